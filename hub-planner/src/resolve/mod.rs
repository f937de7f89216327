//! Edge duration resolution.
//!
//! Three resolvers fill in weights for disjoint subsets of edges:
//!
//! - [`resolve_timetables`]: line edges of modes with scheduled-interval data
//! - [`resolve_journeys`]: remaining line edges, via point-to-point queries
//! - [`resolve_transfers`]: transfer pairs, via walking queries
//!
//! All of them reduce multiple observations with the same
//! [`ReconcilePolicy`] and only produce weights; writing them onto the graph
//! is left to the merge stage.

mod error;
mod journey;
mod observation;
mod reconcile;
mod store;
mod timetable;
mod transfer;

use std::collections::BTreeMap;

use crate::domain::{EdgeTriple, Minutes};
use crate::report::StageReport;

pub use error::ResolveError;
pub use journey::resolve_journeys;
pub use observation::{DurationObservation, ObservationSet};
pub use reconcile::{Aggregate, ReconcilePolicy, Reconciled, Tolerance};
pub use store::{ResolvedStore, StoredWeight};
pub use timetable::{WalkStats, interval_lines, observe_sequence, resolve_timetables};
pub use transfer::resolve_transfers;

/// Weights produced by one resolver run.
#[derive(Debug)]
pub struct ResolverOutcome {
    pub weights: BTreeMap<EdgeTriple, Minutes>,
    /// Upstream queries issued.
    pub queried: usize,
    pub report: StageReport,
}
