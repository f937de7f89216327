//! Hub graph construction, augmentation, merging and persistence.

mod builder;
mod error;
mod merge;
mod model;
mod overrides;
mod persist;
mod proximity;

pub use builder::{BuildOutcome, HubGraphBuilder, build_from_source};
pub use error::GraphError;
pub use merge::{
    MergeOutcome, ValidationReport, apply_weights, merge_and_validate, prune_unresolved_transfers,
    structural_violations,
};
pub use model::HubGraph;
pub use overrides::{OVERRIDE_VERSION, Override, OverrideOutcome, OverrideSet};
pub use persist::{LinkRecord, NodeLinkGraph, NodeRecord, load, save};
pub use proximity::{ProximityConfig, ProximityOutcome, TransferCandidate, augment};
