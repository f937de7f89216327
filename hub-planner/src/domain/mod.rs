//! Domain types for the hub graph.
//!
//! This module contains the core model shared by the build pipeline and the
//! search engine. Identifier and duration types enforce their invariants at
//! construction time, so code that receives them can trust their validity.

mod edge;
mod error;
mod hub;
mod ids;
mod minutes;

pub use edge::{Edge, EdgeKey, EdgeKind, EdgeTriple};
pub use error::DomainError;
pub use hub::{ConstituentStation, Hub};
pub use ids::{HubId, InvalidId, LineId, Mode, StationId};
pub use minutes::Minutes;
