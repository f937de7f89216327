//! Station name lookup over the hub graph.
//!
//! Resolves free text typed by a user (a hub identifier, a constituent
//! station identifier, or a station name) to a hub of a loaded graph.

mod names;

pub use names::{NameMatch, StationMatch, StationNames, normalize};
