//! Journey-time search over the finalized hub graph.
//!
//! This module answers "how long does it take to get from hub A to hub B",
//! counting a fixed penalty for every change between lines, and ranks
//! candidate meeting hubs for a group of travellers by average journey time.
//!
//! The search is read-only: it borrows the graph and never mutates it, so
//! one graph can serve many concurrent queries.

mod config;
mod rank;
mod search;

pub use config::SearchConfig;
pub use rank::{CancelToken, RankedCandidate, Ranking, Traveller, rank_candidates};
pub use search::{JourneySearch, SearchError, SearchOutcome};
