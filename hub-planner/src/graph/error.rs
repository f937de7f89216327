//! Graph construction, override and persistence errors.

use crate::domain::{EdgeTriple, HubId, StationId};

#[derive(Debug, thiserror::Error)]
pub enum GraphError {
    #[error("unknown hub: {0}")]
    UnknownHub(HubId),

    #[error("station {station} already belongs to hub {existing}, cannot add it to {requested}")]
    StationConflict {
        station: StationId,
        existing: HubId,
        requested: HubId,
    },

    #[error("edge would loop on hub {0}")]
    SelfLoop(HubId),

    #[error("no such edge: {0}")]
    UnknownEdge(EdgeTriple),

    #[error("unsupported override document version {found} (supported: {supported})")]
    OverrideVersion { found: u32, supported: u32 },

    #[error("invalid link {index}: {message}")]
    InvalidLink { index: usize, message: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
