//! Resolution store errors.

#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    #[error("unsupported resolution store version {found} (supported: {supported})")]
    StoreVersion { found: u32, supported: u32 },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
