//! Transit source error types.

/// Errors that can occur when talking to an upstream transit data source.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// HTTP request failed (network error, timeout, etc.)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Invalid or missing app key
    #[error("unauthorized: check TRANSIT_APP_KEY")]
    Unauthorized,

    /// Rate limited by the API
    #[error("rate limited by transit API")]
    RateLimited,

    /// The requested resource does not exist upstream
    #[error("not found: {0}")]
    NotFound(String),

    /// API returned an error status
    #[error("API error {status}: {message}")]
    Api { status: u16, message: String },

    /// Failed to parse response JSON
    #[error("JSON parse error: {message}")]
    Json {
        message: String,
        body: Option<String>,
    },

    /// Local fixture data could not be read
    #[error("fixture error: {0}")]
    Fixture(String),
}

impl SourceError {
    /// Whether a retry could plausibly succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            SourceError::Http(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            SourceError::RateLimited => true,
            SourceError::Api { status, .. } => *status >= 500,
            SourceError::Unauthorized
            | SourceError::NotFound(_)
            | SourceError::Json { .. }
            | SourceError::Fixture(_) => false,
        }
    }
}
