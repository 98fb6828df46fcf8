//! Error taxonomy shared by the editor, store and suggestion adapter.

/// Result type alias using [`PromptError`].
pub type Result<T> = std::result::Result<T, PromptError>;

/// Errors surfaced to the user by template and AI operations.
#[derive(Debug, thiserror::Error)]
pub enum PromptError {
    /// Required template fields are missing. Holds every violation at once.
    #[error("Validation failed: {}", .0.join("; "))]
    Validation(Vec<String>),

    /// The referenced template (or channel) does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// The template belongs to a different user.
    #[error("You do not have permission to edit prompt {id}")]
    Forbidden { id: String },

    /// The daily AI request ceiling was reached.
    #[error("Daily AI request limit reached ({limit} requests)")]
    QuotaExceeded { limit: u32 },

    /// The remote suggestion service asked us to back off.
    #[error("The AI service is rate limiting requests, try again later")]
    RateLimited,

    /// Any other storage, network or parse failure.
    #[error("{0}")]
    Adapter(String),
}

impl PromptError {
    /// Create an adapter error.
    pub fn adapter(msg: impl Into<String>) -> Self {
        PromptError::Adapter(msg.into())
    }

    /// Whether this error should be shown as a transient notice rather than a failure.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            PromptError::QuotaExceeded { .. } | PromptError::RateLimited
        )
    }
}

impl From<rusqlite::Error> for PromptError {
    fn from(e: rusqlite::Error) -> Self {
        PromptError::Adapter(format!("Storage error: {}", e))
    }
}

impl From<serde_json::Error> for PromptError {
    fn from(e: serde_json::Error) -> Self {
        PromptError::Adapter(format!("JSON error: {}", e))
    }
}

impl From<reqwest::Error> for PromptError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            PromptError::Adapter("Request timeout - the AI service took too long to respond".into())
        } else if e.is_connect() {
            PromptError::Adapter("Connection error - unable to reach the AI service".into())
        } else {
            PromptError::Adapter(format!("Network error: {}", e))
        }
    }
}

impl From<std::io::Error> for PromptError {
    fn from(e: std::io::Error) -> Self {
        PromptError::Adapter(format!("I/O error: {}", e))
    }
}
