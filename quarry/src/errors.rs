use thiserror::Error;

/// Top-level error type returned by quarry builders, parsers and config loaders.
#[derive(Debug, Error)]
pub enum QueryError {
    /// A nested group could not be created because its setup failed.
    #[error("group creation failed: {message}")]
    GroupCreation { message: String },

    /// A node reached validation with an occurrence that was never resolved.
    #[error("unresolved occurrence at {path}")]
    UnresolvedOccurrence { path: String },

    /// Invalid input supplied to a request parser.
    #[error("invalid request: {message}")]
    InvalidRequest { message: String },

    /// Configuration could not be loaded or parsed.
    #[error("config error: {message}")]
    Config { message: String },

    /// JSON (de)serialization of a model failed.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl QueryError {
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest {
            message: message.into(),
        }
    }

    pub fn group_creation(message: impl Into<String>) -> Self {
        Self::GroupCreation {
            message: message.into(),
        }
    }
}
