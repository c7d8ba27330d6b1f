//! Error types module
//!
//! The reporter never propagates its own failures to callers; these types exist
//! so the failure paths it recovers from are explicit values rather than
//! swallowed panics.

/// Failure to encode an [`ErrorReport`](crate::ErrorReport) into a response body.
#[derive(Debug, thiserror::Error)]
pub enum EncodeError {
    #[error("{0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}

impl EncodeError {
    pub fn other(message: impl Into<String>) -> Self {
        EncodeError::Other(message.into())
    }
}
