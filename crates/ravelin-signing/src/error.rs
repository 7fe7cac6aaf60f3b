use thiserror::Error;

/// Errors produced while signing a request.
#[derive(Debug, Error)]
pub enum SigningError {
    /// The request body could not be serialized.
    #[error("failed to serialize request body: {0}")]
    Body(#[from] serde_json::Error),
}
