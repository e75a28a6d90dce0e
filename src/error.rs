use thiserror::Error;

/// Failures that end an operation. Degraded but successful outcomes are
/// reported through [`crate::outcome::Outcome`] instead.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ServiceError {
    #[error("You must be signed in to {0}")]
    Unauthenticated(&'static str),

    /// A required store step failed. Carries the store's message.
    #[error("{0}")]
    StoreRejected(String),

    #[error("{0}")]
    InvalidInput(String),

    #[error("{0}")]
    NotFound(String),
}

impl ServiceError {
    /// Wraps a store failure, falling back to `fallback` when the store gave
    /// no message of its own.
    pub fn store_rejected(err: &anyhow::Error, fallback: &str) -> Self {
        let message = format!("{:#}", err);
        if message.trim().is_empty() {
            ServiceError::StoreRejected(fallback.to_string())
        } else {
            ServiceError::StoreRejected(message)
        }
    }
}
