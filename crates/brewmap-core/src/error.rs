// Error types shared by the store traits

use thiserror::Error;

/// Result type alias for core store operations
pub type Result<T> = std::result::Result<T, CoreError>;

/// Errors surfaced through the store trait seams
#[derive(Debug, Error)]
pub enum CoreError {
    /// Backing store failure (query, connection, write)
    #[error("store error: {0}")]
    Store(String),

    /// Internal error
    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl CoreError {
    /// Create a store error
    pub fn store(msg: impl Into<String>) -> Self {
        CoreError::Store(msg.into())
    }
}
