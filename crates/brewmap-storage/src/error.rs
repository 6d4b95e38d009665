// Error types for the storage layer

use thiserror::Error;

/// Result type alias for storage operations
pub type Result<T> = std::result::Result<T, StorageError>;

/// Errors that can occur in the Postgres layer
#[derive(Debug, Error)]
pub enum StorageError {
    /// Query or connection failure
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Required environment variable is missing
    #[error("missing environment variable: {0}")]
    MissingEnv(&'static str),
}
