// Error types for the fan-out engine

use thiserror::Error;

use brewmap_core::CoreError;

/// Result type alias for fan-out operations
pub type Result<T> = std::result::Result<T, NotifyError>;

/// Errors that abort a single fan-out invocation
#[derive(Debug, Error)]
pub enum NotifyError {
    /// A relationship, preference, display-name, or write query failed
    #[error("store error: {0}")]
    Store(#[from] CoreError),

    /// A change event lacked a column the trigger handler needs
    #[error("malformed change event on {table}: missing {column}")]
    MalformedEvent {
        table: &'static str,
        column: &'static str,
    },
}

impl NotifyError {
    /// Create a malformed event error
    pub fn malformed(table: &'static str, column: &'static str) -> Self {
        NotifyError::MalformedEvent { table, column }
    }
}
