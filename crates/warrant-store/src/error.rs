//! Store error types.

/// Errors from policy store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A storage operation failed.
    #[error("storage error: {0}")]
    Internal(String),

    /// Connection to the storage backend failed.
    #[error("connection error: {0}")]
    Connection(String),

    /// Serialization or deserialization failed.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// A record failed validation before being written.
    #[error("invalid {field}: {message}")]
    InvalidRecord {
        /// The offending attribute.
        field: &'static str,
        /// What is wrong with it.
        message: String,
    },
}

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
