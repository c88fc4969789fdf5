use thiserror::Error;

/// Unified error type for all data source operations
#[derive(Error, Debug)]
pub enum DataError {
    /// Requested data source is not registered (programmer error)
    #[error("Unknown data source: {0}")]
    UnknownSource(String),

    /// Connection failed (authentication, network, etc.)
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Credentials are present but malformed or rejected by the backend
    #[error("Invalid credentials: {0}")]
    InvalidCredentials(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Query execution failed after a successful connection
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Entity, bucket or catalog not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Operation not supported by this backend
    #[error("Operation not supported: {0}")]
    OperationNotSupported(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// Generic backend error
    #[error("Backend error: {0}")]
    BackendError(String),
}

impl DataError {
    /// Create a "not found" error with custom message
    pub fn not_found(msg: impl Into<String>) -> Self {
        DataError::NotFound(msg.into())
    }

    /// Create an operation not supported error
    pub fn operation_not_supported(msg: impl Into<String>) -> Self {
        DataError::OperationNotSupported(msg.into())
    }

    /// Create an invalid configuration error
    pub fn invalid_configuration(msg: impl Into<String>) -> Self {
        DataError::InvalidConfiguration(msg.into())
    }

    /// Create a query failure with custom message
    pub fn query_failed(msg: impl Into<String>) -> Self {
        DataError::QueryFailed(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, DataError>;
