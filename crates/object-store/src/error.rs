//! Error types for the secret store.

/// Errors that can occur when working with the secret store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// No object at the given key
    #[error("object not found: {0}")]
    NotFound(String),

    /// Object storage error
    #[error("object storage error: {0}")]
    ObjectStore(object_store::Error),

    /// Invalid configuration
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// S3 bucket not found - must be created before use
    #[error("S3 bucket '{0}' does not exist. Create it before starting the service.")]
    BucketNotFound(String),
}

impl StoreError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound(_))
    }
}

impl From<object_store::Error> for StoreError {
    fn from(e: object_store::Error) -> Self {
        match e {
            object_store::Error::NotFound { path, .. } => StoreError::NotFound(path),
            e => StoreError::ObjectStore(e),
        }
    }
}

/// Result type alias for secret store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
