//! Store error types

use grove_types::ResourceId;
use thiserror::Error;

/// Store errors
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Resource not found: {0}")]
    NotFound(ResourceId),

    #[error("Resource already exists: {0}")]
    Duplicate(ResourceId),

    #[error("Storage error: {0}")]
    Storage(String),
}

/// Convenience result alias for store operations
pub type Result<T> = std::result::Result<T, StoreError>;
