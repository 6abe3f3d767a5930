//! Cascade error types

use grove_store::StoreError;
use thiserror::Error;

/// Cascade errors
#[derive(Debug, Error)]
pub enum CascadeError {
    #[error("Store error during cascade: {0}")]
    Store(#[from] StoreError),
}

/// Convenience result alias for cascade operations
pub type Result<T> = std::result::Result<T, CascadeError>;
