//! Lifecycle error types

use grove_gateway::DispatchError;
use grove_store::StoreError;
use grove_types::{CorrelationToken, LifecycleAction, ResourceId, ResourceStatus};
use thiserror::Error;

/// Lifecycle errors
#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("Resource not found: {0}")]
    NotFound(ResourceId),

    #[error("Action {action} is illegal for {resource} in status {current}")]
    InappropriateState {
        resource: ResourceId,
        current: ResourceStatus,
        action: LifecycleAction,
    },

    #[error("Concurrent transition already in flight for {resource} (observed {status})")]
    Conflict {
        resource: ResourceId,
        status: ResourceStatus,
    },

    #[error("No resource matches completion token {0}")]
    UnknownCorrelation(CorrelationToken),

    #[error("Provisioning dispatch failed: {0}")]
    Dispatch(#[from] DispatchError),

    #[error("Store error: {0}")]
    Store(StoreError),
}

impl From<StoreError> for LifecycleError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(id) => LifecycleError::NotFound(id),
            other => LifecycleError::Store(other),
        }
    }
}

/// Convenience result alias for lifecycle operations
pub type Result<T> = std::result::Result<T, LifecycleError>;
