//! Orchestrator error types

use grove_cascade::CascadeError;
use grove_lifecycle::LifecycleError;
use grove_store::StoreError;
use grove_types::{ResourceId, ResourceStatus, RuleValidationError};
use thiserror::Error;

/// Orchestrator errors
#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Operation refused by guard: {reason}")]
    GuardDenied { reason: String },

    #[error("Resource {resource} is in terminal status {status}")]
    TerminalResource {
        resource: ResourceId,
        status: ResourceStatus,
    },

    #[error("Invalid schedule rule: {0}")]
    InvalidRule(#[from] RuleValidationError),

    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),

    #[error(transparent)]
    Cascade(#[from] CascadeError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

/// Convenience result alias for orchestrator operations
pub type Result<T> = std::result::Result<T, OrchestratorError>;
