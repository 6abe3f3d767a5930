//! Gateway error types

use grove_types::{CloudProvider, ResourceId};
use thiserror::Error;

/// Dispatch errors raised synchronously by the provisioning gateway.
///
/// Any of these, raised after the optimistic status write, triggers the
/// caller's rollback to `Failed`.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("Provisioning rejected request for {resource}: {reason}")]
    Rejected { resource: ResourceId, reason: String },

    #[error("Provisioning subsystem unreachable for provider {provider}: {reason}")]
    Unreachable {
        provider: CloudProvider,
        reason: String,
    },

    #[error("No adapter registered for provider {0}")]
    NoAdapter(CloudProvider),
}

/// Convenience result alias for gateway operations
pub type Result<T> = std::result::Result<T, DispatchError>;
