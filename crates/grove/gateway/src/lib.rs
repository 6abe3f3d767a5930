//! GROVE provisioning gateway
//!
//! Seam between the control plane and the remote provisioning subsystem.
//! Dispatch is fire-and-forget: a request returns a correlation token
//! immediately, and the real outcome arrives later through a completion
//! report matched by that token. Only the request contract is modeled here;
//! the wire mechanics belong to the provisioning subsystem itself.

pub mod error;
pub mod provider;
pub mod testing;

pub use error::{DispatchError, Result};
pub use provider::{AwsAdapter, AzureAdapter, GcpAdapter, ProviderAdapter, ProviderGateway};
pub use testing::{FailingGateway, RecordingGateway};

use async_trait::async_trait;
use grove_types::{CorrelationToken, LifecycleAction, ResourceInstance};
use serde::{Deserialize, Serialize};

/// Command shipped to the provisioning subsystem.
///
/// `Create` exists here but not in [`LifecycleAction`]: creation is admitted
/// by the orchestrator directly, not requested as a transition of an
/// existing status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProvisioningCommand {
    Create,
    Start,
    Stop,
    Terminate,
    Reconfigure,
}

impl From<LifecycleAction> for ProvisioningCommand {
    fn from(action: LifecycleAction) -> Self {
        match action {
            LifecycleAction::Start => ProvisioningCommand::Start,
            LifecycleAction::Stop => ProvisioningCommand::Stop,
            LifecycleAction::Terminate => ProvisioningCommand::Terminate,
            LifecycleAction::Reconfigure => ProvisioningCommand::Reconfigure,
        }
    }
}

impl std::fmt::Display for ProvisioningCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProvisioningCommand::Create => write!(f, "create"),
            ProvisioningCommand::Start => write!(f, "start"),
            ProvisioningCommand::Stop => write!(f, "stop"),
            ProvisioningCommand::Terminate => write!(f, "terminate"),
            ProvisioningCommand::Reconfigure => write!(f, "reconfigure"),
        }
    }
}

/// Outcome reported asynchronously for a dispatched command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CompletionOutcome {
    /// The remote operation finished; the resource reached the action's
    /// settled status.
    Succeeded,
    /// The remote operation failed; the resource is left in `Failed`.
    Failed,
}

/// Gateway accepting lifecycle commands for remote execution
#[async_trait]
pub trait ProvisioningGateway: Send + Sync {
    /// Dispatch a command for a resource. Returns the correlation token the
    /// later completion report will carry. A synchronous error here means
    /// nothing was enqueued remotely.
    async fn dispatch(
        &self,
        resource: &ResourceInstance,
        command: ProvisioningCommand,
        payload: serde_json::Value,
    ) -> Result<CorrelationToken>;
}
