//! Gateway test doubles.
//!
//! Shipped outside `#[cfg(test)]` so downstream crates can exercise dispatch
//! success and failure paths without a provisioning subsystem.

use async_trait::async_trait;
use grove_types::{CorrelationToken, ResourceId, ResourceInstance};
use std::sync::Mutex;

use crate::error::{DispatchError, Result};
use crate::{ProvisioningCommand, ProvisioningGateway};

/// A dispatch observed by [`RecordingGateway`].
#[derive(Debug, Clone)]
pub struct RecordedDispatch {
    pub resource: ResourceId,
    pub command: ProvisioningCommand,
    pub token: CorrelationToken,
}

/// Gateway that accepts every command and records it.
pub struct RecordingGateway {
    dispatches: Mutex<Vec<RecordedDispatch>>,
}

impl RecordingGateway {
    pub fn new() -> Self {
        Self {
            dispatches: Mutex::new(Vec::new()),
        }
    }

    /// All dispatches observed so far.
    pub fn dispatches(&self) -> Vec<RecordedDispatch> {
        self.dispatches.lock().expect("gateway lock poisoned").clone()
    }

    /// Number of dispatches observed so far.
    pub fn dispatch_count(&self) -> usize {
        self.dispatches.lock().expect("gateway lock poisoned").len()
    }
}

impl Default for RecordingGateway {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ProvisioningGateway for RecordingGateway {
    async fn dispatch(
        &self,
        resource: &ResourceInstance,
        command: ProvisioningCommand,
        _payload: serde_json::Value,
    ) -> Result<CorrelationToken> {
        let token = CorrelationToken::generate();
        self.dispatches
            .lock()
            .expect("gateway lock poisoned")
            .push(RecordedDispatch {
                resource: resource.id.clone(),
                command,
                token: token.clone(),
            });
        Ok(token)
    }
}

/// Gateway that rejects every command.
pub struct FailingGateway {
    reason: String,
}

impl FailingGateway {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

#[async_trait]
impl ProvisioningGateway for FailingGateway {
    async fn dispatch(
        &self,
        resource: &ResourceInstance,
        _command: ProvisioningCommand,
        _payload: serde_json::Value,
    ) -> Result<CorrelationToken> {
        Err(DispatchError::Rejected {
            resource: resource.id.clone(),
            reason: self.reason.clone(),
        })
    }
}
