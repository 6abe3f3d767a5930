//! Per-provider dispatch adapters.
//!
//! Each cloud provider gets one adapter implementing the same small
//! capability interface; the gateway selects the adapter once per resource
//! from its stored provider field. Lifecycle code never branches on the
//! provider enum itself.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use grove_types::{CloudProvider, CorrelationToken, ResourceInstance};
use tracing::{debug, info};

use crate::error::{DispatchError, Result};
use crate::{ProvisioningCommand, ProvisioningGateway};

/// Capability interface implemented once per cloud provider.
#[async_trait]
pub trait ProviderAdapter: Send + Sync {
    /// The provider this adapter serves.
    fn provider(&self) -> CloudProvider;

    /// Enqueue a command with the provider-side provisioning endpoint and
    /// return the correlation token identifying the request.
    async fn enqueue(
        &self,
        resource: &ResourceInstance,
        command: ProvisioningCommand,
        payload: serde_json::Value,
    ) -> Result<CorrelationToken>;
}

macro_rules! stub_adapter {
    ($name:ident, $provider:expr, $doc:literal) => {
        #[doc = $doc]
        ///
        /// Models the request contract only: the command is acknowledged and
        /// assigned a correlation token. A deployment wires the real
        /// provisioning client in behind this trait.
        pub struct $name;

        #[async_trait]
        impl ProviderAdapter for $name {
            fn provider(&self) -> CloudProvider {
                $provider
            }

            async fn enqueue(
                &self,
                resource: &ResourceInstance,
                command: ProvisioningCommand,
                payload: serde_json::Value,
            ) -> Result<CorrelationToken> {
                let token = CorrelationToken::generate();
                debug!(
                    resource = %resource.id,
                    provider = %self.provider(),
                    command = %command,
                    payload = %payload,
                    token = %token,
                    "Enqueued provisioning command"
                );
                Ok(token)
            }
        }
    };
}

stub_adapter!(AwsAdapter, CloudProvider::Aws, "AWS provisioning adapter.");
stub_adapter!(
    AzureAdapter,
    CloudProvider::Azure,
    "Azure provisioning adapter."
);
stub_adapter!(GcpAdapter, CloudProvider::Gcp, "GCP provisioning adapter.");

/// Gateway routing each dispatch to the adapter registered for the
/// resource's provider.
pub struct ProviderGateway {
    adapters: HashMap<CloudProvider, Arc<dyn ProviderAdapter>>,
}

impl ProviderGateway {
    /// Create a gateway with no adapters registered.
    pub fn new() -> Self {
        Self {
            adapters: HashMap::new(),
        }
    }

    /// Create a gateway with the stub adapters for all providers, for
    /// development setups.
    pub fn with_all_stubs() -> Self {
        Self::new()
            .with_adapter(Arc::new(AwsAdapter))
            .with_adapter(Arc::new(AzureAdapter))
            .with_adapter(Arc::new(GcpAdapter))
    }

    /// Register an adapter, replacing any prior one for the same provider.
    pub fn with_adapter(mut self, adapter: Arc<dyn ProviderAdapter>) -> Self {
        self.adapters.insert(adapter.provider(), adapter);
        self
    }
}

impl Default for ProviderGateway {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ProvisioningGateway for ProviderGateway {
    async fn dispatch(
        &self,
        resource: &ResourceInstance,
        command: ProvisioningCommand,
        payload: serde_json::Value,
    ) -> Result<CorrelationToken> {
        let adapter = self
            .adapters
            .get(&resource.provider)
            .ok_or(DispatchError::NoAdapter(resource.provider))?;

        let token = adapter.enqueue(resource, command, payload).await?;
        info!(
            resource = %resource.id,
            provider = %resource.provider,
            command = %command,
            token = %token,
            "Dispatched provisioning command"
        );
        Ok(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use grove_types::{ProjectId, ResourceKind, UserId};

    fn resource(provider: CloudProvider) -> ResourceInstance {
        ResourceInstance::new(
            UserId::new("alice"),
            ProjectId::new("research"),
            ResourceKind::Notebook,
            provider,
            Utc::now(),
        )
    }

    #[tokio::test]
    async fn test_routes_to_matching_adapter() {
        let gateway = ProviderGateway::with_all_stubs();
        let token = gateway
            .dispatch(
                &resource(CloudProvider::Azure),
                ProvisioningCommand::Start,
                serde_json::json!({}),
            )
            .await
            .unwrap();
        assert!(format!("{}", token).starts_with("corr:"));
    }

    #[tokio::test]
    async fn test_missing_adapter_is_an_error() {
        let gateway = ProviderGateway::new().with_adapter(Arc::new(AwsAdapter));
        let err = gateway
            .dispatch(
                &resource(CloudProvider::Gcp),
                ProvisioningCommand::Stop,
                serde_json::json!({}),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, DispatchError::NoAdapter(CloudProvider::Gcp)));
    }
}
