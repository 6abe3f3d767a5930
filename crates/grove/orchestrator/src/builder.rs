//! Builder for LifecycleOrchestrator
//!
//! The builder pattern allows flexible configuration of the orchestrator
//! with all its required dependencies.

use std::sync::Arc;

use grove_cascade::CascadePolicy;
use grove_gateway::ProvisioningGateway;
use grove_lifecycle::StatusStateMachine;
use grove_store::ResourceStore;

use crate::config::OrchestratorConfig;
use crate::error::{OrchestratorError, Result};
use crate::guards::{AllowAllBudgetGate, BudgetGate, BudgetGuard, Guard};
use crate::orchestrator::LifecycleOrchestrator;

/// Builder for constructing a LifecycleOrchestrator with all dependencies
pub struct OrchestratorBuilder {
    store: Option<Arc<dyn ResourceStore>>,
    gateway: Option<Arc<dyn ProvisioningGateway>>,
    budget_gate: Option<Arc<dyn BudgetGate>>,
    extra_guards: Vec<Arc<dyn Guard>>,
    config: Option<OrchestratorConfig>,
}

impl OrchestratorBuilder {
    /// Create a new builder
    pub fn new() -> Self {
        Self {
            store: None,
            gateway: None,
            budget_gate: None,
            extra_guards: Vec::new(),
            config: None,
        }
    }

    /// Set the resource store
    pub fn with_store(mut self, store: Arc<dyn ResourceStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Set the provisioning gateway
    pub fn with_gateway(mut self, gateway: Arc<dyn ProvisioningGateway>) -> Self {
        self.gateway = Some(gateway);
        self
    }

    /// Set the budget admission gate
    pub fn with_budget_gate(mut self, gate: Arc<dyn BudgetGate>) -> Self {
        self.budget_gate = Some(gate);
        self
    }

    /// Append an additional admission guard, evaluated after the budget guard
    pub fn with_guard(mut self, guard: Arc<dyn Guard>) -> Self {
        self.extra_guards.push(guard);
        self
    }

    /// Set the orchestrator configuration
    pub fn with_config(mut self, config: OrchestratorConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Build the orchestrator with all components
    pub fn build(self) -> Result<LifecycleOrchestrator> {
        let store = self
            .store
            .ok_or_else(|| OrchestratorError::InvalidRequest("store required".into()))?;
        let gateway = self
            .gateway
            .ok_or_else(|| OrchestratorError::InvalidRequest("gateway required".into()))?;

        let budget_gate = self
            .budget_gate
            .unwrap_or_else(|| Arc::new(AllowAllBudgetGate));
        let mut guards: Vec<Arc<dyn Guard>> = vec![Arc::new(BudgetGuard::new(budget_gate))];
        guards.extend(self.extra_guards);

        Ok(LifecycleOrchestrator {
            machine: StatusStateMachine::new(store.clone(), gateway),
            cascade: CascadePolicy::new(store.clone()),
            store,
            guards,
            config: self.config.unwrap_or_default(),
        })
    }
}

impl Default for OrchestratorBuilder {
    fn default() -> Self {
        Self::new()
    }
}
