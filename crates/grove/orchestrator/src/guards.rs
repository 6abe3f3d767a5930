//! Admission guards.
//!
//! An ordered pipeline of checks evaluated before any state is written for
//! an operation. The first denial wins; a denied operation never reaches the
//! state machine. Cross-cutting concerns (budget today, quota or audit
//! checks tomorrow) plug in here instead of being woven into lifecycle code.

use async_trait::async_trait;
use grove_types::{LifecycleAction, ProjectId, ResourceInstance};
use std::sync::Arc;
use tracing::warn;

use crate::error::{OrchestratorError, Result};

/// Operation submitted to the guard pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardedOperation {
    /// Admission of a brand-new resource.
    Create,
    /// A lifecycle action on an existing resource.
    Action(LifecycleAction),
}

impl GuardedOperation {
    /// Does this operation bring billable capacity up?
    pub fn is_billable(&self) -> bool {
        match self {
            GuardedOperation::Create => true,
            GuardedOperation::Action(action) => action.is_billable(),
        }
    }
}

/// A single admission check.
#[async_trait]
pub trait Guard: Send + Sync {
    /// Identifier used in denial logs.
    fn id(&self) -> &str;

    /// Check the operation; an error refuses it before any mutation.
    async fn check(&self, resource: &ResourceInstance, operation: GuardedOperation) -> Result<()>;
}

/// Run the pipeline in order; the first denial is returned.
pub async fn run_guards(
    guards: &[Arc<dyn Guard>],
    resource: &ResourceInstance,
    operation: GuardedOperation,
) -> Result<()> {
    for guard in guards {
        if let Err(err) = guard.check(resource, operation).await {
            warn!(
                resource = %resource.id,
                guard = guard.id(),
                ?operation,
                "Operation refused by guard"
            );
            return Err(err);
        }
    }
    Ok(())
}

/// Budget admission collaborator consulted before billable operations.
#[async_trait]
pub trait BudgetGate: Send + Sync {
    /// Has this project exhausted its budget?
    async fn is_over_budget(&self, project: &ProjectId) -> bool;
}

/// Gate that never refuses. Default for development and tests.
pub struct AllowAllBudgetGate;

#[async_trait]
impl BudgetGate for AllowAllBudgetGate {
    async fn is_over_budget(&self, _project: &ProjectId) -> bool {
        false
    }
}

/// Gate refusing a fixed set of projects. Test double.
pub struct DenyListBudgetGate {
    over_budget: Vec<ProjectId>,
}

impl DenyListBudgetGate {
    pub fn new(over_budget: impl IntoIterator<Item = ProjectId>) -> Self {
        Self {
            over_budget: over_budget.into_iter().collect(),
        }
    }
}

#[async_trait]
impl BudgetGate for DenyListBudgetGate {
    async fn is_over_budget(&self, project: &ProjectId) -> bool {
        self.over_budget.contains(project)
    }
}

/// Guard refusing billable operations for over-budget projects.
pub struct BudgetGuard {
    gate: Arc<dyn BudgetGate>,
}

impl BudgetGuard {
    pub fn new(gate: Arc<dyn BudgetGate>) -> Self {
        Self { gate }
    }
}

#[async_trait]
impl Guard for BudgetGuard {
    fn id(&self) -> &str {
        "budget"
    }

    async fn check(&self, resource: &ResourceInstance, operation: GuardedOperation) -> Result<()> {
        if !operation.is_billable() {
            return Ok(());
        }
        if self.gate.is_over_budget(&resource.project).await {
            return Err(OrchestratorError::GuardDenied {
                reason: format!("project {} is over budget", resource.project),
            });
        }
        Ok(())
    }
}
