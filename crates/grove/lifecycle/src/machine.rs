//! Guarded status transitions.
//!
//! All status movement funnels through [`StatusStateMachine`]. A transition
//! is admitted only if no command is already in flight and the move is legal
//! for the observed status; the write itself is conditional on that observed
//! status, so a concurrent writer makes the losing call fail closed instead
//! of silently desynchronizing. Dispatch failure after the optimistic write
//! rolls the resource back to `Failed`.

use std::sync::Arc;

use grove_gateway::{CompletionOutcome, ProvisioningCommand, ProvisioningGateway};
use grove_store::ResourceStore;
use grove_types::{
    CorrelationToken, LifecycleAction, ResourceId, ResourceInstance, ResourceStatus,
};
use serde_json::json;
use tracing::{error, info, warn};

use crate::error::{LifecycleError, Result};

/// The transition guard: validates, writes conditionally, dispatches, and
/// rolls back on dispatch failure.
pub struct StatusStateMachine {
    store: Arc<dyn ResourceStore>,
    gateway: Arc<dyn ProvisioningGateway>,
}

impl StatusStateMachine {
    pub fn new(store: Arc<dyn ResourceStore>, gateway: Arc<dyn ProvisioningGateway>) -> Self {
        Self { store, gateway }
    }

    /// Request a lifecycle action for a resource.
    ///
    /// On success the resource sits in the action's pending status with the
    /// returned correlation token recorded; the settled status arrives later
    /// through [`complete`](Self::complete).
    pub async fn request_transition(
        &self,
        id: &ResourceId,
        action: LifecycleAction,
    ) -> Result<CorrelationToken> {
        let resource = self.store.get(id).await?;

        // Duplicate-command rejection: a transient status means a command is
        // already in flight. The rejection is logged so it stays observable.
        if resource.status.is_transient() {
            warn!(
                resource = %id,
                status = %resource.status,
                requested = %action,
                "Rejected duplicate command while transition in flight"
            );
            return Err(LifecycleError::Conflict {
                resource: id.clone(),
                status: resource.status,
            });
        }

        let pending = action.pending_status();
        if !resource.status.can_transition_to(pending) {
            return Err(LifecycleError::InappropriateState {
                resource: id.clone(),
                current: resource.status,
                action,
            });
        }

        // Optimistic write guarded by the status we just read. Losing the
        // race means another writer got there first; fail closed.
        let won = self
            .store
            .compare_and_set_status(id, resource.status, pending)
            .await?;
        if !won {
            warn!(
                resource = %id,
                expected = %resource.status,
                "Lost conditional status write to a concurrent transition"
            );
            return Err(LifecycleError::Conflict {
                resource: id.clone(),
                status: resource.status,
            });
        }

        self.dispatch_or_roll_back(&resource, action.into()).await
    }

    /// Admit a freshly created resource record: persist it in `Creating` and
    /// dispatch the create command.
    pub async fn admit(&self, resource: &ResourceInstance) -> Result<CorrelationToken> {
        self.store.insert(resource).await.map_err(|e| match e {
            grove_store::StoreError::Duplicate(id) => LifecycleError::Conflict {
                resource: id,
                status: resource.status,
            },
            other => other.into(),
        })?;

        self.dispatch_or_roll_back(resource, ProvisioningCommand::Create)
            .await
    }

    /// Apply an asynchronous completion report.
    ///
    /// Maps the resource's pending status to the settled status for the
    /// dispatched command, or to `Failed` when the remote operation failed.
    pub async fn complete(
        &self,
        token: &CorrelationToken,
        outcome: CompletionOutcome,
    ) -> Result<ResourceStatus> {
        let resource = self
            .store
            .find_by_correlation(token)
            .await?
            .ok_or_else(|| LifecycleError::UnknownCorrelation(token.clone()))?;

        let settled = match outcome {
            CompletionOutcome::Failed => ResourceStatus::Failed,
            CompletionOutcome::Succeeded => match resource.status {
                ResourceStatus::Creating
                | ResourceStatus::Starting
                | ResourceStatus::Reconfiguring => ResourceStatus::Running,
                ResourceStatus::Stopping => ResourceStatus::Stopped,
                ResourceStatus::Terminating => ResourceStatus::Terminated,
                other => {
                    // A completion for a resource no longer in flight: the
                    // token was stale. Nothing to settle.
                    warn!(
                        resource = %resource.id,
                        status = %other,
                        token = %token,
                        "Dropping completion report for non-transient resource"
                    );
                    return Err(LifecycleError::Conflict {
                        resource: resource.id,
                        status: other,
                    });
                }
            },
        };

        let won = self
            .store
            .compare_and_set_status(&resource.id, resource.status, settled)
            .await?;
        if !won {
            return Err(LifecycleError::Conflict {
                resource: resource.id,
                status: resource.status,
            });
        }

        self.store.set_correlation(&resource.id, None).await?;
        info!(
            resource = %resource.id,
            settled = %settled,
            token = %token,
            "Completion report applied"
        );
        Ok(settled)
    }

    /// Dispatch a command for a resource already moved into its pending
    /// status; on synchronous dispatch failure roll the status back to
    /// `Failed` and surface the original error.
    async fn dispatch_or_roll_back(
        &self,
        resource: &ResourceInstance,
        command: ProvisioningCommand,
    ) -> Result<CorrelationToken> {
        let payload = json!({
            "owner": resource.owner,
            "project": resource.project,
            "kind": resource.kind,
        });

        match self.gateway.dispatch(resource, command, payload).await {
            Ok(token) => {
                self.store.set_correlation(&resource.id, Some(&token)).await?;
                info!(
                    resource = %resource.id,
                    command = %command,
                    token = %token,
                    "Transition dispatched"
                );
                Ok(token)
            }
            Err(dispatch_err) => {
                warn!(
                    resource = %resource.id,
                    command = %command,
                    error = %dispatch_err,
                    "Dispatch failed, rolling back to failed status"
                );
                // Best effort: a rollback failure is logged but must not
                // mask the dispatch error.
                if let Err(rollback_err) = self
                    .store
                    .set_status(&resource.id, ResourceStatus::Failed)
                    .await
                {
                    error!(
                        resource = %resource.id,
                        error = %rollback_err,
                        "Rollback write failed; resource may be stuck in a pending status"
                    );
                }
                Err(dispatch_err.into())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use grove_gateway::{FailingGateway, RecordingGateway};
    use grove_store::InMemoryResourceStore;
    use grove_types::{CloudProvider, ProjectId, ResourceKind, UserId};

    fn notebook() -> ResourceInstance {
        ResourceInstance::new(
            UserId::new("alice"),
            ProjectId::new("research"),
            ResourceKind::Notebook,
            CloudProvider::Aws,
            Utc::now(),
        )
    }

    async fn machine_with_running_notebook() -> (
        Arc<InMemoryResourceStore>,
        Arc<RecordingGateway>,
        StatusStateMachine,
        ResourceId,
    ) {
        let store = Arc::new(InMemoryResourceStore::new());
        let gateway = Arc::new(RecordingGateway::new());
        let machine = StatusStateMachine::new(store.clone(), gateway.clone());

        let mut nb = notebook();
        nb.status = ResourceStatus::Running;
        store.insert(&nb).await.unwrap();
        (store, gateway, machine, nb.id)
    }

    #[tokio::test]
    async fn test_stop_moves_to_stopping_and_dispatches() {
        let (store, gateway, machine, id) = machine_with_running_notebook().await;

        let token = machine
            .request_transition(&id, LifecycleAction::Stop)
            .await
            .unwrap();

        let stored = store.get(&id).await.unwrap();
        assert_eq!(stored.status, ResourceStatus::Stopping);
        assert_eq!(stored.correlation, Some(token));
        assert_eq!(gateway.dispatch_count(), 1);
    }

    #[tokio::test]
    async fn test_illegal_action_has_no_side_effect() {
        let (store, gateway, machine, id) = machine_with_running_notebook().await;

        // Start is illegal from Running
        let err = machine
            .request_transition(&id, LifecycleAction::Start)
            .await
            .unwrap_err();
        assert!(matches!(err, LifecycleError::InappropriateState { .. }));
        assert_eq!(store.get(&id).await.unwrap().status, ResourceStatus::Running);
        assert_eq!(gateway.dispatch_count(), 0);
    }

    #[tokio::test]
    async fn test_duplicate_command_rejected() {
        let (_store, gateway, machine, id) = machine_with_running_notebook().await;

        machine
            .request_transition(&id, LifecycleAction::Stop)
            .await
            .unwrap();
        let err = machine
            .request_transition(&id, LifecycleAction::Stop)
            .await
            .unwrap_err();
        assert!(matches!(err, LifecycleError::Conflict { .. }));
        assert_eq!(gateway.dispatch_count(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_stops_one_wins() {
        let (_store, _gateway, machine, id) = machine_with_running_notebook().await;

        let (a, b) = tokio::join!(
            machine.request_transition(&id, LifecycleAction::Stop),
            machine.request_transition(&id, LifecycleAction::Stop),
        );

        let successes = [&a, &b].iter().filter(|r| r.is_ok()).count();
        assert_eq!(successes, 1);
        let conflict = [a, b]
            .into_iter()
            .find(|r| r.is_err())
            .unwrap()
            .unwrap_err();
        assert!(matches!(conflict, LifecycleError::Conflict { .. }));
    }

    #[tokio::test]
    async fn test_dispatch_failure_rolls_back_to_failed() {
        let store = Arc::new(InMemoryResourceStore::new());
        let gateway = Arc::new(FailingGateway::new("endpoint down"));
        let machine = StatusStateMachine::new(store.clone(), gateway);

        let mut nb = notebook();
        nb.status = ResourceStatus::Running;
        store.insert(&nb).await.unwrap();

        let err = machine
            .request_transition(&nb.id, LifecycleAction::Stop)
            .await
            .unwrap_err();
        assert!(matches!(err, LifecycleError::Dispatch(_)));
        // never left stuck in Stopping
        assert_eq!(store.get(&nb.id).await.unwrap().status, ResourceStatus::Failed);
    }

    #[tokio::test]
    async fn test_admit_inserts_and_dispatches_create() {
        let store = Arc::new(InMemoryResourceStore::new());
        let gateway = Arc::new(RecordingGateway::new());
        let machine = StatusStateMachine::new(store.clone(), gateway.clone());

        let nb = notebook();
        machine.admit(&nb).await.unwrap();

        assert_eq!(store.get(&nb.id).await.unwrap().status, ResourceStatus::Creating);
        assert_eq!(
            gateway.dispatches()[0].command,
            ProvisioningCommand::Create
        );
    }

    #[tokio::test]
    async fn test_admit_dispatch_failure_leaves_failed_record() {
        let store = Arc::new(InMemoryResourceStore::new());
        let gateway = Arc::new(FailingGateway::new("validation"));
        let machine = StatusStateMachine::new(store.clone(), gateway);

        let nb = notebook();
        assert!(machine.admit(&nb).await.is_err());
        assert_eq!(store.get(&nb.id).await.unwrap().status, ResourceStatus::Failed);
    }

    #[tokio::test]
    async fn test_completion_settles_stop() {
        let (store, _gateway, machine, id) = machine_with_running_notebook().await;

        let token = machine
            .request_transition(&id, LifecycleAction::Stop)
            .await
            .unwrap();
        let settled = machine
            .complete(&token, CompletionOutcome::Succeeded)
            .await
            .unwrap();

        assert_eq!(settled, ResourceStatus::Stopped);
        let stored = store.get(&id).await.unwrap();
        assert_eq!(stored.status, ResourceStatus::Stopped);
        assert!(stored.correlation.is_none());
    }

    #[tokio::test]
    async fn test_completion_failure_settles_failed() {
        let (store, _gateway, machine, id) = machine_with_running_notebook().await;

        let token = machine
            .request_transition(&id, LifecycleAction::Terminate)
            .await
            .unwrap();
        let settled = machine
            .complete(&token, CompletionOutcome::Failed)
            .await
            .unwrap();

        assert_eq!(settled, ResourceStatus::Failed);
        assert_eq!(store.get(&id).await.unwrap().status, ResourceStatus::Failed);
    }

    #[tokio::test]
    async fn test_completion_unknown_token() {
        let (_store, _gateway, machine, _id) = machine_with_running_notebook().await;
        let err = machine
            .complete(&CorrelationToken::generate(), CompletionOutcome::Succeeded)
            .await
            .unwrap_err();
        assert!(matches!(err, LifecycleError::UnknownCorrelation(_)));
    }

    #[tokio::test]
    async fn test_explicit_terminate_from_failed() {
        let store = Arc::new(InMemoryResourceStore::new());
        let gateway = Arc::new(RecordingGateway::new());
        let machine = StatusStateMachine::new(store.clone(), gateway);

        let mut nb = notebook();
        nb.status = ResourceStatus::Failed;
        store.insert(&nb).await.unwrap();

        machine
            .request_transition(&nb.id, LifecycleAction::Terminate)
            .await
            .unwrap();
        assert_eq!(
            store.get(&nb.id).await.unwrap().status,
            ResourceStatus::Terminating
        );
    }
}
