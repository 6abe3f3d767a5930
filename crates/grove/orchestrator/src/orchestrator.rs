//! The lifecycle orchestrator.
//!
//! One `tick` runs six independent sweeps: {notebook, cluster} x {stop,
//! start, terminate}. Each sweep queries candidates by status, asks the
//! schedule evaluator and inactivity monitor whether each one fires, and
//! pushes matches through the state machine. Sweeps have no ordering
//! guarantee and run concurrently; a single resource's failure is logged
//! and never aborts the rest of the tick. Nothing is retried here — the
//! next tick re-evaluates whatever is still pending.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

use grove_cascade::{stop_targets, sync_start_targets, terminate_targets, CascadePolicy};
use grove_gateway::CompletionOutcome;
use grove_lifecycle::StatusStateMachine;
use grove_schedule::{fires, should_stop_for_inactivity, SchedulePurpose};
use grove_store::ResourceStore;
use grove_types::{
    CorrelationToken, LifecycleAction, ResourceId, ResourceInstance, ResourceKind, ResourceStatus,
    ScheduleRule, UserId,
};

use crate::config::OrchestratorConfig;
use crate::error::{OrchestratorError, Result};
use crate::guards::{run_guards, Guard, GuardedOperation};

/// Outcome counts for one sweep of one tick.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct SweepStats {
    /// Candidates with a rule that were evaluated.
    pub examined: usize,
    /// Transitions dispatched.
    pub fired: usize,
    /// Candidates whose transition failed and was skipped.
    pub failed: usize,
}

/// Per-sweep outcome of one orchestrator tick.
#[derive(Debug, Clone, Default, Serialize)]
pub struct TickReport {
    pub notebook_stop: SweepStats,
    pub notebook_start: SweepStats,
    pub notebook_terminate: SweepStats,
    pub cluster_stop: SweepStats,
    pub cluster_start: SweepStats,
    pub cluster_terminate: SweepStats,
}

impl TickReport {
    pub fn total_fired(&self) -> usize {
        self.notebook_stop.fired
            + self.notebook_start.fired
            + self.notebook_terminate.fired
            + self.cluster_stop.fired
            + self.cluster_start.fired
            + self.cluster_terminate.fired
    }

    pub fn total_failed(&self) -> usize {
        self.notebook_stop.failed
            + self.notebook_start.failed
            + self.notebook_terminate.failed
            + self.cluster_stop.failed
            + self.cluster_start.failed
            + self.cluster_terminate.failed
    }
}

/// Top-level coordinator for scheduled and user-driven lifecycle actions.
pub struct LifecycleOrchestrator {
    pub(crate) store: Arc<dyn ResourceStore>,
    pub(crate) machine: StatusStateMachine,
    pub(crate) cascade: CascadePolicy,
    pub(crate) guards: Vec<Arc<dyn Guard>>,
    pub(crate) config: OrchestratorConfig,
}

impl LifecycleOrchestrator {
    /// Run one scheduler tick at the given instant.
    ///
    /// The instant is passed in rather than read from a clock so a tick is a
    /// deterministic function of (store contents, now).
    pub async fn tick(&self, now: DateTime<Utc>) -> TickReport {
        let (
            notebook_stop,
            notebook_start,
            notebook_terminate,
            cluster_stop,
            cluster_start,
            cluster_terminate,
        ) = tokio::join!(
            self.sweep_notebook_stop(now),
            self.sweep_notebook_start(now),
            self.sweep_notebook_terminate(now),
            self.sweep_cluster_stop(now),
            self.sweep_cluster_start(now),
            self.sweep_cluster_terminate(now),
        );

        let report = TickReport {
            notebook_stop,
            notebook_start,
            notebook_terminate,
            cluster_stop,
            cluster_start,
            cluster_terminate,
        };
        info!(
            fired = report.total_fired(),
            failed = report.total_failed(),
            "Tick complete"
        );
        report
    }

    /// "What is about to stop" query for a user's resources.
    ///
    /// Reuses the evaluator's stop-preview purpose; never mutates state.
    pub async fn active_schedulers(
        &self,
        user: &UserId,
        now: DateTime<Utc>,
        lookahead_minutes: Option<i64>,
    ) -> Result<Vec<ResourceInstance>> {
        let window_minutes =
            lookahead_minutes.unwrap_or(self.config.default_preview_window_minutes);
        let owned = self.store.list_by_owner(user).await?;
        Ok(owned
            .into_iter()
            .filter(|r| r.status == ResourceStatus::Running)
            .filter(|r| {
                r.schedule.as_ref().map_or(false, |rule| {
                    fires(rule, now, SchedulePurpose::StopPreview { window_minutes })
                })
            })
            .collect())
    }

    /// Admit a new resource: guard pipeline first, then insert + dispatch.
    pub async fn create_resource(&self, resource: &ResourceInstance) -> Result<CorrelationToken> {
        run_guards(&self.guards, resource, GuardedOperation::Create).await?;
        Ok(self.machine.admit(resource).await?)
    }

    /// User-driven lifecycle action, with the same cascade semantics as the
    /// scheduler sweeps.
    pub async fn request_action(
        &self,
        id: &ResourceId,
        action: LifecycleAction,
    ) -> Result<CorrelationToken> {
        let resource = self.store.get(id).await?;
        run_guards(&self.guards, &resource, GuardedOperation::Action(action)).await?;
        let token = self.machine.request_transition(id, action).await?;

        if resource.kind == ResourceKind::Notebook {
            let dependents = self.store.list_children(id).await?;
            match action {
                LifecycleAction::Stop => self.cascade_stop(&dependents).await,
                LifecycleAction::Terminate => self.cascade_terminate(&dependents).await,
                LifecycleAction::Start => {
                    if resource.schedule.as_ref().is_some_and(|r| r.sync_start) {
                        self.cascade_sync_start(&dependents).await;
                    }
                }
                LifecycleAction::Reconfigure => {}
            }
        }
        Ok(token)
    }

    /// Attach or replace a resource's schedule rule.
    ///
    /// Rejected for terminal resources. A notebook rule is propagated to the
    /// notebook's dependent clusters.
    pub async fn set_schedule(&self, id: &ResourceId, rule: &ScheduleRule) -> Result<()> {
        rule.validate()?;
        let resource = self.store.get(id).await?;
        if resource.status.is_terminal() {
            return Err(OrchestratorError::TerminalResource {
                resource: id.clone(),
                status: resource.status,
            });
        }
        self.store.set_rule(id, rule).await?;
        if resource.kind == ResourceKind::Notebook {
            self.cascade.propagate_rule(&resource, rule).await?;
        }
        Ok(())
    }

    /// Detach a resource's schedule rule.
    pub async fn clear_schedule(&self, id: &ResourceId) -> Result<()> {
        let resource = self.store.get(id).await?;
        if resource.status.is_terminal() {
            return Err(OrchestratorError::TerminalResource {
                resource: id.clone(),
                status: resource.status,
            });
        }
        Ok(self.store.clear_rule(id).await?)
    }

    /// Record observed user activity for the inactivity monitor.
    pub async fn record_activity(&self, id: &ResourceId, at: DateTime<Utc>) -> Result<()> {
        Ok(self.store.update_last_activity(id, at).await?)
    }

    /// Apply an asynchronous provisioning completion report.
    pub async fn on_completion(
        &self,
        token: &CorrelationToken,
        outcome: CompletionOutcome,
    ) -> Result<ResourceStatus> {
        Ok(self.machine.complete(token, outcome).await?)
    }

    // ---- sweeps ---------------------------------------------------------

    async fn sweep_notebook_stop(&self, now: DateTime<Utc>) -> SweepStats {
        let candidates = self
            .candidates(ResourceKind::Notebook, ResourceStatus::Running, "notebook-stop")
            .await;
        let mut stats = SweepStats::default();
        for notebook in candidates {
            let Some(rule) = notebook.schedule.clone() else {
                continue;
            };
            stats.examined += 1;
            match self.try_stop_notebook(&notebook, &rule, now).await {
                Ok(true) => stats.fired += 1,
                Ok(false) => {}
                Err(err) => {
                    warn!(resource = %notebook.id, error = %err, "Notebook stop failed");
                    stats.failed += 1;
                }
            }
        }
        stats
    }

    async fn try_stop_notebook(
        &self,
        notebook: &ResourceInstance,
        rule: &ScheduleRule,
        now: DateTime<Utc>,
    ) -> Result<bool> {
        let dependents = self.store.list_children(&notebook.id).await?;
        let scheduled = fires(rule, now, SchedulePurpose::Stop);
        let idle = self.config.inactivity_enabled
            && should_stop_for_inactivity(notebook, rule, now, &dependents);
        if !scheduled && !idle {
            return Ok(false);
        }
        debug!(resource = %notebook.id, scheduled, idle, "Stopping notebook");
        self.machine
            .request_transition(&notebook.id, LifecycleAction::Stop)
            .await?;
        self.cascade_stop(&dependents).await;
        Ok(true)
    }

    async fn sweep_notebook_start(&self, now: DateTime<Utc>) -> SweepStats {
        let candidates = self
            .candidates(ResourceKind::Notebook, ResourceStatus::Stopped, "notebook-start")
            .await;
        let mut stats = SweepStats::default();
        for notebook in candidates {
            let Some(rule) = notebook.schedule.clone() else {
                continue;
            };
            stats.examined += 1;
            if !fires(&rule, now, SchedulePurpose::Start) {
                continue;
            }
            match self.try_start_notebook(&notebook, &rule).await {
                Ok(()) => stats.fired += 1,
                Err(err) => {
                    warn!(resource = %notebook.id, error = %err, "Notebook start failed");
                    stats.failed += 1;
                }
            }
        }
        stats
    }

    async fn try_start_notebook(
        &self,
        notebook: &ResourceInstance,
        rule: &ScheduleRule,
    ) -> Result<()> {
        run_guards(
            &self.guards,
            notebook,
            GuardedOperation::Action(LifecycleAction::Start),
        )
        .await?;
        self.machine
            .request_transition(&notebook.id, LifecycleAction::Start)
            .await?;
        if rule.sync_start {
            let dependents = self.store.list_children(&notebook.id).await?;
            self.cascade_sync_start(&dependents).await;
        }
        Ok(())
    }

    async fn sweep_notebook_terminate(&self, now: DateTime<Utc>) -> SweepStats {
        let mut stats = SweepStats::default();
        for status in [ResourceStatus::Running, ResourceStatus::Stopped] {
            let candidates = self
                .candidates(ResourceKind::Notebook, status, "notebook-terminate")
                .await;
            for notebook in candidates {
                let Some(rule) = notebook.schedule.clone() else {
                    continue;
                };
                stats.examined += 1;
                if !fires(&rule, now, SchedulePurpose::Terminate) {
                    continue;
                }
                match self.try_terminate_notebook(&notebook).await {
                    Ok(()) => stats.fired += 1,
                    Err(err) => {
                        warn!(resource = %notebook.id, error = %err, "Notebook terminate failed");
                        stats.failed += 1;
                    }
                }
            }
        }
        stats
    }

    async fn try_terminate_notebook(&self, notebook: &ResourceInstance) -> Result<()> {
        let dependents = self.store.list_children(&notebook.id).await?;
        self.machine
            .request_transition(&notebook.id, LifecycleAction::Terminate)
            .await?;
        self.cascade_terminate(&dependents).await;
        Ok(())
    }

    async fn sweep_cluster_stop(&self, now: DateTime<Utc>) -> SweepStats {
        let candidates = self
            .candidates(ResourceKind::Cluster, ResourceStatus::Running, "cluster-stop")
            .await;
        let mut stats = SweepStats::default();
        for cluster in candidates {
            let Some(rule) = cluster.schedule.clone() else {
                continue;
            };
            stats.examined += 1;
            let scheduled = fires(&rule, now, SchedulePurpose::Stop);
            let idle = self.config.inactivity_enabled
                && should_stop_for_inactivity(&cluster, &rule, now, &[]);
            if !scheduled && !idle {
                continue;
            }
            match self
                .machine
                .request_transition(&cluster.id, LifecycleAction::Stop)
                .await
            {
                Ok(_) => stats.fired += 1,
                Err(err) => {
                    warn!(resource = %cluster.id, error = %err, "Cluster stop failed");
                    stats.failed += 1;
                }
            }
        }
        stats
    }

    async fn sweep_cluster_start(&self, now: DateTime<Utc>) -> SweepStats {
        let candidates = self
            .candidates(ResourceKind::Cluster, ResourceStatus::Stopped, "cluster-start")
            .await;
        let mut stats = SweepStats::default();
        for cluster in candidates {
            let Some(rule) = cluster.schedule.clone() else {
                continue;
            };
            stats.examined += 1;
            if !fires(&rule, now, SchedulePurpose::Start) {
                continue;
            }
            match self.try_start_cluster(&cluster).await {
                Ok(true) => stats.fired += 1,
                Ok(false) => {}
                Err(err) => {
                    warn!(resource = %cluster.id, error = %err, "Cluster start failed");
                    stats.failed += 1;
                }
            }
        }
        stats
    }

    async fn try_start_cluster(&self, cluster: &ResourceInstance) -> Result<bool> {
        // A cluster never starts under a notebook that is not up.
        if let Some(parent) = &cluster.parent {
            let notebook = self.store.get(parent).await?;
            if notebook.status != ResourceStatus::Running {
                debug!(
                    resource = %cluster.id,
                    parent = %notebook.id,
                    parent_status = %notebook.status,
                    "Cluster start skipped; notebook not running"
                );
                return Ok(false);
            }
        }
        run_guards(
            &self.guards,
            cluster,
            GuardedOperation::Action(LifecycleAction::Start),
        )
        .await?;
        self.machine
            .request_transition(&cluster.id, LifecycleAction::Start)
            .await?;
        Ok(true)
    }

    async fn sweep_cluster_terminate(&self, now: DateTime<Utc>) -> SweepStats {
        let mut stats = SweepStats::default();
        for status in [ResourceStatus::Running, ResourceStatus::Stopped] {
            let candidates = self
                .candidates(ResourceKind::Cluster, status, "cluster-terminate")
                .await;
            for cluster in candidates {
                let Some(rule) = cluster.schedule.clone() else {
                    continue;
                };
                stats.examined += 1;
                if !fires(&rule, now, SchedulePurpose::Terminate) {
                    continue;
                }
                match self
                    .machine
                    .request_transition(&cluster.id, LifecycleAction::Terminate)
                    .await
                {
                    Ok(_) => stats.fired += 1,
                    Err(err) => {
                        warn!(resource = %cluster.id, error = %err, "Cluster terminate failed");
                        stats.failed += 1;
                    }
                }
            }
        }
        stats
    }

    // ---- cascade dispatch -----------------------------------------------

    /// Dispatch cascaded stops sequentially; one cluster's failure does not
    /// stop the others.
    async fn cascade_stop(&self, dependents: &[ResourceInstance]) {
        for target in stop_targets(dependents) {
            if let Err(err) = self
                .machine
                .request_transition(&target.id, LifecycleAction::Stop)
                .await
            {
                warn!(cluster = %target.id, error = %err, "Cascaded stop failed");
            }
        }
    }

    async fn cascade_terminate(&self, dependents: &[ResourceInstance]) {
        for target in terminate_targets(dependents) {
            if let Err(err) = self
                .machine
                .request_transition(&target.id, LifecycleAction::Terminate)
                .await
            {
                warn!(cluster = %target.id, error = %err, "Cascaded terminate failed");
            }
        }
    }

    async fn cascade_sync_start(&self, dependents: &[ResourceInstance]) {
        for target in sync_start_targets(dependents) {
            let guarded = run_guards(
                &self.guards,
                target,
                GuardedOperation::Action(LifecycleAction::Start),
            )
            .await;
            let result = match guarded {
                Ok(()) => self
                    .machine
                    .request_transition(&target.id, LifecycleAction::Start)
                    .await
                    .map(|_| ())
                    .map_err(OrchestratorError::from),
                Err(err) => Err(err),
            };
            if let Err(err) = result {
                warn!(cluster = %target.id, error = %err, "Synchronized start failed");
            }
        }
    }

    // ---- helpers --------------------------------------------------------

    async fn candidates(
        &self,
        kind: ResourceKind,
        status: ResourceStatus,
        sweep: &str,
    ) -> Vec<ResourceInstance> {
        match self.store.list_by_status(kind, status).await {
            Ok(mut candidates) => {
                if let Some(cap) = self.config.sweep_candidate_cap {
                    candidates.truncate(cap);
                }
                candidates
            }
            Err(err) => {
                warn!(sweep, error = %err, "Candidate query failed; skipping sweep");
                Vec::new()
            }
        }
    }
}
