//! Cascade target selection and rule propagation.
//!
//! Stopping or terminating a notebook carries its dependent clusters along;
//! starting one can bring synchronized clusters back up. Target selection is
//! pure over a dependents snapshot so the orchestrator dispatches exactly
//! the transitions that are both wanted and legal — a cluster already
//! terminated (or already on its way) is simply not a target, not an error.

use std::sync::Arc;

use grove_store::ResourceStore;
use grove_types::{ResourceInstance, ResourceStatus, ScheduleRule};
use tracing::{debug, info};

use crate::derive::derive_cluster_rule;
use crate::error::Result;

/// Dependent clusters to stop alongside their notebook.
///
/// Only `Running` clusters are targets: terminal, already-stopped and
/// in-flight dependents are excluded so no duplicate transition is attempted.
pub fn stop_targets(dependents: &[ResourceInstance]) -> Vec<&ResourceInstance> {
    dependents
        .iter()
        .filter(|d| d.status == ResourceStatus::Running)
        .collect()
}

/// Dependent clusters to terminate alongside their notebook.
pub fn terminate_targets(dependents: &[ResourceInstance]) -> Vec<&ResourceInstance> {
    dependents
        .iter()
        .filter(|d| matches!(d.status, ResourceStatus::Running | ResourceStatus::Stopped))
        .collect()
}

/// Dependent clusters to start in lockstep with their notebook.
///
/// A cluster participates only if it is stopped, its engine supports
/// synchronized start, and its own derived rule opted in.
pub fn sync_start_targets(dependents: &[ResourceInstance]) -> Vec<&ResourceInstance> {
    dependents
        .iter()
        .filter(|d| d.status == ResourceStatus::Stopped)
        .filter(|d| d.engine.map_or(false, |e| e.supports_sync_start()))
        .filter(|d| d.schedule.as_ref().map_or(false, |r| r.sync_start))
        .collect()
}

/// Store-backed propagation of a notebook rule to its dependent clusters.
pub struct CascadePolicy {
    store: Arc<dyn ResourceStore>,
}

impl CascadePolicy {
    pub fn new(store: Arc<dyn ResourceStore>) -> Self {
        Self { store }
    }

    /// Propagate a freshly set notebook rule to the notebook's dependents.
    ///
    /// With `sync_start` set (and the rule not inactivity-only), every
    /// dependent currently in a startable/runnable status receives the
    /// derived start-only rule, overwriting any prior derived rule. With
    /// `sync_start` unset, dependents keep their own rules but have the
    /// synchronized-start flag cleared; dependents without a rule are left
    /// alone.
    ///
    /// Returns the number of dependents updated.
    pub async fn propagate_rule(
        &self,
        notebook: &ResourceInstance,
        rule: &ScheduleRule,
    ) -> Result<usize> {
        let dependents = self.store.list_children(&notebook.id).await?;
        let mut updated = 0;

        if rule.sync_start && !rule.is_inactivity_only() {
            let derived = derive_cluster_rule(rule);
            for dependent in dependents.iter().filter(|d| {
                matches!(
                    d.status,
                    ResourceStatus::Starting
                        | ResourceStatus::Running
                        | ResourceStatus::Stopping
                        | ResourceStatus::Stopped
                )
            }) {
                self.store.set_rule(&dependent.id, &derived).await?;
                updated += 1;
            }
            info!(
                notebook = %notebook.id,
                clusters = updated,
                "Propagated synchronized-start rule to dependents"
            );
        } else {
            for dependent in &dependents {
                let Some(mut existing) = dependent.schedule.clone() else {
                    continue;
                };
                if !existing.sync_start {
                    continue;
                }
                existing.sync_start = false;
                self.store.set_rule(&dependent.id, &existing).await?;
                updated += 1;
            }
            debug!(
                notebook = %notebook.id,
                clusters = updated,
                "Cleared synchronized start on dependents"
            );
        }

        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveTime, Utc, Weekday};
    use grove_store::InMemoryResourceStore;
    use grove_types::{
        CloudProvider, ClusterEngine, ProjectId, ResourceKind, UserId,
    };

    fn notebook() -> ResourceInstance {
        let mut nb = ResourceInstance::new(
            UserId::new("alice"),
            ProjectId::new("research"),
            ResourceKind::Notebook,
            CloudProvider::Aws,
            Utc::now(),
        );
        nb.status = ResourceStatus::Running;
        nb
    }

    fn cluster(
        parent: &ResourceInstance,
        engine: ClusterEngine,
        status: ResourceStatus,
    ) -> ResourceInstance {
        let mut c = ResourceInstance::new(
            parent.owner.clone(),
            parent.project.clone(),
            ResourceKind::Cluster,
            parent.provider,
            parent.created_at,
        )
        .as_cluster_of(parent.id.clone(), engine);
        c.status = status;
        c
    }

    fn sync_rule() -> ScheduleRule {
        ScheduleRule::new(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(), 0)
            .with_start(NaiveTime::from_hms_opt(8, 0, 0).unwrap(), [Weekday::Mon])
            .with_stop(NaiveTime::from_hms_opt(18, 0, 0).unwrap(), [Weekday::Mon])
            .with_sync_start(true)
    }

    #[test]
    fn test_terminate_skips_terminated_dependent() {
        let nb = notebook();
        let running = cluster(&nb, ClusterEngine::Standalone, ResourceStatus::Running);
        let terminated = cluster(&nb, ClusterEngine::Standalone, ResourceStatus::Terminated);
        let dependents = vec![running.clone(), terminated];

        let targets = terminate_targets(&dependents);
        assert_eq!(targets.len(), 1);
        assert_eq!(targets[0].id, running.id);
    }

    #[test]
    fn test_stop_targets_only_running() {
        let nb = notebook();
        let dependents = vec![
            cluster(&nb, ClusterEngine::Standalone, ResourceStatus::Running),
            cluster(&nb, ClusterEngine::Standalone, ResourceStatus::Stopped),
            cluster(&nb, ClusterEngine::Standalone, ResourceStatus::Stopping),
            cluster(&nb, ClusterEngine::Standalone, ResourceStatus::Failed),
        ];
        assert_eq!(stop_targets(&dependents).len(), 1);
    }

    #[test]
    fn test_sync_start_requires_engine_flag_and_rule() {
        let nb = notebook();
        let mut eligible = cluster(&nb, ClusterEngine::Standalone, ResourceStatus::Stopped);
        eligible.schedule = Some(sync_rule());

        // wrong engine
        let mut managed = cluster(&nb, ClusterEngine::ManagedService, ResourceStatus::Stopped);
        managed.schedule = Some(sync_rule());

        // rule did not opt in
        let mut opted_out = cluster(&nb, ClusterEngine::Standalone, ResourceStatus::Stopped);
        opted_out.schedule = Some(sync_rule().with_sync_start(false));

        // not stopped
        let mut running = cluster(&nb, ClusterEngine::Standalone, ResourceStatus::Running);
        running.schedule = Some(sync_rule());

        let dependents = vec![eligible.clone(), managed, opted_out, running];
        let targets = sync_start_targets(&dependents);
        assert_eq!(targets.len(), 1);
        assert_eq!(targets[0].id, eligible.id);
    }

    #[tokio::test]
    async fn test_propagate_writes_derived_rules() {
        let store = Arc::new(InMemoryResourceStore::new());
        let nb = notebook();
        let stopped = cluster(&nb, ClusterEngine::Standalone, ResourceStatus::Stopped);
        let terminated = cluster(&nb, ClusterEngine::Standalone, ResourceStatus::Terminated);
        for r in [&nb, &stopped, &terminated] {
            store.insert(r).await.unwrap();
        }

        let policy = CascadePolicy::new(store.clone());
        let updated = policy.propagate_rule(&nb, &sync_rule()).await.unwrap();
        assert_eq!(updated, 1);

        let derived = store.get_rule(&stopped.id).await.unwrap().unwrap();
        assert_eq!(derived.start_time, NaiveTime::from_hms_opt(8, 0, 0));
        assert!(derived.stop_time.is_none());
        assert!(derived.terminate_at.is_none());

        // terminal dependents are untouched
        assert!(store.get_rule(&terminated.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_propagate_without_sync_clears_flag_only() {
        let store = Arc::new(InMemoryResourceStore::new());
        let nb = notebook();
        let mut dependent = cluster(&nb, ClusterEngine::Standalone, ResourceStatus::Stopped);
        dependent.schedule = Some(
            sync_rule().with_stop(NaiveTime::from_hms_opt(20, 0, 0).unwrap(), [Weekday::Fri]),
        );
        let bare = cluster(&nb, ClusterEngine::Standalone, ResourceStatus::Stopped);
        for r in [&nb, &dependent, &bare] {
            store.insert(r).await.unwrap();
        }

        let policy = CascadePolicy::new(store.clone());
        let rule = sync_rule().with_sync_start(false);
        let updated = policy.propagate_rule(&nb, &rule).await.unwrap();
        assert_eq!(updated, 1);

        let kept = store.get_rule(&dependent.id).await.unwrap().unwrap();
        assert!(!kept.sync_start);
        // own stop timing untouched
        assert_eq!(kept.stop_time, NaiveTime::from_hms_opt(20, 0, 0));
        // a dependent without a rule is skipped
        assert!(store.get_rule(&bare.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_inactivity_only_rule_not_propagated() {
        let store = Arc::new(InMemoryResourceStore::new());
        let nb = notebook();
        let dependent = cluster(&nb, ClusterEngine::Standalone, ResourceStatus::Stopped);
        for r in [&nb, &dependent] {
            store.insert(r).await.unwrap();
        }

        let policy = CascadePolicy::new(store.clone());
        let rule = ScheduleRule::new(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(), 0)
            .with_inactivity(30)
            .with_sync_start(true);
        let updated = policy.propagate_rule(&nb, &rule).await.unwrap();
        assert_eq!(updated, 0);
        assert!(store.get_rule(&dependent.id).await.unwrap().is_none());
    }
}
