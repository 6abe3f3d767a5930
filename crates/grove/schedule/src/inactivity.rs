//! Inactivity override.
//!
//! Fires a stop for a resource that has been idle longer than its rule's
//! threshold, independently of the recurring stop window. Either condition
//! alone is sufficient to stop a resource.

use chrono::{DateTime, Duration, Utc};
use grove_types::{ResourceInstance, ResourceKind, ResourceStatus, ScheduleRule};
use tracing::debug;

/// Should `resource` be stopped for inactivity at `now`?
///
/// `dependents` are the resource's dependent clusters; pass an empty slice
/// for a cluster. A notebook with any dependent in a transient status is
/// never stopped for inactivity: the in-flight dependent operation would be
/// raced otherwise.
pub fn should_stop_for_inactivity(
    resource: &ResourceInstance,
    rule: &ScheduleRule,
    now: DateTime<Utc>,
    dependents: &[ResourceInstance],
) -> bool {
    if !rule.check_inactivity || resource.status != ResourceStatus::Running {
        return false;
    }

    let Some(last_activity) = resource.last_activity else {
        return false;
    };
    let Some(max_minutes) = rule.max_inactivity_minutes else {
        return false;
    };

    if last_activity + Duration::minutes(max_minutes) >= now {
        return false;
    }

    if resource.kind == ResourceKind::Notebook {
        let blocked = dependents.iter().any(|d| {
            matches!(
                d.status,
                ResourceStatus::Creating
                    | ResourceStatus::Reconfiguring
                    | ResourceStatus::Terminating
            )
        });
        if blocked {
            debug!(
                resource = %resource.id,
                "Inactivity stop suppressed by in-flight dependent operation"
            );
            return false;
        }
    }

    debug!(
        resource = %resource.id,
        idle_minutes = (now - last_activity).num_minutes(),
        threshold = max_minutes,
        "Inactivity threshold exceeded"
    );
    true
}
