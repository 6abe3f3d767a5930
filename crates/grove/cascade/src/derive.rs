//! Derived cluster rules.
//!
//! A notebook rule with synchronized start is projected onto its dependent
//! clusters as a start-only rule: stop and terminate timing stays under the
//! notebook's control (a cluster cannot outlive its notebook's window), so
//! those fields are stripped. Inactivity settings carry over so an idle
//! cluster can still be stopped on its own.

use grove_types::ScheduleRule;
use std::collections::HashSet;

/// Project a notebook rule onto a dependent cluster.
///
/// The result is written to the cluster's schedule slot by rule propagation;
/// it is never edited by a user directly.
pub fn derive_cluster_rule(notebook_rule: &ScheduleRule) -> ScheduleRule {
    ScheduleRule {
        begin_date: notebook_rule.begin_date,
        finish_date: notebook_rule.finish_date,
        start_time: notebook_rule.start_time,
        start_days: notebook_rule.start_days.clone(),
        stop_time: None,
        stop_days: HashSet::new(),
        terminate_at: None,
        timezone_offset_minutes: notebook_rule.timezone_offset_minutes,
        check_inactivity: notebook_rule.check_inactivity,
        max_inactivity_minutes: notebook_rule.max_inactivity_minutes,
        sync_start: notebook_rule.sync_start,
    }
}
