//! Schedule rules attached to resources
//!
//! A rule describes when a resource should automatically change status:
//! recurring start/stop times on chosen weekdays, a one-shot terminate
//! datetime, and an optional inactivity threshold. All times in a rule are
//! local to the rule's own UTC offset; the evaluator converts the current
//! instant into that offset before comparing.

use chrono::{FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, Offset, Utc, Weekday};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;

/// Largest UTC offset accepted, in minutes (UTC+18:00 / UTC-18:00).
const MAX_OFFSET_MINUTES: i32 = 18 * 60;

/// Rule validation errors, raised before a rule is accepted into the store.
#[derive(Debug, Clone, Error)]
pub enum RuleValidationError {
    #[error("UTC offset {0} minutes is out of range")]
    OffsetOutOfRange(i32),

    #[error("finish date {finish} precedes begin date {begin}")]
    FinishBeforeBegin { begin: NaiveDate, finish: NaiveDate },

    #[error("inactivity check enabled without a positive threshold")]
    InvalidInactivityThreshold,
}

/// Time/inactivity policy describing when a resource should automatically
/// change status.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleRule {
    /// First local date the rule is in effect.
    pub begin_date: NaiveDate,

    /// Last local date the rule is in effect, inclusive. Absent means open-ended.
    pub finish_date: Option<NaiveDate>,

    /// Local time at which a start fires on the chosen weekdays.
    pub start_time: Option<NaiveTime>,

    /// Local time at which a stop fires on the chosen weekdays.
    pub stop_time: Option<NaiveTime>,

    /// Weekdays (in the rule's own offset) on which the start time applies.
    pub start_days: HashSet<Weekday>,

    /// Weekdays (in the rule's own offset) on which the stop time applies.
    pub stop_days: HashSet<Weekday>,

    /// UTC offset of the rule's local times, east-positive, in minutes.
    pub timezone_offset_minutes: i32,

    /// One-shot local datetime at which the resource is terminated.
    /// Evaluated independently of the weekday sets.
    pub terminate_at: Option<NaiveDateTime>,

    /// Stop the resource when it has been idle longer than
    /// `max_inactivity_minutes`, regardless of the stop window.
    pub check_inactivity: bool,

    /// Idle age threshold for the inactivity check.
    pub max_inactivity_minutes: Option<i64>,

    /// On a notebook rule: propagate start timing to dependent clusters.
    /// On a derived cluster rule: this cluster participates in synchronized
    /// start.
    pub sync_start: bool,
}

impl ScheduleRule {
    /// Create a rule active from `begin_date`, local to the given UTC offset,
    /// with nothing configured to fire yet.
    pub fn new(begin_date: NaiveDate, timezone_offset_minutes: i32) -> Self {
        Self {
            begin_date,
            finish_date: None,
            start_time: None,
            stop_time: None,
            start_days: HashSet::new(),
            stop_days: HashSet::new(),
            timezone_offset_minutes,
            terminate_at: None,
            check_inactivity: false,
            max_inactivity_minutes: None,
            sync_start: false,
        }
    }

    /// Set the inclusive finish date.
    pub fn with_finish_date(mut self, finish: NaiveDate) -> Self {
        self.finish_date = Some(finish);
        self
    }

    /// Set the recurring start time and its weekdays.
    pub fn with_start(mut self, time: NaiveTime, days: impl IntoIterator<Item = Weekday>) -> Self {
        self.start_time = Some(time);
        self.start_days = days.into_iter().collect();
        self
    }

    /// Set the recurring stop time and its weekdays.
    pub fn with_stop(mut self, time: NaiveTime, days: impl IntoIterator<Item = Weekday>) -> Self {
        self.stop_time = Some(time);
        self.stop_days = days.into_iter().collect();
        self
    }

    /// Set the one-shot terminate datetime (rule-local).
    pub fn with_terminate_at(mut self, at: NaiveDateTime) -> Self {
        self.terminate_at = Some(at);
        self
    }

    /// Enable the inactivity check with the given idle threshold.
    pub fn with_inactivity(mut self, max_minutes: i64) -> Self {
        self.check_inactivity = true;
        self.max_inactivity_minutes = Some(max_minutes);
        self
    }

    /// Set the synchronized-start flag.
    pub fn with_sync_start(mut self, sync: bool) -> Self {
        self.sync_start = sync;
        self
    }

    /// Check structural validity. Called before a rule is written to a
    /// resource's schedule slot.
    pub fn validate(&self) -> Result<(), RuleValidationError> {
        if self.timezone_offset_minutes.abs() > MAX_OFFSET_MINUTES {
            return Err(RuleValidationError::OffsetOutOfRange(
                self.timezone_offset_minutes,
            ));
        }
        if let Some(finish) = self.finish_date {
            if finish < self.begin_date {
                return Err(RuleValidationError::FinishBeforeBegin {
                    begin: self.begin_date,
                    finish,
                });
            }
        }
        if self.check_inactivity && !matches!(self.max_inactivity_minutes, Some(m) if m > 0) {
            return Err(RuleValidationError::InvalidInactivityThreshold);
        }
        Ok(())
    }

    /// The rule's UTC offset as a chrono [`FixedOffset`].
    ///
    /// Offsets are range-checked by [`validate`](Self::validate); an
    /// unvalidated out-of-range value falls back to UTC rather than panicking.
    pub fn fixed_offset(&self) -> FixedOffset {
        FixedOffset::east_opt(self.timezone_offset_minutes * 60).unwrap_or_else(|| Utc.fix())
    }

    /// Is the rule in effect on the given local date? The finish date is an
    /// inclusive upper bound.
    pub fn is_active_on(&self, local_date: NaiveDate) -> bool {
        local_date >= self.begin_date
            && self.finish_date.map_or(true, |finish| local_date <= finish)
    }

    /// Does this rule do nothing but watch for inactivity?
    ///
    /// Inactivity-only rules are not propagated to dependent clusters.
    pub fn is_inactivity_only(&self) -> bool {
        self.check_inactivity
            && self.start_time.is_none()
            && self.stop_time.is_none()
            && self.terminate_at.is_none()
    }
}
