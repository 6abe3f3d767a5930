//! Rule evaluation.
//!
//! Decides whether a rule fires "now" for a given purpose. The current UTC
//! instant is converted into the rule's own offset and truncated to the
//! whole minute, so re-evaluating within the same minute always yields the
//! same answer and one evaluation granularity cannot fire twice.
//!
//! Weekday membership is checked against the rule-local date: the same UTC
//! instant can land on different weekdays for rules with different offsets.

use chrono::{DateTime, Datelike, Duration, NaiveDateTime, NaiveTime, Timelike, Utc};
use grove_types::ScheduleRule;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// What a rule is being evaluated for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SchedulePurpose {
    /// Recurring start: exact-minute match on the start time and weekdays.
    Start,
    /// Recurring stop: exact-minute match on the stop time and weekdays.
    Stop,
    /// One-shot terminate: exact-minute match on the terminate datetime,
    /// independent of the weekday sets.
    Terminate,
    /// "What will stop soon" look-ahead over the given window. Never used to
    /// drive a transition.
    StopPreview { window_minutes: i64 },
}

fn truncate_to_minute(time: NaiveTime) -> NaiveTime {
    // hour/minute of a valid NaiveTime always form a valid NaiveTime
    NaiveTime::from_hms_opt(time.hour(), time.minute(), 0).unwrap_or(time)
}

/// Does `rule` fire at `now_utc` for `purpose`?
pub fn fires(rule: &ScheduleRule, now_utc: DateTime<Utc>, purpose: SchedulePurpose) -> bool {
    let local = now_utc.with_timezone(&rule.fixed_offset());
    let local_date = local.date_naive();
    let local_time = truncate_to_minute(local.time());

    if !rule.is_active_on(local_date) {
        return false;
    }

    let fired = match purpose {
        SchedulePurpose::Start => {
            rule.start_time.map(truncate_to_minute) == Some(local_time)
                && rule.start_days.contains(&local_date.weekday())
        }
        SchedulePurpose::Stop => {
            rule.stop_time.map(truncate_to_minute) == Some(local_time)
                && rule.stop_days.contains(&local_date.weekday())
        }
        SchedulePurpose::Terminate => match rule.terminate_at {
            Some(at) => {
                NaiveDateTime::new(at.date(), truncate_to_minute(at.time()))
                    == NaiveDateTime::new(local_date, local_time)
            }
            None => false,
        },
        SchedulePurpose::StopPreview { window_minutes } => match rule.stop_time {
            Some(stop) => {
                let now_local = NaiveDateTime::new(local_date, local_time);
                let stop_local = NaiveDateTime::new(local_date, truncate_to_minute(stop));
                let horizon = now_local + Duration::minutes(window_minutes);
                stop_local > now_local && stop_local < horizon
            }
            None => false,
        },
    };

    if fired {
        debug!(?purpose, date = %local_date, time = %local_time, "Rule fired");
    }
    fired
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone, Weekday};
    use grove_types::ScheduleRule;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn time(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn utc(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, min, s).unwrap()
    }

    fn monday_start_rule() -> ScheduleRule {
        ScheduleRule::new(date(2024, 1, 1), 0).with_start(time(9, 0), [Weekday::Mon])
    }

    #[test]
    fn test_start_fires_on_exact_minute() {
        let rule = monday_start_rule();
        // 2024-01-08 is a Monday
        assert!(fires(&rule, utc(2024, 1, 8, 9, 0, 0), SchedulePurpose::Start));
    }

    #[test]
    fn test_start_does_not_fire_a_minute_late() {
        let rule = monday_start_rule();
        assert!(!fires(&rule, utc(2024, 1, 8, 9, 1, 0), SchedulePurpose::Start));
    }

    #[test]
    fn test_start_does_not_fire_on_wrong_weekday() {
        let rule = monday_start_rule();
        // 2024-01-02 is a Tuesday
        assert!(!fires(&rule, utc(2024, 1, 2, 9, 0, 0), SchedulePurpose::Start));
    }

    #[test]
    fn test_seconds_are_truncated() {
        let rule = monday_start_rule();
        assert!(fires(&rule, utc(2024, 1, 8, 9, 0, 42), SchedulePurpose::Start));
    }

    #[test]
    fn test_double_evaluation_same_minute_is_idempotent() {
        let rule = monday_start_rule();
        let first = fires(&rule, utc(2024, 1, 8, 9, 0, 3), SchedulePurpose::Start);
        let second = fires(&rule, utc(2024, 1, 8, 9, 0, 58), SchedulePurpose::Start);
        assert_eq!(first, second);
        assert!(first);
    }

    #[test]
    fn test_finish_date_is_inclusive() {
        // 2024-01-10 is a Wednesday
        let rule = ScheduleRule::new(date(2024, 1, 1), 0)
            .with_finish_date(date(2024, 1, 10))
            .with_stop(time(18, 0), [Weekday::Wed]);
        assert!(fires(&rule, utc(2024, 1, 10, 18, 0, 0), SchedulePurpose::Stop));
        // 2024-01-17 is the next Wednesday, past the finish date
        assert!(!fires(&rule, utc(2024, 1, 17, 18, 0, 0), SchedulePurpose::Stop));
    }

    #[test]
    fn test_not_active_before_begin_date() {
        let rule = ScheduleRule::new(date(2024, 2, 1), 0).with_start(time(9, 0), [Weekday::Mon]);
        // 2024-01-08 is a Monday but before the begin date
        assert!(!fires(&rule, utc(2024, 1, 8, 9, 0, 0), SchedulePurpose::Start));
    }

    #[test]
    fn test_weekday_is_rule_local_not_utc() {
        // UTC+10: 2024-01-07T23:30Z is already Monday 09:30 local.
        let rule = ScheduleRule::new(date(2024, 1, 1), 10 * 60)
            .with_start(time(9, 30), [Weekday::Mon]);
        assert!(fires(&rule, utc(2024, 1, 7, 23, 30, 0), SchedulePurpose::Start));

        // The same instant under a UTC rule is still Sunday.
        let utc_rule = ScheduleRule::new(date(2024, 1, 1), 0).with_start(time(23, 30), [Weekday::Mon]);
        assert!(!fires(&utc_rule, utc(2024, 1, 7, 23, 30, 0), SchedulePurpose::Start));
    }

    #[test]
    fn test_terminate_ignores_weekday_sets() {
        // terminate_at on a Tuesday; the rule only repeats on Mondays
        let rule = ScheduleRule::new(date(2024, 1, 1), 0)
            .with_start(time(9, 0), [Weekday::Mon])
            .with_terminate_at(NaiveDateTime::new(date(2024, 1, 2), time(15, 30)));

        assert!(fires(&rule, utc(2024, 1, 2, 15, 30, 0), SchedulePurpose::Terminate));
        assert!(!fires(&rule, utc(2024, 1, 2, 15, 31, 0), SchedulePurpose::Terminate));
    }

    #[test]
    fn test_terminate_without_datetime_never_fires() {
        let rule = monday_start_rule();
        assert!(!fires(&rule, utc(2024, 1, 8, 9, 0, 0), SchedulePurpose::Terminate));
    }

    #[test]
    fn test_terminate_respects_active_window() {
        let rule = ScheduleRule::new(date(2024, 1, 1), 0)
            .with_finish_date(date(2024, 1, 1))
            .with_terminate_at(NaiveDateTime::new(date(2024, 1, 2), time(10, 0)));
        // terminate_at falls outside the active window
        assert!(!fires(&rule, utc(2024, 1, 2, 10, 0, 0), SchedulePurpose::Terminate));
    }

    #[test]
    fn test_stop_preview_window() {
        let rule = ScheduleRule::new(date(2024, 1, 1), 0).with_stop(time(18, 0), [Weekday::Mon]);
        let preview = SchedulePurpose::StopPreview { window_minutes: 30 };

        // 17:45 -> stop at 18:00 is within 30 minutes
        assert!(fires(&rule, utc(2024, 1, 8, 17, 45, 0), preview));
        // 18:00 itself is not "after" local time
        assert!(!fires(&rule, utc(2024, 1, 8, 18, 0, 0), preview));
        // 17:00 -> stop is an hour away, outside the window
        assert!(!fires(&rule, utc(2024, 1, 8, 17, 0, 0), preview));
    }

    #[test]
    fn test_stop_preview_exact_window_edge_is_exclusive() {
        let rule = ScheduleRule::new(date(2024, 1, 1), 0).with_stop(time(18, 0), [Weekday::Mon]);
        // stop_time == local_time + window is outside the half-open window
        let preview = SchedulePurpose::StopPreview { window_minutes: 15 };
        assert!(!fires(&rule, utc(2024, 1, 8, 17, 45, 0), preview));
    }

    #[test]
    fn test_stop_exact_match_only() {
        let rule = ScheduleRule::new(date(2024, 1, 1), 0).with_stop(time(18, 0), [Weekday::Mon]);
        assert!(fires(&rule, utc(2024, 1, 8, 18, 0, 0), SchedulePurpose::Stop));
        assert!(!fires(&rule, utc(2024, 1, 8, 17, 59, 0), SchedulePurpose::Stop));
        assert!(!fires(&rule, utc(2024, 1, 8, 18, 1, 0), SchedulePurpose::Stop));
    }
}
