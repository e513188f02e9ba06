//! Recurrence metadata and next-run-time computation for scheduled jobs.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use cron::Schedule;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScheduleError {
    #[error("invalid cron expression {spec:?}: {source}")]
    Parse {
        spec: String,
        #[source]
        source: cron::error::Error,
    },

    #[error("cron expression {spec:?} has no future run times")]
    NoUpcoming { spec: String },
}

/// The parsed recurrence rule for one job within a crontab, along with the
/// source line range that produced it.
///
/// An entry is owned by exactly one place at a time: the job descriptor until
/// the job is admitted, then the job record's details.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CronEntry {
    pub line_start: u32,
    pub line_end: u32,
    pub spec: String,
}

impl CronEntry {
    pub fn new(line_start: u32, line_end: u32, spec: impl Into<String>) -> Self {
        Self {
            line_start,
            line_end,
            spec: spec.into(),
        }
    }

    /// Render the source line range as reported in failure responses.
    pub fn line_range(&self) -> String {
        format!("{}-{}", self.line_start, self.line_end)
    }
}

/// Compute the first run time of `spec` strictly after `after`.
///
/// Deterministic in (spec, after): a requeued job recomputes its next eligible
/// interval by calling this again with a later reference time.
pub fn next_run_after(spec: &str, after: DateTime<Utc>) -> Result<DateTime<Utc>, ScheduleError> {
    let normalized = normalize(spec);
    let schedule = Schedule::from_str(&normalized).map_err(|source| ScheduleError::Parse {
        spec: spec.to_string(),
        source,
    })?;
    schedule
        .after(&after)
        .next()
        .ok_or_else(|| ScheduleError::NoUpcoming {
            spec: spec.to_string(),
        })
}

/// Classic crontab expressions carry five fields; the schedule parser wants a
/// leading seconds field.
fn normalize(spec: &str) -> String {
    let trimmed = spec.trim();
    if trimmed.split_whitespace().count() == 5 {
        format!("0 {trimmed}")
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn line_range_format() {
        let entry = CronEntry::new(3, 5, "*/5 * * * *");
        assert_eq!(entry.line_range(), "3-5");
    }

    #[test]
    fn five_field_spec_is_normalized() {
        let after = Utc.with_ymd_and_hms(2026, 1, 1, 0, 2, 30).unwrap();
        let next = next_run_after("*/5 * * * *", after).unwrap();
        assert_eq!(next, Utc.with_ymd_and_hms(2026, 1, 1, 0, 5, 0).unwrap());
    }

    #[test]
    fn six_field_spec_passes_through() {
        let after = Utc.with_ymd_and_hms(2026, 1, 1, 13, 0, 0).unwrap();
        let next = next_run_after("0 0 12 * * *", after).unwrap();
        assert_eq!(next, Utc.with_ymd_and_hms(2026, 1, 2, 12, 0, 0).unwrap());
    }

    #[test]
    fn next_run_is_strictly_after_reference() {
        let on_the_mark = Utc.with_ymd_and_hms(2026, 1, 1, 0, 5, 0).unwrap();
        let next = next_run_after("*/5 * * * *", on_the_mark).unwrap();
        assert_eq!(next, Utc.with_ymd_and_hms(2026, 1, 1, 0, 10, 0).unwrap());
    }

    #[test]
    fn invalid_spec_is_a_parse_error() {
        let after = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        let err = next_run_after("*/5 * * bogus *", after).unwrap_err();
        assert!(matches!(err, ScheduleError::Parse { .. }));
    }

    #[test]
    fn year_bound_spec_in_the_past_has_no_upcoming() {
        let after = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        let err = next_run_after("0 0 0 1 1 * 2000", after).unwrap_err();
        assert!(matches!(err, ScheduleError::NoUpcoming { .. }));
    }
}
