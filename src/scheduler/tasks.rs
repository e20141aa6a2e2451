//! Job definitions and schedules.
//!
//! Defines the [`ScheduledJob`] type and the [`Schedule`] enum for timing.
//! All times are in the canonical timezone of the service clock.

use crate::time::localize;
use chrono::{DateTime, NaiveTime, TimeDelta};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

/// How often a job should run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Schedule {
    /// Run every N seconds.
    Interval {
        /// Interval in seconds between runs.
        secs: u64,
    },
    /// Run once daily at a given local hour and minute.
    Daily {
        /// Hour of day (0-23).
        hour: u8,
        /// Minute of hour (0-59).
        min: u8,
    },
}

impl std::fmt::Display for Schedule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Interval { secs } => {
                if *secs >= 3600 {
                    write!(f, "every {} hours", secs / 3600)
                } else {
                    write!(f, "every {} minutes", secs / 60)
                }
            }
            Self::Daily { hour, min } => write!(f, "daily at {hour:02}:{min:02}"),
        }
    }
}

/// The work a job performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobKind {
    /// Commit due reminder flags and dispatch the reminders.
    NotificationScan,
    /// Expire the deleted archive and trim the completed archive.
    RetentionSweep,
}

impl JobKind {
    pub fn id(self) -> &'static str {
        match self {
            Self::NotificationScan => "notification_scan",
            Self::RetentionSweep => "retention_sweep",
        }
    }
}

impl std::fmt::Display for JobKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.id())
    }
}

/// A job that runs on a schedule.
#[derive(Debug, Clone)]
pub struct ScheduledJob {
    pub kind: JobKind,
    pub schedule: Schedule,
    /// Start of the last run, if any.
    pub last_run: Option<DateTime<Tz>>,
}

impl ScheduledJob {
    pub fn new(kind: JobKind, schedule: Schedule) -> Self {
        Self {
            kind,
            schedule,
            last_run: None,
        }
    }

    /// Returns `true` if the job is due at `now`.
    pub fn is_due(&self, now: &DateTime<Tz>) -> bool {
        match &self.schedule {
            Schedule::Interval { secs } => match &self.last_run {
                None => true,
                Some(last) => {
                    let secs = i64::try_from(*secs).unwrap_or(i64::MAX);
                    *now - *last >= TimeDelta::try_seconds(secs).unwrap_or(TimeDelta::MAX)
                }
            },
            Schedule::Daily { hour, min } => {
                let Some(at) = NaiveTime::from_hms_opt(u32::from(*hour), u32::from(*min), 0)
                else {
                    return false;
                };
                let scheduled = localize(now.timezone(), now.date_naive().and_time(at));
                match &self.last_run {
                    None => *now >= scheduled,
                    Some(last) => *last < scheduled && *now >= scheduled,
                }
            }
        }
    }

    /// Record that the job ran at `now`.
    pub fn mark_run(&mut self, now: DateTime<Tz>) {
        self.last_run = Some(now);
    }
}

/// How a job run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobOutcome {
    Success,
    Error,
}

/// One entry of the scheduler run history.
#[derive(Debug, Clone)]
pub struct JobRunRecord {
    pub job: JobKind,
    pub started_at: DateTime<Tz>,
    pub finished_at: DateTime<Tz>,
    pub outcome: JobOutcome,
    pub summary: String,
}
