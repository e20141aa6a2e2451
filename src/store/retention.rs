//! Archive retention: time-boxed deleted archive, size-bounded completed
//! archive.

use super::{Snapshot, TaskStore};
use crate::error::Result;
use crate::model::Task;
use chrono::{DateTime, TimeDelta};
use chrono_tz::Tz;
use tracing::info;

/// Default number of days a soft-deleted task is kept.
pub const DEFAULT_DELETED_RETENTION_DAYS: i64 = 30;

/// Default size bound of the completed archive.
pub const DEFAULT_COMPLETED_LIMIT: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetentionPolicy {
    /// A deleted task older than this is erased for good.
    pub deleted_retention: TimeDelta,
    /// The completed archive keeps at most this many entries.
    pub completed_limit: usize,
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        Self {
            deleted_retention: TimeDelta::days(DEFAULT_DELETED_RETENTION_DAYS),
            completed_limit: DEFAULT_COMPLETED_LIMIT,
        }
    }
}

/// What a sweep erased.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub expired_deleted: Vec<String>,
    pub evicted_completed: Vec<String>,
    /// True when the snapshot was modified (and therefore saved).
    pub changed: bool,
}

impl TaskStore {
    /// Erase expired deleted tasks and trim the completed archive.
    ///
    /// The snapshot is saved only when something changed.
    pub fn sweep(&mut self) -> Result<SweepReport> {
        let now = self.now();
        let tz = self.timezone();
        let policy = self.retention;

        let mut next = self.state.clone();
        let mut purge = Vec::new();
        let report = sweep_snapshot(&mut next, &mut purge, policy, now, tz);
        if !report.changed {
            return Ok(report);
        }

        self.backend.save(&next)?;
        self.state = next;
        self.purge_photos(&purge);
        info!(
            expired = report.expired_deleted.len(),
            evicted = report.evicted_completed.len(),
            "retention sweep applied"
        );
        Ok(report)
    }
}

fn sort_key(stamp: Option<crate::time::Stamp>, task: &Task, tz: Tz) -> DateTime<Tz> {
    stamp.unwrap_or(task.created_at).resolve(tz)
}

pub(crate) fn sweep_snapshot(
    state: &mut Snapshot,
    purge: &mut Vec<String>,
    policy: RetentionPolicy,
    now: DateTime<Tz>,
    tz: Tz,
) -> SweepReport {
    let mut report = SweepReport::default();

    let expired: Vec<String> = state
        .deleted_tasks
        .values()
        .filter(|t| now - sort_key(t.deleted_at, t, tz) > policy.deleted_retention)
        .map(|t| t.id.clone())
        .collect();
    for id in expired {
        if let Some(task) = state.deleted_tasks.remove(&id) {
            purge.extend(task.photos);
            report.expired_deleted.push(id);
        }
    }

    let before: Vec<String> = state.completed_tasks.iter().map(|t| t.id.clone()).collect();
    // Stable sort keeps insertion order among equal stamps.
    state
        .completed_tasks
        .sort_by_key(|t| std::cmp::Reverse(sort_key(t.completed_at, t, tz)));
    let reordered = state
        .completed_tasks
        .iter()
        .map(|t| t.id.as_str())
        .ne(before.iter().map(String::as_str));

    report.evicted_completed = evict_completed(state, purge, policy.completed_limit);
    report.changed =
        reordered || !report.expired_deleted.is_empty() || !report.evicted_completed.is_empty();
    report
}

/// Drop archive entries beyond `limit`, queueing their photos for purge.
pub(crate) fn evict_completed(
    state: &mut Snapshot,
    purge: &mut Vec<String>,
    limit: usize,
) -> Vec<String> {
    if state.completed_tasks.len() <= limit {
        return Vec::new();
    }
    state
        .completed_tasks
        .split_off(limit)
        .into_iter()
        .map(|task| {
            purge.extend(task.photos);
            task.id
        })
        .collect()
}
