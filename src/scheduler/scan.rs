//! Reminder threshold scan.
//!
//! Each task has two one-shot reminders: a week before the event and a day
//! before it. A reminder is due once `now` has crossed its threshold and its
//! flag is still unset. A task that was not scanned for a long time may have
//! both reminders due in the same scan.

use crate::model::Task;
use chrono::{DateTime, TimeDelta};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

/// Which reminder is being sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    WeekBefore,
    DayBefore,
}

impl NotificationKind {
    pub const ALL: [Self; 2] = [Self::WeekBefore, Self::DayBefore];

    /// How long before the event this reminder becomes due.
    pub fn lead_time(self) -> TimeDelta {
        match self {
            Self::WeekBefore => TimeDelta::days(7),
            Self::DayBefore => TimeDelta::days(1),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::WeekBefore => "week_before",
            Self::DayBefore => "day_before",
        }
    }

    /// Whether this reminder was already sent for `task`.
    pub fn is_sent(self, task: &Task) -> bool {
        match self {
            Self::WeekBefore => task.notified_week_before,
            Self::DayBefore => task.notified_day_before,
        }
    }

    /// Record this reminder as sent on `task`.
    pub fn mark_sent(self, task: &mut Task) {
        match self {
            Self::WeekBefore => task.notified_week_before = true,
            Self::DayBefore => task.notified_day_before = true,
        }
    }
}

impl std::fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A reminder that has crossed its threshold.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DueNotification {
    pub task_id: String,
    pub kind: NotificationKind,
}

/// Reminders due at `now`. Deleted tasks are skipped.
pub fn due_notifications<'a>(
    tasks: impl IntoIterator<Item = &'a Task>,
    now: &DateTime<Tz>,
    tz: Tz,
) -> Vec<DueNotification> {
    let mut due = Vec::new();
    for task in tasks {
        if task.is_deleted {
            continue;
        }
        let event = task.event_date.resolve(tz);
        for kind in NotificationKind::ALL {
            if !kind.is_sent(task) && *now >= event - kind.lead_time() {
                due.push(DueNotification {
                    task_id: task.id.clone(),
                    kind,
                });
            }
        }
    }
    due
}
