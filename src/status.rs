//! Display status derived from a task's dates and completion flag.

use crate::model::Task;
use chrono::DateTime;
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Preparation has not started yet.
    Future,
    /// Inside the preparation window.
    Preparation,
    /// Preparation was marked done.
    PreparationCompleted,
    /// The event time has been reached.
    Urgent,
}

/// Resolve the status of `task` at `now`.
///
/// The completion flag wins over every date check. Dates are compared in
/// the timezone of `now`.
pub fn resolve(task: &Task, now: &DateTime<Tz>) -> TaskStatus {
    if task.is_preparation_completed {
        return TaskStatus::PreparationCompleted;
    }

    let tz = now.timezone();
    if *now >= task.event_date.resolve(tz) {
        return TaskStatus::Urgent;
    }
    if *now >= task.preparation_date.resolve(tz) {
        return TaskStatus::Preparation;
    }
    TaskStatus::Future
}
