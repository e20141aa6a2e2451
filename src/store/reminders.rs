use super::TaskStore;
use crate::error::{PrepError, Result};
use crate::model::Task;
use crate::scheduler::scan::{self, NotificationKind};
use tracing::debug;

/// A reminder whose flag has been committed and which still has to be
/// handed to a dispatcher.
#[derive(Debug, Clone)]
pub struct PendingNotification {
    pub task: Task,
    pub kind: NotificationKind,
}

impl TaskStore {
    /// Find due reminders, set their one-shot flags and persist, all in one
    /// transaction. Dispatching the result is up to the caller.
    pub fn take_due_notifications(&mut self) -> Result<Vec<PendingNotification>> {
        let now = self.now();
        let due = scan::due_notifications(self.state.tasks.values(), &now, self.timezone());
        if due.is_empty() {
            return Ok(Vec::new());
        }
        debug!(count = due.len(), "reminders due");

        self.transact(|state, _| {
            for item in &due {
                let task = state
                    .tasks
                    .get_mut(&item.task_id)
                    .ok_or_else(|| PrepError::task_not_found(&item.task_id))?;
                item.kind.mark_sent(task);
            }
            due.iter()
                .map(|item| {
                    state
                        .tasks
                        .get(&item.task_id)
                        .map(|task| PendingNotification {
                            task: task.clone(),
                            kind: item.kind,
                        })
                        .ok_or_else(|| PrepError::task_not_found(&item.task_id))
                })
                .collect()
        })
    }
}
