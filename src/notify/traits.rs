use crate::error::Result;
use crate::model::{Task, User};
use crate::scheduler::NotificationKind;
use async_trait::async_trait;
use tracing::info;

/// Delivery contract for reminders. New transports only need to implement
/// this trait.
#[async_trait]
pub trait Dispatcher: Send + Sync {
    /// Stable transport identifier (e.g. `telegram`).
    fn id(&self) -> &'static str;

    /// Deliver one reminder about `task` to every recipient.
    ///
    /// Implementations attempt all recipients before reporting a failure.
    async fn dispatch(&self, recipients: &[User], task: &Task, kind: NotificationKind)
    -> Result<()>;
}

/// Writes reminders to the log instead of sending them anywhere.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogDispatcher;

#[async_trait]
impl Dispatcher for LogDispatcher {
    fn id(&self) -> &'static str {
        "log"
    }

    async fn dispatch(
        &self,
        recipients: &[User],
        task: &Task,
        kind: NotificationKind,
    ) -> Result<()> {
        info!(
            task_id = %task.id,
            title = %task.title,
            %kind,
            recipients = recipients.len(),
            "reminder (no transport configured)"
        );
        Ok(())
    }
}
