use super::{Snapshot, TaskStore};
use crate::checklist;
use crate::error::{PrepError, Result};
use crate::model::{ChecklistItem, NewTask, Task, TaskPatch, UserId};
use crate::readiness;
use crate::time::Stamp;
use chrono::DateTime;
use chrono_tz::Tz;
use tracing::{info, warn};

fn active_mut<'a>(state: &'a mut Snapshot, id: &str) -> Result<&'a mut Task> {
    state
        .tasks
        .get_mut(id)
        .ok_or_else(|| PrepError::task_not_found(id))
}

impl TaskStore {
    pub fn create_task(&mut self, draft: NewTask) -> Result<Task> {
        let task = draft.into_task(Stamp::at(&self.now()))?;

        let tz = self.timezone();
        if task.preparation_date.resolve(tz) > task.event_date.resolve(tz) {
            warn!(task_id = %task.id, "preparation date is after the event date");
        }

        let task = self.transact(move |state, _| {
            state.tasks.insert(task.id.clone(), task.clone());
            Ok(task)
        })?;
        info!(task_id = %task.id, title = %task.title, "task created");
        Ok(task)
    }

    /// Active task by id.
    pub fn task(&self, id: &str) -> Option<&Task> {
        self.state.tasks.get(id)
    }

    pub fn update_task(&mut self, id: &str, patch: TaskPatch) -> Result<Task> {
        self.require_active(id)?;
        self.transact(|state, _| {
            let task = active_mut(state, id)?;
            patch.apply(task)?;
            Ok(task.clone())
        })
    }

    /// Active, non-deleted tasks ordered by event date.
    pub fn active_tasks(&self) -> Vec<Task> {
        let tz = self.timezone();
        let mut tasks: Vec<Task> = self
            .state
            .tasks
            .values()
            .filter(|t| !t.is_deleted)
            .cloned()
            .collect();
        tasks.sort_by_key(|t| t.event_date.resolve(tz));
        tasks
    }

    /// Active tasks whose event falls inside `[from, to]`.
    pub fn tasks_in_range(&self, from: &DateTime<Tz>, to: &DateTime<Tz>) -> Result<Vec<Task>> {
        if from > to {
            return Err(PrepError::Validation(
                "range start is after range end".to_owned(),
            ));
        }
        let tz = self.timezone();
        Ok(self
            .active_tasks()
            .into_iter()
            .filter(|t| {
                let event = t.event_date.resolve(tz);
                event >= *from && event <= *to
            })
            .collect())
    }

    /// Soft-deleted tasks, most recently deleted first.
    pub fn deleted_tasks(&self) -> Vec<Task> {
        let tz = self.timezone();
        let mut tasks: Vec<Task> = self.state.deleted_tasks.values().cloned().collect();
        tasks.sort_by_key(|t| {
            std::cmp::Reverse(t.deleted_at.unwrap_or(t.created_at).resolve(tz))
        });
        tasks
    }

    /// Completed archive, most recently completed first.
    pub fn completed_tasks(&self) -> &[Task] {
        &self.state.completed_tasks
    }

    pub fn mark_ready(&mut self, id: &str, user: UserId) -> Result<Task> {
        self.require_active(id)?;
        self.transact(|state, _| {
            let task = active_mut(state, id)?;
            readiness::mark_ready(task, user);
            Ok(task.clone())
        })
    }

    pub fn mark_not_going(&mut self, id: &str, user: UserId) -> Result<Task> {
        self.require_active(id)?;
        self.transact(|state, _| {
            let task = active_mut(state, id)?;
            readiness::mark_not_going(task, user);
            Ok(task.clone())
        })
    }

    pub fn add_checklist_item(&mut self, id: &str, text: &str) -> Result<ChecklistItem> {
        self.require_active(id)?;
        let text = text.trim();
        if text.is_empty() {
            return Err(PrepError::Validation("checklist text is required".to_owned()));
        }
        self.transact(|state, _| {
            let task = active_mut(state, id)?;
            Ok(checklist::add_item(task, text).clone())
        })
    }

    pub fn toggle_checklist_item(
        &mut self,
        id: &str,
        item_id: &str,
        user: UserId,
    ) -> Result<ChecklistItem> {
        self.require_item(id, item_id)?;
        self.transact(|state, _| {
            let task = active_mut(state, id)?;
            checklist::toggle_item(task, item_id, user).cloned()
        })
    }

    pub fn edit_checklist_item(
        &mut self,
        id: &str,
        item_id: &str,
        text: &str,
    ) -> Result<ChecklistItem> {
        self.require_item(id, item_id)?;
        let text = text.trim();
        if text.is_empty() {
            return Err(PrepError::Validation("checklist text is required".to_owned()));
        }
        self.transact(|state, _| {
            let task = active_mut(state, id)?;
            checklist::edit_text(task, item_id, text).cloned()
        })
    }

    /// Remove a checklist item. An unknown item id is a no-op; an unknown
    /// task is still [`PrepError::NotFound`].
    pub fn remove_checklist_item(&mut self, id: &str, item_id: &str) -> Result<Task> {
        let task = self.require_active(id)?;
        if task.checklist_item(item_id).is_none() {
            return Ok(task.clone());
        }
        self.transact(|state, _| {
            let task = active_mut(state, id)?;
            checklist::remove_item(task, item_id);
            Ok(task.clone())
        })
    }

    /// Store a photo and attach its reference to the task.
    pub fn attach_photo(&mut self, id: &str, filename: &str, bytes: &[u8]) -> Result<Task> {
        self.require_active(id)?;
        let reference = self.photos.store(filename, bytes)?;

        let attached = reference.clone();
        let result = self.transact(move |state, _| {
            let task = active_mut(state, id)?;
            task.photos.push(attached);
            Ok(task.clone())
        });
        if result.is_err() {
            self.purge_photos(&[reference]);
        }
        result
    }

    /// Detach a photo and purge its file. Unknown references are ignored.
    pub fn detach_photo(&mut self, id: &str, reference: &str) -> Result<Task> {
        let task = self.require_active(id)?;
        if !task.photos.iter().any(|p| p == reference) {
            return Ok(task.clone());
        }
        self.transact(|state, purge| {
            let task = active_mut(state, id)?;
            task.photos.retain(|p| p != reference);
            purge.push(reference.to_owned());
            Ok(task.clone())
        })
    }

    fn require_active(&self, id: &str) -> Result<&Task> {
        self.state
            .tasks
            .get(id)
            .ok_or_else(|| PrepError::task_not_found(id))
    }

    fn require_item(&self, id: &str, item_id: &str) -> Result<()> {
        self.require_active(id)?
            .checklist_item(item_id)
            .map(|_| ())
            .ok_or_else(|| PrepError::item_not_found(item_id))
    }
}
