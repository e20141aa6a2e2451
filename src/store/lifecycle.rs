//! Transitions between the active set and the two archives.

use super::TaskStore;
use super::retention::evict_completed;
use crate::error::{PrepError, Result};
use crate::model::Task;
use crate::time::Stamp;
use tracing::info;

impl TaskStore {
    /// Active to deleted.
    pub fn delete_task(&mut self, id: &str) -> Result<Task> {
        let stamp = Stamp::at(&self.now());
        let task = self.transact(|state, _| {
            let mut task = state
                .tasks
                .remove(id)
                .ok_or_else(|| PrepError::task_not_found(id))?;
            task.is_deleted = true;
            task.deleted_at = Some(stamp);
            state.deleted_tasks.insert(task.id.clone(), task.clone());
            Ok(task)
        })?;
        info!(task_id = %id, "task moved to deleted archive");
        Ok(task)
    }

    /// Deleted to active.
    pub fn restore_task(&mut self, id: &str) -> Result<Task> {
        let task = self.transact(|state, _| {
            let mut task = state
                .deleted_tasks
                .remove(id)
                .ok_or_else(|| PrepError::task_not_found(id))?;
            task.is_deleted = false;
            task.deleted_at = None;
            state.tasks.insert(task.id.clone(), task.clone());
            Ok(task)
        })?;
        info!(task_id = %id, "task restored from deleted archive");
        Ok(task)
    }

    /// Active to completed. The archive is trimmed to its bound and the
    /// photos of evicted entries are purged.
    pub fn complete_task(&mut self, id: &str) -> Result<Task> {
        let stamp = Stamp::at(&self.now());
        let limit = self.retention.completed_limit;
        let task = self.transact(|state, purge| {
            let mut task = state
                .tasks
                .remove(id)
                .ok_or_else(|| PrepError::task_not_found(id))?;
            task.is_preparation_completed = true;
            task.completed_at = Some(stamp);
            state.completed_tasks.insert(0, task.clone());
            let evicted = evict_completed(state, purge, limit);
            if !evicted.is_empty() {
                info!(?evicted, "completed archive trimmed");
            }
            Ok(task)
        })?;
        info!(task_id = %id, "task completed");
        Ok(task)
    }

    /// Completed to active.
    pub fn restore_completed_task(&mut self, id: &str) -> Result<Task> {
        let task = self.transact(|state, _| {
            let pos = state
                .completed_tasks
                .iter()
                .position(|t| t.id == id)
                .ok_or_else(|| PrepError::task_not_found(id))?;
            let mut task = state.completed_tasks.remove(pos);
            task.is_preparation_completed = false;
            task.completed_at = None;
            state.tasks.insert(task.id.clone(), task.clone());
            Ok(task)
        })?;
        info!(task_id = %id, "task restored from completed archive");
        Ok(task)
    }
}
