//! Per-task checklist with per-user completion marks.

use crate::error::{PrepError, Result};
use crate::model::{ChecklistItem, Task, UserId};

/// Append a new, unchecked item. Returns the created item.
pub fn add_item(task: &mut Task, text: impl Into<String>) -> &ChecklistItem {
    let idx = task.checklist.len();
    task.checklist.push(ChecklistItem::new(text));
    &task.checklist[idx]
}

/// Flip `user`'s completion mark on an item.
pub fn toggle_item<'a>(
    task: &'a mut Task,
    item_id: &str,
    user: UserId,
) -> Result<&'a ChecklistItem> {
    let item = find_mut(task, item_id)?;
    if !item.completed_by.remove(&user) {
        item.completed_by.insert(user);
    }
    item.is_completed = !item.completed_by.is_empty();
    Ok(&*item)
}

/// Replace an item's text.
pub fn edit_text<'a>(
    task: &'a mut Task,
    item_id: &str,
    text: impl Into<String>,
) -> Result<&'a ChecklistItem> {
    let item = find_mut(task, item_id)?;
    item.text = text.into();
    Ok(&*item)
}

/// Remove an item. Unknown ids are ignored; returns whether anything was removed.
pub fn remove_item(task: &mut Task, item_id: &str) -> bool {
    let before = task.checklist.len();
    task.checklist.retain(|item| item.id != item_id);
    task.checklist.len() != before
}

fn find_mut<'a>(task: &'a mut Task, item_id: &str) -> Result<&'a mut ChecklistItem> {
    task.checklist
        .iter_mut()
        .find(|item| item.id == item_id)
        .ok_or_else(|| PrepError::item_not_found(item_id))
}
