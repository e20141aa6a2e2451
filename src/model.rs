//! Users, tasks and checklist items.

use crate::error::{PrepError, Result};
use crate::time::Stamp;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Opaque chat-platform user identifier.
pub type UserId = i64;

/// Timezone assigned to users who do not report one.
pub const DEFAULT_USER_TIMEZONE: &str = "Europe/Kiev";

/// Interface language for reminders.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    Uk,
    En,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    #[serde(rename = "telegram_id")]
    pub id: UserId,
    pub username: String,
    pub first_name: String,
    #[serde(default)]
    pub photo_url: Option<String>,
    #[serde(default = "default_user_timezone")]
    pub timezone: String,
    #[serde(default)]
    pub language: Language,
    pub created_at: Stamp,
}

fn default_user_timezone() -> String {
    DEFAULT_USER_TIMEZONE.to_owned()
}

/// Registration payload for a user seen for the first time.
#[derive(Debug, Clone, Deserialize)]
pub struct NewUser {
    #[serde(rename = "telegram_id")]
    pub id: UserId,
    pub username: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub photo_url: Option<String>,
    #[serde(default)]
    pub timezone: Option<String>,
    #[serde(default)]
    pub language: Option<Language>,
}

impl NewUser {
    pub(crate) fn into_user(self, created_at: Stamp) -> User {
        User {
            id: self.id,
            username: self.username,
            first_name: self.first_name,
            photo_url: self.photo_url,
            timezone: self.timezone.unwrap_or_else(default_user_timezone),
            language: self.language.unwrap_or_default(),
            created_at,
        }
    }
}

/// Partial update of a user profile. `None` leaves the field as is.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct UserPatch {
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub photo_url: Option<String>,
    pub timezone: Option<String>,
    pub language: Option<Language>,
}

impl UserPatch {
    pub(crate) fn apply(self, user: &mut User) {
        if let Some(username) = self.username {
            user.username = username;
        }
        if let Some(first_name) = self.first_name {
            user.first_name = first_name;
        }
        if let Some(photo_url) = self.photo_url {
            user.photo_url = Some(photo_url);
        }
        if let Some(timezone) = self.timezone {
            user.timezone = timezone;
        }
        if let Some(language) = self.language {
            user.language = language;
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChecklistItem {
    pub id: String,
    pub text: String,
    /// Derived: `!completed_by.is_empty()`. Kept in the record for clients.
    #[serde(default)]
    pub is_completed: bool,
    #[serde(default)]
    pub completed_by: BTreeSet<UserId>,
}

impl ChecklistItem {
    pub(crate) fn new(text: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            text: text.into(),
            is_completed: false,
            completed_by: BTreeSet::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub event_date: Stamp,
    pub preparation_date: Stamp,
    #[serde(default)]
    pub photos: Vec<String>,
    #[serde(default)]
    pub checklist: Vec<ChecklistItem>,
    pub created_by: UserId,
    #[serde(default)]
    pub created_by_username: String,
    pub created_at: Stamp,

    #[serde(default)]
    pub is_deleted: bool,
    #[serde(default)]
    pub is_preparation_completed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<Stamp>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<Stamp>,

    #[serde(default)]
    pub notified_week_before: bool,
    #[serde(default)]
    pub notified_day_before: bool,

    #[serde(default)]
    pub ready_users: BTreeSet<UserId>,
    #[serde(default)]
    pub not_going_users: BTreeSet<UserId>,
}

impl Task {
    /// Look up a checklist item by id.
    pub fn checklist_item(&self, item_id: &str) -> Option<&ChecklistItem> {
        self.checklist.iter().find(|item| item.id == item_id)
    }
}

/// Creation payload for a task.
///
/// Required fields are optional here so that a missing field becomes a
/// [`PrepError::Validation`] instead of a deserialization failure. Photos are
/// never taken from the payload; they are attached through the photo store,
/// so every recorded reference belongs to exactly one task.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct NewTask {
    pub title: Option<String>,
    pub description: Option<String>,
    pub event_date: Option<Stamp>,
    pub preparation_date: Option<Stamp>,
    /// Initial checklist entries, by text.
    pub checklist: Vec<String>,
    pub created_by: Option<UserId>,
    pub created_by_username: Option<String>,
}

impl NewTask {
    pub(crate) fn into_task(self, created_at: Stamp) -> Result<Task> {
        let title = self
            .title
            .map(|t| t.trim().to_owned())
            .filter(|t| !t.is_empty())
            .ok_or_else(|| PrepError::Validation("title is required".to_owned()))?;
        let event_date = self
            .event_date
            .ok_or_else(|| PrepError::Validation("event_date is required".to_owned()))?;
        let preparation_date = self
            .preparation_date
            .ok_or_else(|| PrepError::Validation("preparation_date is required".to_owned()))?;
        let created_by = self
            .created_by
            .ok_or_else(|| PrepError::Validation("created_by is required".to_owned()))?;
        let created_by_username = self
            .created_by_username
            .map(|u| u.trim().to_owned())
            .filter(|u| !u.is_empty())
            .ok_or_else(|| PrepError::Validation("created_by_username is required".to_owned()))?;

        Ok(Task {
            id: uuid::Uuid::new_v4().to_string(),
            title,
            description: self.description,
            event_date,
            preparation_date,
            photos: Vec::new(),
            checklist: self.checklist.into_iter().map(ChecklistItem::new).collect(),
            created_by,
            created_by_username,
            created_at,
            is_deleted: false,
            is_preparation_completed: false,
            deleted_at: None,
            completed_at: None,
            notified_week_before: false,
            notified_day_before: false,
            ready_users: BTreeSet::new(),
            not_going_users: BTreeSet::new(),
        })
    }
}

/// Partial update of a task's descriptive fields.
///
/// Lifecycle flags, responder sets and the checklist are changed through
/// their own operations, never through a patch.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TaskPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub event_date: Option<Stamp>,
    pub preparation_date: Option<Stamp>,
}

impl TaskPatch {
    pub(crate) fn apply(self, task: &mut Task) -> Result<()> {
        if let Some(title) = self.title {
            let title = title.trim();
            if title.is_empty() {
                return Err(PrepError::Validation("title must not be empty".to_owned()));
            }
            task.title = title.to_owned();
        }
        if let Some(description) = self.description {
            task.description = Some(description);
        }
        if let Some(event_date) = self.event_date {
            task.event_date = event_date;
        }
        if let Some(preparation_date) = self.preparation_date {
            task.preparation_date = preparation_date;
        }
        Ok(())
    }
}
