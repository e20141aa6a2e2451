//! Error types for the preparation service.

/// Top-level error type for store, scheduler and dispatch operations.
#[derive(Debug, thiserror::Error)]
pub enum PrepError {
    /// Unknown user, task or checklist item on an operation that requires it.
    #[error("{entity} not found: {id}")]
    NotFound {
        /// Kind of entity that was looked up (`"task"`, `"user"`, ...).
        entity: &'static str,
        /// The id that did not resolve.
        id: String,
    },

    /// Missing or malformed input.
    #[error("validation error: {0}")]
    Validation(String),

    /// Backing snapshot could not be read or written.
    #[error("persistence error: {0}")]
    Persistence(String),

    /// Notification delivery failed.
    #[error("dispatch error: {0}")]
    Dispatch(String),

    /// Photo file could not be stored or purged.
    #[error("photo storage error: {0}")]
    Photo(String),

    /// Configuration error.
    #[error("config error: {0}")]
    Config(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl PrepError {
    pub(crate) fn task_not_found(id: &str) -> Self {
        Self::NotFound {
            entity: "task",
            id: id.to_owned(),
        }
    }

    pub(crate) fn user_not_found(id: i64) -> Self {
        Self::NotFound {
            entity: "user",
            id: id.to_string(),
        }
    }

    pub(crate) fn item_not_found(id: &str) -> Self {
        Self::NotFound {
            entity: "checklist item",
            id: id.to_owned(),
        }
    }
}

/// Convenience result type.
pub type Result<T> = std::result::Result<T, PrepError>;
