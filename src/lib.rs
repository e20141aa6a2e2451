//! Prepbot: shared event-preparation tasks for a small group.
//!
//! The crate keeps a set of tasks through their lifecycle (active, deleted,
//! completed), tracks who is ready for each event, keeps a per-task
//! checklist and sends one-shot reminders a week and a day before the event.
//!
//! # Architecture
//!
//! - **Store**: [`store::TaskStore`] owns every record and persists a full
//!   snapshot after each mutation; [`store::StoreHandle`] serializes access.
//! - **Scheduler**: [`scheduler::Scheduler`] runs the reminder scan and the
//!   archive retention sweep on timers.
//! - **Notify**: [`notify::Dispatcher`] delivers reminders (Telegram or log).
//! - **API**: [`api::ApiServer`] exposes the store over HTTP.

pub mod api;
pub mod checklist;
pub mod config;
pub mod error;
pub mod model;
pub mod notify;
pub mod prep_dirs;
pub mod readiness;
pub mod scheduler;
pub mod status;
pub mod store;
pub mod time;

pub use config::PrepConfig;
pub use error::{PrepError, Result};
pub use store::{StoreHandle, TaskStore};
