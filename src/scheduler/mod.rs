//! Background job scheduler.
//!
//! Runs the periodic reminder scan and the archive retention sweep against
//! the shared task store.

pub mod runner;
pub mod scan;
pub mod tasks;

pub use runner::Scheduler;
pub use scan::{DueNotification, NotificationKind, due_notifications};
pub use tasks::{JobKind, JobOutcome, JobRunRecord, Schedule, ScheduledJob};
