//! Reminder delivery.
//!
//! The scheduler hands every committed reminder to a [`Dispatcher`]. Delivery
//! is fire-and-forget from its point of view: a failure is logged and never
//! retried, since the one-shot flag was already persisted.

pub mod message;
pub mod telegram;
pub mod traits;

pub use telegram::TelegramDispatcher;
pub use traits::{Dispatcher, LogDispatcher};
