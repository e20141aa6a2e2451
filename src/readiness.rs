//! Ready / not-going responder sets.
//!
//! A user appears in at most one of `ready_users` and `not_going_users`.

use crate::model::{Task, UserId};

/// Mark `user` as ready, withdrawing any earlier "not going" answer.
pub fn mark_ready(task: &mut Task, user: UserId) {
    task.not_going_users.remove(&user);
    task.ready_users.insert(user);
}

/// Mark `user` as not going, withdrawing any earlier "ready" answer.
pub fn mark_not_going(task: &mut Task, user: UserId) {
    task.ready_users.remove(&user);
    task.not_going_users.insert(user);
}
