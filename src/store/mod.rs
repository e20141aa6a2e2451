//! Task Store: the single owner of users, tasks and both archives.
//!
//! Every mutation runs against a copy of the current [`Snapshot`]; the copy
//! is saved through the [`SnapshotBackend`] and only then replaces the live
//! state. A failed save therefore leaves memory exactly as it was before the
//! call. Photos of permanently erased records are purged after the save.
//!
//! Callers share the store through a [`StoreHandle`], which serializes every
//! read-modify-write sequence (HTTP handlers and the scheduler alike).

mod lifecycle;
pub mod photos;
mod reminders;
mod retention;
pub mod snapshot;
mod tasks;
mod users;

pub use photos::{FsPhotoStorage, MemoryPhotoStorage, PhotoStorage};
pub use reminders::PendingNotification;
pub use retention::{RetentionPolicy, SweepReport};
pub use snapshot::{JsonFileBackend, MemoryBackend, Snapshot, SnapshotBackend};

use crate::error::{PrepError, Result};
use crate::time::Clock;
use chrono::DateTime;
use chrono_tz::Tz;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, info, warn};

pub struct TaskStore {
    state: Snapshot,
    backend: Box<dyn SnapshotBackend>,
    photos: Box<dyn PhotoStorage>,
    clock: Arc<dyn Clock>,
    retention: RetentionPolicy,
}

impl TaskStore {
    /// Load the persisted snapshot and run a retention sweep.
    pub fn open(
        backend: Box<dyn SnapshotBackend>,
        photos: Box<dyn PhotoStorage>,
        clock: Arc<dyn Clock>,
        retention: RetentionPolicy,
    ) -> Result<Self> {
        let state = backend.load()?;
        info!(
            active = state.tasks.len(),
            deleted = state.deleted_tasks.len(),
            completed = state.completed_tasks.len(),
            users = state.users.len(),
            "task store loaded"
        );

        let mut store = Self {
            state,
            backend,
            photos,
            clock,
            retention,
        };
        store.sweep()?;
        Ok(store)
    }

    /// Current time in the canonical timezone.
    pub fn now(&self) -> DateTime<Tz> {
        self.clock.now()
    }

    pub fn timezone(&self) -> Tz {
        self.clock.timezone()
    }

    /// Read-only view of the full state.
    pub fn snapshot(&self) -> &Snapshot {
        &self.state
    }

    /// Run `op` on a copy of the state, persist the copy, then commit it.
    ///
    /// `op` pushes onto the purge list the photo references of records it
    /// erases for good; they are purged once the save has succeeded.
    fn transact<T>(
        &mut self,
        op: impl FnOnce(&mut Snapshot, &mut Vec<String>) -> Result<T>,
    ) -> Result<T> {
        let mut next = self.state.clone();
        let mut purge = Vec::new();
        let out = op(&mut next, &mut purge)?;

        self.backend.save(&next)?;
        self.state = next;
        self.purge_photos(&purge);
        Ok(out)
    }

    fn purge_photos(&self, references: &[String]) {
        for reference in references {
            match self.photos.purge(reference) {
                Ok(()) => debug!(%reference, "photo purged"),
                Err(e) => warn!(%reference, "photo purge failed: {e}"),
            }
        }
    }
}

/// Shared, lock-guarded access to a [`TaskStore`].
#[derive(Clone)]
pub struct StoreHandle {
    inner: Arc<Mutex<TaskStore>>,
}

impl StoreHandle {
    pub fn new(store: TaskStore) -> Self {
        Self {
            inner: Arc::new(Mutex::new(store)),
        }
    }

    /// Acquire the store for one read-modify-write sequence.
    pub fn lock(&self) -> Result<MutexGuard<'_, TaskStore>> {
        self.inner
            .lock()
            .map_err(|_| PrepError::Persistence("task store lock poisoned".to_owned()))
    }

    /// Run `f` with the store locked.
    pub fn with<T>(&self, f: impl FnOnce(&mut TaskStore) -> Result<T>) -> Result<T> {
        let mut store = self.lock()?;
        f(&mut store)
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;
    use crate::model::NewTask;
    use crate::time::{ManualClock, Stamp, parse_timezone};
    use chrono::TimeZone;

    pub(crate) struct Fixture {
        pub store: TaskStore,
        pub backend: MemoryBackend,
        pub photos: MemoryPhotoStorage,
        pub clock: Arc<ManualClock>,
    }

    pub(crate) fn kyiv() -> Tz {
        parse_timezone("Europe/Kyiv").unwrap()
    }

    pub(crate) fn fixture_with(snapshot: Snapshot) -> Fixture {
        let start = kyiv().with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap();
        let clock = Arc::new(ManualClock::new(start));
        let backend = MemoryBackend::with_snapshot(snapshot);
        let photos = MemoryPhotoStorage::new();
        let store = TaskStore::open(
            Box::new(backend.clone()),
            Box::new(photos.clone()),
            clock.clone(),
            RetentionPolicy::default(),
        )
        .unwrap();
        Fixture {
            store,
            backend,
            photos,
            clock,
        }
    }

    pub(crate) fn fixture() -> Fixture {
        fixture_with(Snapshot::default())
    }

    /// A task whose event is `days_ahead` days after the fixture clock.
    pub(crate) fn draft(title: &str, clock: &ManualClock, days_ahead: i64) -> NewTask {
        let event = clock.now() + chrono::TimeDelta::days(days_ahead);
        NewTask {
            title: Some(title.to_owned()),
            event_date: Some(Stamp::at(&event)),
            preparation_date: Some(Stamp::at(&(event - chrono::TimeDelta::days(3)))),
            created_by: Some(1),
            created_by_username: Some("alice".to_owned()),
            ..NewTask::default()
        }
    }
}
