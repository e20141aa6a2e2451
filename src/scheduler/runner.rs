//! Scheduler background loop.
//!
//! Spawns a tokio task that wakes every `tick` and runs the jobs that are
//! due: the reminder scan and the retention sweep. Store work happens under
//! the store lock; reminders are dispatched after the lock is released.

use crate::error::Result;
use crate::model::User;
use crate::notify::Dispatcher;
use crate::scheduler::tasks::{JobKind, JobOutcome, JobRunRecord, Schedule, ScheduledJob};
use crate::store::{PendingNotification, StoreHandle};
use crate::time::Clock;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Default interval between scheduler ticks (seconds).
const TICK_INTERVAL_SECS: u64 = 60;

/// Number of run-history entries to keep.
const DEFAULT_HISTORY_LIMIT: usize = 100;

/// Background scheduler that runs periodic store jobs.
pub struct Scheduler {
    store: StoreHandle,
    dispatcher: Arc<dyn Dispatcher>,
    clock: Arc<dyn Clock>,
    /// Registered jobs.
    jobs: Vec<ScheduledJob>,
    /// Recent run history, oldest first.
    history: Vec<JobRunRecord>,
    tick_interval: Duration,
    max_history_entries: usize,
}

impl Scheduler {
    /// Create a scheduler with no jobs registered.
    pub fn new(store: StoreHandle, dispatcher: Arc<dyn Dispatcher>, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            dispatcher,
            clock,
            jobs: Vec::new(),
            history: Vec::new(),
            tick_interval: Duration::from_secs(TICK_INTERVAL_SECS),
            max_history_entries: DEFAULT_HISTORY_LIMIT,
        }
    }

    /// Override how often the loop wakes up.
    pub fn with_tick_interval(mut self, interval: Duration) -> Self {
        self.tick_interval = interval.max(Duration::from_millis(1));
        self
    }

    /// Override the in-memory run-history limit.
    pub fn with_history_limit(mut self, max_entries: usize) -> Self {
        self.max_history_entries = max_entries.max(1);
        self
    }

    /// Register the reminder scan.
    pub fn with_notification_scan(&mut self, schedule: Schedule) {
        self.add_job(ScheduledJob::new(JobKind::NotificationScan, schedule));
    }

    /// Register the archive retention sweep.
    pub fn with_retention_sweep(&mut self, schedule: Schedule) {
        self.add_job(ScheduledJob::new(JobKind::RetentionSweep, schedule));
    }

    /// Add (or replace) a job of the same kind.
    pub fn add_job(&mut self, job: ScheduledJob) {
        if let Some(existing) = self.jobs.iter_mut().find(|j| j.kind == job.kind) {
            *existing = job;
        } else {
            self.jobs.push(job);
        }
    }

    /// Returns registered jobs.
    pub fn jobs(&self) -> &[ScheduledJob] {
        &self.jobs
    }

    /// Returns scheduler run history.
    pub fn history(&self) -> &[JobRunRecord] {
        &self.history
    }

    /// Start the scheduler background loop.
    pub fn run(mut self) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            info!("scheduler started with {} jobs", self.jobs.len());
            let mut interval = tokio::time::interval(self.tick_interval);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

            loop {
                interval.tick().await;
                self.tick().await;
            }
        })
    }

    /// Execute one scheduler tick: check and run due jobs. Returns the
    /// number of jobs that ran.
    pub async fn tick(&mut self) -> usize {
        let now = self.clock.now();
        let due: Vec<JobKind> = self
            .jobs
            .iter()
            .filter(|j| j.is_due(&now))
            .map(|j| j.kind)
            .collect();

        for kind in &due {
            let started_at = self.clock.now();
            debug!(job = %kind, "running scheduled job");

            let (outcome, summary) = match self.execute(*kind).await {
                Ok(summary) => (JobOutcome::Success, summary),
                Err(e) => {
                    error!(job = %kind, "scheduled job failed: {e}");
                    (JobOutcome::Error, e.to_string())
                }
            };

            if let Some(job) = self.jobs.iter_mut().find(|j| j.kind == *kind) {
                job.mark_run(started_at);
            }
            self.push_history(JobRunRecord {
                job: *kind,
                started_at,
                finished_at: self.clock.now(),
                outcome,
                summary,
            });
        }

        due.len()
    }

    async fn execute(&self, kind: JobKind) -> Result<String> {
        match kind {
            JobKind::NotificationScan => self.run_notification_scan().await,
            JobKind::RetentionSweep => self.run_retention_sweep(),
        }
    }

    /// Commit due reminder flags under the lock, then dispatch unlocked.
    async fn run_notification_scan(&self) -> Result<String> {
        let (pending, recipients) = self.take_pending()?;
        if pending.is_empty() {
            return Ok("no reminders due".to_owned());
        }

        let mut failed = 0usize;
        for PendingNotification { task, kind } in &pending {
            if let Err(e) = self.dispatcher.dispatch(&recipients, task, *kind).await {
                failed += 1;
                warn!(
                    task_id = %task.id,
                    %kind,
                    dispatcher = self.dispatcher.id(),
                    "reminder dispatch failed: {e}"
                );
            } else {
                info!(task_id = %task.id, %kind, "reminder dispatched");
            }
        }

        Ok(format!(
            "{} reminders dispatched, {failed} failed",
            pending.len() - failed
        ))
    }

    fn take_pending(&self) -> Result<(Vec<PendingNotification>, Vec<User>)> {
        self.store.with(|store| {
            let pending = store.take_due_notifications()?;
            let recipients = if pending.is_empty() {
                Vec::new()
            } else {
                store.users()
            };
            Ok((pending, recipients))
        })
    }

    fn run_retention_sweep(&self) -> Result<String> {
        let report = self.store.with(|store| store.sweep())?;
        Ok(format!(
            "{} deleted tasks expired, {} completed tasks evicted",
            report.expired_deleted.len(),
            report.evicted_completed.len()
        ))
    }

    fn push_history(&mut self, run: JobRunRecord) {
        self.history.push(run);
        if self.history.len() > self.max_history_entries {
            let drop_count = self.history.len() - self.max_history_entries;
            self.history.drain(0..drop_count);
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;
    use crate::error::PrepError;
    use crate::model::{NewUser, Task};
    use crate::scheduler::NotificationKind;
    use crate::store::test_support::{Fixture, draft, fixture};
    use async_trait::async_trait;
    use chrono::TimeDelta;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recording {
        sent: Mutex<Vec<(String, NotificationKind, usize)>>,
        fail_titles: Vec<String>,
    }

    #[async_trait]
    impl Dispatcher for Recording {
        fn id(&self) -> &'static str {
            "recording"
        }

        async fn dispatch(
            &self,
            recipients: &[User],
            task: &Task,
            kind: NotificationKind,
        ) -> Result<()> {
            self.sent
                .lock()
                .unwrap()
                .push((task.title.clone(), kind, recipients.len()));
            if self.fail_titles.contains(&task.title) {
                return Err(PrepError::Dispatch("boom".to_owned()));
            }
            Ok(())
        }
    }

    fn scheduler(fx: Fixture, dispatcher: Arc<Recording>) -> (Scheduler, StoreHandle, Arc<crate::time::ManualClock>) {
        let clock = fx.clock.clone();
        let handle = StoreHandle::new(fx.store);
        let mut scheduler = Scheduler::new(handle.clone(), dispatcher, clock.clone());
        scheduler.with_notification_scan(Schedule::Interval { secs: 600 });
        scheduler.with_retention_sweep(Schedule::Interval { secs: 86_400 });
        (scheduler, handle, clock)
    }

    fn register(fx: &mut Fixture, id: i64) {
        let user: NewUser = serde_json::from_value(serde_json::json!({
            "telegram_id": id,
            "username": format!("user{id}"),
        }))
        .unwrap();
        fx.store.add_user(user).unwrap();
    }

    #[tokio::test]
    async fn week_then_day_reminders_are_sent_once() {
        let mut fx = fixture();
        register(&mut fx, 1);
        register(&mut fx, 2);
        fx.store.create_task(draft("trip", &fx.clock, 6)).unwrap();
        let recording = Arc::new(Recording::default());
        let (mut scheduler, _handle, clock) = scheduler(fx, recording.clone());

        assert_eq!(scheduler.tick().await, 2);
        assert_eq!(
            *recording.sent.lock().unwrap(),
            vec![("trip".to_owned(), NotificationKind::WeekBefore, 2)]
        );

        clock.advance(TimeDelta::minutes(10));
        assert_eq!(scheduler.tick().await, 1);
        assert_eq!(recording.sent.lock().unwrap().len(), 1);

        clock.advance(TimeDelta::days(5));
        scheduler.tick().await;
        let sent = recording.sent.lock().unwrap().clone();
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[1].1, NotificationKind::DayBefore);
    }

    #[tokio::test]
    async fn dispatch_failure_is_isolated_and_not_retried() {
        let mut fx = fixture();
        register(&mut fx, 1);
        fx.store.create_task(draft("broken", &fx.clock, 2)).unwrap();
        fx.store.create_task(draft("fine", &fx.clock, 3)).unwrap();
        let recording = Arc::new(Recording {
            fail_titles: vec!["broken".to_owned()],
            ..Recording::default()
        });
        let (mut scheduler, handle, clock) = scheduler(fx, recording.clone());

        scheduler.tick().await;
        assert_eq!(recording.sent.lock().unwrap().len(), 2);
        let scan = scheduler
            .history()
            .iter()
            .find(|r| r.job == JobKind::NotificationScan)
            .unwrap();
        assert_eq!(scan.outcome, JobOutcome::Success);
        assert!(scan.summary.contains("1 failed"));

        let store = handle.lock().unwrap();
        assert!(store.active_tasks().iter().all(|t| t.notified_week_before));
        drop(store);

        clock.advance(TimeDelta::minutes(10));
        scheduler.tick().await;
        assert_eq!(recording.sent.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn sweep_job_expires_deleted_tasks() {
        let mut fx = fixture();
        let task = fx.store.create_task(draft("old", &fx.clock, 2)).unwrap();
        fx.store.delete_task(&task.id).unwrap();
        let (mut scheduler, handle, clock) = scheduler(fx, Arc::new(Recording::default()));

        scheduler.tick().await;
        assert_eq!(handle.lock().unwrap().deleted_tasks().len(), 1);

        clock.advance(TimeDelta::days(31));
        scheduler.tick().await;
        assert!(handle.lock().unwrap().deleted_tasks().is_empty());
    }

    #[tokio::test]
    async fn history_is_bounded() {
        let (scheduler, _handle, clock) = scheduler(fixture(), Arc::new(Recording::default()));
        let mut scheduler = scheduler.with_history_limit(3);
        for _ in 0..5 {
            scheduler.tick().await;
            clock.advance(TimeDelta::days(2));
        }
        assert_eq!(scheduler.history().len(), 3);
    }
}
