//! Prepbot service binary.
//!
//! Usage: `prepbot [config.toml]`. Without an argument the default config
//! path is used; a missing file means built-in defaults.

use anyhow::Context;
use prepbot::api::ApiServer;
use prepbot::notify::{Dispatcher, LogDispatcher, TelegramDispatcher};
use prepbot::scheduler::Scheduler;
use prepbot::store::{FsPhotoStorage, JsonFileBackend};
use prepbot::time::SystemClock;
use prepbot::{PrepConfig, StoreHandle, TaskStore};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

fn init_tracing(config: &PrepConfig) -> Option<WorkerGuard> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log.level));

    let (file_layer, guard) = match &config.log.directory {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "prepbot.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(writer);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(file_layer)
        .init();
    guard
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config_path = std::env::args_os()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(PrepConfig::default_config_path);
    let config = PrepConfig::load_or_default(&config_path)
        .with_context(|| format!("cannot load config from {}", config_path.display()))?;
    let _log_guard = init_tracing(&config);
    config.validate().context("invalid configuration")?;

    tracing::info!(config = %config_path.display(), "prepbot starting");

    let tz = config.timezone()?;
    let clock = Arc::new(SystemClock::new(tz));
    let photos = FsPhotoStorage::new(&config.storage.photos_dir)?;
    let store = TaskStore::open(
        Box::new(JsonFileBackend::new(&config.storage.data_file)),
        Box::new(photos),
        clock.clone(),
        config.retention_policy(),
    )
    .context("cannot open task store")?;
    let store = StoreHandle::new(store);

    let dispatcher: Arc<dyn Dispatcher> = if config.telegram.is_enabled() {
        Arc::new(TelegramDispatcher::new(&config.telegram))
    } else {
        tracing::warn!("telegram bot token not set, reminders will only be logged");
        Arc::new(LogDispatcher)
    };

    let mut scheduler = Scheduler::new(store.clone(), dispatcher, clock)
        .with_tick_interval(Duration::from_secs(config.schedule.tick_secs));
    scheduler.with_notification_scan(config.scan_schedule());
    scheduler.with_retention_sweep(config.sweep_schedule()?);
    for job in scheduler.jobs() {
        tracing::info!(job = %job.kind, schedule = %job.schedule, "job registered");
    }
    let scheduler_handle = scheduler.run();

    let server = ApiServer::start(
        store,
        &config.server,
        Some(config.storage.photos_dir.clone()),
    )
    .await
    .context("cannot start API server")?;

    tokio::signal::ctrl_c()
        .await
        .context("cannot listen for shutdown signal")?;
    tracing::info!("shutdown requested");

    scheduler_handle.abort();
    server.shutdown().await;
    tracing::info!("prepbot stopped");
    Ok(())
}
