//! Configuration types for the prepbot service.

use crate::error::{PrepError, Result};
use crate::scheduler::Schedule;
use crate::store::RetentionPolicy;
use crate::time::{DEFAULT_TIMEZONE, parse_timezone};
use chrono::{NaiveTime, TimeDelta, Timelike};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Top-level service configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PrepConfig {
    /// HTTP listener settings.
    pub server: ServerConfig,
    /// Snapshot and photo locations.
    pub storage: StorageConfig,
    /// Canonical timezone and job intervals.
    pub schedule: ScheduleConfig,
    /// Archive retention bounds.
    pub retention: RetentionConfig,
    /// Telegram reminder delivery.
    pub telegram: TelegramConfig,
    /// Logging.
    pub log: LogConfig,
}

/// HTTP listener configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Largest accepted request body, photo uploads included.
    pub max_upload_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_owned(),
            port: 5000,
            max_upload_bytes: 10 * 1024 * 1024,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// JSON snapshot file.
    pub data_file: PathBuf,
    /// Directory holding uploaded photos.
    pub photos_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_file: crate::prep_dirs::data_file(),
            photos_dir: crate::prep_dirs::photos_dir(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleConfig {
    /// IANA name of the canonical timezone.
    pub timezone: String,
    /// Seconds between reminder scans.
    pub scan_interval_secs: u64,
    /// Seconds between retention sweeps.
    pub sweep_interval_secs: u64,
    /// Daily sweep time as `HH:MM` in the canonical timezone. Takes
    /// precedence over `sweep_interval_secs` when set.
    pub sweep_at: Option<String>,
    /// Scheduler wake-up period in seconds.
    pub tick_secs: u64,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            timezone: DEFAULT_TIMEZONE.to_owned(),
            scan_interval_secs: 600,
            sweep_interval_secs: 86_400,
            sweep_at: None,
            tick_secs: 60,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetentionConfig {
    pub deleted_retention_days: u32,
    pub completed_limit: usize,
}

impl Default for RetentionConfig {
    fn default() -> Self {
        let policy = RetentionPolicy::default();
        Self {
            deleted_retention_days: u32::try_from(policy.deleted_retention.num_days())
                .unwrap_or(30),
            completed_limit: policy.completed_limit,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TelegramConfig {
    /// Bot API token. Empty disables delivery; reminders are only logged.
    pub bot_token: String,
    pub api_base_url: String,
    /// Mini-app link used for the "Open" button, e.g. `https://t.me/<bot>/<app>`.
    pub app_link: String,
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            bot_token: String::new(),
            api_base_url: "https://api.telegram.org".to_owned(),
            app_link: String::new(),
        }
    }
}

impl TelegramConfig {
    pub fn is_enabled(&self) -> bool {
        !self.bot_token.trim().is_empty()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Filter used when `RUST_LOG` is not set.
    pub level: String,
    /// When set, logs are also written to a daily rolling file here.
    pub directory: Option<PathBuf>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_owned(),
            directory: None,
        }
    }
}

impl PrepConfig {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| PrepError::Config(e.to_string()))
    }

    /// Load `path` when it exists, otherwise fall back to defaults.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::from_file(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to a TOML file, creating parent directories as needed.
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| PrepError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Returns the default config file path: `<config_dir>/config.toml`.
    pub fn default_config_path() -> PathBuf {
        crate::prep_dirs::config_file()
    }

    /// Parsed canonical timezone.
    pub fn timezone(&self) -> Result<Tz> {
        parse_timezone(&self.schedule.timezone)
    }

    /// Schedule of the notification scan job.
    pub fn scan_schedule(&self) -> Schedule {
        Schedule::Interval {
            secs: self.schedule.scan_interval_secs,
        }
    }

    /// Schedule of the retention sweep job: daily at `sweep_at` when set,
    /// otherwise every `sweep_interval_secs`.
    pub fn sweep_schedule(&self) -> Result<Schedule> {
        let Some(raw) = self.schedule.sweep_at.as_deref() else {
            return Ok(Schedule::Interval {
                secs: self.schedule.sweep_interval_secs,
            });
        };
        let at = NaiveTime::parse_from_str(raw.trim(), "%H:%M").map_err(|e| {
            PrepError::Config(format!("schedule.sweep_at '{raw}' is not HH:MM: {e}"))
        })?;
        Ok(Schedule::Daily {
            hour: u8::try_from(at.hour()).unwrap_or_default(),
            min: u8::try_from(at.minute()).unwrap_or_default(),
        })
    }

    pub fn retention_policy(&self) -> RetentionPolicy {
        RetentionPolicy {
            deleted_retention: TimeDelta::days(i64::from(self.retention.deleted_retention_days)),
            completed_limit: self.retention.completed_limit,
        }
    }

    /// Reject values the service cannot run with.
    pub fn validate(&self) -> Result<()> {
        self.timezone()?;
        if self.schedule.tick_secs == 0 {
            return Err(PrepError::Config("schedule.tick_secs must be positive".to_owned()));
        }
        if self.schedule.scan_interval_secs == 0 || self.schedule.sweep_interval_secs == 0 {
            return Err(PrepError::Config(
                "schedule intervals must be positive".to_owned(),
            ));
        }
        self.sweep_schedule()?;
        if self.retention.completed_limit == 0 {
            return Err(PrepError::Config(
                "retention.completed_limit must be at least 1".to_owned(),
            ));
        }
        if self.server.max_upload_bytes == 0 {
            return Err(PrepError::Config(
                "server.max_upload_bytes must be positive".to_owned(),
            ));
        }
        Ok(())
    }
}
