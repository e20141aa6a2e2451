//! Application directory paths.
//!
//! Uses the [`dirs`] crate for platform-appropriate directory resolution.
//!
//! | Purpose | Linux | macOS |
//! |---------|-------|-------|
//! | App data | `~/.local/share/prepbot/` | `~/Library/Application Support/prepbot/` |
//! | Config | `~/.config/prepbot/` | `~/Library/Application Support/prepbot/` |
//!
//! # Environment Overrides
//!
//! - `PREPBOT_DATA_DIR` overrides [`data_dir`]
//! - `PREPBOT_CONFIG_DIR` overrides [`config_dir`]

use std::path::PathBuf;

/// Application data root: the snapshot file and photos.
#[must_use]
pub fn data_dir() -> PathBuf {
    if let Some(override_dir) = std::env::var_os("PREPBOT_DATA_DIR") {
        return PathBuf::from(override_dir);
    }
    dirs::data_dir()
        .map(|d| d.join("prepbot"))
        .unwrap_or_else(|| PathBuf::from("/tmp/prepbot-data"))
}

/// Application config directory.
#[must_use]
pub fn config_dir() -> PathBuf {
    if let Some(override_dir) = std::env::var_os("PREPBOT_CONFIG_DIR") {
        return PathBuf::from(override_dir);
    }
    dirs::config_dir()
        .map(|d| d.join("prepbot"))
        .unwrap_or_else(|| PathBuf::from("/tmp/prepbot-config"))
}

/// Main config file path (`config_dir()/config.toml`).
#[must_use]
pub fn config_file() -> PathBuf {
    config_dir().join("config.toml")
}

/// Snapshot file path (`data_dir()/data.json`).
#[must_use]
pub fn data_file() -> PathBuf {
    data_dir().join("data.json")
}

/// Uploaded photos (`data_dir()/photos/`).
#[must_use]
pub fn photos_dir() -> PathBuf {
    data_dir().join("photos")
}
