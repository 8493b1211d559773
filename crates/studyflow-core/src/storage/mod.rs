//! Persistence: storage backends, schema migrations, configuration and the
//! observable state repository.

pub mod backend;
mod config;
pub mod migrations;
pub mod repository;

pub use backend::{MemoryBackend, SqliteBackend, StorageBackend};
pub use config::{
    Config, PlanningConfig, QuietHoursConfig, SafeModeConfig, StorageConfig, TierThresholds,
    TierTable, Weights,
};
pub use repository::{
    Change, Command, LoadSource, SettingChange, StateRepository, SubscriptionId,
};

use std::path::PathBuf;

use crate::error::ConfigError;

/// Returns the StudyFlow data directory, creating it if needed.
///
/// `STUDYFLOW_DATA_DIR` wins when set. Otherwise `~/.config/studyflow[-dev]/`
/// based on `STUDYFLOW_ENV` (set `STUDYFLOW_ENV=dev` for a scratch profile).
///
/// # Errors
/// Returns an error if creating the directory fails.
pub fn data_dir() -> Result<PathBuf, ConfigError> {
    let dir = match std::env::var_os("STUDYFLOW_DATA_DIR") {
        Some(dir) => PathBuf::from(dir),
        None => {
            let base_dir = dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".config");

            let env = std::env::var("STUDYFLOW_ENV").unwrap_or_else(|_| "production".to_string());
            if env == "dev" {
                base_dir.join("studyflow-dev")
            } else {
                base_dir.join("studyflow")
            }
        }
    };

    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}
