//! TOML-based application configuration.
//!
//! Stores settings that belong to the installation rather than to the user's
//! data document:
//! - Storage keys used inside the backend
//! - Quiet-hours window
//! - Safe-mode weights and tier thresholds
//! - Planning grid bounds
//!
//! Configuration is stored at `<data dir>/config.toml`.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::data_dir;
use crate::error::ConfigError;

/// Where the state document lives inside the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_storage_key")]
    pub key: String,
    /// Read-only fallback written by pre-versioned builds.
    #[serde(default = "default_legacy_key")]
    pub legacy_key: String,
}

impl StorageConfig {
    /// Key prefix for copies of documents that failed to load.
    pub fn backup_prefix(&self) -> String {
        format!("{}_backup_", self.key)
    }
}

/// Hours during which notifications stay silent.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QuietHoursConfig {
    #[serde(default = "default_quiet_start")]
    pub start: u8,
    #[serde(default = "default_quiet_end")]
    pub end: u8,
}

/// Relative importance of each safe-mode input. Must sum to 1.0.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Weights {
    pub sleep: f64,
    pub stress: f64,
    pub load: f64,
    pub streak: f64,
    pub rest_ratio: f64,
}

impl Weights {
    pub fn total(&self) -> f64 {
        self.sleep + self.stress + self.load + self.streak + self.rest_ratio
    }
}

/// Bounds for a single safe-mode tier.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TierThresholds {
    /// Minimum composite score (0-100) to enter the tier.
    pub score: f64,
    /// Average sleep below this is a violation.
    pub sleep_min: f64,
    /// Average stress at or above this is a violation.
    pub stress_min: f64,
    /// Weekly load above this is a violation.
    pub load_max: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TierTable {
    pub critical: TierThresholds,
    pub alert: TierThresholds,
    pub watch: TierThresholds,
}

/// Safe-mode evaluation settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SafeModeConfig {
    /// Number of most recent journal entries averaged.
    #[serde(default = "default_window_days")]
    pub window_days: usize,
    #[serde(default)]
    pub weights: Weights,
    #[serde(default)]
    pub thresholds: TierTable,
}

/// Bounds of the weekly timetable grid.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlanningConfig {
    #[serde(default = "default_hour_min")]
    pub hour_min: u8,
    #[serde(default = "default_hour_max")]
    pub hour_max: u8,
}

/// Application configuration.
///
/// Serialized to/from TOML at `<data dir>/config.toml`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub quiet_hours: QuietHoursConfig,
    #[serde(default)]
    pub safe_mode: SafeModeConfig,
    #[serde(default)]
    pub planning: PlanningConfig,
}

// Default functions
fn default_storage_key() -> String {
    "sf_ultimate_pro_v2".into()
}
fn default_legacy_key() -> String {
    "sf_ultimate_pro".into()
}
fn default_quiet_start() -> u8 {
    23
}
fn default_quiet_end() -> u8 {
    7
}
fn default_window_days() -> usize {
    7
}
fn default_hour_min() -> u8 {
    6
}
fn default_hour_max() -> u8 {
    22
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            key: default_storage_key(),
            legacy_key: default_legacy_key(),
        }
    }
}

impl Default for QuietHoursConfig {
    fn default() -> Self {
        Self {
            start: default_quiet_start(),
            end: default_quiet_end(),
        }
    }
}

impl Default for Weights {
    fn default() -> Self {
        Self {
            sleep: 0.3,
            stress: 0.3,
            load: 0.2,
            streak: 0.1,
            rest_ratio: 0.1,
        }
    }
}

impl Default for TierTable {
    fn default() -> Self {
        Self {
            critical: TierThresholds {
                score: 80.0,
                sleep_min: 5.0,
                stress_min: 8.0,
                load_max: 35,
            },
            alert: TierThresholds {
                score: 60.0,
                sleep_min: 6.0,
                stress_min: 7.0,
                load_max: 30,
            },
            watch: TierThresholds {
                score: 40.0,
                sleep_min: 6.5,
                stress_min: 6.0,
                load_max: 25,
            },
        }
    }
}

impl Default for SafeModeConfig {
    fn default() -> Self {
        Self {
            window_days: default_window_days(),
            weights: Weights::default(),
            thresholds: TierTable::default(),
        }
    }
}

impl Default for PlanningConfig {
    fn default() -> Self {
        Self {
            hour_min: default_hour_min(),
            hour_max: default_hour_max(),
        }
    }
}

impl Config {
    fn get_json_value_by_path<'a>(
        root: &'a serde_json::Value,
        key: &str,
    ) -> Option<&'a serde_json::Value> {
        if key.is_empty() {
            return None;
        }

        let mut current = root;
        for part in key.split('.') {
            current = current.get(part)?;
        }
        Some(current)
    }

    fn set_json_value_by_path(
        root: &mut serde_json::Value,
        key: &str,
        value: &str,
    ) -> Result<(), ConfigError> {
        let unknown = || ConfigError::UnknownKey(key.to_string());
        let invalid = |message: String| ConfigError::InvalidValue {
            key: key.to_string(),
            message,
        };

        let mut parts = key.split('.').peekable();
        if parts.peek().is_none() || key.is_empty() {
            return Err(unknown());
        }

        let mut current = root;
        while let Some(part) = parts.next() {
            let is_leaf = parts.peek().is_none();
            if is_leaf {
                let obj = current.as_object_mut().ok_or_else(unknown)?;
                let existing = obj.get(part).ok_or_else(unknown)?;

                let new_value = match existing {
                    serde_json::Value::Bool(_) => serde_json::Value::Bool(
                        value.parse::<bool>().map_err(|e| invalid(e.to_string()))?,
                    ),
                    serde_json::Value::Number(_) => {
                        if let Ok(n) = value.parse::<u64>() {
                            serde_json::Value::Number(n.into())
                        } else if let Ok(n) = value.parse::<f64>() {
                            serde_json::Number::from_f64(n)
                                .map(serde_json::Value::Number)
                                .ok_or_else(|| invalid(format!("cannot parse '{value}' as number")))?
                        } else {
                            return Err(invalid(format!("cannot parse '{value}' as number")));
                        }
                    }
                    serde_json::Value::Object(_) | serde_json::Value::Array(_) => {
                        serde_json::from_str(value).map_err(|e| invalid(e.to_string()))?
                    }
                    _ => serde_json::Value::String(value.into()),
                };

                obj.insert(part.to_string(), new_value);
                return Ok(());
            }

            current = current.get_mut(part).ok_or_else(unknown)?;
        }

        Err(unknown())
    }

    fn path() -> Result<PathBuf, ConfigError> {
        Ok(data_dir()?.join("config.toml"))
    }

    /// Load from the data directory or write and return the default.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed,
    /// or if the default config cannot be written to disk.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::path()?)
    }

    /// Load from an explicit path, writing the default if it is absent.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => {
                let cfg: Config = toml::from_str(&content).map_err(|e| ConfigError::LoadFailed {
                    path: path.to_path_buf(),
                    message: e.to_string(),
                })?;
                cfg.validate()?;
                Ok(cfg)
            }
            Err(_) => {
                let cfg = Self::default();
                cfg.save_to(path)?;
                Ok(cfg)
            }
        }
    }

    /// Persist to the data directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the config cannot be serialized or written to disk.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let save_failed = |message: String| ConfigError::SaveFailed {
            path: path.to_path_buf(),
            message,
        };
        let content = toml::to_string_pretty(self).map_err(|e| save_failed(e.to_string()))?;
        std::fs::write(path, content).map_err(|e| save_failed(e.to_string()))?;
        Ok(())
    }

    /// Check cross-field constraints serde cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let total = self.safe_mode.weights.total();
        if (total - 1.0).abs() > 1e-6 {
            return Err(ConfigError::InvalidValue {
                key: "safe_mode.weights".into(),
                message: format!("weights must sum to 1.0, got {total}"),
            });
        }
        if self.quiet_hours.start > 23 || self.quiet_hours.end > 23 {
            return Err(ConfigError::InvalidValue {
                key: "quiet_hours".into(),
                message: "hours must be between 0 and 23".into(),
            });
        }
        if self.planning.hour_min > self.planning.hour_max || self.planning.hour_max > 23 {
            return Err(ConfigError::InvalidValue {
                key: "planning".into(),
                message: format!(
                    "invalid grid {}..={}",
                    self.planning.hour_min, self.planning.hour_max
                ),
            });
        }
        if self.safe_mode.window_days == 0 {
            return Err(ConfigError::InvalidValue {
                key: "safe_mode.window_days".into(),
                message: "window must cover at least one entry".into(),
            });
        }
        Ok(())
    }

    /// Get a config value as string by dot-separated key.
    pub fn get(&self, key: &str) -> Option<String> {
        let json = serde_json::to_value(self).ok()?;
        let val = Self::get_json_value_by_path(&json, key)?;
        match val {
            serde_json::Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Set a config value by key without saving. Returns error if key is
    /// unknown or the result fails validation; `self` is unchanged on error.
    pub fn apply(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let invalid = |message: String| ConfigError::InvalidValue {
            key: key.to_string(),
            message,
        };
        let mut json = serde_json::to_value(&*self).map_err(|e| invalid(e.to_string()))?;
        Self::set_json_value_by_path(&mut json, key, value)?;
        let updated: Config = serde_json::from_value(json).map_err(|e| invalid(e.to_string()))?;
        updated.validate()?;
        *self = updated;
        Ok(())
    }

    /// Set a config value by key and save.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is unknown, the value cannot be parsed,
    /// or the config cannot be saved.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        self.apply(key, value)?;
        self.save()
    }
}
