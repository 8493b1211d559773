//! # StudyFlow Core Library
//!
//! Core logic for the StudyFlow study planner: a versioned application state
//! persisted in a key-value store, plus the pure computations the UI layers
//! render from it.
//!
//! ## Architecture
//!
//! - **State**: typed, schema-versioned document (timetable, journal,
//!   gamification, settings, safe-mode snapshot)
//! - **Storage**: byte-oriented backends (SQLite, in-memory), version-keyed
//!   migrations, TOML configuration and the observable repository
//! - **Metrics**: weekly load, rest ratio and recent journal averages
//! - **Safe mode**: weighted wellbeing score with tiered alerts
//!
//! ## Key Components
//!
//! - [`StateRepository`]: owns the state, persists it and notifies listeners
//! - [`AppState`]: the persisted document
//! - [`SafeModeEvaluator`]: tier evaluation
//! - [`Config`]: installation configuration

pub mod error;
pub mod metrics;
pub mod quiet_hours;
pub mod safe_mode;
pub mod state;
pub mod storage;

pub use error::{
    ConfigError, CoreError, MigrationError, RepositoryError, StorageError, ValidationError,
};
pub use metrics::{RecentStats, WeeklyOverview};
pub use quiet_hours::{is_quiet_at, is_quiet_hour};
pub use safe_mode::{SafeModeEvaluation, SafeModeEvaluator, SafeModeInputs, Tier};
pub use state::{AppState, DailyLog, Day, Settings, Slot, SlotKey, SlotType};
pub use storage::{
    Change, Command, Config, LoadSource, MemoryBackend, SettingChange, SqliteBackend,
    StateRepository, StorageBackend, SubscriptionId,
};
