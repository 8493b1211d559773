//! Typed application state.
//!
//! [`AppState`] is the single root document persisted by the
//! [`StateRepository`](crate::storage::StateRepository). Field names on the
//! wire are camelCase so documents written by earlier builds load unchanged.
//! Every record keeps unknown fields in an `extra` map so nothing a newer or
//! older build wrote is dropped on the next save.

mod log;
mod slot;

pub use log::DailyLog;
pub use slot::{Day, Slot, SlotKey, SlotType};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Latest schema version this build knows how to produce.
pub const CURRENT_SCHEMA_VERSION: u32 = 1;

/// Application build tag written into every saved document.
pub const APP_VERSION: u64 = 2;

/// Category given to notes that were saved without one.
pub const DEFAULT_NOTE_CATEGORY: &str = "📚";

/// Generate a fresh record id.
pub fn generate_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Build tag of the application that produced a document.
///
/// Older builds wrote a bare number, some wrote a string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AppVersion {
    Number(u64),
    Text(String),
}

impl AppVersion {
    pub fn current() -> Self {
        AppVersion::Number(APP_VERSION)
    }
}

impl Default for AppVersion {
    fn default() -> Self {
        Self::current()
    }
}

/// Level, points and streak bookkeeping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Gamification {
    pub level: u32,
    pub wisdom: u64,
    /// Consecutive days with a journal entry.
    pub streak: u32,
    /// Date (YYYY-MM-DD) of the last journal entry.
    pub last_entry: Option<String>,
}

impl Default for Gamification {
    fn default() -> Self {
        Self {
            level: 1,
            wisdom: 0,
            streak: 0,
            last_entry: None,
        }
    }
}

/// User preferences stored alongside the data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    pub sound: bool,
    pub theme: String,
    pub notifications: bool,
    pub quiet_hours: bool,
    /// Length of one timetable slot in minutes.
    pub slot_duration: u32,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            sound: true,
            theme: "dark".into(),
            notifications: false,
            quiet_hours: true,
            slot_duration: 60,
            extra: Map::new(),
        }
    }
}

/// Last persisted safe-mode evaluation.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SafeModeSnapshot {
    pub active: bool,
    pub score: f64,
    pub dismissed_at: Option<DateTime<Utc>>,
    pub reasons: Vec<String>,
}

/// Free-form note.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Note {
    #[serde(default)]
    pub id: String,
    #[serde(default = "default_note_category")]
    pub category: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Note {
    pub fn new(category: impl Into<String>, text: impl Into<String>) -> Self {
        let mut extra = Map::new();
        extra.insert("text".into(), Value::String(text.into()));
        extra.insert("createdAt".into(), Value::String(Utc::now().to_rfc3339()));
        Self {
            id: generate_id(),
            category: category.into(),
            extra,
        }
    }
}

fn default_note_category() -> String {
    DEFAULT_NOTE_CATEGORY.into()
}

/// Auxiliary record (focus session, goal) that only needs a stable id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    #[serde(default)]
    pub id: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Root state document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AppState {
    pub schema_version: u32,
    pub created_at: DateTime<Utc>,
    pub last_modified: DateTime<Utc>,
    pub app_version: AppVersion,
    /// Slots keyed by [`SlotKey`] rendering (`"Mon-9"`).
    pub timetable: BTreeMap<String, Slot>,
    /// Journal entries, oldest first.
    pub logs: Vec<DailyLog>,
    pub gamification: Gamification,
    pub focus_sessions: Vec<Record>,
    pub goals: Vec<Record>,
    pub notes: Vec<Note>,
    pub templates: Map<String, Value>,
    pub settings: Settings,
    pub safe_mode: SafeModeSnapshot,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl AppState {
    /// Fresh state for a new device, stamped with `now`.
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            schema_version: CURRENT_SCHEMA_VERSION,
            created_at: now,
            last_modified: now,
            app_version: AppVersion::current(),
            timetable: BTreeMap::new(),
            logs: Vec::new(),
            gamification: Gamification::default(),
            focus_sessions: Vec::new(),
            goals: Vec::new(),
            notes: Vec::new(),
            templates: Map::new(),
            settings: Settings::default(),
            safe_mode: SafeModeSnapshot::default(),
            extra: Map::new(),
        }
    }

    /// Slot at the given key, if any.
    pub fn slot(&self, key: &SlotKey) -> Option<&Slot> {
        self.timetable.get(&key.to_string())
    }

    /// Parse a JSON document into the typed model.
    pub fn from_value(value: Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(value)
    }

    /// Render the state as a JSON document.
    pub fn to_value(&self) -> Result<Value, serde_json::Error> {
        serde_json::to_value(self)
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new(Utc::now())
    }
}
