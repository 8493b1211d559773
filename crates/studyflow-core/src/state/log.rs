//! Daily journal entries.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One journal entry: how stressed the user felt and how long they slept.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyLog {
    /// Entry date as written by the client, normally `YYYY-MM-DD`.
    #[serde(default)]
    pub date: String,
    /// Stress rating on a 1-10 scale.
    pub stress: f64,
    /// Hours slept the night before.
    pub sleep: f64,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl DailyLog {
    pub fn new(date: NaiveDate, stress: f64, sleep: f64) -> Self {
        Self {
            date: date.format("%Y-%m-%d").to_string(),
            stress,
            sleep,
            extra: Map::new(),
        }
    }

    /// Parsed entry date, if it is a plain calendar date.
    pub fn day(&self) -> Option<NaiveDate> {
        NaiveDate::parse_from_str(self.date.get(..10)?, "%Y-%m-%d").ok()
    }
}
