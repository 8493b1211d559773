//! Timetable slots and their keys.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

use super::generate_id;
use crate::error::ValidationError;

/// Kind of activity occupying a slot.
///
/// Names written by the French-language builds (`cours`, `repos`, ...) are
/// read back as the matching variant. Anything else is kept verbatim in
/// [`SlotType::Other`] so it survives the next save.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum SlotType {
    Class,
    Revision,
    Rest,
    Sport,
    Social,
    Admin,
    Meal,
    Other(String),
}

impl SlotType {
    pub const ALL: [SlotType; 7] = [
        SlotType::Class,
        SlotType::Revision,
        SlotType::Rest,
        SlotType::Sport,
        SlotType::Social,
        SlotType::Admin,
        SlotType::Meal,
    ];

    pub fn as_str(&self) -> &str {
        match self {
            SlotType::Class => "class",
            SlotType::Revision => "revision",
            SlotType::Rest => "rest",
            SlotType::Sport => "sport",
            SlotType::Social => "social",
            SlotType::Admin => "admin",
            SlotType::Meal => "meal",
            SlotType::Other(name) => name,
        }
    }

    pub fn is_rest(&self) -> bool {
        matches!(self, SlotType::Rest)
    }
}

impl Default for SlotType {
    fn default() -> Self {
        SlotType::Other(String::new())
    }
}

impl From<String> for SlotType {
    fn from(name: String) -> Self {
        match name.as_str() {
            "class" | "cours" => SlotType::Class,
            "revision" | "revisions" => SlotType::Revision,
            "rest" | "repos" => SlotType::Rest,
            "sport" => SlotType::Sport,
            "social" => SlotType::Social,
            "admin" => SlotType::Admin,
            "meal" | "repas" => SlotType::Meal,
            _ => SlotType::Other(name),
        }
    }
}

impl From<SlotType> for String {
    fn from(slot_type: SlotType) -> Self {
        match slot_type {
            SlotType::Other(name) => name,
            known => known.as_str().to_string(),
        }
    }
}

impl FromStr for SlotType {
    type Err = ValidationError;

    /// Strict parse for user input: only known types are accepted.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match SlotType::from(s.to_ascii_lowercase()) {
            SlotType::Other(_) => Err(ValidationError::InvalidValue {
                field: "type".into(),
                message: format!(
                    "unknown slot type '{s}' (expected one of: {})",
                    SlotType::ALL
                        .iter()
                        .map(SlotType::as_str)
                        .collect::<Vec<_>>()
                        .join(", ")
                ),
            }),
            known => Ok(known),
        }
    }
}

impl fmt::Display for SlotType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A scheduled entry in the weekly timetable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Slot {
    #[serde(default)]
    pub id: String,
    #[serde(rename = "type", default)]
    pub slot_type: SlotType,
    pub created_at: DateTime<Utc>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Slot {
    pub fn new(slot_type: SlotType, now: DateTime<Utc>) -> Self {
        Self {
            id: generate_id(),
            slot_type,
            created_at: now,
            extra: Map::new(),
        }
    }
}

/// Day of the week, Monday first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Day {
    Mon,
    Tue,
    Wed,
    Thu,
    Fri,
    Sat,
    Sun,
}

impl Day {
    pub const ALL: [Day; 7] = [
        Day::Mon,
        Day::Tue,
        Day::Wed,
        Day::Thu,
        Day::Fri,
        Day::Sat,
        Day::Sun,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Day::Mon => "Mon",
            Day::Tue => "Tue",
            Day::Wed => "Wed",
            Day::Thu => "Thu",
            Day::Fri => "Fri",
            Day::Sat => "Sat",
            Day::Sun => "Sun",
        }
    }

    pub fn from_weekday(weekday: chrono::Weekday) -> Self {
        Day::ALL[weekday.num_days_from_monday() as usize]
    }
}

impl FromStr for Day {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let day = match s.to_ascii_lowercase().as_str() {
            "mon" | "monday" | "lun" => Day::Mon,
            "tue" | "tuesday" | "mar" => Day::Tue,
            "wed" | "wednesday" | "mer" => Day::Wed,
            "thu" | "thursday" | "jeu" => Day::Thu,
            "fri" | "friday" | "ven" => Day::Fri,
            "sat" | "saturday" | "sam" => Day::Sat,
            "sun" | "sunday" | "dim" => Day::Sun,
            _ => return Err(ValidationError::InvalidSlotKey(s.to_string())),
        };
        Ok(day)
    }
}

impl fmt::Display for Day {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Composite (day, hour) address of a timetable slot.
///
/// Rendered as `"<Day>-<hour>"`; the separator cannot appear in either part,
/// so distinct pairs never render to the same key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SlotKey {
    pub day: Day,
    pub hour: u8,
}

impl SlotKey {
    pub fn new(day: Day, hour: u8) -> Self {
        Self { day, hour }
    }

    /// Build a key, rejecting hours outside `min..=max`.
    pub fn within(day: Day, hour: u8, min: u8, max: u8) -> Result<Self, ValidationError> {
        if hour < min || hour > max {
            return Err(ValidationError::HourOutOfRange { hour, min, max });
        }
        Ok(Self { day, hour })
    }
}

impl fmt::Display for SlotKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.day, self.hour)
    }
}

impl FromStr for SlotKey {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (day, hour) = s
            .split_once(|c: char| c == '-' || c == '_')
            .ok_or_else(|| ValidationError::InvalidSlotKey(s.to_string()))?;
        let hour: u8 = hour
            .parse()
            .map_err(|_| ValidationError::InvalidSlotKey(s.to_string()))?;
        if hour > 23 {
            return Err(ValidationError::InvalidSlotKey(s.to_string()));
        }
        Ok(Self {
            day: day.parse()?,
            hour,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::HashSet;

    #[test]
    fn legacy_type_names_map_to_variants() {
        let rest: SlotType = serde_json::from_value(json!("repos")).unwrap();
        let meal: SlotType = serde_json::from_value(json!("repas")).unwrap();
        assert_eq!(rest, SlotType::Rest);
        assert_eq!(meal, SlotType::Meal);
        assert_eq!(serde_json::to_value(&rest).unwrap(), json!("rest"));
    }

    #[test]
    fn unknown_type_is_preserved() {
        let t: SlotType = serde_json::from_value(json!("music")).unwrap();
        assert_eq!(t, SlotType::Other("music".into()));
        assert!(!t.is_rest());
        assert_eq!(serde_json::to_value(&t).unwrap(), json!("music"));
    }

    #[test]
    fn strict_parse_rejects_unknown_type() {
        assert_eq!("Rest".parse::<SlotType>().unwrap(), SlotType::Rest);
        assert!("music".parse::<SlotType>().is_err());
    }

    #[test]
    fn slot_keys_are_unique_across_the_week() {
        let mut seen = HashSet::new();
        for day in Day::ALL {
            for hour in 0..24 {
                assert!(seen.insert(SlotKey::new(day, hour).to_string()));
            }
        }
        assert_eq!(seen.len(), 7 * 24);
    }

    #[test]
    fn slot_key_parses_its_own_rendering() {
        let key = SlotKey::new(Day::Thu, 14);
        assert_eq!(key.to_string(), "Thu-14");
        assert_eq!("Thu-14".parse::<SlotKey>().unwrap(), key);
        assert_eq!("Jeu_14".parse::<SlotKey>().unwrap(), key);
        assert!("Thu-25".parse::<SlotKey>().is_err());
        assert!("Thu".parse::<SlotKey>().is_err());
    }

    #[test]
    fn within_enforces_grid() {
        assert!(SlotKey::within(Day::Mon, 5, 6, 22).is_err());
        assert!(SlotKey::within(Day::Mon, 22, 6, 22).is_ok());
    }
}
