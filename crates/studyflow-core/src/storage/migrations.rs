//! Schema migrations for the persisted state document.
//!
//! Migrations are versioned and run on the raw JSON document before it is
//! parsed into [`AppState`]. `schemaVersion` tracks the last applied step;
//! a missing field means version 0 (documents written before versioning).
//!
//! Every step only fills what is absent, so running the whole chain again on
//! an up-to-date document changes nothing. Defaults and record back-fill run
//! on every call, whatever the stored version.

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

use crate::error::MigrationError;
use crate::state::{
    generate_id, AppState, SlotKey, APP_VERSION, CURRENT_SCHEMA_VERSION, DEFAULT_NOTE_CATEGORY,
};

/// Field written by pre-versioned builds; dropped by the v1 step.
pub const LEGACY_VERSION_FIELD: &str = "version";

type Step = fn(&mut Map<String, Value>, DateTime<Utc>);

/// Migration steps keyed by the version they produce, in order.
const STEPS: &[(u32, Step)] = &[(1, migrate_v1)];

/// What a call to [`migrate`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MigrationOutcome {
    /// Version found in the document.
    pub from: u32,
    /// Version the document carries now.
    pub to: u32,
}

impl MigrationOutcome {
    pub fn changed_version(&self) -> bool {
        self.from != self.to
    }
}

/// Read `schemaVersion`, treating absent or malformed values as 0.
pub fn schema_version(doc: &Value) -> u32 {
    doc.get("schemaVersion")
        .and_then(Value::as_u64)
        .and_then(|v| u32::try_from(v).ok())
        .unwrap_or(0)
}

/// Apply all pending migrations to bring `doc` to [`CURRENT_SCHEMA_VERSION`].
///
/// Documents written by a newer build are left untouched: the version never
/// goes down.
///
/// # Errors
/// Returns an error if the document is not a JSON object.
pub fn migrate(doc: &mut Value, now: DateTime<Utc>) -> Result<MigrationOutcome, MigrationError> {
    let from = schema_version(doc);
    let found = json_kind(doc);
    let Some(obj) = doc.as_object_mut() else {
        return Err(MigrationError::NotAnObject { found });
    };

    if from > CURRENT_SCHEMA_VERSION {
        tracing::warn!(
            from,
            current = CURRENT_SCHEMA_VERSION,
            "state written by a newer build; leaving schema as is"
        );
        return Ok(MigrationOutcome { from, to: from });
    }

    for (target, step) in STEPS {
        if from < *target {
            tracing::info!(from = *target - 1, to = *target, "migrating state schema");
            step(obj, now);
        }
    }

    fill_defaults(obj, now);
    drop_non_records(obj);
    normalize_records(obj, now);
    obj.insert("schemaVersion".into(), Value::from(CURRENT_SCHEMA_VERSION));
    obj.insert("appVersion".into(), Value::from(APP_VERSION));

    Ok(MigrationOutcome {
        from,
        to: CURRENT_SCHEMA_VERSION,
    })
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Migration v1: first versioned schema. Removes the obsolete `version`
/// field; record back-fill is done by [`normalize_records`] on every load.
fn migrate_v1(obj: &mut Map<String, Value>, _now: DateTime<Utc>) {
    obj.remove(LEGACY_VERSION_FIELD);
}

/// Bring the record collections into the shape the typed model expects.
///
/// - timetable keys are rewritten to their canonical `Mon-9` form; when two
///   keys name the same cell, the one already canonical wins
/// - back-fills `id` and `createdAt` on timetable slots
/// - back-fills `id` and `category` on notes, `id` on focus sessions and goals
///
/// Only absent or empty values are filled, so this is safe to run on every
/// write as well as on load. Entries that are not objects are left for the
/// typed model to reject.
pub fn normalize_records(obj: &mut Map<String, Value>, now: DateTime<Utc>) {
    if let Some(Value::Object(timetable)) = obj.get_mut("timetable") {
        canonicalize_slot_keys(timetable);
        for slot in timetable.values_mut() {
            if let Value::Object(slot) = slot {
                ensure_id(slot);
                if !matches!(slot.get("createdAt"), Some(Value::String(_))) {
                    slot.insert("createdAt".into(), Value::String(now.to_rfc3339()));
                }
            }
        }
    }

    if let Some(Value::Array(notes)) = obj.get_mut("notes") {
        for note in notes.iter_mut() {
            if let Value::Object(note) = note {
                ensure_id(note);
                if !is_non_empty_string(note.get("category")) {
                    note.insert(
                        "category".into(),
                        Value::String(DEFAULT_NOTE_CATEGORY.into()),
                    );
                }
            }
        }
    }

    for field in ["focusSessions", "goals"] {
        if let Some(Value::Array(records)) = obj.get_mut(field) {
            for record in records.iter_mut() {
                if let Value::Object(record) = record {
                    ensure_id(record);
                }
            }
        }
    }
}

/// Drop stored entries that cannot be records.
fn drop_non_records(obj: &mut Map<String, Value>) {
    if let Some(Value::Object(timetable)) = obj.get_mut("timetable") {
        timetable.retain(|key, slot| {
            let keep = slot.is_object();
            if !keep {
                tracing::warn!(slot_key = %key, "dropping timetable entry that is not an object");
            }
            keep
        });
    }
    for field in ["notes", "focusSessions", "goals"] {
        if let Some(Value::Array(records)) = obj.get_mut(field) {
            retain_objects(records, field);
        }
    }
}

/// Re-key slots stored under legacy spellings (`Lun-8`, `Jeu_14`, `Mon-09`).
/// Keys that do not parse are left alone.
fn canonicalize_slot_keys(timetable: &mut Map<String, Value>) {
    let renames: Vec<(String, String)> = timetable
        .keys()
        .filter_map(|key| {
            let canonical = key.parse::<SlotKey>().ok()?.to_string();
            (canonical != *key).then(|| (key.clone(), canonical))
        })
        .collect();

    for (old, canonical) in renames {
        let Some(slot) = timetable.remove(&old) else {
            continue;
        };
        if timetable.contains_key(&canonical) {
            tracing::warn!(
                slot_key = %old,
                canonical = %canonical,
                "dropping legacy slot that collides with an existing cell"
            );
            continue;
        }
        timetable.insert(canonical, slot);
    }
}

/// Insert every default field that is absent, and replace top-level fields
/// whose JSON kind does not match the default's.
fn fill_defaults(obj: &mut Map<String, Value>, now: DateTime<Utc>) {
    let Ok(Value::Object(defaults)) = AppState::new(now).to_value() else {
        return;
    };

    for (key, default) in defaults {
        let nested = matches!(key.as_str(), "settings" | "gamification" | "safeMode");
        let existing = obj.entry(key.clone()).or_insert(Value::Null);
        if existing.is_null() {
            *existing = default;
            continue;
        }
        if !same_kind(existing, &default) {
            tracing::warn!(field = %key, "replacing mis-shaped field with its default");
            *existing = default;
            continue;
        }
        // Nested records get their missing keys filled; present nulls
        // (e.g. `safeMode.dismissedAt`) are legitimate values.
        if let (true, Value::Object(existing), Value::Object(default)) = (nested, existing, default) {
            for (inner_key, inner_default) in default {
                existing.entry(inner_key).or_insert(inner_default);
            }
        }
    }
}

fn same_kind(a: &Value, b: &Value) -> bool {
    json_kind(a) == json_kind(b)
}

fn ensure_id(record: &mut Map<String, Value>) {
    if !is_non_empty_string(record.get("id")) {
        record.insert("id".into(), Value::String(generate_id()));
    }
}

fn is_non_empty_string(value: Option<&Value>) -> bool {
    matches!(value, Some(Value::String(s)) if !s.is_empty())
}

fn retain_objects(records: &mut Vec<Value>, field: &str) {
    let before = records.len();
    records.retain(Value::is_object);
    if records.len() != before {
        tracing::warn!(
            field,
            dropped = before - records.len(),
            "dropping entries that are not objects"
        );
    }
}
