//! The state repository: sole owner of the [`AppState`] document.
//!
//! Loads the document from a [`StorageBackend`], migrates and validates it,
//! and persists after every mutation. Subscribers are notified synchronously
//! once the write has been attempted, so a listener always sees the state
//! that was just written (or that failed to be written).
//!
//! Mutations go through [`Command`]. [`StateRepository::get`],
//! [`StateRepository::set`] and [`StateRepository::update`] address the
//! document by dotted path for callers that only speak JSON; every such write
//! is re-validated against the typed model before it is accepted.

use chrono::{DateTime, NaiveDate, Utc};
use serde_json::{Map, Value};
use std::fmt;

use super::backend::StorageBackend;
use super::config::{Config, PlanningConfig, StorageConfig};
use super::migrations::{self, LEGACY_VERSION_FIELD};
use crate::error::{RepositoryError, StorageError, ValidationError};
use crate::state::{generate_id, AppState, DailyLog, Gamification, Note, Slot, SlotKey, SlotType};

/// What changed, as reported to subscribers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Change {
    /// A single dotted path (`"settings.sound"`, `"timetable.Mon-9"`).
    Path(String),
    /// Any number of top-level fields.
    All,
}

impl fmt::Display for Change {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Change::Path(path) => f.write_str(path),
            Change::All => f.write_str("*"),
        }
    }
}

/// Where the state came from at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadSource {
    /// Parsed from the primary key.
    Primary,
    /// Parsed from the pre-versioned legacy key.
    Legacy,
    /// Nothing stored yet; fresh defaults.
    Default,
    /// Stored bytes were unusable and defaults were used instead. The bytes
    /// are copied to `backup_key`; `None` means the copy has not been written
    /// yet, and the stored document is left alone until it is.
    Recovered { backup_key: Option<String> },
}

/// Handle returned by [`StateRepository::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// A typed preference change.
#[derive(Debug, Clone, PartialEq)]
pub enum SettingChange {
    Sound(bool),
    Theme(String),
    Notifications(bool),
    QuietHours(bool),
    SlotDuration(u32),
}

impl SettingChange {
    fn field(&self) -> &'static str {
        match self {
            SettingChange::Sound(_) => "sound",
            SettingChange::Theme(_) => "theme",
            SettingChange::Notifications(_) => "notifications",
            SettingChange::QuietHours(_) => "quietHours",
            SettingChange::SlotDuration(_) => "slotDuration",
        }
    }
}

/// Typed mutations accepted by [`StateRepository::apply`].
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Put a new slot at `key`, replacing whatever was there.
    PlaceSlot { key: SlotKey, slot_type: SlotType },
    /// Remove the slot at `key`.
    ClearSlot { key: SlotKey },
    /// Append a journal entry and advance the streak.
    AppendLog(DailyLog),
    AddNote(Note),
    ChangeSetting(SettingChange),
    /// Store the latest safe-mode evaluation, keeping the dismissal time.
    RecordSafeMode {
        active: bool,
        score: f64,
        reasons: Vec<String>,
    },
    DismissSafeMode,
}

type Listener = Box<dyn FnMut(&Change, &AppState)>;

/// Loads, owns and persists the application state.
pub struct StateRepository<B: StorageBackend> {
    backend: B,
    storage: StorageConfig,
    planning: PlanningConfig,
    state: AppState,
    source: LoadSource,
    startup_error: Option<StorageError>,
    pending_backup: Option<Vec<u8>>,
    listeners: Vec<(SubscriptionId, Listener)>,
    next_subscription: u64,
}

/// Raw bytes and their parsed form, kept together so a document that fails
/// later stages can still be backed up verbatim.
struct Loaded {
    raw: Vec<u8>,
    doc: Value,
    source: LoadSource,
}

impl<B: StorageBackend> StateRepository<B> {
    /// Load state from `backend`, migrate it and persist the result.
    ///
    /// Never fails: unreadable documents are backed up and replaced by
    /// defaults, and a failed initial write is kept for
    /// [`startup_error`](Self::startup_error).
    pub fn initialize(backend: B, config: &Config) -> Self {
        let mut repo = Self {
            backend,
            storage: config.storage.clone(),
            planning: config.planning,
            state: AppState::default(),
            source: LoadSource::Default,
            startup_error: None,
            pending_backup: None,
            listeners: Vec::new(),
            next_subscription: 0,
        };

        let now = Utc::now();
        match repo.load_document() {
            Ok(Some(loaded)) => match Self::migrate_and_validate(loaded.doc, now) {
                Ok(state) => {
                    repo.state = state;
                    repo.source = loaded.source;
                }
                Err(message) => {
                    tracing::warn!(error = %message, "stored state failed validation");
                    repo.recover(loaded.raw, now);
                }
            },
            Ok(None) => {
                repo.state = AppState::new(now);
                repo.source = LoadSource::Default;
            }
            Err(raw) => repo.recover(raw, now),
        }

        tracing::info!(source = ?repo.source, schema = repo.state.schema_version, "state loaded");

        if let Err(e) = repo.save() {
            repo.startup_error = Some(e);
        }
        repo
    }

    /// Read the primary key, then the legacy key.
    ///
    /// `Err` carries stored bytes that are not JSON.
    fn load_document(&self) -> Result<Option<Loaded>, Vec<u8>> {
        if let Some(raw) = self.read(&self.storage.key) {
            return match serde_json::from_slice::<Value>(&raw) {
                Ok(doc) => Ok(Some(Loaded {
                    raw,
                    doc,
                    source: LoadSource::Primary,
                })),
                Err(e) => {
                    tracing::warn!(error = %e, "stored state is not valid JSON");
                    Err(raw)
                }
            };
        }

        if let Some(raw) = self.read(&self.storage.legacy_key) {
            return match serde_json::from_slice::<Value>(&raw) {
                Ok(mut doc) => {
                    if let Some(obj) = doc.as_object_mut() {
                        obj.insert(LEGACY_VERSION_FIELD.into(), Value::from(1));
                    }
                    tracing::info!("loading state from legacy key");
                    Ok(Some(Loaded {
                        raw,
                        doc,
                        source: LoadSource::Legacy,
                    }))
                }
                Err(e) => {
                    tracing::warn!(error = %e, "legacy state is not valid JSON");
                    Err(raw)
                }
            };
        }

        Ok(None)
    }

    fn read(&self, key: &str) -> Option<Vec<u8>> {
        match self.backend.get(key) {
            Ok(raw) => raw,
            Err(e) => {
                tracing::error!(key, error = %e, "failed to read stored state");
                None
            }
        }
    }

    fn migrate_and_validate(mut doc: Value, now: DateTime<Utc>) -> Result<AppState, String> {
        migrations::migrate(&mut doc, now).map_err(|e| e.to_string())?;
        AppState::from_value(doc).map_err(|e| e.to_string())
    }

    /// Fall back to defaults, holding `raw` until a backup of it is written.
    fn recover(&mut self, raw: Vec<u8>, now: DateTime<Utc>) {
        self.state = AppState::new(now);
        self.source = LoadSource::Recovered { backup_key: None };
        self.pending_backup = Some(raw);
    }

    /// Write the held copy of an unreadable document, if there is one.
    ///
    /// On failure the copy stays held and the next save tries again.
    fn flush_backup(&mut self) -> Result<(), StorageError> {
        let Some(raw) = self.pending_backup.take() else {
            return Ok(());
        };
        match self.write_backup(&raw) {
            Ok(key) => {
                tracing::warn!(backup_key = %key, bytes = raw.len(), "backed up unreadable state");
                if let LoadSource::Recovered { backup_key } = &mut self.source {
                    *backup_key = Some(key);
                }
                Ok(())
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to back up unreadable state");
                self.pending_backup = Some(raw);
                Err(e)
            }
        }
    }

    fn write_backup(&mut self, raw: &[u8]) -> Result<String, StorageError> {
        let key = self.backup_key_for(Utc::now().timestamp_millis())?;
        self.backend.set(&key, raw)?;
        Ok(key)
    }

    /// First free backup key for `millis`: `<prefix><millis>`, then
    /// `<prefix><millis>_1`, `_2`, ...
    fn backup_key_for(&self, millis: i64) -> Result<String, StorageError> {
        let base = format!("{}{}", self.storage.backup_prefix(), millis);
        let mut key = base.clone();
        let mut seq = 0u32;
        while self.backend.get(&key)?.is_some() {
            seq += 1;
            key = format!("{base}_{seq}");
        }
        Ok(key)
    }

    /// Current state.
    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// How the state was obtained at startup.
    pub fn load_source(&self) -> &LoadSource {
        &self.source
    }

    /// Error from the write performed during [`initialize`](Self::initialize).
    pub fn startup_error(&self) -> Option<&StorageError> {
        self.startup_error.as_ref()
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    pub fn into_backend(self) -> B {
        self.backend
    }

    /// Keys of backups created from unreadable documents, oldest first.
    pub fn backups(&self) -> Result<Vec<String>, StorageError> {
        let prefix = self.storage.backup_prefix();
        let mut keys: Vec<String> = self
            .backend
            .keys()?
            .into_iter()
            .filter(|k| k.starts_with(&prefix))
            .collect();
        keys.sort_by_key(|k| backup_order(&k[prefix.len()..]));
        Ok(keys)
    }

    /// Whether an unreadable document is still waiting to be backed up.
    /// While it is, saves do not touch the stored document.
    pub fn backup_pending(&self) -> bool {
        self.pending_backup.is_some()
    }

    /// Stamp `lastModified` and write the whole document.
    ///
    /// On failure the in-memory state is still current; the caller decides
    /// how to surface the warning.
    pub fn save(&mut self) -> Result<(), StorageError> {
        if let Err(e) = self.flush_backup() {
            tracing::warn!(error = %e, "not saving state before the unreadable copy is backed up");
            return Err(e);
        }
        self.state.last_modified = Utc::now();
        let result = serde_json::to_vec(&self.state)
            .map_err(StorageError::from)
            .and_then(|bytes| self.backend.set(&self.storage.key, &bytes));
        match &result {
            Ok(()) => tracing::debug!(key = %self.storage.key, "state saved"),
            Err(e) => tracing::warn!(error = %e, "failed to save state"),
        }
        result
    }

    /// Register a listener. Listeners run in registration order.
    pub fn subscribe<F>(&mut self, listener: F) -> SubscriptionId
    where
        F: FnMut(&Change, &AppState) + 'static,
    {
        let id = SubscriptionId(self.next_subscription);
        self.next_subscription += 1;
        self.listeners.push((id, Box::new(listener)));
        id
    }

    /// Remove a listener. Returns false if it was not registered.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(existing, _)| *existing != id);
        self.listeners.len() != before
    }

    fn notify(&mut self, change: &Change) {
        for (_, listener) in self.listeners.iter_mut() {
            listener(change, &self.state);
        }
    }

    /// Save, then notify; a failed save is returned after listeners ran.
    fn commit(&mut self, change: Change) -> Result<(), RepositoryError> {
        let saved = self.save();
        self.notify(&change);
        saved.map_err(RepositoryError::from)
    }

    /// Apply a typed mutation, persist and notify.
    pub fn apply(&mut self, command: Command) -> Result<(), RepositoryError> {
        let now = Utc::now();
        let path = match command {
            Command::PlaceSlot { key, slot_type } => {
                let key = SlotKey::within(
                    key.day,
                    key.hour,
                    self.planning.hour_min,
                    self.planning.hour_max,
                )?;
                self.state
                    .timetable
                    .insert(key.to_string(), Slot::new(slot_type, now));
                format!("timetable.{key}")
            }
            Command::ClearSlot { key } => {
                self.state.timetable.remove(&key.to_string());
                format!("timetable.{key}")
            }
            Command::AppendLog(log) => {
                if !log.stress.is_finite() || !log.sleep.is_finite() {
                    return Err(ValidationError::InvalidValue {
                        field: "logs".into(),
                        message: "stress and sleep must be finite numbers".into(),
                    }
                    .into());
                }
                advance_streak(&mut self.state.gamification, log.day());
                self.state.logs.push(log);
                "logs".to_string()
            }
            Command::AddNote(mut note) => {
                if note.id.is_empty() {
                    note.id = generate_id();
                }
                self.state.notes.push(note);
                "notes".to_string()
            }
            Command::ChangeSetting(change) => {
                let field = change.field();
                let settings = &mut self.state.settings;
                match change {
                    SettingChange::Sound(v) => settings.sound = v,
                    SettingChange::Theme(v) => settings.theme = v,
                    SettingChange::Notifications(v) => settings.notifications = v,
                    SettingChange::QuietHours(v) => settings.quiet_hours = v,
                    SettingChange::SlotDuration(v) => settings.slot_duration = v,
                }
                format!("settings.{field}")
            }
            Command::RecordSafeMode {
                active,
                score,
                reasons,
            } => {
                let snapshot = &mut self.state.safe_mode;
                snapshot.active = active;
                snapshot.score = score;
                snapshot.reasons = reasons;
                "safeMode".to_string()
            }
            Command::DismissSafeMode => {
                self.state.safe_mode.dismissed_at = Some(now);
                "safeMode.dismissedAt".to_string()
            }
        };
        self.commit(Change::Path(path))
    }

    /// Read a value by dotted path. An empty path returns the whole document;
    /// any missing segment yields `None`. Numeric segments index arrays.
    pub fn get(&self, path: &str) -> Option<Value> {
        let doc = self.state.to_value().ok()?;
        if path.is_empty() {
            return Some(doc);
        }
        let mut current = &doc;
        for segment in path.split('.') {
            current = match current {
                Value::Object(map) => map.get(segment)?,
                Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
                _ => return None,
            };
        }
        Some(current.clone())
    }

    /// Assign `value` at a dotted path, creating missing intermediate
    /// objects, then persist and notify with [`Change::Path`].
    ///
    /// # Errors
    /// Rejects empty paths, paths through scalars, and values that do not fit
    /// the typed model; in those cases nothing changes. A persist failure is
    /// returned after the change has been applied and announced.
    pub fn set(&mut self, path: &str, value: Value) -> Result<(), RepositoryError> {
        let path_error = |message: &str| RepositoryError::Path {
            path: path.to_string(),
            message: message.to_string(),
        };
        if path.is_empty() || path.split('.').any(str::is_empty) {
            return Err(path_error("path has an empty segment"));
        }

        let mut doc = self.state.to_value().map_err(ValidationError::from)?;
        let (parents, leaf) = match path.rsplit_once('.') {
            Some((parents, leaf)) => (Some(parents), leaf),
            None => (None, path),
        };

        let mut target = &mut doc;
        if let Some(parents) = parents {
            for segment in parents.split('.') {
                target = descend_or_create(target, segment)
                    .ok_or_else(|| path_error(&format!("'{segment}' is not a container")))?;
            }
        }
        match target {
            Value::Object(map) => {
                map.insert(leaf.to_string(), value);
            }
            Value::Array(items) => {
                let slot = leaf
                    .parse::<usize>()
                    .ok()
                    .and_then(|i| items.get_mut(i))
                    .ok_or_else(|| path_error(&format!("no element '{leaf}'")))?;
                *slot = value;
            }
            _ => return Err(path_error("parent is not a container")),
        }

        self.replace_document(doc)?;
        self.commit(Change::Path(path.to_string()))
    }

    /// Shallow-merge top-level fields, then persist and notify with
    /// [`Change::All`].
    pub fn update(&mut self, partial: Map<String, Value>) -> Result<(), RepositoryError> {
        let mut doc = self.state.to_value().map_err(ValidationError::from)?;
        if let Some(obj) = doc.as_object_mut() {
            obj.extend(partial);
        }
        self.replace_document(doc)?;
        self.commit(Change::All)
    }

    /// Back-fill record ids, validate an edited document and swap it in.
    fn replace_document(&mut self, mut doc: Value) -> Result<(), ValidationError> {
        if let Some(obj) = doc.as_object_mut() {
            migrations::normalize_records(obj, Utc::now());
        }
        let next = AppState::from_value(doc)?;
        if next.schema_version < self.state.schema_version {
            return Err(ValidationError::InvalidValue {
                field: "schemaVersion".into(),
                message: format!(
                    "cannot lower schema version from {} to {}",
                    self.state.schema_version, next.schema_version
                ),
            });
        }
        self.state = next;
        Ok(())
    }
}

/// Sort key for a backup suffix `<millis>` or `<millis>_<seq>`.
fn backup_order(suffix: &str) -> (i64, u32) {
    let (millis, seq) = suffix.split_once('_').unwrap_or((suffix, "0"));
    (millis.parse().unwrap_or(i64::MAX), seq.parse().unwrap_or(0))
}

/// Step into `segment`, creating an empty object when it is absent or null.
fn descend_or_create<'a>(value: &'a mut Value, segment: &str) -> Option<&'a mut Value> {
    match value {
        Value::Object(map) => {
            let child = map
                .entry(segment.to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            if child.is_null() {
                *child = Value::Object(Map::new());
            }
            (child.is_object() || child.is_array()).then_some(child)
        }
        Value::Array(items) => segment
            .parse::<usize>()
            .ok()
            .and_then(move |i| items.get_mut(i)),
        _ => None,
    }
}

/// Consecutive-day bookkeeping for a new journal entry on `day`.
fn advance_streak(gamification: &mut Gamification, day: Option<NaiveDate>) {
    let Some(day) = day else {
        return;
    };
    let last = gamification
        .last_entry
        .as_deref()
        .and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok());
    match last {
        // Same day, or a back-filled older entry.
        Some(last) if day <= last => return,
        Some(last) if last.succ_opt() == Some(day) => gamification.streak += 1,
        _ => gamification.streak = 1,
    }
    gamification.last_entry = Some(day.format("%Y-%m-%d").to_string());
}
