//! Core error types for studyflow-core.
//!
//! Nothing in this hierarchy is fatal to the process: corrupted documents are
//! recovered inside the repository, and write failures leave the in-memory
//! state authoritative. These types exist so callers can surface warnings.

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for studyflow-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Storage backend errors
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Schema migration errors
    #[error("Migration error: {0}")]
    Migration(#[from] MigrationError),

    /// Repository mutation errors
    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors raised by a [`StorageBackend`](crate::storage::StorageBackend).
#[derive(Error, Debug)]
pub enum StorageError {
    /// The backend refused the write because it is full.
    #[error("Storage quota exceeded writing '{key}': {needed} bytes needed, {available} available")]
    QuotaExceeded {
        key: String,
        needed: usize,
        available: usize,
    },

    /// Failed to open the backing database
    #[error("Failed to open storage at {path}: {source}")]
    OpenFailed {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    /// SQLite query failed
    #[error("Query failed: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Serializing the state document failed
    #[error("Failed to encode state: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Errors raised while migrating a persisted document.
#[derive(Error, Debug, PartialEq)]
pub enum MigrationError {
    /// The persisted document is valid JSON but not an object.
    #[error("State document must be a JSON object, found {found}")]
    NotAnObject { found: &'static str },
}

/// Errors returned by state repository mutations.
#[derive(Error, Debug)]
pub enum RepositoryError {
    /// The dotted path could not be resolved for writing.
    #[error("Invalid state path '{path}': {message}")]
    Path { path: String, message: String },

    /// The mutation would produce a state that does not validate.
    #[error("Rejected mutation: {0}")]
    Validation(#[from] ValidationError),

    /// The mutation was applied in memory but could not be persisted.
    #[error("State changed but was not saved: {0}")]
    Persist(#[from] StorageError),
}

impl RepositoryError {
    /// Whether the in-memory state reflects the requested change.
    pub fn is_applied(&self) -> bool {
        matches!(self, RepositoryError::Persist(_))
    }
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// Unknown configuration key
    #[error("Unknown configuration key: {0}")]
    UnknownKey(String),

    /// The data directory could not be prepared
    #[error("Data directory unavailable: {0}")]
    DataDir(#[from] std::io::Error),
}

/// Validation errors.
#[derive(Error, Debug)]
pub enum ValidationError {
    /// A slot hour falls outside the planning grid
    #[error("Hour {hour} is outside the planning grid ({min}..={max})")]
    HourOutOfRange { hour: u8, min: u8, max: u8 },

    /// Unparseable slot key or day name
    #[error("Invalid slot key '{0}'")]
    InvalidSlotKey(String),

    /// Invalid value
    #[error("Invalid value for '{field}': {message}")]
    InvalidValue { field: String, message: String },

    /// The document no longer matches the typed state model
    #[error("State does not match schema: {0}")]
    Schema(#[from] serde_json::Error),
}
