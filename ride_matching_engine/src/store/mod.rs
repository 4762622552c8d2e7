//! The status store: durable, versioned storage of every status record.
//!
//! The store knows nothing about rides. It keeps one JSON body per `(kind, id)` pair along with the record's version,
//! whether it is still open, and when it is due to expire. All writes go through [`StatusStore::commit`], which applies
//! a [`ChangeSet`] atomically and refuses the whole set if any record's stored version is not the one the change was
//! computed from.
mod memory;
#[cfg(feature = "sqlite")]
pub mod sqlite;

use chrono::{DateTime, Utc};
pub use memory::MemoryStatusStore;
use thiserror::Error;

use crate::status_types::{StatusKind, StatusRecord, Version, INITIAL_VERSION};

#[derive(Debug, Error)]
pub enum StatusStoreError {
    #[cfg(feature = "sqlite")]
    #[error("Database driver error: {0}")]
    DriverError(#[from] sqlx::Error),
    #[error("Could not run database migrations: {0}")]
    MigrationError(String),
    #[error("Could not encode or decode a {kind} record: {message}")]
    SerializationError { kind: StatusKind, message: String },
    #[error("{kind} {id} was expected at version {expected:?}, but the store has {found:?}")]
    VersionConflict { kind: StatusKind, id: String, expected: Option<Version>, found: Option<Version> },
}

impl StatusStoreError {
    fn serialization<E: std::fmt::Display>(kind: StatusKind, e: E) -> Self {
        Self::SerializationError { kind, message: e.to_string() }
    }
}

/// One record write, ready to be applied.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordChange {
    pub kind: StatusKind,
    pub id: String,
    /// The version the store must currently hold. `None` means the record must not exist yet.
    pub expected_version: Option<Version>,
    pub version: Version,
    pub is_open: bool,
    pub expires_at: Option<DateTime<Utc>>,
    pub body: serde_json::Value,
}

impl RecordChange {
    fn from_record<R: StatusRecord>(record: &R, expected_version: Option<Version>) -> Result<Self, StatusStoreError> {
        let body = serde_json::to_value(record).map_err(|e| StatusStoreError::serialization(R::KIND, e))?;
        Ok(Self {
            kind: R::KIND,
            id: record.key(),
            expected_version,
            version: record.version(),
            is_open: record.is_open(),
            expires_at: record.expires_at(),
            body,
        })
    }

    fn conflict(&self, found: Option<Version>) -> StatusStoreError {
        StatusStoreError::VersionConflict {
            kind: self.kind,
            id: self.id.clone(),
            expected: self.expected_version,
            found,
        }
    }
}

/// A set of record writes that must land together or not at all.
#[derive(Debug, Clone, Default)]
pub struct ChangeSet {
    changes: Vec<RecordChange>,
}

impl ChangeSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a brand-new record. It must be at the initial version.
    pub fn insert<R: StatusRecord>(&mut self, record: &R) -> Result<&mut Self, StatusStoreError> {
        if record.version() != INITIAL_VERSION {
            return Err(StatusStoreError::VersionConflict {
                kind: R::KIND,
                id: record.key(),
                expected: Some(INITIAL_VERSION),
                found: Some(record.version()),
            });
        }
        self.changes.push(RecordChange::from_record(record, None)?);
        Ok(self)
    }

    /// Adds an update to an existing record. `record` must already carry its new version; the store is expected to
    /// hold the version just before it.
    pub fn update<R: StatusRecord>(&mut self, record: &R) -> Result<&mut Self, StatusStoreError> {
        let expected = record.version() - 1;
        self.changes.push(RecordChange::from_record(record, Some(expected))?);
        Ok(self)
    }

    pub fn changes(&self) -> &[RecordChange] {
        &self.changes
    }

    pub fn into_changes(self) -> Vec<RecordChange> {
        self.changes
    }

    pub fn len(&self) -> usize {
        self.changes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }
}

pub(crate) fn decode<R: StatusRecord>(body: serde_json::Value) -> Result<R, StatusStoreError> {
    serde_json::from_value(body).map_err(|e| StatusStoreError::serialization(R::KIND, e))
}

/// Read/write contract for a status store backend.
///
/// Reads return whatever was last committed. Writes only ever happen through [`Self::commit`].
#[allow(async_fn_in_trait)]
pub trait StatusStore: Clone {
    /// The URL (or a description) of the backing store.
    fn url(&self) -> &str;

    async fn fetch<R: StatusRecord>(&self, id: &R::Id) -> Result<Option<R>, StatusStoreError>;

    /// Every record of kind `R` that is still open.
    async fn fetch_open<R: StatusRecord>(&self) -> Result<Vec<R>, StatusStoreError>;

    /// Every open record of kind `R` whose expiry deadline is at or before `now`.
    async fn fetch_due<R: StatusRecord>(&self, now: DateTime<Utc>) -> Result<Vec<R>, StatusStoreError>;

    /// Applies every change in `changes` atomically. If any change's expected version does not match what is stored,
    /// nothing is written and [`StatusStoreError::VersionConflict`] is returned.
    async fn commit(&self, changes: ChangeSet) -> Result<(), StatusStoreError>;

    async fn close(&mut self) -> Result<(), StatusStoreError>;
}
