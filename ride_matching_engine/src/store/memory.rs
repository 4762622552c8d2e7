use std::{collections::HashMap, sync::Arc};

use chrono::{DateTime, Utc};
use log::*;
use tokio::sync::RwLock;

use super::{decode, ChangeSet, StatusStore, StatusStoreError};
use crate::status_types::{StatusKind, StatusRecord, Version};

#[derive(Debug, Clone)]
struct StoredRecord {
    version: Version,
    is_open: bool,
    expires_at: Option<DateTime<Utc>>,
    body: serde_json::Value,
}

type RecordMap = HashMap<(StatusKind, String), StoredRecord>;

/// A status store that lives in memory. Clones share the same records.
///
/// Records are held as JSON, exactly as the SQLite store keeps them, so both backends behave the same way.
#[derive(Debug, Clone, Default)]
pub struct MemoryStatusStore {
    records: Arc<RwLock<RecordMap>>,
}

impl MemoryStatusStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    async fn fetch_where<R, F>(&self, predicate: F) -> Result<Vec<R>, StatusStoreError>
    where
        R: StatusRecord,
        F: Fn(&StoredRecord) -> bool,
    {
        let records = self.records.read().await;
        records
            .iter()
            .filter(|((kind, _), record)| *kind == R::KIND && predicate(record))
            .map(|(_, record)| decode::<R>(record.body.clone()))
            .collect()
    }
}

impl StatusStore for MemoryStatusStore {
    fn url(&self) -> &str {
        "memory://"
    }

    async fn fetch<R: StatusRecord>(&self, id: &R::Id) -> Result<Option<R>, StatusStoreError> {
        let records = self.records.read().await;
        records.get(&(R::KIND, id.to_string())).map(|r| decode::<R>(r.body.clone())).transpose()
    }

    async fn fetch_open<R: StatusRecord>(&self) -> Result<Vec<R>, StatusStoreError> {
        self.fetch_where(|r| r.is_open).await
    }

    async fn fetch_due<R: StatusRecord>(&self, now: DateTime<Utc>) -> Result<Vec<R>, StatusStoreError> {
        self.fetch_where(|r| r.is_open && r.expires_at.is_some_and(|t| t <= now)).await
    }

    async fn commit(&self, changes: ChangeSet) -> Result<(), StatusStoreError> {
        let mut records = self.records.write().await;
        // Check everything before touching anything
        for change in changes.changes() {
            let found = records.get(&(change.kind, change.id.clone())).map(|r| r.version);
            if found != change.expected_version {
                debug!("🗃️ Rejecting change set. {} {} is at {found:?}", change.kind, change.id);
                return Err(change.conflict(found));
            }
        }
        let count = changes.len();
        for change in changes.into_changes() {
            let record = StoredRecord {
                version: change.version,
                is_open: change.is_open,
                expires_at: change.expires_at,
                body: change.body,
            };
            records.insert((change.kind, change.id), record);
        }
        trace!("🗃️ Committed {count} record changes");
        Ok(())
    }

    async fn close(&mut self) -> Result<(), StatusStoreError> {
        Ok(())
    }
}
