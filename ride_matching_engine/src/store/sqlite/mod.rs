mod records;

use std::{env, fmt::Debug};

use chrono::{DateTime, Utc};
use log::*;
use sqlx::{
    migrate::MigrateDatabase,
    sqlite::SqlitePoolOptions,
    Sqlite,
    SqlitePool,
};

use super::{decode, ChangeSet, StatusStore, StatusStoreError};
use crate::status_types::StatusRecord;

const SQLITE_DB_URL: &str = "sqlite://data/ride_status.db";

pub fn db_url() -> String {
    let result = env::var("RIDE_DATABASE_URL").unwrap_or_else(|_| {
        info!("🗃️ RIDE_DATABASE_URL is not set. Using the default.");
        SQLITE_DB_URL.to_string()
    });
    info!("🗃️ Using database URL: {result}");
    result
}

pub async fn new_pool(url: &str, max_connections: u32) -> Result<SqlitePool, StatusStoreError> {
    let pool = SqlitePoolOptions::new().max_connections(max_connections).connect(url).await?;
    Ok(pool)
}

/// Creates the database file if it does not exist yet.
pub async fn create_database_if_not_exist(url: &str) -> Result<(), StatusStoreError> {
    if !Sqlite::database_exists(url).await? {
        info!("🗃️ Creating new database at {url}");
        Sqlite::create_database(url).await?;
    }
    Ok(())
}

#[derive(Clone)]
pub struct SqliteStatusStore {
    url: String,
    pool: SqlitePool,
}

impl Debug for SqliteStatusStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SqliteStatusStore ({})", self.url)
    }
}

impl SqliteStatusStore {
    /// Connects to the database at `RIDE_DATABASE_URL`, creating and migrating it if necessary.
    pub async fn new(max_connections: u32) -> Result<Self, StatusStoreError> {
        let url = db_url();
        Self::new_with_url(&url, max_connections).await
    }

    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, StatusStoreError> {
        create_database_if_not_exist(url).await?;
        let pool = new_pool(url, max_connections).await?;
        let store = Self { url: url.to_string(), pool };
        store.migrate().await?;
        Ok(store)
    }

    /// Runs the embedded migrations. Migrations that have already been applied are skipped.
    pub async fn migrate(&self) -> Result<(), StatusStoreError> {
        sqlx::migrate!("./src/store/sqlite/migrations")
            .run(&self.pool)
            .await
            .map_err(|e| StatusStoreError::MigrationError(e.to_string()))?;
        debug!("🗃️ Migrations complete for {}", self.url);
        Ok(())
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

fn decode_bodies<R: StatusRecord>(bodies: Vec<String>) -> Result<Vec<R>, StatusStoreError> {
    bodies.into_iter().map(|b| decode_body::<R>(&b)).collect()
}

fn decode_body<R: StatusRecord>(body: &str) -> Result<R, StatusStoreError> {
    let value = serde_json::from_str(body)
        .map_err(|e| StatusStoreError::SerializationError { kind: R::KIND, message: e.to_string() })?;
    decode(value)
}

impl StatusStore for SqliteStatusStore {
    fn url(&self) -> &str {
        self.url.as_str()
    }

    async fn fetch<R: StatusRecord>(&self, id: &R::Id) -> Result<Option<R>, StatusStoreError> {
        let mut conn = self.pool.acquire().await?;
        let body = records::fetch_body(R::KIND, &id.to_string(), &mut conn).await?;
        body.map(|b| decode_body::<R>(&b)).transpose()
    }

    async fn fetch_open<R: StatusRecord>(&self) -> Result<Vec<R>, StatusStoreError> {
        let mut conn = self.pool.acquire().await?;
        let bodies = records::fetch_open_bodies(R::KIND, &mut conn).await?;
        decode_bodies(bodies)
    }

    async fn fetch_due<R: StatusRecord>(&self, now: DateTime<Utc>) -> Result<Vec<R>, StatusStoreError> {
        let mut conn = self.pool.acquire().await?;
        let bodies = records::fetch_due_bodies(R::KIND, now, &mut conn).await?;
        decode_bodies(bodies)
    }

    async fn commit(&self, changes: ChangeSet) -> Result<(), StatusStoreError> {
        let mut tx = self.pool.begin().await?;
        for change in changes.changes() {
            // Returning early drops the transaction, which rolls it back
            records::apply_change(change, &mut tx).await?;
        }
        tx.commit().await?;
        trace!("🗃️ Committed {} record changes", changes.len());
        Ok(())
    }

    async fn close(&mut self) -> Result<(), StatusStoreError> {
        self.pool.close().await;
        Ok(())
    }
}
