//! Queries against the `statuses` table. None of these are atomic on their own; run them inside a transaction and
//! pass `&mut tx` as the connection when several must land together.
use chrono::{DateTime, Utc};
use log::*;
use sqlx::SqliteConnection;

use crate::{
    status_types::{StatusKind, Version},
    store::{RecordChange, StatusStoreError},
};

pub async fn fetch_body(
    kind: StatusKind,
    id: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<String>, StatusStoreError> {
    let body = sqlx::query_scalar::<_, String>("SELECT body FROM statuses WHERE kind = $1 AND id = $2")
        .bind(kind.as_str())
        .bind(id)
        .fetch_optional(conn)
        .await?;
    Ok(body)
}

pub async fn fetch_open_bodies(kind: StatusKind, conn: &mut SqliteConnection) -> Result<Vec<String>, StatusStoreError> {
    let bodies = sqlx::query_scalar::<_, String>("SELECT body FROM statuses WHERE kind = $1 AND is_open = 1")
        .bind(kind.as_str())
        .fetch_all(conn)
        .await?;
    Ok(bodies)
}

pub async fn fetch_due_bodies(
    kind: StatusKind,
    now: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<Vec<String>, StatusStoreError> {
    let bodies = sqlx::query_scalar::<_, String>(
        r#"
            SELECT body FROM statuses
            WHERE kind = $1 AND is_open = 1 AND expires_at IS NOT NULL AND expires_at <= $2
        "#,
    )
    .bind(kind.as_str())
    .bind(now.timestamp_millis())
    .fetch_all(conn)
    .await?;
    Ok(bodies)
}

async fn stored_version(
    kind: StatusKind,
    id: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<Version>, StatusStoreError> {
    let version = sqlx::query_scalar::<_, i64>("SELECT version FROM statuses WHERE kind = $1 AND id = $2")
        .bind(kind.as_str())
        .bind(id)
        .fetch_optional(conn)
        .await?;
    Ok(version)
}

/// Writes a single change, checking the stored version first.
pub async fn apply_change(change: &RecordChange, conn: &mut SqliteConnection) -> Result<(), StatusStoreError> {
    let body = change.body.to_string();
    let expires_at = change.expires_at.map(|t| t.timestamp_millis());
    let rows = match change.expected_version {
        None => {
            let found = stored_version(change.kind, &change.id, &mut *conn).await?;
            if found.is_some() {
                return Err(change.conflict(found));
            }
            sqlx::query(
                r#"
                    INSERT INTO statuses (kind, id, version, is_open, expires_at, body)
                    VALUES ($1, $2, $3, $4, $5, $6)
                "#,
            )
            .bind(change.kind.as_str())
            .bind(&change.id)
            .bind(change.version)
            .bind(change.is_open)
            .bind(expires_at)
            .bind(&body)
            .execute(&mut *conn)
            .await?
            .rows_affected()
        },
        Some(expected) => sqlx::query(
            r#"
                UPDATE statuses
                SET version = $1, is_open = $2, expires_at = $3, body = $4, updated_at = CURRENT_TIMESTAMP
                WHERE kind = $5 AND id = $6 AND version = $7
            "#,
        )
        .bind(change.version)
        .bind(change.is_open)
        .bind(expires_at)
        .bind(&body)
        .bind(change.kind.as_str())
        .bind(&change.id)
        .bind(expected)
        .execute(&mut *conn)
        .await?
        .rows_affected(),
    };
    if rows == 0 {
        let found = stored_version(change.kind, &change.id, conn).await?;
        return Err(change.conflict(found));
    }
    trace!("🗃️ {} {} written at version {}", change.kind, change.id, change.version);
    Ok(())
}
