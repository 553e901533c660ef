//! Local sync-state repository
//!
//! One row per synced record: the normalized payload last written to the
//! store and when the record was last looked at.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use std::path::Path;
use std::time::Duration;

use crate::error::{SyncError, SyncResult};
use crate::models::EntityType;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SyncState {
    pub entity: EntityType,
    pub business_number: String,
    /// Fields written by the last sync, as sent to the store
    pub payload: Map<String, Value>,
    /// When the payload was last written
    pub written_at: DateTime<Utc>,
    /// When the record was last synced, written or not
    pub synced_at: DateTime<Utc>,
}

type StateRow = (String, String, String, DateTime<Utc>, DateTime<Utc>);

fn from_row((entity, business_number, payload, written_at, synced_at): StateRow) -> SyncResult<SyncState> {
    let payload = match serde_json::from_str(&payload)? {
        Value::Object(map) => map,
        other => {
            return Err(SyncError::Config(format!(
                "sync state for {} holds non-object payload {}",
                business_number, other
            )));
        }
    };
    Ok(SyncState {
        entity: entity.parse()?,
        business_number,
        payload,
        written_at,
        synced_at,
    })
}

/// Open (creating if needed) the state database and apply migrations
pub async fn open_state_pool(path: &Path) -> SyncResult<SqlitePool> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let options = SqliteConnectOptions::new()
        .filename(path)
        .busy_timeout(Duration::from_secs(5))
        .create_if_missing(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(4)
        .connect_with(options)
        .await?;
    migrate(&pool).await?;
    Ok(pool)
}

pub async fn migrate(pool: &SqlitePool) -> SyncResult<()> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .map_err(sqlx::Error::from)?;
    Ok(())
}

pub async fn get_sync_state(
    pool: &SqlitePool,
    entity: EntityType,
    business_number: &str,
) -> SyncResult<Option<SyncState>> {
    let row: Option<StateRow> = sqlx::query_as(
        "SELECT entity, business_number, payload, written_at, synced_at
         FROM sync_state WHERE entity = ? AND business_number = ?",
    )
    .bind(entity.as_str())
    .bind(business_number)
    .fetch_optional(pool)
    .await?;

    row.map(from_row).transpose()
}

/// Store the payload just written and stamp both timestamps
pub async fn record_sync(
    pool: &SqlitePool,
    entity: EntityType,
    business_number: &str,
    payload: &Map<String, Value>,
) -> SyncResult<()> {
    let now = Utc::now();
    let payload = serde_json::to_string(payload)?;
    sqlx::query(
        "INSERT INTO sync_state (entity, business_number, payload, written_at, synced_at)
         VALUES (?, ?, ?, ?, ?)
         ON CONFLICT(entity, business_number)
         DO UPDATE SET payload = excluded.payload,
                       written_at = excluded.written_at,
                       synced_at = excluded.synced_at",
    )
    .bind(entity.as_str())
    .bind(business_number)
    .bind(payload)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await?;
    Ok(())
}

/// Move only the sync timestamp (source unchanged)
pub async fn touch_sync(pool: &SqlitePool, entity: EntityType, business_number: &str) -> SyncResult<()> {
    let result = sqlx::query(
        "UPDATE sync_state SET synced_at = ? WHERE entity = ? AND business_number = ?",
    )
    .bind(Utc::now())
    .bind(entity.as_str())
    .bind(business_number)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(SyncError::not_found(format!(
            "sync state for {} {}",
            entity, business_number
        )));
    }
    Ok(())
}

pub async fn list_sync_states(pool: &SqlitePool, entity: EntityType) -> SyncResult<Vec<SyncState>> {
    let rows: Vec<StateRow> = sqlx::query_as(
        "SELECT entity, business_number, payload, written_at, synced_at
         FROM sync_state WHERE entity = ? ORDER BY business_number",
    )
    .bind(entity.as_str())
    .fetch_all(pool)
    .await?;

    rows.into_iter().map(from_row).collect()
}

/// In-memory state database for tests
#[cfg(test)]
pub async fn memory_pool() -> SqlitePool {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .unwrap();
    migrate(&pool).await.unwrap();
    pool
}
