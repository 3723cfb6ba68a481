//! Playback snapshot blobs
//!
//! One row per key; writes replace the previous blob.

use crate::error::Result;
use async_trait::async_trait;
use lumen_playback::{SnapshotError, SnapshotStore};
use sqlx::{Row, SqlitePool};
use tracing::debug;

/// Get the blob stored under `key`
pub async fn get(pool: &SqlitePool, key: &str) -> Result<Option<Vec<u8>>> {
    let row = sqlx::query("SELECT blob FROM playback_snapshots WHERE key = ?")
        .bind(key)
        .fetch_optional(pool)
        .await?;

    Ok(row.map(|r| r.try_get("blob")).transpose()?)
}

/// Create or replace the blob stored under `key`
pub async fn set(pool: &SqlitePool, key: &str, blob: &[u8]) -> Result<()> {
    let now = chrono::Utc::now().timestamp();

    sqlx::query(
        "INSERT INTO playback_snapshots (key, blob, updated_at)
         VALUES (?, ?, ?)
         ON CONFLICT(key)
         DO UPDATE SET
            blob = excluded.blob,
            updated_at = excluded.updated_at",
    )
    .bind(key)
    .bind(blob)
    .bind(now)
    .execute(pool)
    .await?;

    Ok(())
}

/// Delete the blob stored under `key`
///
/// Returns whether a row was removed.
pub async fn remove(pool: &SqlitePool, key: &str) -> Result<bool> {
    let result = sqlx::query("DELETE FROM playback_snapshots WHERE key = ?")
        .bind(key)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

/// Unix timestamp of the last write under `key`
pub async fn updated_at(pool: &SqlitePool, key: &str) -> Result<Option<i64>> {
    let row = sqlx::query("SELECT updated_at FROM playback_snapshots WHERE key = ?")
        .bind(key)
        .fetch_optional(pool)
        .await?;

    Ok(row.map(|r| r.try_get("updated_at")).transpose()?)
}

/// [`SnapshotStore`] backed by an `SQLite` pool
#[derive(Debug, Clone)]
pub struct SqliteSnapshotStore {
    pool: SqlitePool,
}

impl SqliteSnapshotStore {
    /// Wrap a pool whose migrations have already run
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Connect to `database_url` and run migrations
    pub async fn open(database_url: &str) -> Result<Self> {
        let pool = crate::create_pool(database_url).await?;
        crate::run_migrations(&pool).await?;
        Ok(Self::new(pool))
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[async_trait]
impl SnapshotStore for SqliteSnapshotStore {
    async fn get(&self, key: &str) -> std::result::Result<Option<Vec<u8>>, SnapshotError> {
        Ok(get(&self.pool, key).await?)
    }

    async fn set(&self, key: &str, blob: Vec<u8>) -> std::result::Result<(), SnapshotError> {
        debug!("Writing {} byte snapshot under {}", blob.len(), key);
        Ok(set(&self.pool, key, &blob).await?)
    }

    async fn remove(&self, key: &str) -> std::result::Result<(), SnapshotError> {
        remove(&self.pool, key).await?;
        Ok(())
    }
}
