//! Lumen Storage
//!
//! `SQLite` backend for playback resume snapshots.
//!
//! Snapshots are opaque blobs keyed by string; the playback crate owns the
//! encoding. This crate only stores, replaces and removes them.
//!
//! # Example
//!
//! ```rust,no_run
//! use lumen_playback::SnapshotStore;
//! use lumen_storage::SqliteSnapshotStore;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = SqliteSnapshotStore::open("sqlite://lumen.db").await?;
//!
//! store.set("lumen.playback.snapshot", b"{}".to_vec()).await?;
//! let blob = store.get("lumen.playback.snapshot").await?;
//! # Ok(())
//! # }
//! ```

mod error;

pub mod snapshots;

pub use error::{Result, StorageError};
pub use snapshots::SqliteSnapshotStore;

use sqlx::migrate::Migrator;
use sqlx::sqlite::SqlitePool;
use tracing::debug;

// Embed migrations into binary
static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

/// Run database migrations
///
/// Call once at startup, before the first snapshot is read.
pub async fn run_migrations(
    pool: &SqlitePool,
) -> std::result::Result<(), sqlx::migrate::MigrateError> {
    MIGRATOR.run(pool).await
}

/// Create a new `SQLite` pool
///
/// # Arguments
///
/// * `database_url` - `SQLite` connection string (e.g., `sqlite://lumen.db`)
pub async fn create_pool(database_url: &str) -> std::result::Result<SqlitePool, sqlx::Error> {
    use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
    use std::str::FromStr;

    debug!("Creating snapshot pool for {}", database_url);

    let options = SqliteConnectOptions::from_str(database_url)?
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(std::time::Duration::from_secs(30));

    SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await
}
