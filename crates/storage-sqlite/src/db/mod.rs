//! SQLite connection pool, embedded migrations, and shared text codecs.

use diesel::connection::SimpleConnection;
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, Pool, PooledConnection};
use diesel::sqlite::SqliteConnection;
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use mealtrack_core::errors::{DatabaseError, Error, Result};

use crate::errors::StorageError;

pub mod write_actor;
pub use write_actor::{spawn_writer, WriteHandle};

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

const DB_FILE_NAME: &str = "mealtrack.db";
const POOL_MAX_SIZE: u32 = 8;

pub type DbPool = Pool<ConnectionManager<SqliteConnection>>;
pub type DbConnection = PooledConnection<ConnectionManager<SqliteConnection>>;

#[derive(Debug)]
struct ConnectionOptions;

impl diesel::r2d2::CustomizeConnection<SqliteConnection, diesel::r2d2::Error>
    for ConnectionOptions
{
    fn on_acquire(
        &self,
        conn: &mut SqliteConnection,
    ) -> std::result::Result<(), diesel::r2d2::Error> {
        conn.batch_execute(
            "PRAGMA journal_mode = WAL; \
             PRAGMA synchronous = NORMAL; \
             PRAGMA foreign_keys = ON; \
             PRAGMA busy_timeout = 5000;",
        )
        .map_err(diesel::r2d2::Error::QueryError)
    }
}

/// Ensure the app data directory exists and return the database file path.
pub fn init(app_data_dir: &str) -> Result<String> {
    std::fs::create_dir_all(app_data_dir).map_err(|e| {
        Error::Database(DatabaseError::Connection(format!(
            "Failed to create app data dir: {}",
            e
        )))
    })?;
    let db_path = Path::new(app_data_dir).join(DB_FILE_NAME);
    Ok(db_path.to_string_lossy().to_string())
}

/// Run any pending embedded migrations against the database file.
pub fn run_migrations(db_path: &str) -> Result<()> {
    let mut conn = SqliteConnection::establish(db_path).map_err(|e| {
        Error::Database(DatabaseError::Connection(format!(
            "Failed to open database: {}",
            e
        )))
    })?;
    conn.run_pending_migrations(MIGRATIONS)
        .map(|_| ())
        .map_err(|e| StorageError::Migration(e.to_string()))?;
    Ok(())
}

pub fn create_pool(db_path: &str) -> Result<Arc<DbPool>> {
    let manager = ConnectionManager::<SqliteConnection>::new(db_path);
    let pool = Pool::builder()
        .max_size(POOL_MAX_SIZE)
        .connection_timeout(Duration::from_secs(5))
        .connection_customizer(Box::new(ConnectionOptions))
        .build(manager)
        .map_err(|e| Error::Database(DatabaseError::Connection(e.to_string())))?;
    Ok(Arc::new(pool))
}

pub fn get_connection(pool: &Arc<DbPool>) -> Result<DbConnection> {
    pool.get()
        .map_err(StorageError::from)
        .map_err(Error::from)
}

// ─────────────────────────────────────────────────────────────────────────
// Text codecs shared by the repositories
// ─────────────────────────────────────────────────────────────────────────

/// Store a serde enum as its bare wire string (e.g. `PENDING`).
pub(crate) fn enum_to_db<T: serde::Serialize>(value: &T) -> Result<String> {
    Ok(serde_json::to_string(value)?.trim_matches('"').to_string())
}

pub(crate) fn enum_from_db<T: serde::de::DeserializeOwned>(value: &str) -> Result<T> {
    Ok(serde_json::from_str(&format!("\"{}\"", value))?)
}

/// Calendar dates are stored as ISO `YYYY-MM-DD`, which also makes lexical
/// range filters chronological.
pub(crate) fn date_to_db(value: chrono::NaiveDate) -> String {
    value.format("%Y-%m-%d").to_string()
}

pub(crate) fn date_from_db(value: &str) -> Result<chrono::NaiveDate> {
    chrono::NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|e| {
        Error::Database(DatabaseError::Internal(format!(
            "Invalid stored date '{}': {}",
            value, e
        )))
    })
}

pub(crate) fn datetime_to_db(value: chrono::DateTime<chrono::Utc>) -> String {
    value.to_rfc3339()
}

pub(crate) fn datetime_from_db(value: &str) -> Result<chrono::DateTime<chrono::Utc>> {
    chrono::DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&chrono::Utc))
        .map_err(|e| {
            Error::Database(DatabaseError::Internal(format!(
                "Invalid stored timestamp '{}': {}",
                value, e
            )))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use mealtrack_core::meals::SyncStatus;

    #[test]
    fn enum_round_trips_through_bare_strings() {
        let stored = enum_to_db(&SyncStatus::Pending).unwrap();
        assert_eq!(stored, "PENDING");
        let status: SyncStatus = enum_from_db(&stored).unwrap();
        assert_eq!(status, SyncStatus::Pending);
    }

    #[test]
    fn date_text_sorts_chronologically() {
        let early = date_to_db(chrono::NaiveDate::from_ymd_opt(2026, 7, 9).unwrap());
        let late = date_to_db(chrono::NaiveDate::from_ymd_opt(2026, 7, 10).unwrap());
        assert!(early < late);
        assert_eq!(
            date_from_db(&early).unwrap(),
            chrono::NaiveDate::from_ymd_opt(2026, 7, 9).unwrap()
        );
    }
}
