//! Storage error types and their mapping into the core error taxonomy.

use mealtrack_core::errors::{DatabaseError, Error};
use thiserror::Error;

/// Errors raised by the SQLite storage layer.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Query failed: {0}")]
    Diesel(#[from] diesel::result::Error),

    #[error("Connection pool error: {0}")]
    Pool(#[from] r2d2::Error),

    #[error("Migration failed: {0}")]
    Migration(String),

    #[error("Write actor unavailable: {0}")]
    Writer(String),
}

impl From<StorageError> for Error {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::Diesel(inner) => Error::Database(DatabaseError::Query(inner.to_string())),
            StorageError::Pool(inner) => {
                Error::Database(DatabaseError::Connection(inner.to_string()))
            }
            StorageError::Migration(message) => Error::Database(DatabaseError::Migration(message)),
            StorageError::Writer(message) => Error::Database(DatabaseError::Internal(message)),
        }
    }
}
