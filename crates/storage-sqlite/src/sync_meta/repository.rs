//! Repository for the persisted sync metadata flags.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use std::sync::Arc;

use mealtrack_core::errors::Result;
use mealtrack_core::sync::{SyncMetaRepositoryTrait, SyncRunState};

use crate::db::{
    datetime_from_db, datetime_to_db, enum_from_db, enum_to_db, get_connection, DbPool,
    WriteHandle,
};
use crate::errors::StorageError;
use crate::schema::sync_meta;

use super::model::SyncMetaDB;

const KEY_LAST_SYNCED_AT: &str = "last_synced_at";
const KEY_RUN_STATE: &str = "run_state";

/// Key/value store for `last_synced_at` and the sync run-state flag.
/// Last-write-wins is sufficient here: the scheduler guarantees only one
/// cycle writes at a time.
pub struct SyncMetaRepository {
    pool: Arc<DbPool>,
    writer: WriteHandle,
}

impl SyncMetaRepository {
    pub fn new(pool: Arc<DbPool>, writer: WriteHandle) -> Self {
        Self { pool, writer }
    }

    fn get_value(&self, key: &str) -> Result<Option<String>> {
        let mut conn = get_connection(&self.pool)?;
        let row = sync_meta::table
            .find(key)
            .first::<SyncMetaDB>(&mut conn)
            .optional()
            .map_err(StorageError::from)?;
        Ok(row.map(|r| r.value))
    }

    async fn set_value(&self, key: &'static str, value: String) -> Result<()> {
        self.writer
            .exec(move |conn| {
                let row = SyncMetaDB {
                    key: key.to_string(),
                    value,
                    updated_at: datetime_to_db(Utc::now()),
                };
                diesel::insert_into(sync_meta::table)
                    .values(&row)
                    .on_conflict(sync_meta::key)
                    .do_update()
                    .set((
                        sync_meta::value.eq(row.value.clone()),
                        sync_meta::updated_at.eq(row.updated_at.clone()),
                    ))
                    .execute(conn)
                    .map_err(StorageError::from)?;
                Ok(())
            })
            .await
    }
}

#[async_trait]
impl SyncMetaRepositoryTrait for SyncMetaRepository {
    fn last_synced_at(&self) -> Result<Option<DateTime<Utc>>> {
        self.get_value(KEY_LAST_SYNCED_AT)?
            .map(|value| datetime_from_db(&value))
            .transpose()
    }

    async fn set_last_synced_at(&self, at: DateTime<Utc>) -> Result<()> {
        self.set_value(KEY_LAST_SYNCED_AT, datetime_to_db(at)).await
    }

    fn run_state(&self) -> Result<SyncRunState> {
        // Initialized empty on first run; absent means idle.
        match self.get_value(KEY_RUN_STATE)? {
            Some(value) => enum_from_db(&value),
            None => Ok(SyncRunState::Idle),
        }
    }

    async fn set_run_state(&self, state: SyncRunState) -> Result<()> {
        self.set_value(KEY_RUN_STATE, enum_to_db(&state)?).await
    }
}
