//! Database model for the sync metadata key/value table.

use diesel::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(
    Queryable,
    Identifiable,
    Insertable,
    AsChangeset,
    Selectable,
    Debug,
    Clone,
    Serialize,
    Deserialize,
)]
#[diesel(primary_key(key))]
#[diesel(table_name = crate::schema::sync_meta)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct SyncMetaDB {
    pub key: String,
    pub value: String,
    pub updated_at: String,
}
