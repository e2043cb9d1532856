//! Database models for the meals table.

use diesel::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Queryable, Identifiable, Selectable, Debug, Clone, Serialize, Deserialize)]
#[diesel(primary_key(local_id))]
#[diesel(table_name = crate::schema::meals)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct MealDB {
    pub local_id: i32,
    pub client_id: String,
    pub server_id: Option<i64>,
    pub name: String,
    pub portion: String,
    pub calories: f64,
    pub sodium: f64,
    pub purine: f64,
    pub protein: Option<f64>,
    pub carbs: Option<f64>,
    pub fat: Option<f64>,
    pub fiber: Option<f64>,
    pub meal_type: String,
    pub category: String,
    pub record_date: String,
    pub note: Option<String>,
    pub image_url: Option<String>,
    pub ai_recognized: i32,
    pub sync_status: String,
    pub created_at: String,
    pub updated_at: String,
}

/// Insertable row; `local_id` is assigned by SQLite. Also used as the
/// changeset for the sync upsert path, where every field is overwritten
/// with the server copy — including absent optionals, hence
/// `treat_none_as_null`.
#[derive(Insertable, AsChangeset, Debug, Clone)]
#[diesel(table_name = crate::schema::meals)]
#[diesel(treat_none_as_null = true)]
pub struct NewMealDB {
    pub client_id: String,
    pub server_id: Option<i64>,
    pub name: String,
    pub portion: String,
    pub calories: f64,
    pub sodium: f64,
    pub purine: f64,
    pub protein: Option<f64>,
    pub carbs: Option<f64>,
    pub fat: Option<f64>,
    pub fiber: Option<f64>,
    pub meal_type: String,
    pub category: String,
    pub record_date: String,
    pub note: Option<String>,
    pub image_url: Option<String>,
    pub ai_recognized: i32,
    pub sync_status: String,
    pub created_at: String,
    pub updated_at: String,
}

/// Partial-update changeset; `None` fields are left untouched. The sync
/// status and `updated_at` are always set by the repository.
#[derive(AsChangeset, Debug, Clone, Default)]
#[diesel(table_name = crate::schema::meals)]
pub struct MealChangesetDB {
    pub name: Option<String>,
    pub portion: Option<String>,
    pub calories: Option<f64>,
    pub sodium: Option<f64>,
    pub purine: Option<f64>,
    pub protein: Option<f64>,
    pub carbs: Option<f64>,
    pub fat: Option<f64>,
    pub fiber: Option<f64>,
    pub meal_type: Option<String>,
    pub category: Option<String>,
    pub note: Option<String>,
    pub sync_status: Option<String>,
    pub updated_at: Option<String>,
}
