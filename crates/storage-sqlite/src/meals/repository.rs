//! Repository for the local meals table.

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use diesel::prelude::*;
use std::sync::Arc;

use mealtrack_core::errors::{Error, Result};
use mealtrack_core::meals::{Meal, MealRepositoryTrait, MealUpdate, NewMeal, SyncStatus};
use mealtrack_core::sync::{MergeOutcome, MergePlan, ServerMeal};

use crate::db::{
    date_from_db, date_to_db, datetime_from_db, datetime_to_db, enum_from_db, enum_to_db,
    get_connection, DbPool, WriteHandle,
};
use crate::errors::StorageError;
use crate::schema::meals;

use super::model::{MealChangesetDB, MealDB, NewMealDB};

fn to_meal(row: MealDB) -> Result<Meal> {
    Ok(Meal {
        local_id: row.local_id,
        client_id: row.client_id,
        server_id: row.server_id,
        name: row.name,
        portion: row.portion,
        calories: row.calories,
        sodium: row.sodium,
        purine: row.purine,
        protein: row.protein,
        carbs: row.carbs,
        fat: row.fat,
        fiber: row.fiber,
        meal_type: enum_from_db(&row.meal_type)?,
        category: enum_from_db(&row.category)?,
        record_date: date_from_db(&row.record_date)?,
        note: row.note,
        image_url: row.image_url,
        ai_recognized: row.ai_recognized != 0,
        sync_status: enum_from_db(&row.sync_status)?,
        created_at: datetime_from_db(&row.created_at)?,
        updated_at: datetime_from_db(&row.updated_at)?,
    })
}

fn new_meal_row(new_meal: &NewMeal) -> Result<NewMealDB> {
    let draft = &new_meal.draft;
    Ok(NewMealDB {
        client_id: new_meal.client_id.clone(),
        server_id: None,
        name: draft.name.clone(),
        portion: draft.portion.clone(),
        calories: draft.calories,
        sodium: draft.sodium,
        purine: draft.purine,
        protein: draft.protein,
        carbs: draft.carbs,
        fat: draft.fat,
        fiber: draft.fiber,
        meal_type: enum_to_db(&draft.meal_type)?,
        category: enum_to_db(&draft.category)?,
        record_date: date_to_db(draft.record_date),
        note: draft.note.clone(),
        image_url: draft.image_url.clone(),
        ai_recognized: i32::from(draft.ai_recognized),
        sync_status: enum_to_db(&new_meal.sync_status)?,
        created_at: datetime_to_db(new_meal.created_at),
        updated_at: datetime_to_db(new_meal.updated_at),
    })
}

/// A server copy adopted locally: fields, server id, and timestamps are the
/// server's; the status becomes `SYNCED`.
fn server_meal_row(server_meal: &ServerMeal) -> Result<NewMealDB> {
    Ok(NewMealDB {
        client_id: server_meal.client_id.clone(),
        server_id: Some(server_meal.id),
        name: server_meal.name.clone(),
        portion: server_meal.portion.clone(),
        calories: server_meal.calories,
        sodium: server_meal.sodium,
        purine: server_meal.purine,
        protein: server_meal.protein,
        carbs: server_meal.carbs,
        fat: server_meal.fat,
        fiber: server_meal.fiber,
        meal_type: enum_to_db(&server_meal.meal_type)?,
        category: enum_to_db(&server_meal.category)?,
        record_date: date_to_db(server_meal.record_date),
        note: server_meal.note.clone(),
        image_url: server_meal.image_url.clone(),
        ai_recognized: i32::from(server_meal.ai_recognized),
        sync_status: enum_to_db(&SyncStatus::Synced)?,
        created_at: datetime_to_db(server_meal.created_at),
        updated_at: datetime_to_db(server_meal.updated_at),
    })
}

pub struct MealRepository {
    pool: Arc<DbPool>,
    writer: WriteHandle,
}

impl MealRepository {
    pub fn new(pool: Arc<DbPool>, writer: WriteHandle) -> Self {
        Self { pool, writer }
    }
}

#[async_trait]
impl MealRepositoryTrait for MealRepository {
    async fn insert(&self, new_meal: NewMeal) -> Result<Meal> {
        self.writer
            .exec(move |conn| {
                let row = new_meal_row(&new_meal)?;
                let stored = diesel::insert_into(meals::table)
                    .values(&row)
                    .returning(MealDB::as_returning())
                    .get_result::<MealDB>(conn)
                    .map_err(StorageError::from)?;
                to_meal(stored)
            })
            .await
    }

    fn get(&self, local_id: i32) -> Result<Meal> {
        let mut conn = get_connection(&self.pool)?;
        let row = meals::table
            .find(local_id)
            .first::<MealDB>(&mut conn)
            .optional()
            .map_err(StorageError::from)?
            .ok_or_else(|| Error::NotFound(format!("meal {}", local_id)))?;
        to_meal(row)
    }

    fn list_by_date_range(&self, start: NaiveDate, end: NaiveDate) -> Result<Vec<Meal>> {
        let mut conn = get_connection(&self.pool)?;
        let rows = meals::table
            .filter(meals::record_date.ge(date_to_db(start)))
            .filter(meals::record_date.le(date_to_db(end)))
            .order((meals::record_date.desc(), meals::created_at.desc()))
            .load::<MealDB>(&mut conn)
            .map_err(StorageError::from)?;
        rows.into_iter().map(to_meal).collect()
    }

    fn list_by_status(&self, status: SyncStatus) -> Result<Vec<Meal>> {
        let mut conn = get_connection(&self.pool)?;
        let rows = meals::table
            .filter(meals::sync_status.eq(enum_to_db(&status)?))
            .order(meals::created_at.asc())
            .load::<MealDB>(&mut conn)
            .map_err(StorageError::from)?;
        rows.into_iter().map(to_meal).collect()
    }

    async fn update(&self, local_id: i32, update: MealUpdate) -> Result<Meal> {
        self.writer
            .exec(move |conn| {
                let changeset = MealChangesetDB {
                    name: update.name,
                    portion: update.portion,
                    calories: update.calories,
                    sodium: update.sodium,
                    purine: update.purine,
                    protein: update.protein,
                    carbs: update.carbs,
                    fat: update.fat,
                    fiber: update.fiber,
                    meal_type: update
                        .meal_type
                        .as_ref()
                        .map(enum_to_db)
                        .transpose()?,
                    category: update.category.as_ref().map(enum_to_db).transpose()?,
                    note: update.note,
                    // Every local edit re-enters the push queue.
                    sync_status: Some(enum_to_db(&SyncStatus::Pending)?),
                    updated_at: Some(datetime_to_db(Utc::now())),
                };

                let affected = diesel::update(meals::table.find(local_id))
                    .set(&changeset)
                    .execute(conn)
                    .map_err(StorageError::from)?;
                if affected == 0 {
                    return Err(Error::NotFound(format!("meal {}", local_id)));
                }

                let row = meals::table
                    .find(local_id)
                    .first::<MealDB>(conn)
                    .map_err(StorageError::from)?;
                to_meal(row)
            })
            .await
    }

    async fn delete(&self, local_id: i32) -> Result<usize> {
        self.writer
            .exec(move |conn| {
                diesel::delete(meals::table.find(local_id))
                    .execute(conn)
                    .map_err(StorageError::from)
                    .map_err(Error::from)
            })
            .await
    }

    async fn apply_merge(&self, plan: MergePlan) -> Result<MergeOutcome> {
        self.writer
            .exec(move |conn| {
                let mut outcome = MergeOutcome::default();

                for client_id in &plan.flag_conflict {
                    let affected = diesel::update(
                        meals::table.filter(meals::client_id.eq(client_id)),
                    )
                    .set(meals::sync_status.eq(enum_to_db(&SyncStatus::Conflict)?))
                    .execute(conn)
                    .map_err(StorageError::from)?;
                    outcome.flagged_conflicts += affected;
                }

                for server_meal in &plan.adopt {
                    let exists = meals::table
                        .filter(meals::client_id.eq(&server_meal.client_id))
                        .select(meals::local_id)
                        .first::<i32>(conn)
                        .optional()
                        .map_err(StorageError::from)?
                        .is_some();

                    let row = server_meal_row(server_meal)?;
                    diesel::insert_into(meals::table)
                        .values(&row)
                        .on_conflict(meals::client_id)
                        .do_update()
                        .set(&row)
                        .execute(conn)
                        .map_err(StorageError::from)?;

                    if exists {
                        outcome.adopted_updated += 1;
                    } else {
                        outcome.adopted_inserted += 1;
                    }
                }

                Ok(outcome)
            })
            .await
    }

    async fn evict_synced_before(&self, cutoff: NaiveDate) -> Result<usize> {
        self.writer
            .exec(move |conn| {
                diesel::delete(
                    meals::table
                        .filter(meals::sync_status.eq(enum_to_db(&SyncStatus::Synced)?))
                        .filter(meals::record_date.lt(date_to_db(cutoff))),
                )
                .execute(conn)
                .map_err(StorageError::from)
                .map_err(Error::from)
            })
            .await
    }
}
