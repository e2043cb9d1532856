//! Record lifecycle service: the only entry point the application layer uses
//! to mutate meal data. Always local-first; sync is invisible from here.

use chrono::{NaiveDate, Utc};
use log::debug;
use std::sync::Arc;

use crate::errors::Result;

use super::{DailySummary, Meal, MealDraft, MealRepositoryTrait, MealUpdate, NewMeal};

#[derive(Clone)]
pub struct MealService {
    repository: Arc<dyn MealRepositoryTrait>,
}

impl MealService {
    pub fn new(repository: Arc<dyn MealRepositoryTrait>) -> Self {
        Self { repository }
    }

    /// Log a new meal. Assigns the record's `client_id`, marks it `Pending`
    /// and persists it locally; the next sync cycle picks it up. Never
    /// blocks on network and only fails on local storage failure.
    pub async fn add_meal(&self, draft: MealDraft) -> Result<Meal> {
        let new_meal = NewMeal::pending(draft, Utc::now());
        let meal = self.repository.insert(new_meal).await?;
        debug!(
            "Logged meal '{}' local_id={} client_id={}",
            meal.name, meal.local_id, meal.client_id
        );
        Ok(meal)
    }

    /// Edit an existing meal. Resets `sync_status` to `Pending` so the
    /// change is re-pushed, even when the record was already `Synced`.
    pub async fn edit_meal(&self, local_id: i32, update: MealUpdate) -> Result<Meal> {
        self.repository.update(local_id, update).await
    }

    /// Delete a meal from the local store unconditionally. Deletion is
    /// local-only: no tombstone is kept and nothing is propagated to the
    /// server.
    pub async fn delete_meal(&self, local_id: i32) -> Result<usize> {
        self.repository.delete(local_id).await
    }

    pub fn get_meal(&self, local_id: i32) -> Result<Meal> {
        self.repository.get(local_id)
    }

    /// Meals whose record date falls within the inclusive range, any sync
    /// status. Reads resolve from the local store regardless of network
    /// state.
    pub fn meals_between(&self, start: NaiveDate, end: NaiveDate) -> Result<Vec<Meal>> {
        self.repository.list_by_date_range(start, end)
    }

    /// Aggregated intake for one calendar date.
    pub fn summary_for(&self, date: NaiveDate) -> Result<DailySummary> {
        let meals = self.repository.list_by_date_range(date, date)?;
        Ok(DailySummary::from_meals(date, &meals))
    }

    /// Aggregated intake for the current date.
    pub fn today_summary(&self) -> Result<DailySummary> {
        self.summary_for(Utc::now().date_naive())
    }
}
