//! Meal domain models and the record lifecycle service.

mod meal_model;
mod meal_service;

pub use meal_model::*;
pub use meal_service::*;

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::errors::Result;
use crate::sync::{MergeOutcome, MergePlan};

/// Durable local store contract for meal records.
///
/// All mutations are atomic with respect to a single record; `apply_merge`
/// is atomic as a batch so a crash never leaves a half-applied sync result.
#[async_trait]
pub trait MealRepositoryTrait: Send + Sync {
    /// Insert a new record, assigning its `local_id`. This is the write path
    /// the rest of the app depends on: it returns before any network
    /// activity is attempted.
    async fn insert(&self, new_meal: NewMeal) -> Result<Meal>;

    fn get(&self, local_id: i32) -> Result<Meal>;

    /// Records whose `record_date` falls within the inclusive range, any
    /// sync status, newest first.
    fn list_by_date_range(&self, start: NaiveDate, end: NaiveDate) -> Result<Vec<Meal>>;

    fn list_by_status(&self, status: SyncStatus) -> Result<Vec<Meal>>;

    /// Merge the provided fields, force `sync_status = Pending`, and refresh
    /// `updated_at`. `server_id` is preserved.
    async fn update(&self, local_id: i32, update: MealUpdate) -> Result<Meal>;

    async fn delete(&self, local_id: i32) -> Result<usize>;

    /// Apply one reconciliation result as a single all-or-nothing batch.
    async fn apply_merge(&self, plan: MergePlan) -> Result<MergeOutcome>;

    /// Delete `Synced` records dated strictly before `cutoff`. `Pending` and
    /// `Conflict` records survive regardless of age.
    async fn evict_synced_before(&self, cutoff: NaiveDate) -> Result<usize>;
}
