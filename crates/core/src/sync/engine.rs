//! Reconciliation engine: one push-then-merge round trip between the local
//! store and the remote service.

use chrono::Utc;
use log::{debug, warn};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;

use crate::errors::Result;
use crate::meals::{Meal, MealRepositoryTrait, SyncStatus};

use super::retention::RetentionPolicy;
use super::sync_model::{
    ConflictDecision, ConflictResolution, MealUpload, MergePlan, SyncBatchRequest,
    SyncBatchResponse, SyncCycleReport, SyncCycleStatus, SyncMetaRepositoryTrait, SyncRunState,
    SyncTransport,
};

/// Derive the local writes from one server response.
///
/// Server copies of conflicted records are not adopted unless the resolution
/// policy says so; the flagged record keeps its local fields. A pushed record
/// that was accepted but has no server copy in the response stays `Pending`
/// (it carries no server id yet) and is re-pushed next cycle, which is safe
/// because the server keys on `client_id`.
pub fn plan_merge(
    pending: &[Meal],
    response: &SyncBatchResponse,
    resolution: &dyn ConflictResolution,
) -> MergePlan {
    let conflict_set: HashSet<&str> = response.conflicts.iter().map(String::as_str).collect();

    let mut plan = MergePlan::default();
    for server_meal in &response.server_meals {
        if !conflict_set.contains(server_meal.client_id.as_str()) {
            plan.adopt.push(server_meal.clone());
        }
    }

    for client_id in &response.conflicts {
        let local = pending.iter().find(|meal| meal.client_id == *client_id);
        let server = response
            .server_meals
            .iter()
            .find(|meal| meal.client_id == *client_id);
        match (resolution.resolve(local, server), server) {
            (ConflictDecision::AdoptServer, Some(copy)) => plan.adopt.push(copy.clone()),
            _ => plan.flag_conflict.push(client_id.clone()),
        }
    }

    plan
}

/// Runs reconciliation cycles against the injected seams. All state changes
/// flow through the repositories; transport failures are absorbed into the
/// persisted run state rather than raised to callers.
pub struct SyncEngine {
    meals: Arc<dyn MealRepositoryTrait>,
    sync_meta: Arc<dyn SyncMetaRepositoryTrait>,
    transport: Arc<dyn SyncTransport>,
    resolution: Arc<dyn ConflictResolution>,
    retention: RetentionPolicy,
}

impl SyncEngine {
    pub fn new(
        meals: Arc<dyn MealRepositoryTrait>,
        sync_meta: Arc<dyn SyncMetaRepositoryTrait>,
        transport: Arc<dyn SyncTransport>,
        resolution: Arc<dyn ConflictResolution>,
        retention: RetentionPolicy,
    ) -> Self {
        Self {
            meals,
            sync_meta,
            transport,
            resolution,
            retention,
        }
    }

    /// Record a cycle failure: persist the error state and report it. The
    /// pending set is untouched and `last_synced_at` does not advance, so
    /// the next trigger retries the whole batch from scratch.
    async fn fail(
        &self,
        status: SyncCycleStatus,
        message: String,
        pushed_count: usize,
        started_at: Instant,
    ) -> Result<SyncCycleReport> {
        warn!("Sync cycle failed ({:?}): {}", status, message);
        self.sync_meta.set_run_state(SyncRunState::Error).await?;
        Ok(SyncCycleReport {
            status,
            pushed_count,
            adopted_count: 0,
            conflict_count: 0,
            evicted_count: 0,
            duration_ms: started_at.elapsed().as_millis() as i64,
            error: Some(message),
        })
    }

    /// Run one reconciliation cycle.
    ///
    /// The pending set is snapshotted at cycle start; records created while
    /// the cycle is in flight wait for the next one. The round trip happens
    /// even with zero pending records so server-side changes still arrive.
    pub async fn run_cycle(&self) -> Result<SyncCycleReport> {
        let started_at = Instant::now();
        self.sync_meta.set_run_state(SyncRunState::Syncing).await?;

        let pending = self.meals.list_by_status(SyncStatus::Pending)?;
        let request = SyncBatchRequest {
            meals: pending.iter().map(MealUpload::from_meal).collect(),
            last_sync_at: self.sync_meta.last_synced_at()?,
        };
        debug!(
            "Pushing {} pending record(s), last_sync_at={:?}",
            request.meals.len(),
            request.last_sync_at
        );

        let response = match self.transport.push_batch(request).await {
            Ok(response) => response,
            Err(err) => {
                return self
                    .fail(
                        SyncCycleStatus::PushError,
                        err.to_string(),
                        pending.len(),
                        started_at,
                    )
                    .await;
            }
        };

        let plan = plan_merge(&pending, &response, self.resolution.as_ref());
        let outcome = match self.meals.apply_merge(plan).await {
            Ok(outcome) => outcome,
            Err(err) => {
                return self
                    .fail(
                        SyncCycleStatus::ApplyError,
                        err.to_string(),
                        pending.len(),
                        started_at,
                    )
                    .await;
            }
        };

        // The merge is durable; only now does the sync watermark advance.
        self.sync_meta.set_last_synced_at(Utc::now()).await?;
        self.sync_meta.set_run_state(SyncRunState::Idle).await?;

        // Post-sync housekeeping. An eviction failure does not undo an
        // otherwise successful cycle.
        let cutoff = self.retention.cutoff(Utc::now().date_naive());
        let evicted_count = match self.meals.evict_synced_before(cutoff).await {
            Ok(count) => count,
            Err(err) => {
                warn!("Retention eviction failed: {}", err);
                0
            }
        };

        let report = SyncCycleReport {
            status: SyncCycleStatus::Ok,
            pushed_count: pending.len(),
            adopted_count: outcome.adopted_updated + outcome.adopted_inserted,
            conflict_count: outcome.flagged_conflicts,
            evicted_count,
            duration_ms: started_at.elapsed().as_millis() as i64,
            error: None,
        };
        debug!(
            "Sync cycle complete: pushed={} adopted={} conflicts={} evicted={} in {}ms",
            report.pushed_count,
            report.adopted_count,
            report.conflict_count,
            report.evicted_count,
            report.duration_ms
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::meals::{FoodCategory, MealType};
    use crate::sync::sync_model::{FlagForReview, ServerMeal, ServerWins};
    use chrono::NaiveDate;

    fn local(client_id: &str) -> Meal {
        let now = Utc::now();
        Meal {
            local_id: 1,
            client_id: client_id.to_string(),
            server_id: None,
            name: "noodles".to_string(),
            portion: "1 bowl".to_string(),
            calories: 400.0,
            sodium: 800.0,
            purine: 90.0,
            protein: None,
            carbs: None,
            fat: None,
            fiber: None,
            meal_type: MealType::Lunch,
            category: FoodCategory::Staple,
            record_date: NaiveDate::from_ymd_opt(2026, 8, 1).unwrap(),
            note: None,
            image_url: None,
            ai_recognized: false,
            sync_status: SyncStatus::Pending,
            created_at: now,
            updated_at: now,
        }
    }

    fn server(client_id: &str, id: i64) -> ServerMeal {
        let now = Utc::now();
        ServerMeal {
            id,
            client_id: client_id.to_string(),
            name: "noodles".to_string(),
            portion: "1 bowl".to_string(),
            calories: 400.0,
            sodium: 800.0,
            purine: 90.0,
            protein: None,
            carbs: None,
            fat: None,
            fiber: None,
            meal_type: MealType::Lunch,
            category: FoodCategory::Staple,
            record_date: NaiveDate::from_ymd_opt(2026, 8, 1).unwrap(),
            note: None,
            image_url: None,
            ai_recognized: false,
            sync_status: SyncStatus::Synced,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn conflicted_record_is_flagged_not_adopted() {
        let pending = vec![local("a"), local("b")];
        let response = SyncBatchResponse {
            synced_count: 1,
            conflicts: vec!["b".to_string()],
            server_meals: vec![server("a", 10), server("b", 11)],
        };

        let plan = plan_merge(&pending, &response, &FlagForReview);
        assert_eq!(plan.flag_conflict, vec!["b".to_string()]);
        assert_eq!(plan.adopt.len(), 1);
        assert_eq!(plan.adopt[0].client_id, "a");
    }

    #[test]
    fn server_wins_policy_adopts_the_server_copy() {
        let pending = vec![local("b")];
        let response = SyncBatchResponse {
            synced_count: 0,
            conflicts: vec!["b".to_string()],
            server_meals: vec![server("b", 11)],
        };

        let plan = plan_merge(&pending, &response, &ServerWins);
        assert!(plan.flag_conflict.is_empty());
        assert_eq!(plan.adopt.len(), 1);
        assert_eq!(plan.adopt[0].id, 11);
    }

    #[test]
    fn server_wins_without_server_copy_still_flags() {
        let pending = vec![local("b")];
        let response = SyncBatchResponse {
            synced_count: 0,
            conflicts: vec!["b".to_string()],
            server_meals: vec![],
        };

        let plan = plan_merge(&pending, &response, &ServerWins);
        assert_eq!(plan.flag_conflict, vec!["b".to_string()]);
        assert!(plan.adopt.is_empty());
    }

    #[test]
    fn foreign_records_are_adopted() {
        let pending = vec![];
        let response = SyncBatchResponse {
            synced_count: 0,
            conflicts: vec![],
            server_meals: vec![server("other-device", 42)],
        };

        let plan = plan_merge(&pending, &response, &FlagForReview);
        assert_eq!(plan.adopt.len(), 1);
        assert_eq!(plan.adopt[0].client_id, "other-device");
        assert!(plan.flag_conflict.is_empty());
    }

    #[test]
    fn accepted_without_server_copy_produces_no_write() {
        // The server counted the record as synced but returned no copy for
        // it; the record must stay pending so a later cycle can finish the
        // job with a server id.
        let pending = vec![local("a")];
        let response = SyncBatchResponse {
            synced_count: 1,
            conflicts: vec![],
            server_meals: vec![],
        };

        let plan = plan_merge(&pending, &response, &FlagForReview);
        assert!(plan.is_empty());
    }
}
