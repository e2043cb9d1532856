//! Sync domain models, wire contract, and the seams the engine is built on.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::Result;
use crate::meals::{FoodCategory, Meal, MealType, SyncStatus};

/// Persisted process-wide sync state: `idle -> syncing -> idle` on success,
/// `idle -> syncing -> error -> idle` on failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncRunState {
    Idle,
    Syncing,
    Error,
}

/// Trigger source for sync cycles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncTrigger {
    Startup,
    Periodic,
    ConnectivityRestored,
    Foreground,
    Manual,
}

/// Outcome classification of one reconciliation cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncCycleStatus {
    Ok,
    PushError,
    ApplyError,
}

/// Lightweight cycle metrics reported by the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncCycleReport {
    pub status: SyncCycleStatus,
    pub pushed_count: usize,
    pub adopted_count: usize,
    pub conflict_count: usize,
    pub evicted_count: usize,
    pub duration_ms: i64,
    pub error: Option<String>,
}

// ─────────────────────────────────────────────────────────────────────────
// Wire contract
// ─────────────────────────────────────────────────────────────────────────

/// One record as pushed to the server. Carries `client_id` plus all
/// user-visible fields; `local_id` and `server_id` never cross the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MealUpload {
    pub client_id: String,
    pub name: String,
    pub portion: String,
    pub calories: f64,
    pub sodium: f64,
    pub purine: f64,
    pub protein: Option<f64>,
    pub carbs: Option<f64>,
    pub fat: Option<f64>,
    pub fiber: Option<f64>,
    pub meal_type: MealType,
    pub category: FoodCategory,
    pub record_date: NaiveDate,
    pub note: Option<String>,
    pub image_url: Option<String>,
    pub ai_recognized: bool,
}

impl MealUpload {
    pub fn from_meal(meal: &Meal) -> Self {
        Self {
            client_id: meal.client_id.clone(),
            name: meal.name.clone(),
            portion: meal.portion.clone(),
            calories: meal.calories,
            sodium: meal.sodium,
            purine: meal.purine,
            protein: meal.protein,
            carbs: meal.carbs,
            fat: meal.fat,
            fiber: meal.fiber,
            meal_type: meal.meal_type,
            category: meal.category,
            record_date: meal.record_date,
            note: meal.note.clone(),
            image_url: meal.image_url.clone(),
            ai_recognized: meal.ai_recognized,
        }
    }
}

/// One record as returned by the server, carrying the server-assigned `id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerMeal {
    pub id: i64,
    pub client_id: String,
    pub name: String,
    pub portion: String,
    pub calories: f64,
    pub sodium: f64,
    pub purine: f64,
    pub protein: Option<f64>,
    pub carbs: Option<f64>,
    pub fat: Option<f64>,
    pub fiber: Option<f64>,
    pub meal_type: MealType,
    pub category: FoodCategory,
    pub record_date: NaiveDate,
    pub note: Option<String>,
    pub image_url: Option<String>,
    pub ai_recognized: bool,
    pub sync_status: SyncStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Batch push request: the full locally pending set plus the last successful
/// sync timestamp, which lets the server compute what changed since.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncBatchRequest {
    pub meals: Vec<MealUpload>,
    pub last_sync_at: Option<DateTime<Utc>>,
}

/// Batch push response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncBatchResponse {
    pub synced_count: i64,
    #[serde(default)]
    pub conflicts: Vec<String>,
    #[serde(default)]
    pub server_meals: Vec<ServerMeal>,
}

// ─────────────────────────────────────────────────────────────────────────
// Merge plan
// ─────────────────────────────────────────────────────────────────────────

/// The local writes derived from one server response, applied as a single
/// all-or-nothing batch.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MergePlan {
    /// Records to mark `Conflict`, keeping their local fields.
    pub flag_conflict: Vec<String>,
    /// Server copies to adopt: overwrite the matching local record (by
    /// `client_id`) as `Synced` with the server id, or insert a new local
    /// `Synced` record when no match exists.
    pub adopt: Vec<ServerMeal>,
}

impl MergePlan {
    pub fn is_empty(&self) -> bool {
        self.flag_conflict.is_empty() && self.adopt.is_empty()
    }
}

/// Counts of what a merge application actually changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeOutcome {
    pub adopted_updated: usize,
    pub adopted_inserted: usize,
    pub flagged_conflicts: usize,
}

// ─────────────────────────────────────────────────────────────────────────
// Seams
// ─────────────────────────────────────────────────────────────────────────

/// Persisted sync metadata: last successful reconciliation time and the
/// run-state flag. Updated only by the reconciliation engine.
#[async_trait]
pub trait SyncMetaRepositoryTrait: Send + Sync {
    fn last_synced_at(&self) -> Result<Option<DateTime<Utc>>>;
    async fn set_last_synced_at(&self, at: DateTime<Utc>) -> Result<()>;
    fn run_state(&self) -> Result<SyncRunState>;
    async fn set_run_state(&self, state: SyncRunState) -> Result<()>;
}

/// The network round-trip the engine performs once per cycle.
#[async_trait]
pub trait SyncTransport: Send + Sync {
    async fn push_batch(&self, request: SyncBatchRequest) -> Result<SyncBatchResponse>;
}

/// Connectivity probe consulted by the scheduler. Offline is not an error;
/// triggers are simply skipped.
pub trait ConnectivityMonitor: Send + Sync {
    fn is_online(&self) -> bool;
}

/// Fixed-answer connectivity monitor, togglable at runtime.
#[derive(Debug, Default)]
pub struct StaticConnectivity {
    online: std::sync::atomic::AtomicBool,
}

impl StaticConnectivity {
    pub fn new(online: bool) -> Self {
        Self {
            online: std::sync::atomic::AtomicBool::new(online),
        }
    }

    pub fn set_online(&self, online: bool) {
        self.online
            .store(online, std::sync::atomic::Ordering::Relaxed);
    }
}

impl ConnectivityMonitor for StaticConnectivity {
    fn is_online(&self) -> bool {
        self.online.load(std::sync::atomic::Ordering::Relaxed)
    }
}

/// Decision for one server-flagged conflict.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictDecision {
    /// Keep the local fields and mark the record `Conflict` for explicit
    /// resolution later.
    KeepLocalFlagged,
    /// Adopt the server copy and mark the record `Synced`.
    AdoptServer,
}

/// Pluggable policy for server-flagged conflicts. The upstream product
/// leaves resolution to the user, so the default keeps local data and
/// surfaces the conflict instead of guessing.
pub trait ConflictResolution: Send + Sync {
    fn resolve(&self, local: Option<&Meal>, server: Option<&ServerMeal>) -> ConflictDecision;
}

/// Default policy: never auto-resolve; flag for review.
#[derive(Debug, Clone, Copy, Default)]
pub struct FlagForReview;

impl ConflictResolution for FlagForReview {
    fn resolve(&self, _local: Option<&Meal>, _server: Option<&ServerMeal>) -> ConflictDecision {
        ConflictDecision::KeepLocalFlagged
    }
}

/// Alternative policy: the server copy wins whenever one is available.
#[derive(Debug, Clone, Copy, Default)]
pub struct ServerWins;

impl ConflictResolution for ServerWins {
    fn resolve(&self, _local: Option<&Meal>, server: Option<&ServerMeal>) -> ConflictDecision {
        if server.is_some() {
            ConflictDecision::AdoptServer
        } else {
            ConflictDecision::KeepLocalFlagged
        }
    }
}
