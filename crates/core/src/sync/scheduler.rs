//! Sync scheduler: decides when a reconciliation cycle runs and guarantees
//! at most one runs at a time.

use chrono::Utc;
use log::{debug, warn};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

use crate::errors::Result;

use super::engine::SyncEngine;
use super::sync_model::{ConnectivityMonitor, SyncCycleReport, SyncCycleStatus, SyncTrigger};

/// Periodic cycle cadence in seconds.
pub const SYNC_PERIODIC_INTERVAL_SECS: u64 = 180;

/// Maximum jitter (seconds) added to periodic cycle intervals.
pub const SYNC_INTERVAL_JITTER_SECS: u64 = 15;

/// Exponential backoff in seconds with cap, keyed on consecutive failures.
pub fn backoff_seconds(consecutive_failures: i32) -> i64 {
    const MAX_EXPONENT: i32 = 8;
    const BASE_DELAY_SECONDS: i64 = 5;

    let capped = i64::from(consecutive_failures.clamp(0, MAX_EXPONENT));
    2_i64.pow(capped as u32) * BASE_DELAY_SECONDS
}

/// What the scheduler did with a trigger.
#[derive(Debug, Clone, PartialEq)]
pub enum TriggerOutcome {
    /// A cycle ran to completion (successfully or not; see the report).
    Completed(SyncCycleReport),
    /// The device is offline; the trigger was skipped without error state.
    Offline,
    /// A cycle is already in flight; the trigger was dropped, not queued.
    AlreadySyncing,
}

/// Injectable scheduler with no process-global state. Triggers are explicit
/// values, so ordering and single-flight behavior are testable without real
/// timers or connectivity events.
pub struct SyncScheduler {
    engine: Arc<SyncEngine>,
    connectivity: Arc<dyn ConnectivityMonitor>,
    in_flight: Mutex<()>,
}

impl SyncScheduler {
    pub fn new(engine: Arc<SyncEngine>, connectivity: Arc<dyn ConnectivityMonitor>) -> Self {
        Self {
            engine,
            connectivity,
            in_flight: Mutex::new(()),
        }
    }

    /// Handle one trigger. If offline or already syncing this is a no-op;
    /// otherwise exactly one engine cycle runs. There is no mid-cycle
    /// cancellation: a cycle completes or fails on its own.
    pub async fn handle_trigger(&self, trigger: SyncTrigger) -> Result<TriggerOutcome> {
        if !self.connectivity.is_online() {
            debug!("Sync trigger {:?} skipped: offline", trigger);
            return Ok(TriggerOutcome::Offline);
        }

        // Single-flight: a concurrent trigger is dropped, never queued, so
        // the same pending set is never pushed twice in parallel.
        let Ok(_guard) = self.in_flight.try_lock() else {
            debug!("Sync trigger {:?} dropped: cycle already in flight", trigger);
            return Ok(TriggerOutcome::AlreadySyncing);
        };

        debug!("Sync trigger {:?} starting cycle", trigger);
        let report = self.engine.run_cycle().await?;
        Ok(TriggerOutcome::Completed(report))
    }

    /// Spawn the periodic trigger loop. Failed cycles stretch the delay with
    /// capped exponential backoff; the next trigger retries wholesale.
    pub fn spawn_periodic(self: &Arc<Self>, interval: Duration) -> tokio::task::JoinHandle<()> {
        let scheduler = Arc::clone(self);
        tokio::spawn(async move {
            let mut consecutive_failures: i32 = 0;
            loop {
                let jitter_bound = SYNC_INTERVAL_JITTER_SECS.saturating_mul(1000);
                let jitter_ms = if jitter_bound > 0 {
                    Utc::now().timestamp_millis().unsigned_abs() % jitter_bound
                } else {
                    0
                };
                let mut delay_ms = interval.as_millis() as u64 + jitter_ms;
                if consecutive_failures > 0 {
                    let backoff_ms = backoff_seconds(consecutive_failures)
                        .saturating_mul(1000)
                        .unsigned_abs();
                    delay_ms = delay_ms.max(backoff_ms);
                }
                tokio::time::sleep(Duration::from_millis(delay_ms)).await;

                match scheduler.handle_trigger(SyncTrigger::Periodic).await {
                    Ok(TriggerOutcome::Completed(report)) => {
                        if report.status == SyncCycleStatus::Ok {
                            consecutive_failures = 0;
                        } else {
                            consecutive_failures = consecutive_failures.saturating_add(1);
                        }
                    }
                    Ok(TriggerOutcome::Offline) | Ok(TriggerOutcome::AlreadySyncing) => {}
                    Err(err) => {
                        warn!("Periodic sync trigger failed: {}", err);
                        consecutive_failures = consecutive_failures.saturating_add(1);
                    }
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_is_exponential_and_capped() {
        assert_eq!(backoff_seconds(0), 5);
        assert_eq!(backoff_seconds(1), 10);
        assert_eq!(backoff_seconds(2), 20);
        assert_eq!(backoff_seconds(9), backoff_seconds(8));
    }
}
