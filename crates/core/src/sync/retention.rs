//! Cache retention policy: bounds local storage growth after sync.

use chrono::{Duration, NaiveDate};

/// Default retention window in days.
pub const RETENTION_WINDOW_DAYS: i64 = 30;

/// Eviction policy for old, fully synced records.
///
/// Only `Synced` records strictly older than the cutoff are eligible;
/// `Pending` and `Conflict` records are never evicted regardless of age,
/// since data not yet confirmed safe on the server must not be lost. Runs
/// only as the engine's post-sync step, never concurrently with a cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetentionPolicy {
    window_days: i64,
}

impl RetentionPolicy {
    pub fn new(window_days: i64) -> Self {
        Self { window_days }
    }

    /// Records dated strictly before this cutoff are eligible for eviction.
    /// A record dated exactly at the cutoff survives.
    pub fn cutoff(&self, today: NaiveDate) -> NaiveDate {
        today - Duration::days(self.window_days)
    }
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        Self::new(RETENTION_WINDOW_DAYS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cutoff_is_window_days_before_today() {
        let policy = RetentionPolicy::default();
        let today = NaiveDate::from_ymd_opt(2026, 8, 6).unwrap();
        assert_eq!(
            policy.cutoff(today),
            NaiveDate::from_ymd_opt(2026, 7, 7).unwrap()
        );
    }

    #[test]
    fn custom_window_is_respected() {
        let policy = RetentionPolicy::new(7);
        let today = NaiveDate::from_ymd_opt(2026, 8, 6).unwrap();
        assert_eq!(
            policy.cutoff(today),
            NaiveDate::from_ymd_opt(2026, 7, 30).unwrap()
        );
    }
}
