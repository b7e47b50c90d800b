//! Per-user persistence for review records, stats, activity and goals.
//!
//! Stores are device-local and allowed to be lossy: a record that cannot be
//! decoded is reported as absent rather than failing the caller.
//!
//! - [`MemoryStore`] keeps everything in a `Mutex<HashMap>`
//! - [`SqliteStore`] persists to SQLite with versioned migrations

// ============================================================
// Submodules
// ============================================================

pub mod memory;
pub mod migrations;
pub mod sqlite;

pub use memory::MemoryStore;
pub use migrations::run_migrations;
pub use sqlite::SqliteStore;

use chrono::{DateTime, Duration, Utc};
use thiserror::Error;

use crate::config::RetentionParams;
use crate::types::{ActivityEvent, LearningGoal, ReviewRecord, UserStats};

// ============================================================
// Errors
// ============================================================

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("migration error: {0}")]
    Migration(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("lock poisoned: {0}")]
    LockError(String),
}

pub type StorageResult<T> = Result<T, StorageError>;

// ============================================================
// LearnerStore
// ============================================================

/// Storage seam consumed by [`crate::engine::AdaptiveEngine`].
///
/// All methods are scoped to one user. Implementations must not fail on a
/// corrupt payload; they log it and behave as if nothing was stored.
pub trait LearnerStore: Send + Sync {
    fn load_review(&self, user_id: &str, item_id: &str) -> StorageResult<Option<ReviewRecord>>;

    /// Insert or replace the record for `record.item_id`.
    fn save_review(&self, user_id: &str, record: &ReviewRecord) -> StorageResult<()>;

    fn reviews_for_user(&self, user_id: &str) -> StorageResult<Vec<ReviewRecord>>;

    fn load_stats(&self, user_id: &str) -> StorageResult<Option<UserStats>>;

    fn save_stats(&self, user_id: &str, stats: &UserStats) -> StorageResult<()>;

    fn append_activity(&self, user_id: &str, event: &ActivityEvent) -> StorageResult<()>;

    /// Most recent first.
    fn recent_activity(&self, user_id: &str, limit: usize) -> StorageResult<Vec<ActivityEvent>>;

    /// Drop events outside the retention window and beyond the newest
    /// `activity_limit`. Returns how many were removed.
    fn prune_activity(&self, user_id: &str, now: DateTime<Utc>, retention: &RetentionParams) -> StorageResult<usize>;

    fn load_goals(&self, user_id: &str) -> StorageResult<Vec<LearningGoal>>;

    fn save_goals(&self, user_id: &str, goals: &[LearningGoal]) -> StorageResult<()>;

    /// Session performance scores, oldest first.
    fn load_scores(&self, user_id: &str) -> StorageResult<Vec<f64>>;

    fn save_scores(&self, user_id: &str, scores: &[f64]) -> StorageResult<()>;
}

/// Oldest timestamp still inside the retention window. Saturates at the
/// earliest representable instant, which keeps everything.
pub fn retention_cutoff(now: DateTime<Utc>, retention: &RetentionParams) -> DateTime<Utc> {
    Duration::try_days(retention.activity_retention_days.max(0))
        .and_then(|window| now.checked_sub_signed(window))
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

/// Decode a stored JSON payload, logging and discarding anything unreadable.
pub(crate) fn decode_lossy<T: serde::de::DeserializeOwned>(kind: &'static str, user_id: &str, raw: &str) -> Option<T> {
    match serde_json::from_str(raw) {
        Ok(value) => Some(value),
        Err(err) => {
            tracing::warn!(error = %err, kind, user_id, "discarding unreadable stored record");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn retention_cutoff_subtracts_window() {
        let now = Utc.with_ymd_and_hms(2026, 5, 2, 8, 30, 0).unwrap();
        let cutoff = retention_cutoff(now, &RetentionParams::default());
        assert_eq!(cutoff, now - Duration::days(30));
    }

    #[test]
    fn huge_retention_window_saturates() {
        let now = Utc.with_ymd_and_hms(2026, 5, 2, 8, 30, 0).unwrap();
        for days in [1_000_000_000, i64::MAX] {
            let retention = RetentionParams {
                activity_limit: 100,
                activity_retention_days: days,
            };
            assert_eq!(retention_cutoff(now, &retention), DateTime::<Utc>::MIN_UTC);
        }
    }
}
