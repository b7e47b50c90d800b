//! In-memory store.
//!
//! Used by tests and by embedders that keep state elsewhere and only need the
//! engine's bookkeeping for the lifetime of the process.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};

use crate::config::RetentionParams;
use crate::storage::{retention_cutoff, LearnerStore, StorageError, StorageResult};
use crate::types::{ActivityEvent, ItemId, LearningGoal, ReviewRecord, UserStats};

#[derive(Debug, Default)]
struct UserBucket {
    reviews: HashMap<ItemId, ReviewRecord>,
    stats: Option<UserStats>,
    /// Append order.
    activity: Vec<ActivityEvent>,
    goals: Vec<LearningGoal>,
    scores: Vec<f64>,
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    users: Mutex<HashMap<String, UserBucket>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> StorageResult<MutexGuard<'_, HashMap<String, UserBucket>>> {
        self.users
            .lock()
            .map_err(|e| StorageError::LockError(e.to_string()))
    }

    fn read<T>(&self, user_id: &str, f: impl FnOnce(&UserBucket) -> T) -> StorageResult<Option<T>> {
        let users = self.lock()?;
        Ok(users.get(user_id).map(f))
    }

    fn write<T>(&self, user_id: &str, f: impl FnOnce(&mut UserBucket) -> T) -> StorageResult<T> {
        let mut users = self.lock()?;
        Ok(f(users.entry(user_id.to_string()).or_default()))
    }
}

impl LearnerStore for MemoryStore {
    fn load_review(&self, user_id: &str, item_id: &str) -> StorageResult<Option<ReviewRecord>> {
        Ok(self
            .read(user_id, |bucket| bucket.reviews.get(item_id).cloned())?
            .flatten())
    }

    fn save_review(&self, user_id: &str, record: &ReviewRecord) -> StorageResult<()> {
        self.write(user_id, |bucket| {
            bucket.reviews.insert(record.item_id.clone(), record.clone());
        })
    }

    fn reviews_for_user(&self, user_id: &str) -> StorageResult<Vec<ReviewRecord>> {
        let mut records = self
            .read(user_id, |bucket| bucket.reviews.values().cloned().collect::<Vec<_>>())?
            .unwrap_or_default();
        records.sort_by(|a, b| a.item_id.cmp(&b.item_id));
        Ok(records)
    }

    fn load_stats(&self, user_id: &str) -> StorageResult<Option<UserStats>> {
        Ok(self.read(user_id, |bucket| bucket.stats.clone())?.flatten())
    }

    fn save_stats(&self, user_id: &str, stats: &UserStats) -> StorageResult<()> {
        self.write(user_id, |bucket| bucket.stats = Some(stats.clone()))
    }

    fn append_activity(&self, user_id: &str, event: &ActivityEvent) -> StorageResult<()> {
        self.write(user_id, |bucket| bucket.activity.push(event.clone()))
    }

    fn recent_activity(&self, user_id: &str, limit: usize) -> StorageResult<Vec<ActivityEvent>> {
        Ok(self
            .read(user_id, |bucket| newest_first(&bucket.activity, limit))?
            .unwrap_or_default())
    }

    fn prune_activity(&self, user_id: &str, now: DateTime<Utc>, retention: &RetentionParams) -> StorageResult<usize> {
        let cutoff = retention_cutoff(now, retention);
        self.write(user_id, |bucket| {
            let before = bucket.activity.len();
            let mut kept = newest_first(&bucket.activity, retention.activity_limit);
            kept.retain(|e| e.timestamp >= cutoff);
            kept.reverse();
            bucket.activity = kept;
            before - bucket.activity.len()
        })
    }

    fn load_goals(&self, user_id: &str) -> StorageResult<Vec<LearningGoal>> {
        Ok(self.read(user_id, |bucket| bucket.goals.clone())?.unwrap_or_default())
    }

    fn save_goals(&self, user_id: &str, goals: &[LearningGoal]) -> StorageResult<()> {
        self.write(user_id, |bucket| bucket.goals = goals.to_vec())
    }

    fn load_scores(&self, user_id: &str) -> StorageResult<Vec<f64>> {
        Ok(self.read(user_id, |bucket| bucket.scores.clone())?.unwrap_or_default())
    }

    fn save_scores(&self, user_id: &str, scores: &[f64]) -> StorageResult<()> {
        self.write(user_id, |bucket| bucket.scores = scores.to_vec())
    }
}

/// Later appends win ties on timestamp, matching the SQLite ordering.
fn newest_first(events: &[ActivityEvent], limit: usize) -> Vec<ActivityEvent> {
    let mut indexed: Vec<(usize, &ActivityEvent)> = events.iter().enumerate().collect();
    indexed.sort_by(|(ia, a), (ib, b)| b.timestamp.cmp(&a.timestamp).then_with(|| ib.cmp(ia)));
    indexed.into_iter().take(limit).map(|(_, e)| e.clone()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn at(days_ago: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 4, 1, 10, 0, 0).unwrap() - Duration::days(days_ago)
    }

    #[test]
    fn users_are_isolated() {
        let store = MemoryStore::new();
        store.save_stats("alice", &UserStats::default()).unwrap();
        assert!(store.load_stats("alice").unwrap().is_some());
        assert!(store.load_stats("bob").unwrap().is_none());
        assert!(store.recent_activity("bob", 10).unwrap().is_empty());
    }

    #[test]
    fn recent_activity_is_newest_first() {
        let store = MemoryStore::new();
        for (i, days) in [3, 1, 2].iter().enumerate() {
            store
                .append_activity("u", &ActivityEvent::new(at(*days), format!("w{i}"), true, "quiz"))
                .unwrap();
        }
        let recent = store.recent_activity("u", 2).unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].item_id, "w1");
        assert_eq!(recent[1].item_id, "w2");
    }

    #[test]
    fn prune_applies_window_and_limit() {
        let store = MemoryStore::new();
        let retention = RetentionParams {
            activity_limit: 3,
            activity_retention_days: 30,
        };
        store.append_activity("u", &ActivityEvent::new(at(45), "old", true, "quiz")).unwrap();
        for i in 0..5 {
            store
                .append_activity("u", &ActivityEvent::new(at(5 - i), format!("w{i}"), true, "quiz"))
                .unwrap();
        }
        let removed = store.prune_activity("u", at(0), &retention).unwrap();
        assert_eq!(removed, 3);
        let ids: Vec<String> = store.recent_activity("u", 10).unwrap().into_iter().map(|e| e.item_id).collect();
        assert_eq!(ids, vec!["w4", "w3", "w2"]);
    }
}
