//! SQLite-backed store.
//!
//! Review records, stats, goals and score history are stored as JSON payload
//! columns next to the few fields that need indexing. Activity events get
//! their own columns since they are queried by time.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use crate::config::RetentionParams;
use crate::storage::{decode_lossy, migrations, retention_cutoff, LearnerStore, StorageError, StorageResult};
use crate::types::{ActivityEvent, LearningGoal, ReviewRecord, UserStats};

pub struct SqliteStore {
    connection: Mutex<Connection>,
    db_path: String,
}

impl SqliteStore {
    /// Open (or create) a database file and bring the schema up to date.
    pub fn open<P: AsRef<Path>>(db_path: P) -> StorageResult<Self> {
        let path_str = db_path.as_ref().to_string_lossy().to_string();
        let connection = Connection::open(&db_path)?;

        connection.execute_batch(
            "PRAGMA journal_mode=WAL;
             PRAGMA synchronous=NORMAL;",
        )?;

        Self::init(connection, path_str)
    }

    /// In-memory database, for tests.
    pub fn in_memory() -> StorageResult<Self> {
        let connection = Connection::open_in_memory()?;
        Self::init(connection, ":memory:".to_string())
    }

    fn init(connection: Connection, db_path: String) -> StorageResult<Self> {
        migrations::run_migrations(&connection)?;
        Ok(Self {
            connection: Mutex::new(connection),
            db_path,
        })
    }

    pub fn db_path(&self) -> &str {
        &self.db_path
    }

    fn conn(&self) -> StorageResult<MutexGuard<'_, Connection>> {
        self.connection
            .lock()
            .map_err(|e| StorageError::LockError(e.to_string()))
    }

    fn load_payload(&self, table: &'static str, user_id: &str) -> StorageResult<Option<String>> {
        let conn = self.conn()?;
        let sql = format!("SELECT payload FROM {table} WHERE user_id = ?1");
        let payload = conn
            .query_row(&sql, params![user_id], |row| row.get::<_, String>(0))
            .optional()?;
        Ok(payload)
    }

    fn save_payload(&self, table: &'static str, user_id: &str, payload: &str) -> StorageResult<()> {
        let conn = self.conn()?;
        let sql = format!(
            "INSERT INTO {table} (user_id, payload, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(user_id) DO UPDATE SET payload = excluded.payload, updated_at = excluded.updated_at"
        );
        conn.execute(&sql, params![user_id, payload, Utc::now().timestamp_millis()])?;
        Ok(())
    }
}

impl LearnerStore for SqliteStore {
    fn load_review(&self, user_id: &str, item_id: &str) -> StorageResult<Option<ReviewRecord>> {
        let raw: Option<String> = {
            let conn = self.conn()?;
            conn.query_row(
                "SELECT payload FROM review_records WHERE user_id = ?1 AND item_id = ?2",
                params![user_id, item_id],
                |row| row.get(0),
            )
            .optional()?
        };
        Ok(raw.and_then(|raw| decode_lossy("review_record", user_id, &raw)))
    }

    fn save_review(&self, user_id: &str, record: &ReviewRecord) -> StorageResult<()> {
        let payload = serde_json::to_string(record)?;
        let conn = self.conn()?;
        conn.execute(
            r#"
            INSERT INTO review_records (user_id, item_id, payload, next_due_ms, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT(user_id, item_id) DO UPDATE SET
                payload = excluded.payload,
                next_due_ms = excluded.next_due_ms,
                updated_at = excluded.updated_at
            "#,
            params![
                user_id,
                record.item_id,
                payload,
                record.next_due.timestamp_millis(),
                Utc::now().timestamp_millis()
            ],
        )?;
        Ok(())
    }

    fn reviews_for_user(&self, user_id: &str) -> StorageResult<Vec<ReviewRecord>> {
        let rows: Vec<String> = {
            let conn = self.conn()?;
            let mut stmt = conn.prepare("SELECT payload FROM review_records WHERE user_id = ?1 ORDER BY item_id")?;
            let rows: Vec<String> = stmt
                .query_map(params![user_id], |row| row.get::<_, String>(0))?
                .filter_map(|r| r.ok())
                .collect();
            rows
        };
        Ok(rows
            .iter()
            .filter_map(|raw| decode_lossy("review_record", user_id, raw))
            .collect())
    }

    fn load_stats(&self, user_id: &str) -> StorageResult<Option<UserStats>> {
        let raw = self.load_payload("user_stats", user_id)?;
        Ok(raw.and_then(|raw| decode_lossy("user_stats", user_id, &raw)))
    }

    fn save_stats(&self, user_id: &str, stats: &UserStats) -> StorageResult<()> {
        let payload = serde_json::to_string(stats)?;
        self.save_payload("user_stats", user_id, &payload)
    }

    fn append_activity(&self, user_id: &str, event: &ActivityEvent) -> StorageResult<()> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO activity_events (user_id, item_id, is_correct, session_type, timestamp_ms)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                user_id,
                event.item_id,
                event.is_correct as i32,
                event.session_type,
                event.timestamp.timestamp_millis()
            ],
        )?;
        Ok(())
    }

    fn recent_activity(&self, user_id: &str, limit: usize) -> StorageResult<Vec<ActivityEvent>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT item_id, is_correct, session_type, timestamp_ms FROM activity_events
             WHERE user_id = ?1 ORDER BY timestamp_ms DESC, id DESC LIMIT ?2",
        )?;

        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let events = stmt
            .query_map(params![user_id, limit], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, i32>(1)? != 0,
                    row.get::<_, String>(2)?,
                    row.get::<_, i64>(3)?,
                ))
            })?
            .filter_map(|r| r.ok())
            .filter_map(|(item_id, is_correct, session_type, ms)| match DateTime::<Utc>::from_timestamp_millis(ms) {
                Some(timestamp) => Some(ActivityEvent {
                    timestamp,
                    item_id,
                    is_correct,
                    session_type,
                }),
                None => {
                    tracing::warn!(user_id, timestamp_ms = ms, "skipping activity event with invalid timestamp");
                    None
                }
            })
            .collect();

        Ok(events)
    }

    fn prune_activity(&self, user_id: &str, now: DateTime<Utc>, retention: &RetentionParams) -> StorageResult<usize> {
        let cutoff = retention_cutoff(now, retention).timestamp_millis();
        let limit = i64::try_from(retention.activity_limit).unwrap_or(i64::MAX);

        let conn = self.conn()?;
        let tx = conn.unchecked_transaction()?;
        let expired = tx.execute(
            "DELETE FROM activity_events WHERE user_id = ?1 AND timestamp_ms < ?2",
            params![user_id, cutoff],
        )?;
        let overflow = tx.execute(
            "DELETE FROM activity_events WHERE user_id = ?1 AND id NOT IN (
                SELECT id FROM activity_events WHERE user_id = ?1
                ORDER BY timestamp_ms DESC, id DESC LIMIT ?2
            )",
            params![user_id, limit],
        )?;
        tx.commit()?;

        if expired + overflow > 0 {
            tracing::debug!(user_id, expired, overflow, "pruned activity log");
        }
        Ok(expired + overflow)
    }

    fn load_goals(&self, user_id: &str) -> StorageResult<Vec<LearningGoal>> {
        let raw = self.load_payload("learning_goals", user_id)?;
        Ok(raw
            .and_then(|raw| decode_lossy("learning_goals", user_id, &raw))
            .unwrap_or_default())
    }

    fn save_goals(&self, user_id: &str, goals: &[LearningGoal]) -> StorageResult<()> {
        let payload = serde_json::to_string(goals)?;
        self.save_payload("learning_goals", user_id, &payload)
    }

    fn load_scores(&self, user_id: &str) -> StorageResult<Vec<f64>> {
        let raw = self.load_payload("score_history", user_id)?;
        Ok(raw
            .and_then(|raw| decode_lossy("score_history", user_id, &raw))
            .unwrap_or_default())
    }

    fn save_scores(&self, user_id: &str, scores: &[f64]) -> StorageResult<()> {
        let payload = serde_json::to_string(scores)?;
        self.save_payload("score_history", user_id, &payload)
    }
}
