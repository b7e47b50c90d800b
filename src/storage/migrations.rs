//! Schema migrations for [`super::SqliteStore`].
//!
//! Each migration runs in its own transaction and is recorded in the
//! `schema_migrations` table; applied versions are skipped on the next open.

use rusqlite::Connection;

use crate::storage::{StorageError, StorageResult};

/// Latest schema version.
pub const CURRENT_SCHEMA_VERSION: i32 = 2;

#[derive(Debug, Clone)]
pub struct Migration {
    pub version: i32,
    pub name: String,
    pub sql: String,
}

impl Migration {
    pub fn new(version: i32, name: impl Into<String>, sql: impl Into<String>) -> Self {
        Self {
            version,
            name: name.into(),
            sql: sql.into(),
        }
    }
}

/// All migrations, ordered by version.
pub fn get_migrations() -> Vec<Migration> {
    vec![
        Migration::new(
            1,
            "initial tables",
            r#"
            CREATE TABLE IF NOT EXISTS review_records (
                user_id TEXT NOT NULL,
                item_id TEXT NOT NULL,
                payload TEXT NOT NULL,
                next_due_ms INTEGER NOT NULL,
                updated_at INTEGER NOT NULL,
                PRIMARY KEY (user_id, item_id)
            );

            CREATE TABLE IF NOT EXISTS user_stats (
                user_id TEXT PRIMARY KEY,
                payload TEXT NOT NULL,
                updated_at INTEGER NOT NULL
            );

            CREATE TABLE IF NOT EXISTS activity_events (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id TEXT NOT NULL,
                item_id TEXT NOT NULL,
                is_correct INTEGER NOT NULL,
                session_type TEXT NOT NULL,
                timestamp_ms INTEGER NOT NULL
            );

            CREATE TABLE IF NOT EXISTS learning_goals (
                user_id TEXT PRIMARY KEY,
                payload TEXT NOT NULL,
                updated_at INTEGER NOT NULL
            );
            "#,
        ),
        Migration::new(
            2,
            "indexes and score history",
            r#"
            CREATE INDEX IF NOT EXISTS idx_activity_user_time
                ON activity_events(user_id, timestamp_ms DESC, id DESC);

            CREATE INDEX IF NOT EXISTS idx_review_user_due
                ON review_records(user_id, next_due_ms);

            CREATE TABLE IF NOT EXISTS score_history (
                user_id TEXT PRIMARY KEY,
                payload TEXT NOT NULL,
                updated_at INTEGER NOT NULL
            );
            "#,
        ),
    ]
}

fn ensure_migrations_table(conn: &Connection) -> StorageResult<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS schema_migrations (
            version INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            applied_at INTEGER NOT NULL
        );
        "#,
    )
    .map_err(|e| StorageError::Migration(format!("failed to create schema_migrations: {e}")))?;

    Ok(())
}

/// Highest applied version, 0 for a fresh database.
pub fn get_current_version(conn: &Connection) -> i32 {
    if ensure_migrations_table(conn).is_err() {
        return 0;
    }

    conn.query_row("SELECT COALESCE(MAX(version), 0) FROM schema_migrations", [], |row| row.get(0))
        .unwrap_or(0)
}

fn get_applied_versions(conn: &Connection) -> StorageResult<Vec<i32>> {
    let mut stmt = conn.prepare("SELECT version FROM schema_migrations ORDER BY version")?;
    let versions = stmt
        .query_map([], |row| row.get(0))?
        .filter_map(|r| r.ok())
        .collect();

    Ok(versions)
}

pub fn run_migrations(conn: &Connection) -> StorageResult<i32> {
    ensure_migrations_table(conn)?;

    let applied = get_applied_versions(conn)?;
    let mut version = get_current_version(conn);

    tracing::debug!(current = version, target = CURRENT_SCHEMA_VERSION, "checking schema version");

    for migration in get_migrations() {
        if applied.contains(&migration.version) {
            continue;
        }

        tracing::info!(version = migration.version, name = %migration.name, "running migration");
        if let Err(err) = apply(conn, &migration) {
            tracing::error!(version = migration.version, error = %err, "migration failed");
            return Err(err);
        }
        version = migration.version;
    }

    Ok(version)
}

fn apply(conn: &Connection, migration: &Migration) -> StorageResult<()> {
    let tx = conn.unchecked_transaction()?;

    tx.execute_batch(&migration.sql)
        .map_err(|e| StorageError::Migration(format!("v{} ({}): {e}", migration.version, migration.name)))?;

    tx.execute(
        "INSERT INTO schema_migrations (version, name, applied_at) VALUES (?1, ?2, ?3)",
        rusqlite::params![migration.version, migration.name, chrono::Utc::now().timestamp()],
    )?;

    tx.commit()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_database_reaches_current_version() {
        let conn = Connection::open_in_memory().unwrap();
        assert_eq!(get_current_version(&conn), 0);
        assert_eq!(run_migrations(&conn).unwrap(), CURRENT_SCHEMA_VERSION);
        assert_eq!(get_current_version(&conn), CURRENT_SCHEMA_VERSION);
    }

    #[test]
    fn migrations_are_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();
        assert_eq!(run_migrations(&conn).unwrap(), CURRENT_SCHEMA_VERSION);
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM schema_migrations", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, CURRENT_SCHEMA_VERSION as i64);
    }

    #[test]
    fn versions_are_strictly_increasing() {
        let migrations = get_migrations();
        assert!(migrations.windows(2).all(|w| w[0].version < w[1].version));
        assert_eq!(migrations.last().map(|m| m.version), Some(CURRENT_SCHEMA_VERSION));
    }
}
