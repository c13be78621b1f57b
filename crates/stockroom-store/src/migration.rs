//! Database schema migrations for SQLite.
//!
//! Versioned migrations: each one moves the schema from version N to N+1
//! inside a single transaction.

use rusqlite::Connection;

use crate::error::{Result, StoreError};

/// Current schema version.
pub const CURRENT_VERSION: u32 = 1;

/// Initialize or migrate the database schema. Idempotent.
pub fn migrate(conn: &mut Connection) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version INTEGER PRIMARY KEY,
            applied_at INTEGER NOT NULL
        )",
        [],
    )?;

    let current: u32 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_migrations",
        [],
        |row| row.get(0),
    )?;

    if current > CURRENT_VERSION {
        return Err(StoreError::Migration(format!(
            "database schema version {} is newer than supported version {}",
            current, CURRENT_VERSION
        )));
    }

    if current < CURRENT_VERSION {
        let tx = conn.transaction()?;

        for version in (current + 1)..=CURRENT_VERSION {
            apply_migration(&tx, version)?;

            tx.execute(
                "INSERT INTO schema_migrations (version, applied_at) VALUES (?1, ?2)",
                rusqlite::params![version, now_millis()],
            )?;
            tracing::debug!(version, "applied schema migration");
        }

        tx.commit()?;
    }

    Ok(())
}

fn apply_migration(conn: &Connection, version: u32) -> Result<()> {
    match version {
        1 => apply_v1(conn),
        _ => Err(StoreError::Migration(format!(
            "unknown migration version: {}",
            version
        ))),
    }
}

/// Migration v1: Initial schema.
fn apply_v1(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        -- Structural elements of every kind except groups
        CREATE TABLE elements (
            id INTEGER PRIMARY KEY,
            kind TEXT NOT NULL,               -- EntityKind, snake_case
            name TEXT NOT NULL,
            comment TEXT NOT NULL DEFAULT '',
            parent_id INTEGER,                -- same kind, NULL for roots
            created_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL
        );

        -- "groups" is a keyword in SQLite
        CREATE TABLE user_groups (
            id INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            comment TEXT NOT NULL DEFAULT '',
            parent_id INTEGER,
            created_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL
        );

        CREATE TABLE users (
            id INTEGER PRIMARY KEY,
            name TEXT NOT NULL UNIQUE,
            first_name TEXT NOT NULL DEFAULT '',
            last_name TEXT NOT NULL DEFAULT '',
            email TEXT NOT NULL DEFAULT '',
            group_id INTEGER,
            created_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL
        );

        -- One packed 32 bit value per owner and category
        CREATE TABLE permissions (
            owner_kind TEXT NOT NULL,         -- 'user' or 'group'
            owner_id INTEGER NOT NULL,
            category TEXT NOT NULL,
            raw INTEGER NOT NULL,
            PRIMARY KEY (owner_kind, owner_id, category)
        );

        CREATE INDEX idx_elements_kind ON elements(kind);
        CREATE INDEX idx_elements_parent ON elements(parent_id);
        CREATE INDEX idx_user_groups_parent ON user_groups(parent_id);
        CREATE INDEX idx_users_group ON users(group_id);
        "#,
    )?;

    Ok(())
}

/// Current time in milliseconds since the Unix epoch.
pub(crate) fn now_millis() -> i64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}
