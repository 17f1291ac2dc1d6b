//! Database migrations

use crate::error::Result;
use rusqlite::Connection;

/// Current schema version
const CURRENT_VERSION: i32 = 2;

/// Run all pending migrations
pub fn run(conn: &Connection) -> Result<()> {
    let version = get_version(conn)?;

    if version < 1 {
        migrate_v1(conn)?;
    }
    if version < 2 {
        migrate_v2(conn)?;
    }

    Ok(())
}

/// Get the current schema version
fn get_version(conn: &Connection) -> Result<i32> {
    let exists: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_version')",
        [],
        |row| row.get(0),
    )?;

    if !exists {
        return Ok(0);
    }

    let version = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_version",
        [],
        |row| row.get(0),
    )?;

    Ok(version)
}

/// Run a migration's statements inside one transaction
fn apply(conn: &Connection, version: i32, statements: &[&str]) -> Result<()> {
    let tx = conn.unchecked_transaction()?;
    for stmt in statements {
        tx.execute(stmt, [])?;
    }
    tx.execute("INSERT INTO schema_version (version) VALUES (?1)", [version])?;
    tx.commit()?;

    tracing::info!("Migrated database to version {version}");
    Ok(())
}

/// Migration to version 1: Initial schema
fn migrate_v1(conn: &Connection) -> Result<()> {
    apply(
        conn,
        1,
        &[
            // Schema version tracking
            "CREATE TABLE IF NOT EXISTS schema_version (
                version INTEGER PRIMARY KEY
            )",
            // Tasks table
            "CREATE TABLE IF NOT EXISTS tasks (
                id TEXT PRIMARY KEY,
                title TEXT NOT NULL,
                estimated_minutes INTEGER NOT NULL CHECK (estimated_minutes >= 0),
                remaining_minutes INTEGER NOT NULL
                    CHECK (remaining_minutes >= 0 AND remaining_minutes <= estimated_minutes),
                is_active INTEGER NOT NULL DEFAULT 0,
                created_at INTEGER NOT NULL,
                modified_at INTEGER NOT NULL,
                remote_identifier TEXT
            )",
            "CREATE INDEX IF NOT EXISTS idx_tasks_created ON tasks(created_at)",
            // Settings table (local only)
            "CREATE TABLE IF NOT EXISTS settings (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            )",
        ],
    )
}

/// Migration to version 2: one local task per remote record
fn migrate_v2(conn: &Connection) -> Result<()> {
    apply(
        conn,
        2,
        &[
            "CREATE UNIQUE INDEX IF NOT EXISTS idx_tasks_remote_identifier
             ON tasks(remote_identifier) WHERE remote_identifier IS NOT NULL",
            "CREATE INDEX IF NOT EXISTS idx_tasks_active ON tasks(is_active)",
        ],
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> Connection {
        Connection::open_in_memory().unwrap()
    }

    #[test]
    fn test_migrations() {
        let conn = setup();
        run(&conn).unwrap();

        let version = get_version(&conn).unwrap();
        assert_eq!(version, CURRENT_VERSION);
    }

    #[test]
    fn test_migrations_idempotent() {
        let conn = setup();
        run(&conn).unwrap();
        run(&conn).unwrap(); // Should not fail

        let version = get_version(&conn).unwrap();
        assert_eq!(version, CURRENT_VERSION);
    }

    #[test]
    fn test_remote_identifier_is_unique() {
        let conn = setup();
        run(&conn).unwrap();

        let insert = "INSERT INTO tasks
            (id, title, estimated_minutes, remaining_minutes, is_active, created_at, modified_at, remote_identifier)
            VALUES (?1, 'T', 10, 10, 0, 0, 0, ?2)";
        conn.execute(insert, rusqlite::params!["a", "R1"]).unwrap();
        conn.execute(insert, rusqlite::params!["b", Option::<String>::None])
            .unwrap();
        conn.execute(insert, rusqlite::params!["c", Option::<String>::None])
            .unwrap();
        assert!(conn.execute(insert, rusqlite::params!["d", "R1"]).is_err());
    }

    #[test]
    fn test_remaining_cannot_exceed_estimate() {
        let conn = setup();
        run(&conn).unwrap();

        let result = conn.execute(
            "INSERT INTO tasks
                (id, title, estimated_minutes, remaining_minutes, is_active, created_at, modified_at)
                VALUES ('x', 'T', 10, 20, 0, 0, 0)",
            [],
        );
        assert!(result.is_err());
    }
}
