//! Migration runner.
//!
//! Runs on every cold start. All statements are `IF NOT EXISTS`, so the
//! runner is safe to call any number of times. There are no data migrations;
//! the applied version is recorded in `PRAGMA user_version`.

use rusqlite::Connection;

use crate::{LocalDbError, Result, SCHEMA_VERSION, schema};

/// Bring the schema on `conn` to [`SCHEMA_VERSION`].
///
/// Any failing statement aborts the run and is returned to the caller.
pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;

    let current_version: u32 = conn.query_row("PRAGMA user_version", [], |row| row.get(0))?;
    if current_version > SCHEMA_VERSION {
        return Err(LocalDbError::Migration(format!(
            "Database version {current_version} is newer than supported {SCHEMA_VERSION}"
        )));
    }

    for statement in schema::SCHEMA_V1 {
        conn.execute_batch(statement)?;
    }

    if current_version < SCHEMA_VERSION {
        tracing::info!(
            from = current_version,
            to = SCHEMA_VERSION,
            "Local schema upgraded"
        );
        conn.execute_batch(&format!("PRAGMA user_version = {SCHEMA_VERSION};"))?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table_count(conn: &Connection, name: &str) -> i64 {
        conn.query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
            [name],
            |row| row.get(0),
        )
        .expect("count")
    }

    #[test]
    fn test_fresh_migration() {
        let conn = Connection::open_in_memory().expect("open");
        run(&conn).expect("migrate");

        let version: u32 = conn
            .query_row("PRAGMA user_version", [], |row| row.get(0))
            .expect("version");
        assert_eq!(version, SCHEMA_VERSION);

        for table in [
            "meta",
            "topics",
            "flashcards",
            "quizzes",
            "quiz_questions",
            "quiz_options",
            "mind_maps",
        ] {
            assert_eq!(table_count(&conn, table), 1, "missing table {table}");
        }
    }

    #[test]
    fn test_idempotent_migration() {
        let conn = Connection::open_in_memory().expect("open");
        run(&conn).expect("first run");
        run(&conn).expect("second run should be no-op");

        assert_eq!(table_count(&conn, "topics"), 1);
        let indexes: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'index' AND name = 'topics_user_id_idx'",
                [],
                |row| row.get(0),
            )
            .expect("index count");
        assert_eq!(indexes, 1);
    }

    #[test]
    fn test_foreign_keys_enabled() {
        let conn = Connection::open_in_memory().expect("open");
        run(&conn).expect("migrate");

        let enabled: i64 = conn
            .query_row("PRAGMA foreign_keys", [], |row| row.get(0))
            .expect("pragma");
        assert_eq!(enabled, 1);
    }

    #[test]
    fn test_newer_database_is_rejected() {
        let conn = Connection::open_in_memory().expect("open");
        conn.execute_batch(&format!("PRAGMA user_version = {};", SCHEMA_VERSION + 1))
            .expect("bump version");

        let err = run(&conn).expect_err("newer schema must fail");
        assert!(matches!(err, LocalDbError::Migration(_)));
    }
}
