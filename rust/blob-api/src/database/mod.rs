//! Relational store.
//!
//! A single SQLite connection shared behind a mutex. Every repository call
//! runs on the blocking pool through [`Database::call`]; multi-row writes open
//! a transaction inside the closure, which rolls back when dropped without a
//! commit.
//!
//! Ownership is enforced in SQL: every lookup below a topic joins back to
//! `topics.user_id`, so a row owned by someone else is indistinguishable from
//! a missing one.

pub mod encryption;
pub mod flashcards;
pub mod mind_maps;
pub mod quizzes;
pub mod schema;
pub mod settings;
pub mod topics;
pub mod users;

pub use encryption::KeyManager;
pub use flashcards::FlashcardRepository;
pub use mind_maps::MindMapRepository;
pub use quizzes::QuizRepository;
pub use settings::SettingsRepository;
pub use topics::TopicRepository;
pub use users::UserRepository;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use parking_lot::Mutex;
use rusqlite::Connection;
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};

use crate::domain::{AiProvider, Difficulty};

/// Handle to the server's SQLite database. Cheap to clone.
#[derive(Clone)]
pub struct Database {
    path: Option<PathBuf>,
    conn: Arc<Mutex<Connection>>,
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

impl Database {
    /// Open (or create) the database file and apply the schema.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).with_context(|| {
                    format!("Failed to create database directory {}", parent.display())
                })?;
            }
        }

        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open database {}", path.display()))?;
        conn.pragma_update(None, "journal_mode", "WAL")
            .context("Failed to enable WAL mode")?;

        Self::with_connection(conn, Some(path.to_path_buf()))
    }

    /// Private in-memory database, used by tests.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("Failed to open in-memory database")?;
        Self::with_connection(conn, None)
    }

    fn with_connection(conn: Connection, path: Option<PathBuf>) -> Result<Self> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")
            .context("Failed to enable foreign keys")?;
        schema::apply(&conn)?;

        Ok(Self {
            path,
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Run `f` against the connection on the blocking pool.
    pub async fn call<T, F>(&self, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
    {
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || {
            let mut guard = conn.lock();
            f(&mut guard)
        })
        .await
        .context("Tokio spawn_blocking failed")?
    }
}

impl ToSql for Difficulty {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for Difficulty {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse()
            .map_err(|e: String| FromSqlError::Other(e.into()))
    }
}

impl ToSql for AiProvider {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for AiProvider {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse()
            .map_err(|e: String| FromSqlError::Other(e.into()))
    }
}

/// New row id.
pub(crate) fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::domain::{NewTopic, NewUser, Topic, User};

    pub async fn db_with_user(email: &str) -> (Database, User) {
        let db = Database::open_in_memory().expect("open db");
        let user = add_user(&db, email).await;
        (db, user)
    }

    pub async fn add_user(db: &Database, email: &str) -> User {
        db.create_user(NewUser {
            name: "Test User".to_string(),
            email: email.to_string(),
            image: None,
        })
        .await
        .expect("create user")
    }

    pub async fn add_topic(db: &Database, user: &User, title: &str) -> Topic {
        db.create_topic(
            &user.id,
            NewTopic {
                title: title.to_string(),
                description: None,
            },
        )
        .await
        .expect("create topic")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_open_creates_parent_directories() {
        let dir = tempdir().expect("Failed to create temp dir");
        let path = dir.path().join("nested").join("blob.sqlite");

        let db = Database::open(&path).expect("open");
        assert_eq!(db.path(), Some(path.as_path()));
        assert!(path.exists());
    }

    #[tokio::test]
    async fn test_foreign_keys_enabled() {
        let db = Database::open_in_memory().expect("open");
        let enabled: i64 = db
            .call(|conn| Ok(conn.query_row("PRAGMA foreign_keys", [], |row| row.get(0))?))
            .await
            .expect("pragma");
        assert_eq!(enabled, 1);
    }
}
