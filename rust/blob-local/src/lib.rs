//! # blob-local
//!
//! On-device SQLite mirror for the Blob study app.
//!
//! The mirror keeps a subset of the server schema (`topics` fully, the other
//! study entities as tables without repository functions yet) in a single
//! database file. One lazily opened connection is shared by every caller.
//!
//! ## Startup
//!
//! ```rust,ignore
//! use blob_local::LocalStore;
//!
//! // Logs and returns `None` when the store cannot be brought up; the app
//! // keeps running without persistence in that case.
//! let store = LocalStore::init_or_degraded(&data_dir.join(blob_local::DATABASE_FILE));
//! ```
//!
//! There is no reconciliation with the remote store.

pub mod migrations;
pub mod schema;
pub mod topics;

use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};

use parking_lot::Mutex;
use rusqlite::Connection;

pub use topics::{Topic, TopicInput};

/// File name of the on-device database.
pub const DATABASE_FILE: &str = "blob.db";

/// Current schema version, stored in `PRAGMA user_version`.
pub const SCHEMA_VERSION: u32 = 1;

/// Local database errors.
#[derive(Debug, thiserror::Error)]
pub enum LocalDbError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("migration failed: {0}")]
    Migration(String),
}

pub type Result<T> = std::result::Result<T, LocalDbError>;

/// Handle to the on-device database.
///
/// Cloning is cheap; every clone shares the same connection. Calls are not
/// wrapped in transactions and there is no write-write conflict handling.
#[derive(Clone)]
pub struct LocalStore {
    path: Option<PathBuf>,
    conn: Arc<Mutex<Connection>>,
}

impl std::fmt::Debug for LocalStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalStore")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

impl LocalStore {
    /// Open (or create) the database file without running migrations.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(path)?;
        Ok(Self {
            path: Some(path.to_path_buf()),
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Open an in-memory database (for testing).
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Ok(Self {
            path: None,
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Open the database and bring its schema to the current version.
    pub fn init(path: &Path) -> Result<Self> {
        let store = Self::open(path)?;
        store.migrate()?;
        tracing::info!(path = %path.display(), "Local database initialized");
        Ok(store)
    }

    /// Like [`Self::init`], but logs the failure and yields `None`.
    pub fn init_or_degraded(path: &Path) -> Option<Self> {
        match Self::init(path) {
            Ok(store) => Some(store),
            Err(e) => {
                tracing::error!(
                    path = %path.display(),
                    error = %e,
                    "Local database unavailable, continuing without persistence"
                );
                None
            }
        }
    }

    /// Run the migration runner against this connection.
    pub fn migrate(&self) -> Result<()> {
        let conn = self.conn.lock();
        migrations::run(&conn)
    }

    /// Path of the backing file, `None` for in-memory stores.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Run a closure against the shared connection.
    pub fn with_connection<T>(&self, f: impl FnOnce(&Connection) -> Result<T>) -> Result<T> {
        let conn = self.conn.lock();
        f(&conn)
    }
}

static DATABASE: OnceLock<LocalStore> = OnceLock::new();

/// Process-wide database handle, opened on first use under `data_dir`.
///
/// Later calls return the same handle regardless of `data_dir`.
pub fn database(data_dir: &Path) -> Result<LocalStore> {
    if let Some(store) = DATABASE.get() {
        return Ok(store.clone());
    }
    let store = LocalStore::open(&data_dir.join(DATABASE_FILE))?;
    // A concurrent caller may have won the race; keep whichever landed first.
    Ok(DATABASE.get_or_init(|| store).clone())
}

/// Open the shared handle and run migrations, mirroring app start.
pub fn init_database(data_dir: &Path) -> Result<LocalStore> {
    let store = database(data_dir)?;
    store.migrate()?;
    Ok(store)
}
