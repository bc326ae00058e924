pub mod migrations;
pub mod models;
pub mod queries;

use anyhow::Result;
use rusqlite::{Connection, ErrorCode};
use std::path::Path;
use std::sync::Mutex;
use tracing::info;

pub use models::{HelpRequestChanges, NewHelpRequest, NewPost, NewUser, PostChanges, PostFilter, UserRow};

/// Handle to the portal's SQLite store. Constructed once at startup and shared
/// behind an `Arc`; every call is synchronous, so async callers go through
/// `spawn_blocking`.
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;

        // WAL mode for concurrent reads
        conn.pragma_update(None, "journal_mode", "WAL")?;

        let db = Self::init(conn)?;
        info!("Database opened at {}", path.display());
        Ok(db)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.pragma_update(None, "foreign_keys", "ON")?;
        migrations::run(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub fn with_conn<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        let conn = self.conn.lock().map_err(|e| anyhow::anyhow!("DB lock poisoned: {}", e))?;
        f(&conn)
    }

    /// Same lock as `with_conn`; kept separate so write paths read as such.
    pub fn with_conn_mut<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        let conn = self.conn.lock().map_err(|e| anyhow::anyhow!("DB writer lock poisoned: {}", e))?;
        f(&conn)
    }
}

/// True when `err` is a SQLite constraint failure, e.g. a UNIQUE column
/// raced by a concurrent insert.
pub fn is_constraint_violation(err: &anyhow::Error) -> bool {
    err.downcast_ref::<rusqlite::Error>()
        .and_then(rusqlite::Error::sqlite_error_code)
        == Some(ErrorCode::ConstraintViolation)
}
