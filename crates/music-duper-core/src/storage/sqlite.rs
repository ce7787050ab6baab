use crate::error::{Error, Result};
use rusqlite::{Connection, Transaction};
use std::sync::{Mutex, MutexGuard};
use tracing::debug;

/// The music index: one SQLite connection behind one exclusive lock.
///
/// Every component receives a reference to the same `Index`. A batch of
/// statements that must be seen atomically runs inside
/// [`Index::with_transaction`], which holds the lock for the whole batch.
pub struct Index {
    conn: Mutex<Connection>,
}

impl Index {
    pub fn open(path: &str) -> Result<Self> {
        debug!("Creating / opening index at {}", path);
        let conn = Connection::open(path)?;
        Self::from_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        configure_pragmas(&conn)?;
        migrate_schema(&conn)?;
        Ok(Index {
            conn: Mutex::new(conn),
        })
    }

    /// Exclusive access to the connection for single statements.
    pub fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| Error::Other(format!("Index lock poisoned: {}", e)))
    }

    /// Run `f` inside one transaction while holding the index lock.
    /// The transaction commits only if `f` succeeds.
    pub fn with_transaction<T>(&self, f: impl FnOnce(&Transaction<'_>) -> Result<T>) -> Result<T> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let value = f(&tx)?;
        tx.commit()?;
        Ok(value)
    }

    pub fn truncate_all(&self) -> Result<()> {
        self.lock()?.execute_batch(
            "DELETE FROM moved_file;
             DELETE FROM original;
             DELETE FROM duplicate;
             DELETE FROM reject;
             DELETE FROM scanned_file;",
        )?;
        debug!("All tables truncated");
        Ok(())
    }
}

fn configure_pragmas(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "PRAGMA journal_mode = WAL;
         PRAGMA synchronous = NORMAL;
         PRAGMA cache_size = -64000;
         PRAGMA busy_timeout = 5000;",
    )?;
    debug!("SQLite pragmas configured (WAL mode, 64MB cache)");
    Ok(())
}

/// Create any missing tables. The schema is create-if-absent, so an existing
/// index keeps its rows.
fn migrate_schema(conn: &Connection) -> Result<()> {
    let version: i64 = conn.query_row("PRAGMA user_version", [], |row| row.get(0))?;
    conn.execute_batch(include_str!("schema.sql"))?;
    debug!("SQLite schema initialized (version {} -> 1)", version);
    Ok(())
}
