/*!
 * SQLite connection shared by the store.
 *
 * One `rusqlite::Connection` sits behind a mutex; async callers reach it on
 * tokio's blocking pool so a slow write never stalls the runtime.
 */

use anyhow::{Context, Result};
use log::{debug, info};
use parking_lot::Mutex;
use rusqlite::Connection;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::schema;

const DEFAULT_DB_FILENAME: &str = "locale-cascade.db";

/// Directory created under the platform data dir
const DEFAULT_DB_DIRNAME: &str = "locale-cascade";

const IN_MEMORY: &str = ":memory:";

#[derive(Clone, Debug)]
pub struct DatabaseConnection {
    db_path: PathBuf,
    connection: Arc<Mutex<Connection>>,
}

impl DatabaseConnection {
    /// Open the database under the platform data directory
    pub fn new_default() -> Result<Self> {
        Self::new(Self::default_database_path()?)
    }

    /// Open (or create) the database file at `db_path` and bring its schema up to date
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let db_path = db_path.as_ref().to_path_buf();
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Cannot create directory for translation store: {:?}", parent))?;
        }

        info!("Translation store: {:?}", db_path);
        let conn = Connection::open(&db_path)
            .with_context(|| format!("Cannot open translation store {:?}", db_path))?;
        Self::with_schema(conn, db_path)
    }

    /// Private database that disappears with the connection
    pub fn new_in_memory() -> Result<Self> {
        debug!("Opening in-memory translation store");
        let conn = Connection::open_in_memory().context("Cannot open in-memory translation store")?;
        Self::with_schema(conn, PathBuf::from(IN_MEMORY))
    }

    fn with_schema(conn: Connection, db_path: PathBuf) -> Result<Self> {
        schema::initialize_schema(&conn)?;
        Ok(Self {
            db_path,
            connection: Arc::new(Mutex::new(conn)),
        })
    }

    /// `<data dir>/locale-cascade/locale-cascade.db`
    pub fn default_database_path() -> Result<PathBuf> {
        let base_dir = dirs::data_local_dir()
            .or_else(dirs::data_dir)
            .or_else(|| dirs::home_dir().map(|h| h.join(".local").join("share")))
            .ok_or_else(|| anyhow::anyhow!("No data directory for the translation store"))?;

        Ok(base_dir.join(DEFAULT_DB_DIRNAME).join(DEFAULT_DB_FILENAME))
    }

    pub fn path(&self) -> &Path {
        &self.db_path
    }

    pub fn is_in_memory(&self) -> bool {
        self.db_path.as_os_str() == IN_MEMORY
    }

    /// Run `f` on the calling thread; prefer `execute_async` inside the runtime
    pub fn execute<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        let conn = self.connection.lock();
        f(&*conn)
    }

    /// Run `f` on the blocking pool
    pub async fn execute_async<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = self.connection.clone();
        tokio::task::spawn_blocking(move || {
            let conn = conn.lock();
            f(&*conn)
        })
        .await
        .context("Translation store task panicked")?
    }

    /// Run `f` in one transaction on the blocking pool; an error from `f` rolls back
    pub async fn transaction_async<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&rusqlite::Transaction) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = self.connection.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = conn.lock();
            let tx = conn.transaction()?;
            let value = f(&tx)?;
            tx.commit()?;
            Ok(value)
        })
        .await
        .context("Translation store transaction panicked")?
    }

    /// Row and record counts plus the file size
    pub fn stats(&self) -> Result<DatabaseStats> {
        let (row_count, record_count) = self.execute(|conn| {
            let rows: i64 = conn.query_row("SELECT COUNT(*) FROM translations", [], |row| row.get(0))?;
            let records: i64 = conn.query_row(
                "SELECT COUNT(*) FROM (SELECT DISTINCT model, host_id FROM translations)",
                [],
                |row| row.get(0),
            )?;
            Ok((rows, records))
        })?;

        let file_size_bytes = if self.is_in_memory() {
            0
        } else {
            std::fs::metadata(&self.db_path).map(|m| m.len()).unwrap_or(0)
        };

        Ok(DatabaseStats {
            row_count,
            record_count,
            file_size_bytes,
        })
    }
}

#[derive(Debug, Clone)]
pub struct DatabaseStats {
    /// (record, locale) rows
    pub row_count: i64,
    /// Distinct host records
    pub record_count: i64,
    pub file_size_bytes: u64,
}

impl std::fmt::Display for DatabaseStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} record(s), {} locale row(s), {} KB",
            self.record_count,
            self.row_count,
            self.file_size_bytes / 1024
        )
    }
}
