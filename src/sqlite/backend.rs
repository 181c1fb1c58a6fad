use std::path::Path;

use rusqlite::Connection;
use tracing::debug;

use super::config::{SqliteOptions, SqliteOptionsBuilder};
use super::query::{run_script, run_statement};
use crate::backend::{Backend, Capabilities};
use crate::config::DEFAULT_STATEMENT_CACHE_CAPACITY;
use crate::error::SqlOpError;
use crate::results::ResultSet;
use crate::translation::PlaceholderStyle;
use crate::types::RowValues;

/// A `rusqlite` connection used as an operation backend.
///
/// Transactions are real `BEGIN`/`COMMIT`/`ROLLBACK`; statements go through
/// `prepare_cached`.
pub struct SqliteBackend {
    conn: Connection,
    cache_capacity: usize,
}

impl SqliteBackend {
    /// # Errors
    /// Returns `SqlOpError::SqliteError` if the database cannot be opened.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, SqlOpError> {
        Ok(Self::from_connection(Connection::open(path)?))
    }

    /// # Errors
    /// Returns `SqlOpError::SqliteError` if the database cannot be opened.
    pub fn open_in_memory() -> Result<Self, SqlOpError> {
        Ok(Self::from_connection(Connection::open_in_memory()?))
    }

    #[must_use]
    pub fn from_connection(conn: Connection) -> Self {
        conn.set_prepared_statement_cache_capacity(DEFAULT_STATEMENT_CACHE_CAPACITY);
        Self {
            conn,
            cache_capacity: DEFAULT_STATEMENT_CACHE_CAPACITY,
        }
    }

    #[must_use]
    pub fn builder(db_path: impl Into<String>) -> SqliteOptionsBuilder {
        SqliteOptionsBuilder::new(db_path.into())
    }

    /// # Errors
    /// Returns `SqlOpError::SqliteError` if opening or configuring the connection fails,
    /// or `SqlOpError::ConfigError` for a zero cache capacity.
    pub fn with_options(opts: SqliteOptions) -> Result<Self, SqlOpError> {
        if opts.statement_cache_capacity == 0 {
            return Err(SqlOpError::ConfigError(
                "statement cache capacity must be at least 1".into(),
            ));
        }

        let conn = Connection::open(&opts.db_path)?;
        conn.set_prepared_statement_cache_capacity(opts.statement_cache_capacity);
        if let Some(timeout) = opts.busy_timeout {
            conn.busy_timeout(timeout)?;
        }
        if opts.wal {
            conn.execute_batch("PRAGMA journal_mode = WAL;")?;
        }
        debug!(db_path = %opts.db_path, wal = opts.wal, "opened sqlite connection");

        Ok(Self {
            conn,
            cache_capacity: opts.statement_cache_capacity,
        })
    }

    #[must_use]
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Run raw SQL outside the operation machinery, e.g. schema setup.
    ///
    /// # Errors
    /// Returns `SqlOpError::SqliteError` if any statement fails.
    pub fn execute_batch(&mut self, sql: &str) -> Result<(), SqlOpError> {
        self.conn.execute_batch(sql)?;
        Ok(())
    }

    #[must_use]
    pub fn into_connection(self) -> Connection {
        self.conn
    }
}

impl Backend for SqliteBackend {
    fn capabilities(&self) -> Capabilities {
        Capabilities {
            native_transactions: true,
            native_script: true,
            reports_last_insert_id: true,
        }
    }

    fn placeholder_style(&self) -> PlaceholderStyle {
        PlaceholderStyle::Sqlite
    }

    fn execute(&mut self, sql: &str, params: &[RowValues]) -> Result<ResultSet, SqlOpError> {
        run_statement(&self.conn, sql, params)
    }

    fn begin(&mut self) -> Result<(), SqlOpError> {
        self.conn.execute_batch("BEGIN")?;
        Ok(())
    }

    // A script may end the transaction itself; committing or rolling back in autocommit
    // mode is then a no-op.
    fn commit(&mut self) -> Result<(), SqlOpError> {
        if !self.conn.is_autocommit() {
            self.conn.execute_batch("COMMIT")?;
        }
        Ok(())
    }

    fn rollback(&mut self) -> Result<(), SqlOpError> {
        if !self.conn.is_autocommit() {
            self.conn.execute_batch("ROLLBACK")?;
        }
        Ok(())
    }

    fn execute_script(&mut self, sql: &str) -> Result<Vec<ResultSet>, SqlOpError> {
        run_script(&self.conn, sql)
    }

    fn last_insert_id(&mut self) -> Result<Option<i64>, SqlOpError> {
        // 0 means no successful insert yet on this connection
        Ok(Some(self.conn.last_insert_rowid()).filter(|id| *id != 0))
    }

    fn statement_cache_capacity(&self) -> Option<usize> {
        Some(self.cache_capacity)
    }
}
