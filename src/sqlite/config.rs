use std::time::Duration;

use super::backend::SqliteBackend;
use crate::config::DEFAULT_STATEMENT_CACHE_CAPACITY;
use crate::error::SqlOpError;

/// Options for opening a `SQLite` connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SqliteOptions {
    /// File path, or `:memory:` for a private in-memory database.
    pub db_path: String,
    pub statement_cache_capacity: usize,
    /// Switch the journal to WAL after opening.
    pub wal: bool,
    pub busy_timeout: Option<Duration>,
}

impl SqliteOptions {
    #[must_use]
    pub fn new(db_path: String) -> Self {
        Self {
            db_path,
            statement_cache_capacity: DEFAULT_STATEMENT_CACHE_CAPACITY,
            wal: false,
            busy_timeout: None,
        }
    }

    #[must_use]
    pub fn with_statement_cache_capacity(mut self, capacity: usize) -> Self {
        self.statement_cache_capacity = capacity;
        self
    }
}

/// Fluent builder for `SQLite` options.
#[derive(Debug, Clone)]
pub struct SqliteOptionsBuilder {
    opts: SqliteOptions,
}

impl SqliteOptionsBuilder {
    #[must_use]
    pub fn new(db_path: String) -> Self {
        Self {
            opts: SqliteOptions::new(db_path),
        }
    }

    #[must_use]
    pub fn statement_cache_capacity(mut self, capacity: usize) -> Self {
        self.opts.statement_cache_capacity = capacity;
        self
    }

    #[must_use]
    pub fn wal(mut self, wal: bool) -> Self {
        self.opts.wal = wal;
        self
    }

    #[must_use]
    pub fn busy_timeout(mut self, timeout: Duration) -> Self {
        self.opts.busy_timeout = Some(timeout);
        self
    }

    #[must_use]
    pub fn finish(self) -> SqliteOptions {
        self.opts
    }

    /// Open the connection.
    ///
    /// # Errors
    ///
    /// Returns `SqlOpError` if the database cannot be opened or configured.
    pub fn build(self) -> Result<SqliteBackend, SqlOpError> {
        SqliteBackend::with_options(self.finish())
    }
}
