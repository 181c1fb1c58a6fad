use std::path::PathBuf;

use crate::access::DataAccess;
use crate::backend::Backend;
use crate::error::SqlOpError;
use crate::types::SqlDialect;

/// Prepared-statement cache size assumed when neither the options nor the backend say.
pub const DEFAULT_STATEMENT_CACHE_CAPACITY: usize = 100;

/// Options for a [`DataAccess`] instance.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DataAccessOptions {
    /// Base directory for `INCLUDE` paths; overrides the per-file default.
    pub include_dir: Option<PathBuf>,
    pub dialect: SqlDialect,
    /// Defer synthesis of `sql_dir` operations until first use.
    pub lazy: bool,
    /// Directory of `.sql` files registered at construction.
    pub sql_dir: Option<PathBuf>,
    /// Number of bound operations above which a cache warning is logged.
    pub statement_cache_capacity: Option<usize>,
}

impl DataAccessOptions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_sql_dir(mut self, sql_dir: impl Into<PathBuf>) -> Self {
        self.sql_dir = Some(sql_dir.into());
        self
    }

    #[must_use]
    pub fn with_lazy(mut self, lazy: bool) -> Self {
        self.lazy = lazy;
        self
    }
}

/// Fluent builder for [`DataAccess`].
pub struct DataAccessBuilder<B> {
    backend: B,
    opts: DataAccessOptions,
}

impl<B: Backend> DataAccessBuilder<B> {
    #[must_use]
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            opts: DataAccessOptions::default(),
        }
    }

    #[must_use]
    pub fn options(mut self, opts: DataAccessOptions) -> Self {
        self.opts = opts;
        self
    }

    #[must_use]
    pub fn include_dir(mut self, include_dir: impl Into<PathBuf>) -> Self {
        self.opts.include_dir = Some(include_dir.into());
        self
    }

    #[must_use]
    pub fn dialect(mut self, dialect: SqlDialect) -> Self {
        self.opts.dialect = dialect;
        self
    }

    #[must_use]
    pub fn lazy(mut self, lazy: bool) -> Self {
        self.opts.lazy = lazy;
        self
    }

    #[must_use]
    pub fn sql_dir(mut self, sql_dir: impl Into<PathBuf>) -> Self {
        self.opts.sql_dir = Some(sql_dir.into());
        self
    }

    #[must_use]
    pub fn statement_cache_capacity(mut self, capacity: usize) -> Self {
        self.opts.statement_cache_capacity = Some(capacity);
        self
    }

    #[must_use]
    pub fn finish(self) -> (B, DataAccessOptions) {
        (self.backend, self.opts)
    }

    /// Build the instance, registering `sql_dir` if one was given.
    ///
    /// # Errors
    /// Returns `SqlOpError::ConfigError` for invalid options, or the first registration
    /// error from `sql_dir`.
    pub fn build(self) -> Result<DataAccess<B>, SqlOpError> {
        let (backend, opts) = self.finish();
        DataAccess::with_options(backend, opts)
    }
}
