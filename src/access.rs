use std::fs;
use std::path::Path;
use std::sync::Arc;

use lazy_static::lazy_static;
use regex::Regex;
use tracing::{debug, info};

use crate::args::{InvocationArgs, Positional, normalize};
use crate::backend::Backend;
use crate::config::{DEFAULT_STATEMENT_CACHE_CAPACITY, DataAccessBuilder, DataAccessOptions};
use crate::error::SqlOpError;
use crate::operation::{Operation, OperationOutput};
use crate::preprocess::StatementSource;
use crate::registry::{Compiler, OperationRegistry};
use crate::tx::{ScopeState, TransactionCoordinator};
use crate::types::{ParamMap, RowValues};

lazy_static! {
    static ref OPERATION_NAME: Result<Regex, regex::Error> =
        Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$");
}

fn validate_name(name: &str) -> Result<(), SqlOpError> {
    let pattern = OPERATION_NAME
        .as_ref()
        .map_err(|e| SqlOpError::ConfigError(e.to_string()))?;
    if pattern.is_match(name) {
        Ok(())
    } else {
        Err(SqlOpError::ConfigError(format!(
            "invalid operation name `{name}`: expected letters, digits and underscores"
        )))
    }
}

/// Registered SQL operations bound to one backend connection.
///
/// ```rust
/// # #[cfg(feature = "sqlite")]
/// # fn main() -> Result<(), sql_operations::SqlOpError> {
/// use sql_operations::prelude::*;
///
/// let db = DataAccess::new(SqliteBackend::open_in_memory()?)?;
/// db.register_text("create", "CREATE TABLE users (id INTEGER PRIMARY KEY, name TEXT)", false)?;
/// db.register_text("insert_user", "INSERT INTO users(name) VALUES (:name)", false)?;
/// db.register_text("get_name", "SELECT name FROM users WHERE id = :id LIMIT 1", false)?;
///
/// db.call("create", ())?;
/// let id = db.call("insert_user", params! { "name" => "Ada" })?.row_id();
/// let name = db.invoke("get_name").arg("id", id).run()?;
/// assert_eq!(name.value().and_then(RowValues::as_text), Some("Ada"));
/// # Ok(())
/// # }
/// # #[cfg(not(feature = "sqlite"))]
/// # fn main() {}
/// ```
pub struct DataAccess<B: Backend> {
    coordinator: TransactionCoordinator<B>,
    registry: OperationRegistry,
    options: DataAccessOptions,
}

impl<B: Backend> DataAccess<B> {
    /// # Errors
    /// See [`DataAccess::with_options`].
    pub fn new(backend: B) -> Result<Self, SqlOpError> {
        Self::with_options(backend, DataAccessOptions::default())
    }

    #[must_use]
    pub fn builder(backend: B) -> DataAccessBuilder<B> {
        DataAccessBuilder::new(backend)
    }

    /// # Errors
    /// Returns `SqlOpError::ConfigError` for a zero cache capacity, or the first
    /// registration error from `options.sql_dir`.
    pub fn with_options(backend: B, options: DataAccessOptions) -> Result<Self, SqlOpError> {
        if options.statement_cache_capacity == Some(0) {
            return Err(SqlOpError::ConfigError(
                "statement cache capacity must be at least 1".into(),
            ));
        }

        let compiler = Compiler {
            dialect: options.dialect,
            style: backend.placeholder_style(),
        };
        let capacity = options
            .statement_cache_capacity
            .or_else(|| backend.statement_cache_capacity())
            .unwrap_or(DEFAULT_STATEMENT_CACHE_CAPACITY);

        let access = Self {
            coordinator: TransactionCoordinator::new(backend),
            registry: OperationRegistry::new(compiler, Some(capacity)),
            options,
        };
        if let Some(sql_dir) = access.options.sql_dir.clone() {
            access.register_dir(&sql_dir, access.options.lazy)?;
        }
        Ok(access)
    }

    #[must_use]
    pub fn options(&self) -> &DataAccessOptions {
        &self.options
    }

    #[must_use]
    pub fn registry(&self) -> &OperationRegistry {
        &self.registry
    }

    #[must_use]
    pub fn state(&self) -> ScopeState {
        self.coordinator.state()
    }

    /// Register `text` as operation `name`.
    ///
    /// # Errors
    /// Returns `SqlOpError::ConfigError` for an invalid name, or (when not lazy) the
    /// preprocessing error for the text.
    pub fn register_text(&self, name: &str, text: &str, lazy: bool) -> Result<(), SqlOpError> {
        validate_name(name)?;
        let mut source = StatementSource::new(text, name);
        if let Some(include_dir) = &self.options.include_dir {
            source = source.with_base_path(include_dir);
        }
        self.registry.register(name, source, lazy)
    }

    /// Register a file, named after its stem unless `name` is given. Returns the name used.
    ///
    /// # Errors
    /// Returns `SqlOpError::IoError` if the file cannot be read, `ConfigError` for an invalid
    /// name, or (when not lazy) the preprocessing error.
    pub fn register_file(
        &self,
        path: &Path,
        name: Option<&str>,
        lazy: bool,
    ) -> Result<String, SqlOpError> {
        let name = match name {
            Some(name) => name.to_string(),
            None => path
                .file_stem()
                .map(|stem| stem.to_string_lossy().into_owned())
                .ok_or_else(|| {
                    SqlOpError::ConfigError(format!("no file name in {}", path.display()))
                })?,
        };
        validate_name(&name)?;

        let mut source = StatementSource::from_file(path)?;
        if let Some(include_dir) = &self.options.include_dir {
            source = source.with_base_path(include_dir);
        }
        self.registry.register(&name, source, lazy)?;
        Ok(name)
    }

    /// Register every `.sql` file in `dir`, in file-name order. Returns the names used.
    ///
    /// # Errors
    /// Returns `SqlOpError::IoError` if the directory cannot be listed, or the first
    /// registration error.
    pub fn register_dir(&self, dir: &Path, lazy: bool) -> Result<Vec<String>, SqlOpError> {
        let mut paths = Vec::new();
        for entry in fs::read_dir(dir).map_err(|e| SqlOpError::io(dir, e))? {
            let entry = entry.map_err(|e| SqlOpError::io(dir, e))?;
            let path = entry.path();
            if path.is_file() && path.extension().is_some_and(|ext| ext == "sql") {
                paths.push(path);
            }
        }
        paths.sort();

        let names = paths
            .iter()
            .map(|path| self.register_file(path, None, lazy))
            .collect::<Result<Vec<_>, _>>()?;
        info!(dir = %dir.display(), count = names.len(), lazy, "registered SQL directory");
        Ok(names)
    }

    /// The operation registered as `name`, synthesizing it if still pending.
    ///
    /// # Errors
    /// Returns `SqlOpError::UnknownOperationError` or a lazy compilation error.
    pub fn operation(&self, name: &str) -> Result<Arc<Operation>, SqlOpError> {
        self.registry.get(name)
    }

    /// Invoke `name` in its own transaction scope. A batch shares one scope.
    ///
    /// # Errors
    /// Returns the lookup, binding or backend error; the scope is rolled back first.
    pub fn call(
        &self,
        name: &str,
        args: impl Into<InvocationArgs>,
    ) -> Result<OperationOutput, SqlOpError> {
        let operation = self.registry.get(name)?;
        let args = args.into();
        if let InvocationArgs::Batch(batch) = &args
            && batch.is_empty()
        {
            debug!(operation = name, "empty batch, nothing to run");
            return Ok(OperationOutput::Batch(Vec::new()));
        }
        self.coordinator
            .run(|backend| operation.run(backend, &args))
    }

    /// Start a keyword-style call.
    #[must_use]
    pub fn invoke(&self, name: &str) -> Invocation<'_, B> {
        Invocation {
            access: self,
            name: name.to_string(),
            keywords: ParamMap::new(),
            positional: None,
        }
    }

    /// Run several operations in one transaction scope. `Ok` commits; `Err` or a panic
    /// rolls back.
    ///
    /// # Errors
    /// Returns the closure's error, or the error from opening or committing the scope.
    pub fn transaction<T, F>(&self, f: F) -> Result<T, SqlOpError>
    where
        F: FnOnce(&mut TransactionHandle<'_, B>) -> Result<T, SqlOpError>,
    {
        self.coordinator.run(|backend| {
            let mut handle = TransactionHandle {
                registry: &self.registry,
                backend,
            };
            f(&mut handle)
        })
    }

    /// Use the connection directly, outside any scope, for setup or inspection.
    ///
    /// # Errors
    /// Returns `SqlOpError::AlreadyInTransactionError` when called from inside a scope on
    /// this thread.
    pub fn with_backend<T, F>(&self, f: F) -> Result<T, SqlOpError>
    where
        F: FnOnce(&mut B) -> T,
    {
        self.coordinator.with_backend(f)
    }

    pub fn into_backend(self) -> B {
        self.coordinator.into_inner()
    }
}

/// Operations available inside [`DataAccess::transaction`].
pub struct TransactionHandle<'a, B> {
    registry: &'a OperationRegistry,
    backend: &'a mut B,
}

impl<B: Backend> TransactionHandle<'_, B> {
    /// Run `name` inside the enclosing scope.
    ///
    /// # Errors
    /// Returns the lookup, binding or backend error. The enclosing scope decides whether
    /// to roll back.
    pub fn call(
        &mut self,
        name: &str,
        args: impl Into<InvocationArgs>,
    ) -> Result<OperationOutput, SqlOpError> {
        let operation = self.registry.get(name)?;
        operation.run(&mut *self.backend, &args.into())
    }

    pub fn backend(&mut self) -> &mut B {
        &mut *self.backend
    }
}

/// Keyword-style call builder returned by [`DataAccess::invoke`].
pub struct Invocation<'a, B: Backend> {
    access: &'a DataAccess<B>,
    name: String,
    keywords: ParamMap,
    positional: Option<Positional>,
}

impl<B: Backend> Invocation<'_, B> {
    #[must_use]
    pub fn arg(mut self, name: impl Into<String>, value: impl Into<RowValues>) -> Self {
        self.keywords.insert(name, value);
        self
    }

    /// Use `mapping` instead of any keyword arguments.
    #[must_use]
    pub fn mapping(mut self, mapping: ParamMap) -> Self {
        self.positional = Some(Positional::Mapping(mapping));
        self
    }

    /// Run once per mapping in one scope; keyword arguments are ignored.
    #[must_use]
    pub fn batch(mut self, batch: Vec<ParamMap>) -> Self {
        self.positional = Some(Positional::Batch(batch));
        self
    }

    /// # Errors
    /// Same as [`DataAccess::call`].
    pub fn run(self) -> Result<OperationOutput, SqlOpError> {
        let args = normalize(self.positional, self.keywords);
        self.access.call(&self.name, args)
    }
}
