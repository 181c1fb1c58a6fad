use crate::error::SqlOpError;
use crate::results::ResultSet;
use crate::translation::PlaceholderStyle;
use crate::types::RowValues;

/// What a backend connection can do natively. Declared once per connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Capabilities {
    /// `begin`/`commit`/`rollback` map onto real database transactions.
    pub native_transactions: bool,
    /// `execute_script` runs a whole parameterless script in one call.
    pub native_script: bool,
    /// `execute` fills `ResultSet::last_insert_id` for inserts.
    pub reports_last_insert_id: bool,
}

/// A relational backend connection.
///
/// `execute` receives SQL already rewritten into [`Backend::placeholder_style`] and the
/// parameter values in placeholder order.
pub trait Backend {
    fn capabilities(&self) -> Capabilities;

    fn placeholder_style(&self) -> PlaceholderStyle;

    /// Execute one statement, returning its rows (if any) and affected-row count.
    ///
    /// # Errors
    /// Returns the driver's error, usually wrapped in [`SqlOpError::DriverError`].
    fn execute(&mut self, sql: &str, params: &[RowValues]) -> Result<ResultSet, SqlOpError>;

    /// # Errors
    /// Returns the driver's error if the commit fails.
    fn commit(&mut self) -> Result<(), SqlOpError>;

    /// # Errors
    /// Returns the driver's error if the rollback fails.
    fn rollback(&mut self) -> Result<(), SqlOpError>;

    /// Open a native transaction. Only called when `native_transactions` is set.
    ///
    /// # Errors
    /// Returns the driver's error if the transaction cannot be started.
    fn begin(&mut self) -> Result<(), SqlOpError> {
        Ok(())
    }

    /// Run a parameterless multi-statement script, one result per statement.
    ///
    /// # Errors
    /// The default implementation always fails; backends advertising `native_script`
    /// must override it.
    fn execute_script(&mut self, _sql: &str) -> Result<Vec<ResultSet>, SqlOpError> {
        Err(SqlOpError::ExecutionError(
            "backend does not support native script execution".into(),
        ))
    }

    /// Row id generated by the most recent insert, for backends whose `execute` does not
    /// report it.
    ///
    /// # Errors
    /// Returns the driver's error if the lookup fails.
    fn last_insert_id(&mut self) -> Result<Option<i64>, SqlOpError> {
        Ok(None)
    }

    /// Size of the prepared-statement cache, if the backend keeps one.
    fn statement_cache_capacity(&self) -> Option<usize> {
        None
    }
}

impl<B: Backend + ?Sized> Backend for Box<B> {
    fn capabilities(&self) -> Capabilities {
        (**self).capabilities()
    }

    fn placeholder_style(&self) -> PlaceholderStyle {
        (**self).placeholder_style()
    }

    fn execute(&mut self, sql: &str, params: &[RowValues]) -> Result<ResultSet, SqlOpError> {
        (**self).execute(sql, params)
    }

    fn commit(&mut self) -> Result<(), SqlOpError> {
        (**self).commit()
    }

    fn rollback(&mut self) -> Result<(), SqlOpError> {
        (**self).rollback()
    }

    fn begin(&mut self) -> Result<(), SqlOpError> {
        (**self).begin()
    }

    fn execute_script(&mut self, sql: &str) -> Result<Vec<ResultSet>, SqlOpError> {
        (**self).execute_script(sql)
    }

    fn last_insert_id(&mut self) -> Result<Option<i64>, SqlOpError> {
        (**self).last_insert_id()
    }

    fn statement_cache_capacity(&self) -> Option<usize> {
        (**self).statement_cache_capacity()
    }
}
