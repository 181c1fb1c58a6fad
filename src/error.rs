use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SqlOpError {
    #[cfg(feature = "sqlite")]
    #[error(transparent)]
    SqliteError(#[from] rusqlite::Error),

    /// Error raised by a custom backend, passed through untouched.
    #[error(transparent)]
    DriverError(Box<dyn std::error::Error + Send + Sync>),

    #[error("SQL parse error in {origin}: {message}")]
    ParseError { origin: String, message: String },

    #[error("Unknown operation: {0}")]
    UnknownOperationError(String),

    #[error("Already in a transaction on this connection")]
    AlreadyInTransactionError,

    #[error("Missing parameter `{parameter}` for operation `{operation}`")]
    ParameterBindingError { operation: String, parameter: String },

    #[error("Failed to read {path}: {source}")]
    IoError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("SQL execution error: {0}")]
    ExecutionError(String),
}

impl SqlOpError {
    /// Wrap an error produced by a backend driver.
    pub fn driver<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        SqlOpError::DriverError(Box::new(err))
    }

    pub(crate) fn parse(origin: &str, message: impl Into<String>) -> Self {
        SqlOpError::ParseError {
            origin: origin.to_string(),
            message: message.into(),
        }
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        SqlOpError::IoError {
            path: path.into(),
            source,
        }
    }
}
