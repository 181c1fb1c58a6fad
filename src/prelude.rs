//! Convenient imports for common functionality.
//!
//! This module re-exports the most commonly used types and functions
//! to make it easier to get started with the library.

pub use crate::access::{DataAccess, Invocation, TransactionHandle};
pub use crate::args::{InvocationArgs, Positional, normalize};
pub use crate::backend::{Backend, Capabilities};
pub use crate::classify::{StatementCategory, classify};
pub use crate::config::{DataAccessBuilder, DataAccessOptions};
pub use crate::error::SqlOpError;
pub use crate::operation::{Operation, OperationOutput};
pub use crate::params;
pub use crate::preprocess::{CompactedStatements, StatementSource, compact};
pub use crate::results::{CustomDbRow, ResultSet};
pub use crate::translation::{CompiledSql, PlaceholderStyle, compile_named_markers};
pub use crate::tx::ScopeState;
pub use crate::types::{ParamMap, RowValues, SqlDialect};

#[cfg(feature = "sqlite")]
pub use crate::sqlite::{SqliteBackend, SqliteOptions, SqliteOptionsBuilder};
