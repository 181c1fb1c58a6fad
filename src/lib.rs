//! Turn SQL text into named, typed, transactional operations.
//!
//! Each registered source is compacted, classified by its result shape
//! ([`StatementCategory`]) and compiled once for the backend's placeholder style. Calls
//! run inside a transaction scope that commits on success and rolls back on error.

pub mod access;
pub mod args;
pub mod backend;
pub mod classify;
pub mod config;
pub mod error;
pub mod operation;
pub mod prelude;
pub mod preprocess;
pub mod registry;
pub mod results;
pub mod translation;
pub mod tx;
pub mod types;

#[cfg(feature = "sqlite")]
pub mod sqlite;

pub use access::{DataAccess, Invocation, TransactionHandle};
pub use backend::{Backend, Capabilities};
pub use classify::StatementCategory;
pub use error::SqlOpError;
pub use operation::{Operation, OperationOutput};
pub use results::{CustomDbRow, ResultSet};
pub use types::{ParamMap, RowValues, SqlDialect};

#[cfg(feature = "sqlite")]
pub use sqlite::SqliteBackend;
