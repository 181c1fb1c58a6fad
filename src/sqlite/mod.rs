// SQLite backend built on rusqlite.
//
// - config: open options and their builder
// - params: conversion from `RowValues` to SQLite values
// - query: statement execution and result extraction
// - backend: the `Backend` implementation

pub mod backend;
pub mod config;
pub mod params;
pub mod query;

pub use backend::SqliteBackend;
pub use config::{SqliteOptions, SqliteOptionsBuilder};
pub use params::Params;
pub use query::build_result_set;
