#![cfg(feature = "sqlite")]

use std::fs;
use std::path::Path;

use sql_operations::params;
use sql_operations::prelude::*;

fn write(dir: &Path, name: &str, sql: &str) -> std::io::Result<()> {
    fs::write(dir.join(name), sql)
}

/// A SQL directory with a shared schema pulled in through INCLUDE.
fn sql_dir() -> std::io::Result<tempfile::TempDir> {
    let dir = tempfile::tempdir()?;
    fs::create_dir(dir.path().join("common"))?;
    write(
        &dir.path().join("common"),
        "tables.sql",
        "CREATE TABLE users (id INTEGER PRIMARY KEY, name TEXT NOT NULL);",
    )?;
    write(
        dir.path(),
        "create_schema.sql",
        "-- schema lives in one place\nINCLUDE \"common/tables.sql\";\nCREATE INDEX users_name ON users(name);",
    )?;
    write(dir.path(), "insert_user.sql", "INSERT INTO users(name) VALUES (:name)")?;
    write(
        dir.path(),
        "get_name.sql",
        "SELECT name\n  FROM users\n WHERE id = :id\n LIMIT 1",
    )?;
    write(dir.path(), "README.txt", "not SQL")?;
    Ok(dir)
}

#[test]
fn register_dir_loads_sql_files_only() -> Result<(), Box<dyn std::error::Error>> {
    let dir = sql_dir()?;
    let db = DataAccess::new(SqliteBackend::open_in_memory()?)?;

    let names = db.register_dir(dir.path(), false)?;
    assert_eq!(names, ["create_schema", "get_name", "insert_user"]);
    assert_eq!(db.registry().names(), names);
    assert_eq!(
        db.registry().category("create_schema")?,
        StatementCategory::Script
    );

    db.call("create_schema", ())?;
    let id = db.call("insert_user", params! { "name" => "Ada" })?.row_id();
    let name = db.invoke("get_name").arg("id", id).run()?;
    assert_eq!(name.value().and_then(RowValues::as_text), Some("Ada"));
    Ok(())
}

#[test]
fn builder_registers_sql_dir_lazily() -> Result<(), Box<dyn std::error::Error>> {
    let dir = sql_dir()?;
    let db = DataAccess::builder(SqliteBackend::open_in_memory()?)
        .sql_dir(dir.path())
        .lazy(true)
        .build()?;

    assert!(db.registry().contains("get_name"));
    assert!(!db.registry().is_bound("get_name"));
    db.call("create_schema", ())?;
    db.call("get_name", params! { "id" => 1 })?;
    assert!(db.registry().is_bound("get_name"));
    Ok(())
}

#[test]
fn lazy_compile_errors_surface_on_first_use() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    write(dir.path(), "broken.sql", "INCLUDE \"missing.sql\";")?;
    let db = DataAccess::new(SqliteBackend::open_in_memory()?)?;

    db.register_dir(dir.path(), true)?;
    for _ in 0..2 {
        let err = db.call("broken", ()).unwrap_err();
        assert!(matches!(err, SqlOpError::IoError { .. }));
    }

    let err = db.register_dir(dir.path(), false).unwrap_err();
    assert!(matches!(err, SqlOpError::IoError { .. }));
    Ok(())
}

#[test]
fn include_dir_option_overrides_file_location() -> Result<(), Box<dyn std::error::Error>> {
    let shared = tempfile::tempdir()?;
    write(
        shared.path(),
        "tables.sql",
        "CREATE TABLE users (id INTEGER PRIMARY KEY, name TEXT NOT NULL);",
    )?;
    let queries = tempfile::tempdir()?;
    write(queries.path(), "setup.sql", "INCLUDE 'tables.sql'")?;

    let db = DataAccess::builder(SqliteBackend::open_in_memory()?)
        .include_dir(shared.path())
        .build()?;
    let name = db.register_file(&queries.path().join("setup.sql"), Some("init_db"), false)?;
    assert_eq!(name, "init_db");
    db.call("init_db", ())?;

    db.register_text("count_users", "SELECT count(*) FROM users LIMIT 1", false)?;
    let out = db.call("count_users", ())?;
    assert_eq!(out.value(), Some(&RowValues::Int(0)));
    Ok(())
}

#[test]
fn unknown_and_invalid_names() -> Result<(), Box<dyn std::error::Error>> {
    let db = DataAccess::new(SqliteBackend::open_in_memory()?)?;
    let err = db.call("nope", ()).unwrap_err();
    assert!(matches!(err, SqlOpError::UnknownOperationError(name) if name == "nope"));

    let err = db.register_text("bad-name", "SELECT 1", false).unwrap_err();
    assert!(matches!(err, SqlOpError::ConfigError(_)));

    let dir = tempfile::tempdir()?;
    write(dir.path(), "1st.sql", "SELECT 1")?;
    let err = db.register_dir(dir.path(), false).unwrap_err();
    assert!(matches!(err, SqlOpError::ConfigError(_)));
    Ok(())
}

#[test]
fn comment_only_source_fails_at_registration() -> Result<(), Box<dyn std::error::Error>> {
    let db = DataAccess::new(SqliteBackend::open_in_memory()?)?;
    let err = db
        .register_text("empty", "-- nothing to see\n/* here */", false)
        .unwrap_err();
    assert!(matches!(err, SqlOpError::ParseError { .. }));
    assert!(!db.registry().contains("empty"));
    Ok(())
}

#[test]
fn re_registration_is_idempotent_and_replaces() -> Result<(), Box<dyn std::error::Error>> {
    let db = DataAccess::new(SqliteBackend::open_in_memory()?)?;
    db.register_text("answer", "SELECT 42 AS answer LIMIT 1", false)?;
    let first = db.operation("answer")?;
    db.register_text("answer", "SELECT 42 AS answer LIMIT 1", false)?;
    assert_eq!(*db.operation("answer")?, *first);
    assert_eq!(db.call("answer", ())?.value(), Some(&RowValues::Int(42)));

    db.register_text("answer", "SELECT 41 + 1 AS a, 0 AS b LIMIT 1", false)?;
    assert_eq!(
        db.registry().category("answer")?,
        StatementCategory::SingleRow
    );
    assert_eq!(db.registry().len(), 1);
    Ok(())
}

#[test]
fn operation_reports_compiled_sql_and_params() -> Result<(), Box<dyn std::error::Error>> {
    let db = DataAccess::new(SqliteBackend::open_in_memory()?)?;
    db.register_text(
        "between",
        "SELECT id FROM t WHERE id >= :low AND id < :high AND id <> :low",
        false,
    )?;
    let op = db.operation("between")?;
    assert_eq!(op.name(), "between");
    assert_eq!(op.placeholder_style(), PlaceholderStyle::Sqlite);
    assert_eq!(op.param_names(), ["low", "high"]);
    assert_eq!(
        op.statements()[0].sql(),
        "SELECT id FROM t WHERE id >= ?1 AND id < ?2 AND id <> ?1"
    );
    Ok(())
}
