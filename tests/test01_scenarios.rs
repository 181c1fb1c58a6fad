#![cfg(feature = "sqlite")]

use sql_operations::params;
use sql_operations::prelude::*;

fn users_db() -> Result<DataAccess<SqliteBackend>, SqlOpError> {
    let db = DataAccess::new(SqliteBackend::open_in_memory()?)?;
    db.with_backend(|backend| {
        backend.execute_batch("CREATE TABLE users (id INTEGER PRIMARY KEY, name TEXT NOT NULL UNIQUE)")
    })??;
    db.register_text("insert_user", "INSERT INTO users(name) VALUES (:name)", false)?;
    db.register_text(
        "get_name",
        "SELECT name FROM users WHERE id = :id LIMIT 1",
        false,
    )?;
    db.register_text("list_users", "SELECT name FROM users", false)?;
    Ok(db)
}

fn user_names(db: &DataAccess<SqliteBackend>) -> Result<Vec<Vec<RowValues>>, SqlOpError> {
    let out = db.call("list_users", ())?;
    Ok(out.table().map(ResultSet::values).unwrap_or_default())
}

#[test]
fn insert_returns_row_id() -> Result<(), Box<dyn std::error::Error>> {
    let db = users_db()?;

    let out = db.call("insert_user", params! { "name" => "Ada" })?;
    assert_eq!(out.row_id(), Some(1));
    assert_eq!(user_names(&db)?, vec![vec![RowValues::Text("Ada".into())]]);
    Ok(())
}

#[test]
fn single_value_lookup_returns_scalar_or_null() -> Result<(), Box<dyn std::error::Error>> {
    let db = users_db()?;
    db.call("insert_user", params! { "name" => "Ada" })?;

    let found = db.invoke("get_name").arg("id", 1).run()?;
    assert_eq!(found.value(), Some(&RowValues::Text("Ada".into())));

    let missing = db.invoke("get_name").arg("id", 999).run()?;
    assert!(missing.is_null());
    assert_eq!(missing, OperationOutput::Value(None));
    Ok(())
}

#[test]
fn table_preserves_query_order() -> Result<(), Box<dyn std::error::Error>> {
    let db = users_db()?;
    db.call("insert_user", params! { "name" => "Ada" })?;
    db.call("insert_user", params! { "name" => "Grace" })?;

    let expected = vec![
        vec![RowValues::Text("Ada".into())],
        vec![RowValues::Text("Grace".into())],
    ];
    assert_eq!(user_names(&db)?, expected);
    assert_eq!(user_names(&db)?, expected);
    Ok(())
}

#[test]
fn batch_insert_returns_ids_in_order() -> Result<(), Box<dyn std::error::Error>> {
    let db = users_db()?;

    let out = db.call(
        "insert_user",
        vec![params! { "name" => "Ada" }, params! { "name" => "Grace" }],
    )?;
    assert_eq!(out.row_ids(), Some(vec![1, 2]));
    assert_eq!(user_names(&db)?.len(), 2);
    Ok(())
}

#[test]
fn failing_batch_element_leaves_no_rows() -> Result<(), Box<dyn std::error::Error>> {
    let db = users_db()?;

    // second element violates the UNIQUE constraint on name
    let err = db
        .call(
            "insert_user",
            vec![params! { "name" => "Ada" }, params! { "name" => "Ada" }],
        )
        .unwrap_err();
    assert!(matches!(err, SqlOpError::SqliteError(_)));
    assert!(user_names(&db)?.is_empty());
    assert_eq!(db.state(), ScopeState::Idle);
    Ok(())
}

#[test]
fn ignored_insert_does_not_borrow_an_earlier_row_id() -> Result<(), Box<dyn std::error::Error>> {
    let db = users_db()?;
    db.register_text(
        "add_once",
        "INSERT OR IGNORE INTO users(name) VALUES (:name)",
        false,
    )?;

    assert_eq!(db.call("add_once", params! { "name" => "Ada" })?.row_id(), Some(1));
    assert_eq!(db.call("add_once", params! { "name" => "Grace" })?.row_id(), Some(2));

    let err = db.call("add_once", params! { "name" => "Ada" }).unwrap_err();
    assert!(matches!(err, SqlOpError::ExecutionError(_)));
    assert_eq!(user_names(&db)?.len(), 2);
    assert_eq!(db.state(), ScopeState::Idle);
    Ok(())
}
