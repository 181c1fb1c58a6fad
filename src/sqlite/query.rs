use std::sync::Arc;

use rusqlite::fallible_iterator::FallibleIterator;
use rusqlite::types::Value;
use rusqlite::{Batch, Connection, Statement, ToSql};

use super::params::Params;
use crate::error::SqlOpError;
use crate::results::ResultSet;
use crate::types::RowValues;

/// Extract a `RowValues` from a `SQLite` row.
///
/// # Errors
///
/// Returns `SqlOpError::SqliteError` if the value cannot be read.
pub fn sqlite_extract_value(row: &rusqlite::Row, idx: usize) -> Result<RowValues, SqlOpError> {
    let value: Value = row.get(idx)?;
    Ok(match value {
        Value::Null => RowValues::Null,
        Value::Integer(i) => RowValues::Int(i),
        Value::Real(f) => RowValues::Float(f),
        Value::Text(s) => RowValues::Text(s),
        Value::Blob(b) => RowValues::Blob(b),
    })
}

/// Run a row-returning statement and collect every row, in order.
///
/// # Errors
/// Returns `SqlOpError::SqliteError` if query execution or value extraction fails.
pub fn build_result_set(stmt: &mut Statement, params: &[Value]) -> Result<ResultSet, SqlOpError> {
    let param_refs: Vec<&dyn ToSql> = params.iter().map(|v| v as &dyn ToSql).collect();
    let column_names: Vec<String> = stmt
        .column_names()
        .iter()
        .map(std::string::ToString::to_string)
        .collect();
    let col_count = column_names.len();

    let mut rows_iter = stmt.query(&param_refs[..])?;
    let mut result_set = ResultSet::with_capacity(10);
    result_set.set_column_names(Arc::new(column_names));

    while let Some(row) = rows_iter.next()? {
        let mut row_values = Vec::with_capacity(col_count);
        for i in 0..col_count {
            row_values.push(sqlite_extract_value(row, i)?);
        }
        result_set.add_row_values(row_values);
    }

    Ok(result_set)
}

/// Whether `sql` is an insert, so the connection's last rowid belongs to it.
fn inserts_rows(sql: &str) -> bool {
    let first = sql
        .trim_start()
        .split(|c: char| !c.is_ascii_alphabetic())
        .next()
        .unwrap_or_default();
    first.eq_ignore_ascii_case("insert") || first.eq_ignore_ascii_case("replace")
}

/// Execute one statement through the connection's prepared-statement cache.
///
/// # Errors
/// Returns `SqlOpError::SqliteError` if preparing or executing fails.
pub(crate) fn run_statement(
    conn: &Connection,
    sql: &str,
    params: &[RowValues],
) -> Result<ResultSet, SqlOpError> {
    let params = Params::convert(params);
    let mut stmt = conn.prepare_cached(sql)?;
    if stmt.column_count() > 0 {
        return build_result_set(&mut stmt, params.as_values());
    }

    let changed = stmt.execute(&params.as_refs()[..])?;
    let last_insert_id = (changed > 0 && inserts_rows(sql)).then(|| conn.last_insert_rowid());
    Ok(ResultSet::affected(changed, last_insert_id))
}

/// Run a parameterless script statement by statement, one `ResultSet` each.
///
/// # Errors
/// Returns `SqlOpError::SqliteError` for the first statement that fails.
pub(crate) fn run_script(conn: &Connection, sql: &str) -> Result<Vec<ResultSet>, SqlOpError> {
    let mut batch = Batch::new(conn, sql);
    let mut results = Vec::new();
    while let Some(mut stmt) = batch.next()? {
        if stmt.column_count() > 0 {
            results.push(build_result_set(&mut stmt, &[])?);
        } else {
            let changed = stmt.execute([])?;
            results.push(ResultSet::affected(changed, None));
        }
    }
    Ok(results)
}
