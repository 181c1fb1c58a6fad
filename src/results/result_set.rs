use std::sync::Arc;

use serde_json::Value as JsonValue;

use super::row::CustomDbRow;
use crate::types::RowValues;

/// Outcome of executing one SQL statement.
///
/// Row-returning statements fill `results` in the order the backend produced them; DML
/// statements leave `results` empty and report `rows_affected` (and, for inserts, the
/// generated row id when the backend knows it).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultSet {
    /// The rows returned by the query
    pub results: Vec<CustomDbRow>,
    /// The number of rows affected (DML) or returned (queries)
    pub rows_affected: usize,
    /// Row id generated by the statement, when the backend reports one
    pub last_insert_id: Option<i64>,
    /// Column names shared by all rows (to avoid duplicating in each row)
    column_names: Option<Arc<Vec<String>>>,
}

impl ResultSet {
    /// Create a new result set with a known capacity
    #[must_use]
    pub fn with_capacity(capacity: usize) -> ResultSet {
        ResultSet {
            results: Vec::with_capacity(capacity),
            ..ResultSet::default()
        }
    }

    /// Result of a statement that returned no rows.
    #[must_use]
    pub fn affected(rows_affected: usize, last_insert_id: Option<i64>) -> ResultSet {
        ResultSet {
            rows_affected,
            last_insert_id,
            ..ResultSet::default()
        }
    }

    /// Set the column names for this result set (to be shared by all rows)
    pub fn set_column_names(&mut self, column_names: Arc<Vec<String>>) {
        self.column_names = Some(column_names);
    }

    /// Get the column names for this result set
    #[must_use]
    pub fn get_column_names(&self) -> Option<&Arc<Vec<String>>> {
        self.column_names.as_ref()
    }

    /// Add a row to the result set, sharing the column names already set.
    pub fn add_row_values(&mut self, row_values: Vec<RowValues>) {
        let column_names = self
            .column_names
            .get_or_insert_with(|| Arc::new(Vec::new()))
            .clone();
        self.results.push(CustomDbRow::new(column_names, row_values));
        self.rows_affected += 1;
    }

    /// First row, if any.
    #[must_use]
    pub fn fetch_one(&self) -> Option<&CustomDbRow> {
        self.results.first()
    }

    /// All rows in backend order.
    #[must_use]
    pub fn fetch_all(&self) -> &[CustomDbRow] {
        &self.results
    }

    /// Consume the set and keep only its first row.
    #[must_use]
    pub fn into_first_row(self) -> Option<CustomDbRow> {
        self.results.into_iter().next()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.results.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, CustomDbRow> {
        self.results.iter()
    }

    /// Row values only, handy for comparing against tuples in tests.
    #[must_use]
    pub fn values(&self) -> Vec<Vec<RowValues>> {
        self.results.iter().map(|row| row.values.clone()).collect()
    }

    /// Render as JSON: an array of row objects for queries, or a summary object for DML.
    #[must_use]
    pub fn to_json(&self) -> JsonValue {
        if self.column_names.as_ref().is_some_and(|names| !names.is_empty()) {
            JsonValue::Array(self.results.iter().map(CustomDbRow::to_json).collect())
        } else {
            serde_json::json!({
                "rows_affected": self.rows_affected,
                "last_insert_id": self.last_insert_id,
            })
        }
    }
}

impl<'a> IntoIterator for &'a ResultSet {
    type Item = &'a CustomDbRow;
    type IntoIter = std::slice::Iter<'a, CustomDbRow>;

    fn into_iter(self) -> Self::IntoIter {
        self.results.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rows_share_column_names_and_keep_order() {
        let mut rs = ResultSet::with_capacity(2);
        rs.set_column_names(Arc::new(vec!["id".into(), "name".into()]));
        rs.add_row_values(vec![RowValues::Int(1), RowValues::Text("Ada".into())]);
        rs.add_row_values(vec![RowValues::Int(2), RowValues::Text("Grace".into())]);

        assert_eq!(rs.rows_affected, 2);
        assert_eq!(rs.fetch_one().and_then(|r| r.get("name")), Some(&RowValues::Text("Ada".into())));
        assert!(Arc::ptr_eq(&rs.results[0].column_names, &rs.results[1].column_names));
        assert_eq!(
            rs.values(),
            vec![
                vec![RowValues::Int(1), RowValues::Text("Ada".into())],
                vec![RowValues::Int(2), RowValues::Text("Grace".into())],
            ]
        );
    }

    #[test]
    fn dml_outcome_renders_summary() {
        let rs = ResultSet::affected(3, Some(9));
        assert_eq!(
            rs.to_json(),
            serde_json::json!({"rows_affected": 3, "last_insert_id": 9})
        );
    }
}
