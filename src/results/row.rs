use std::sync::Arc;

use serde_json::{Map, Value as JsonValue};

use crate::types::RowValues;

/// A row from a database query result.
///
/// Values keep the projection order of the query; the column names are shared with the
/// other rows of the same result set, so rows can be read positionally (like a tuple) or
/// by name.
#[derive(Debug, Clone, PartialEq)]
pub struct CustomDbRow {
    /// The column names for this row (shared across all rows in a result set)
    pub column_names: Arc<Vec<String>>,
    /// The values for this row
    pub values: Vec<RowValues>,
}

impl CustomDbRow {
    #[must_use]
    pub fn new(column_names: Arc<Vec<String>>, values: Vec<RowValues>) -> Self {
        Self {
            column_names,
            values,
        }
    }

    /// Get the index of a column by name
    #[must_use]
    pub fn get_column_index(&self, column_name: &str) -> Option<usize> {
        self.column_names.iter().position(|col| col == column_name)
    }

    /// Get a value from the row by column name
    #[must_use]
    pub fn get(&self, column_name: &str) -> Option<&RowValues> {
        self.get_column_index(column_name)
            .and_then(|idx| self.values.get(idx))
    }

    /// Get a value from the row by column index
    #[must_use]
    pub fn get_by_index(&self, index: usize) -> Option<&RowValues> {
        self.values.get(index)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Consume the row, keeping only its values.
    #[must_use]
    pub fn into_values(self) -> Vec<RowValues> {
        self.values
    }

    /// Render the row as a JSON object keyed by column name.
    ///
    /// Duplicate column names keep the last value, as JSON objects cannot repeat keys.
    #[must_use]
    pub fn to_json(&self) -> JsonValue {
        let mut object = Map::with_capacity(self.values.len());
        for (idx, value) in self.values.iter().enumerate() {
            let key = self
                .column_names
                .get(idx)
                .cloned()
                .unwrap_or_else(|| idx.to_string());
            object.insert(key, value.to_json());
        }
        JsonValue::Object(object)
    }
}
