use serde_json::Value as JsonValue;
use tracing::{debug, trace};

use crate::args::{InvocationArgs, bind};
use crate::backend::Backend;
use crate::classify::{StatementCategory, classify};
use crate::error::SqlOpError;
use crate::preprocess::CompactedStatements;
use crate::results::{CustomDbRow, ResultSet};
use crate::translation::{CompiledSql, PlaceholderStyle, compile_named_markers};
use crate::types::{ParamMap, RowValues};

#[derive(Debug, Clone, PartialEq)]
enum Callable {
    Insert(CompiledSql),
    MultiInsert(Vec<CompiledSql>),
    Value(CompiledSql),
    Row(CompiledSql),
    Table(CompiledSql),
    Script {
        statements: Vec<CompiledSql>,
        /// Whole-script text for backends that can run it in one call; only set when no
        /// statement has parameter markers.
        native: Option<String>,
    },
}

/// A named, classified statement group with a fixed result shape.
#[derive(Debug, Clone, PartialEq)]
pub struct Operation {
    name: String,
    category: StatementCategory,
    style: PlaceholderStyle,
    callable: Callable,
}

/// Result of invoking an [`Operation`]. The shape follows its [`StatementCategory`].
#[derive(Debug, Clone, PartialEq)]
pub enum OperationOutput {
    RowId(i64),
    Value(Option<RowValues>),
    Row(Option<CustomDbRow>),
    Table(ResultSet),
    Script(Vec<ResultSet>),
    Batch(Vec<OperationOutput>),
}

impl Operation {
    /// Classify `statements` and compile their markers into `style` placeholders.
    ///
    /// # Errors
    /// Returns `SqlOpError::ParseError` if `statements` is empty.
    pub fn synthesize(
        name: &str,
        statements: &CompactedStatements,
        style: PlaceholderStyle,
    ) -> Result<Self, SqlOpError> {
        let category = classify(statements);
        let mut compiled: Vec<CompiledSql> = statements
            .iter()
            .map(|stmt| compile_named_markers(stmt.sql(), style))
            .collect();
        if compiled.is_empty() {
            return Err(SqlOpError::parse(name, "no statements to synthesize"));
        }

        let callable = match category {
            StatementCategory::SingleInsert => Callable::Insert(compiled.swap_remove(0)),
            StatementCategory::MultiInsert => Callable::MultiInsert(compiled),
            StatementCategory::SingleValue => Callable::Value(compiled.swap_remove(0)),
            StatementCategory::SingleRow => Callable::Row(compiled.swap_remove(0)),
            StatementCategory::Table => Callable::Table(compiled.swap_remove(0)),
            StatementCategory::Script => {
                let native = compiled
                    .iter()
                    .all(|sql| !sql.has_params())
                    .then(|| statements.script());
                Callable::Script {
                    statements: compiled,
                    native,
                }
            }
        };

        debug!(
            operation = name,
            %category,
            statements = statements.len(),
            "synthesized operation"
        );
        Ok(Self {
            name: name.to_string(),
            category,
            style,
            callable,
        })
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn category(&self) -> StatementCategory {
        self.category
    }

    #[must_use]
    pub fn placeholder_style(&self) -> PlaceholderStyle {
        self.style
    }

    /// The compiled statements in execution order.
    #[must_use]
    pub fn statements(&self) -> &[CompiledSql] {
        match &self.callable {
            Callable::Insert(sql)
            | Callable::Value(sql)
            | Callable::Row(sql)
            | Callable::Table(sql) => std::slice::from_ref(sql),
            Callable::MultiInsert(statements) | Callable::Script { statements, .. } => statements,
        }
    }

    /// Distinct parameter names across all statements, in first-appearance order.
    #[must_use]
    pub fn param_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::new();
        for name in self.statements().iter().flat_map(CompiledSql::param_names) {
            if !names.contains(&name.as_str()) {
                names.push(name);
            }
        }
        names
    }

    /// Execute against `backend`. The caller owns the transaction scope; a batch runs
    /// every element in order and stops at the first failure.
    ///
    /// # Errors
    /// Returns `SqlOpError::ParameterBindingError` for a missing marker value, or the
    /// backend's error unchanged.
    pub fn run<B: Backend + ?Sized>(
        &self,
        backend: &mut B,
        args: &InvocationArgs,
    ) -> Result<OperationOutput, SqlOpError> {
        match args {
            InvocationArgs::Single(params) => self.run_once(backend, params),
            InvocationArgs::Batch(batch) => batch
                .iter()
                .map(|params| self.run_once(backend, params))
                .collect::<Result<Vec<_>, _>>()
                .map(OperationOutput::Batch),
        }
    }

    fn bind_all(
        &self,
        statements: &[CompiledSql],
        params: &ParamMap,
    ) -> Result<Vec<Vec<RowValues>>, SqlOpError> {
        statements
            .iter()
            .map(|sql| {
                bind(params, sql.param_names()).map_err(|parameter| {
                    SqlOpError::ParameterBindingError {
                        operation: self.name.clone(),
                        parameter,
                    }
                })
            })
            .collect()
    }

    fn run_once<B: Backend + ?Sized>(
        &self,
        backend: &mut B,
        params: &ParamMap,
    ) -> Result<OperationOutput, SqlOpError> {
        trace!(operation = %self.name, category = %self.category, "running operation");
        match &self.callable {
            Callable::Script {
                native: Some(script),
                ..
            } if backend.capabilities().native_script => {
                backend.execute_script(script).map(OperationOutput::Script)
            }
            Callable::Script { statements, .. } => {
                let bound = self.bind_all(statements, params)?;
                statements
                    .iter()
                    .zip(bound)
                    .map(|(sql, values)| backend.execute(sql.sql(), &values))
                    .collect::<Result<Vec<_>, _>>()
                    .map(OperationOutput::Script)
            }
            Callable::MultiInsert(statements) => {
                let bound = self.bind_all(statements, params)?;
                let mut row_id = None;
                for (sql, values) in statements.iter().zip(bound) {
                    let outcome = backend.execute(sql.sql(), &values)?;
                    if row_id.is_none() {
                        row_id = Some(self.row_id(backend, &outcome)?);
                    }
                }
                row_id.map(OperationOutput::RowId).ok_or_else(|| {
                    SqlOpError::ExecutionError(format!("operation `{}` ran no statements", self.name))
                })
            }
            Callable::Insert(sql) => {
                let outcome = self.execute_one(backend, sql, params)?;
                self.row_id(backend, &outcome).map(OperationOutput::RowId)
            }
            Callable::Value(sql) => {
                let outcome = self.execute_one(backend, sql, params)?;
                let value = outcome
                    .into_first_row()
                    .and_then(|row| row.into_values().into_iter().next());
                Ok(OperationOutput::Value(value))
            }
            Callable::Row(sql) => {
                let outcome = self.execute_one(backend, sql, params)?;
                Ok(OperationOutput::Row(outcome.into_first_row()))
            }
            Callable::Table(sql) => self
                .execute_one(backend, sql, params)
                .map(OperationOutput::Table),
        }
    }

    fn execute_one<B: Backend + ?Sized>(
        &self,
        backend: &mut B,
        sql: &CompiledSql,
        params: &ParamMap,
    ) -> Result<ResultSet, SqlOpError> {
        let values = bind(params, sql.param_names()).map_err(|parameter| {
            SqlOpError::ParameterBindingError {
                operation: self.name.clone(),
                parameter,
            }
        })?;
        backend.execute(sql.sql(), &values)
    }

    fn row_id<B: Backend + ?Sized>(
        &self,
        backend: &mut B,
        outcome: &ResultSet,
    ) -> Result<i64, SqlOpError> {
        if backend.capabilities().reports_last_insert_id {
            if let Some(id) = outcome.last_insert_id {
                return Ok(id);
            }
            // the connection-wide id would belong to an earlier insert
            if outcome.rows_affected == 0 {
                return Err(SqlOpError::ExecutionError(format!(
                    "insert operation `{}` inserted no row",
                    self.name
                )));
            }
        }
        backend.last_insert_id()?.ok_or_else(|| {
            SqlOpError::ExecutionError(format!(
                "insert operation `{}` produced no row id",
                self.name
            ))
        })
    }
}

impl OperationOutput {
    /// Row id of a single insert.
    #[must_use]
    pub fn row_id(&self) -> Option<i64> {
        match self {
            Self::RowId(id) => Some(*id),
            _ => None,
        }
    }

    /// Row ids of a batched insert, in input order.
    #[must_use]
    pub fn row_ids(&self) -> Option<Vec<i64>> {
        match self {
            Self::Batch(outputs) => outputs.iter().map(Self::row_id).collect(),
            Self::RowId(id) => Some(vec![*id]),
            _ => None,
        }
    }

    /// Scalar of a single-value operation; `None` when no row matched.
    #[must_use]
    pub fn value(&self) -> Option<&RowValues> {
        match self {
            Self::Value(value) => value.as_ref(),
            _ => None,
        }
    }

    #[must_use]
    pub fn row(&self) -> Option<&CustomDbRow> {
        match self {
            Self::Row(row) => row.as_ref(),
            _ => None,
        }
    }

    #[must_use]
    pub fn table(&self) -> Option<&ResultSet> {
        match self {
            Self::Table(rows) => Some(rows),
            _ => None,
        }
    }

    #[must_use]
    pub fn script(&self) -> Option<&[ResultSet]> {
        match self {
            Self::Script(results) => Some(results),
            _ => None,
        }
    }

    #[must_use]
    pub fn batch(&self) -> Option<&[OperationOutput]> {
        match self {
            Self::Batch(outputs) => Some(outputs),
            _ => None,
        }
    }

    /// True for the null sentinel: a value or row lookup that matched nothing.
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Value(None) | Self::Row(None))
    }

    #[must_use]
    pub fn to_json(&self) -> JsonValue {
        match self {
            Self::RowId(id) => JsonValue::from(*id),
            Self::Value(value) => value.as_ref().map_or(JsonValue::Null, RowValues::to_json),
            Self::Row(row) => row.as_ref().map_or(JsonValue::Null, CustomDbRow::to_json),
            Self::Table(rows) => rows.to_json(),
            Self::Script(results) => results.iter().map(ResultSet::to_json).collect(),
            Self::Batch(outputs) => outputs.iter().map(Self::to_json).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::preprocess::{StatementSource, compact};
    use crate::types::SqlDialect;

    fn operation(sql: &str, style: PlaceholderStyle) -> Result<Operation, SqlOpError> {
        let compacted = compact(&StatementSource::new(sql, "op"), SqlDialect::Sqlite)?;
        Operation::synthesize("op", &compacted, style)
    }

    #[test]
    fn compiles_each_statement_for_the_backend_style() -> Result<(), SqlOpError> {
        let op = operation(
            "INSERT INTO a (x) VALUES (:x); UPDATE b SET n = :n, x = :x",
            PlaceholderStyle::Postgres,
        )?;
        assert_eq!(op.category(), StatementCategory::MultiInsert);
        let sqls: Vec<&str> = op.statements().iter().map(CompiledSql::sql).collect();
        assert_eq!(
            sqls,
            ["INSERT INTO a (x) VALUES ($1)", "UPDATE b SET n = $1, x = $2"]
        );
        assert_eq!(op.param_names(), ["x", "n"]);
        Ok(())
    }

    #[test]
    fn parameterless_scripts_carry_native_text() -> Result<(), SqlOpError> {
        let op = operation(
            "CREATE TABLE a (id INTEGER); -- done\nCREATE TABLE b (id INTEGER);",
            PlaceholderStyle::Sqlite,
        )?;
        assert!(matches!(
            &op.callable,
            Callable::Script { native: Some(text), .. }
                if text == "CREATE TABLE a (id INTEGER);\nCREATE TABLE b (id INTEGER);"
        ));

        let op = operation(
            "DELETE FROM a WHERE id = :id; DELETE FROM b WHERE id = :id",
            PlaceholderStyle::Sqlite,
        )?;
        assert!(matches!(&op.callable, Callable::Script { native: None, .. }));
        Ok(())
    }

    #[test]
    fn output_accessors() {
        let batch = OperationOutput::Batch(vec![OperationOutput::RowId(1), OperationOutput::RowId(2)]);
        assert_eq!(batch.row_ids(), Some(vec![1, 2]));
        assert_eq!(batch.to_json(), serde_json::json!([1, 2]));

        let missing = OperationOutput::Value(None);
        assert!(missing.is_null());
        assert_eq!(missing.value(), None);
        assert_eq!(missing.to_json(), JsonValue::Null);

        let mixed = OperationOutput::Batch(vec![OperationOutput::Value(None)]);
        assert_eq!(mixed.row_ids(), None);
    }
}
