use std::fmt;

use serde::Serialize;
use sqlparser::keywords::Keyword;
use sqlparser::tokenizer::{Token, Word};

use crate::preprocess::{CompactedStatement, CompactedStatements};

/// Execution shape of a registered operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StatementCategory {
    /// One `INSERT`; yields the generated row id.
    SingleInsert,
    /// `INSERT` followed by more statements; yields the first statement's row id.
    MultiInsert,
    /// `LIMIT 1` with a single projected column; yields a scalar or nothing.
    SingleValue,
    /// `LIMIT 1` otherwise; yields one row or nothing.
    SingleRow,
    /// Any other single statement; yields every row.
    Table,
    /// Several statements not led by an `INSERT`.
    Script,
}

impl StatementCategory {
    #[must_use]
    pub fn is_insert(self) -> bool {
        matches!(self, Self::SingleInsert | Self::MultiInsert)
    }
}

impl fmt::Display for StatementCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::SingleInsert => "single_insert",
            Self::MultiInsert => "multi_insert",
            Self::SingleValue => "single_value",
            Self::SingleRow => "single_row",
            Self::Table => "table",
            Self::Script => "script",
        };
        f.write_str(name)
    }
}

/// The top-level `LIMIT` of a statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LimitClause {
    Absent,
    Literal(u64),
    /// Anything that is not a plain integer, kept as rendered SQL.
    Expression(String),
}

/// One item of a `SELECT` list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectedColumn {
    pub name: String,
    pub wildcard: bool,
}

/// Assign a category to compacted statements.
///
/// ```rust
/// use sql_operations::prelude::*;
///
/// let source = StatementSource::new("SELECT name FROM users WHERE id = :id LIMIT 1", "get_name");
/// let compacted = compact(&source, SqlDialect::Sqlite)?;
/// assert_eq!(classify(&compacted), StatementCategory::SingleValue);
/// # Ok::<(), SqlOpError>(())
/// ```
#[must_use]
pub fn classify(statements: &CompactedStatements) -> StatementCategory {
    let Some(first) = statements.first() else {
        return StatementCategory::Script;
    };
    let leads_with_insert = leading_keyword(first) == Some(Keyword::INSERT);

    match (statements.len(), leads_with_insert) {
        (1, true) => StatementCategory::SingleInsert,
        (_, true) => StatementCategory::MultiInsert,
        (1, false) => match limit_clause(first) {
            LimitClause::Literal(1) => {
                let columns = projected_columns(first);
                match columns.as_slice() {
                    [column] if !column.wildcard => StatementCategory::SingleValue,
                    _ => StatementCategory::SingleRow,
                }
            }
            _ => StatementCategory::Table,
        },
        _ => StatementCategory::Script,
    }
}

fn significant(statement: &CompactedStatement) -> Vec<&Token> {
    statement
        .tokens()
        .iter()
        .filter(|t| !matches!(t, Token::Whitespace(_)))
        .collect()
}

fn keyword_of(token: &Token) -> Option<Keyword> {
    match token {
        Token::Word(Word {
            keyword,
            quote_style: None,
            ..
        }) if *keyword != Keyword::NoKeyword => Some(*keyword),
        _ => None,
    }
}

fn is_keyword(token: &Token, keywords: &[Keyword]) -> bool {
    keyword_of(token).is_some_and(|kw| keywords.contains(&kw))
}

pub(crate) fn leading_keyword(statement: &CompactedStatement) -> Option<Keyword> {
    statement
        .tokens()
        .iter()
        .find(|t| !matches!(t, Token::Whitespace(_)))
        .and_then(keyword_of)
}

/// Split `tokens` on commas outside parentheses.
fn split_top_level_commas<'a>(tokens: &[&'a Token]) -> Vec<Vec<&'a Token>> {
    let mut parts = vec![Vec::new()];
    let mut depth = 0usize;
    for &token in tokens {
        match token {
            Token::LParen => depth += 1,
            Token::RParen => depth = depth.saturating_sub(1),
            Token::Comma if depth == 0 => {
                parts.push(Vec::new());
                continue;
            }
            _ => {}
        }
        if let Some(part) = parts.last_mut() {
            part.push(token);
        }
    }
    parts
}

fn render(tokens: &[&Token]) -> String {
    tokens
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Find the last `LIMIT` at parenthesis depth 0.
///
/// `LIMIT offset, count` reports `count`; an `OFFSET` clause ends the expression.
#[must_use]
pub fn limit_clause(statement: &CompactedStatement) -> LimitClause {
    let tokens = significant(statement);
    let mut depth = 0usize;
    let mut limit_at = None;
    for (idx, token) in tokens.iter().enumerate() {
        match token {
            Token::LParen => depth += 1,
            Token::RParen => depth = depth.saturating_sub(1),
            _ if depth == 0 && is_keyword(token, &[Keyword::LIMIT]) => limit_at = Some(idx),
            _ => {}
        }
    }

    let Some(start) = limit_at else {
        return LimitClause::Absent;
    };

    let expr: Vec<&Token> = tokens[start + 1..]
        .iter()
        .copied()
        .take_while(|t| !is_keyword(t, LIMIT_END) && !matches!(t, Token::RParen))
        .collect();
    let parts = split_top_level_commas(&expr);
    let count = parts.last().map(Vec::as_slice).unwrap_or_default();

    match count {
        [Token::Number(digits, false)] => digits.parse::<u64>().map_or_else(
            |_| LimitClause::Expression(digits.clone()),
            LimitClause::Literal,
        ),
        _ => LimitClause::Expression(render(count)),
    }
}

/// Keywords that may follow the row count of a `LIMIT` clause.
const LIMIT_END: &[Keyword] = &[Keyword::OFFSET, Keyword::FOR, Keyword::FETCH];

const SELECT_LIST_END: &[Keyword] = &[
    Keyword::FROM,
    Keyword::INTO,
    Keyword::WHERE,
    Keyword::GROUP,
    Keyword::HAVING,
    Keyword::ORDER,
    Keyword::LIMIT,
    Keyword::UNION,
    Keyword::EXCEPT,
    Keyword::INTERSECT,
    Keyword::WINDOW,
];

/// Columns of the first top-level `SELECT` list. Empty when the statement has none.
#[must_use]
pub fn projected_columns(statement: &CompactedStatement) -> Vec<ProjectedColumn> {
    let tokens = significant(statement);
    let mut depth = 0usize;
    let mut select_at = None;
    for (idx, token) in tokens.iter().enumerate() {
        match token {
            Token::LParen => depth += 1,
            Token::RParen => depth = depth.saturating_sub(1),
            _ if depth == 0 && is_keyword(token, &[Keyword::SELECT]) => {
                select_at = Some(idx);
                break;
            }
            _ => {}
        }
    }
    let Some(select_at) = select_at else {
        return Vec::new();
    };

    let mut list: Vec<&Token> = Vec::new();
    let mut depth = 0usize;
    for &token in tokens[select_at + 1..]
        .iter()
        .skip_while(|t| is_keyword(t, &[Keyword::DISTINCT, Keyword::ALL]))
    {
        match token {
            Token::LParen => depth += 1,
            Token::RParen if depth == 0 => break,
            Token::RParen => depth -= 1,
            Token::SemiColon if depth == 0 => break,
            _ if depth == 0 && is_keyword(token, SELECT_LIST_END) => break,
            _ => {}
        }
        list.push(token);
    }

    split_top_level_commas(&list)
        .into_iter()
        .filter(|item| !item.is_empty())
        .map(|item| column_from_item(&item))
        .collect()
}

fn column_from_item(item: &[&Token]) -> ProjectedColumn {
    let wildcard = matches!(item, [Token::Mul] | [.., Token::Period, Token::Mul]);
    if wildcard {
        return ProjectedColumn {
            name: "*".to_string(),
            wildcard,
        };
    }

    let name = match item {
        [.., Token::Word(word)] => word.value.clone(),
        _ => render(item),
    };
    ProjectedColumn { name, wildcard }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SqlOpError;
    use crate::preprocess::{StatementSource, compact};
    use crate::types::SqlDialect;

    fn compacted(sql: &str) -> Result<CompactedStatements, SqlOpError> {
        compact(&StatementSource::new(sql, "test"), SqlDialect::Sqlite)
    }

    fn category(sql: &str) -> Result<StatementCategory, SqlOpError> {
        Ok(classify(&compacted(sql)?))
    }

    fn first_columns(sql: &str) -> Result<Vec<String>, SqlOpError> {
        let stmts = compacted(sql)?;
        Ok(stmts
            .first()
            .map(projected_columns)
            .unwrap_or_default()
            .into_iter()
            .map(|c| c.name)
            .collect())
    }

    #[test]
    fn inserts_are_classified_by_statement_count() -> Result<(), SqlOpError> {
        assert_eq!(
            category("INSERT INTO users(name) VALUES (:name)")?,
            StatementCategory::SingleInsert
        );
        assert_eq!(
            category("insert into users(name) values (:name); UPDATE stats SET n = n + 1")?,
            StatementCategory::MultiInsert
        );
        Ok(())
    }

    #[test]
    fn limit_one_with_single_column_is_a_value() -> Result<(), SqlOpError> {
        assert_eq!(
            category("SELECT name FROM users WHERE id = :id LIMIT 1")?,
            StatementCategory::SingleValue
        );
        assert_eq!(
            category("SELECT count(*) AS n FROM users LIMIT 1")?,
            StatementCategory::SingleValue
        );
        Ok(())
    }

    #[test]
    fn limit_one_with_many_columns_or_wildcard_is_a_row() -> Result<(), SqlOpError> {
        assert_eq!(
            category("SELECT id, name FROM users LIMIT 1")?,
            StatementCategory::SingleRow
        );
        assert_eq!(
            category("SELECT * FROM users LIMIT 1")?,
            StatementCategory::SingleRow
        );
        assert_eq!(
            category("SELECT u.* FROM users u LIMIT 1 OFFSET 3")?,
            StatementCategory::SingleRow
        );
        Ok(())
    }

    #[test]
    fn other_limits_are_tables() -> Result<(), SqlOpError> {
        assert_eq!(category("SELECT name FROM users")?, StatementCategory::Table);
        assert_eq!(
            category("SELECT name FROM users LIMIT 10")?,
            StatementCategory::Table
        );
        assert_eq!(
            category("SELECT name FROM users LIMIT :n")?,
            StatementCategory::Table
        );
        assert_eq!(
            category("SELECT name FROM users WHERE id IN (SELECT id FROM t LIMIT 1)")?,
            StatementCategory::Table
        );
        assert_eq!(
            category("UPDATE users SET name = :name WHERE id = :id")?,
            StatementCategory::Table
        );
        Ok(())
    }

    #[test]
    fn several_statements_not_led_by_insert_are_a_script() -> Result<(), SqlOpError> {
        assert_eq!(
            category("CREATE TABLE a (id INTEGER); INSERT INTO a VALUES (1)")?,
            StatementCategory::Script
        );
        Ok(())
    }

    #[test]
    fn limit_clause_forms() -> Result<(), SqlOpError> {
        let limit = |sql: &str| -> Result<LimitClause, SqlOpError> {
            let stmts = compacted(sql)?;
            Ok(stmts.first().map_or(LimitClause::Absent, limit_clause))
        };
        assert_eq!(limit("SELECT a FROM t")?, LimitClause::Absent);
        assert_eq!(limit("SELECT a FROM t LIMIT 1")?, LimitClause::Literal(1));
        assert_eq!(limit("SELECT a FROM t LIMIT 5, 1")?, LimitClause::Literal(1));
        assert_eq!(limit("SELECT a FROM t LIMIT 1 OFFSET 4")?, LimitClause::Literal(1));
        assert_eq!(
            limit("SELECT a FROM t WHERE id = :id LIMIT 1 FOR UPDATE")?,
            LimitClause::Literal(1)
        );
        assert_eq!(
            limit("SELECT a FROM t LIMIT 1 FOR SHARE SKIP LOCKED")?,
            LimitClause::Literal(1)
        );
        assert!(matches!(
            limit("SELECT a FROM t LIMIT 1 + 1")?,
            LimitClause::Expression(_)
        ));
        Ok(())
    }

    #[test]
    fn projected_column_names() -> Result<(), SqlOpError> {
        assert_eq!(
            first_columns("SELECT DISTINCT u.name, max(age) oldest, (a + b) AS total FROM u")?,
            ["name", "oldest", "total"]
        );
        assert_eq!(
            first_columns("WITH x AS (SELECT 1 AS one) SELECT one FROM x LIMIT 1")?,
            ["one"]
        );
        assert!(first_columns("DELETE FROM users")?.is_empty());
        Ok(())
    }

    #[test]
    fn category_names() {
        assert_eq!(StatementCategory::SingleInsert.to_string(), "single_insert");
        assert!(StatementCategory::MultiInsert.is_insert());
        assert!(!StatementCategory::Script.is_insert());
    }

    #[test]
    fn locking_clause_keeps_single_value() -> Result<(), SqlOpError> {
        let source = StatementSource::new(
            "SELECT name FROM users WHERE id = :id LIMIT 1 FOR UPDATE",
            "lock_name",
        );
        let stmts = compact(&source, SqlDialect::Postgres)?;
        assert_eq!(classify(&stmts), StatementCategory::SingleValue);
        Ok(())
    }
}
