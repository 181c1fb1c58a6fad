// Preprocessing turns raw SQL text into compacted statements:
// - include: `INCLUDE "file"` substitution and comment stripping
// - split: top-level statement splitting that keeps trigger bodies intact

mod include;
mod split;

use std::fs;
use std::path::{Path, PathBuf};

use sqlparser::tokenizer::{Token, Tokenizer, Whitespace};

use crate::error::SqlOpError;
use crate::types::SqlDialect;

use include::IncludeResolver;
use split::split_statements;

/// Raw SQL as handed to registration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatementSource {
    text: String,
    origin: String,
    base_path: Option<PathBuf>,
}

impl StatementSource {
    /// Source text with an origin label used in error messages (usually the operation name).
    #[must_use]
    pub fn new(text: impl Into<String>, origin: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            origin: origin.into(),
            base_path: None,
        }
    }

    /// Directory `INCLUDE` paths are resolved against.
    #[must_use]
    pub fn with_base_path(mut self, base_path: impl Into<PathBuf>) -> Self {
        self.base_path = Some(base_path.into());
        self
    }

    /// Read a source from disk. The file's directory becomes the include base.
    ///
    /// # Errors
    /// Returns `SqlOpError::IoError` if the file cannot be read.
    pub fn from_file(path: &Path) -> Result<Self, SqlOpError> {
        let text = fs::read_to_string(path).map_err(|e| SqlOpError::io(path, e))?;
        let source = Self::new(text, path.display().to_string());
        Ok(match path.parent() {
            Some(parent) => source.with_base_path(parent),
            None => source,
        })
    }

    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    #[must_use]
    pub fn origin(&self) -> &str {
        &self.origin
    }

    #[must_use]
    pub fn base_path(&self) -> Option<&Path> {
        self.base_path.as_deref()
    }
}

/// One top-level statement with comments stripped and whitespace collapsed.
#[derive(Debug, Clone, PartialEq)]
pub struct CompactedStatement {
    tokens: Vec<Token>,
    sql: String,
}

impl CompactedStatement {
    fn from_tokens(tokens: Vec<Token>) -> Option<Self> {
        let mut compacted: Vec<Token> = Vec::with_capacity(tokens.len());
        let mut pending_space = false;
        for token in tokens {
            match token {
                Token::Whitespace(_) => pending_space = true,
                Token::EOF => {}
                other => {
                    if pending_space && !compacted.is_empty() {
                        compacted.push(Token::Whitespace(Whitespace::Space));
                    }
                    pending_space = false;
                    compacted.push(other);
                }
            }
        }

        if compacted.is_empty() {
            return None;
        }
        let sql = compacted.iter().map(ToString::to_string).collect();
        Some(Self {
            tokens: compacted,
            sql,
        })
    }

    #[must_use]
    pub fn sql(&self) -> &str {
        &self.sql
    }

    #[must_use]
    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }
}

/// Ordered, non-empty list of compacted statements derived from one source.
#[derive(Debug, Clone, PartialEq)]
pub struct CompactedStatements {
    origin: String,
    statements: Vec<CompactedStatement>,
}

impl CompactedStatements {
    #[must_use]
    pub fn origin(&self) -> &str {
        &self.origin
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.statements.len()
    }

    /// Always false for values produced by [`compact`]; kept for API symmetry.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }

    #[must_use]
    pub fn first(&self) -> Option<&CompactedStatement> {
        self.statements.first()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, CompactedStatement> {
        self.statements.iter()
    }

    /// The statements rejoined as one script, each terminated by `;`.
    #[must_use]
    pub fn script(&self) -> String {
        self.statements
            .iter()
            .map(|stmt| format!("{};", stmt.sql()))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Compact `source`: resolve includes, strip comments and split into statements.
///
/// # Errors
/// Returns `SqlOpError::ParseError` when tokenizing fails, an include is malformed or
/// cyclic, or nothing but comments and whitespace remains. Unreadable include files
/// surface as `SqlOpError::IoError`.
pub fn compact(
    source: &StatementSource,
    dialect: SqlDialect,
) -> Result<CompactedStatements, SqlOpError> {
    let tokens = tokenize(source.text(), dialect, source.origin())?;
    let mut resolver = IncludeResolver::new(dialect, source.base_path());
    let tokens = resolver.expand(tokens, source.origin())?;

    let statements: Vec<CompactedStatement> = split_statements(tokens)
        .into_iter()
        .filter_map(CompactedStatement::from_tokens)
        .collect();

    if statements.is_empty() {
        return Err(SqlOpError::parse(
            source.origin(),
            "no SQL statements left after removing comments and whitespace",
        ));
    }

    Ok(CompactedStatements {
        origin: source.origin().to_string(),
        statements,
    })
}

pub(crate) fn tokenize(
    sql: &str,
    dialect: SqlDialect,
    origin: &str,
) -> Result<Vec<Token>, SqlOpError> {
    let dialect = dialect.tokenizer_dialect();
    Tokenizer::new(dialect.as_ref(), sql)
        .with_unescape(false)
        .tokenize()
        .map_err(|e| SqlOpError::parse(origin, e.to_string()))
}
