use std::fs;
use std::iter::Peekable;
use std::path::{Path, PathBuf};

use sqlparser::tokenizer::{Token, Whitespace, Word};
use tracing::debug;

use super::tokenize;
use crate::error::SqlOpError;
use crate::types::SqlDialect;

/// Expands `INCLUDE "path";` directives and replaces comments with a single space.
///
/// Every include path resolves against the same base directory, however deep the
/// nesting. The stack of canonical paths being expanded catches cycles.
pub(super) struct IncludeResolver {
    dialect: SqlDialect,
    base: PathBuf,
    stack: Vec<PathBuf>,
}

impl IncludeResolver {
    pub(super) fn new(dialect: SqlDialect, base: Option<&Path>) -> Self {
        Self {
            dialect,
            base: base.map_or_else(|| PathBuf::from("."), Path::to_path_buf),
            stack: Vec::new(),
        }
    }

    pub(super) fn expand(
        &mut self,
        tokens: Vec<Token>,
        origin: &str,
    ) -> Result<Vec<Token>, SqlOpError> {
        let mut out = Vec::with_capacity(tokens.len());
        let mut at_statement_start = true;
        let mut iter = tokens.into_iter().peekable();

        while let Some(token) = iter.next() {
            match token {
                Token::Whitespace(
                    Whitespace::SingleLineComment { .. } | Whitespace::MultiLineComment(_),
                ) => out.push(Token::Whitespace(Whitespace::Space)),
                Token::Whitespace(_) => out.push(token),
                Token::Word(ref word) if at_statement_start && is_include_keyword(word) => {
                    let target = next_include_path(&mut iter).ok_or_else(|| {
                        SqlOpError::parse(origin, "INCLUDE must be followed by a quoted file name")
                    })?;
                    skip_trivia(&mut iter);
                    if matches!(iter.peek(), Some(Token::SemiColon)) {
                        iter.next();
                    }

                    let included = self.include(&target, origin)?;
                    out.push(Token::Whitespace(Whitespace::Space));
                    out.extend(included);
                    out.push(Token::SemiColon);
                }
                Token::SemiColon => {
                    at_statement_start = true;
                    out.push(token);
                }
                other => {
                    at_statement_start = false;
                    out.push(other);
                }
            }
        }

        Ok(out)
    }

    fn include(&mut self, target: &str, origin: &str) -> Result<Vec<Token>, SqlOpError> {
        let path = self.base.join(target);
        let canonical = fs::canonicalize(&path).map_err(|e| SqlOpError::io(&path, e))?;
        if self.stack.contains(&canonical) {
            return Err(SqlOpError::parse(
                origin,
                format!("INCLUDE cycle through {}", path.display()),
            ));
        }

        let text = fs::read_to_string(&canonical).map_err(|e| SqlOpError::io(&path, e))?;
        let nested_origin = path.display().to_string();
        debug!(origin, include = %nested_origin, "expanding include");
        let tokens = tokenize(&text, self.dialect, &nested_origin)?;

        self.stack.push(canonical);
        let expanded = self.expand(tokens, &nested_origin);
        self.stack.pop();
        expanded
    }
}

fn is_include_keyword(word: &Word) -> bool {
    word.quote_style.is_none() && word.value.eq_ignore_ascii_case("include")
}

fn skip_trivia<I>(iter: &mut Peekable<I>)
where
    I: Iterator<Item = Token>,
{
    while matches!(iter.peek(), Some(Token::Whitespace(_))) {
        iter.next();
    }
}

fn next_include_path<I>(iter: &mut Peekable<I>) -> Option<String>
where
    I: Iterator<Item = Token>,
{
    skip_trivia(iter);
    match iter.next()? {
        Token::SingleQuotedString(path) | Token::DoubleQuotedString(path) => Some(path),
        Token::Word(Word {
            value,
            quote_style: Some(_),
            ..
        }) => Some(value),
        _ => None,
    }
}
