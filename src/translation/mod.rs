mod scanner;

use scanner::{Cursor, State};

/// Native placeholder syntax a backend expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlaceholderStyle {
    /// SQLite-style numbered placeholders like `?1`.
    #[default]
    Sqlite,
    /// PostgreSQL-style placeholders like `$1`.
    Postgres,
    /// Keep `:name` markers; values are still supplied in first-appearance order.
    Named,
}

/// SQL text with its named markers rewritten for a backend, plus the marker names in
/// binding order.
///
/// Each distinct name occupies one slot: `:id` used twice binds a single value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledSql {
    sql: String,
    params: Vec<String>,
}

impl CompiledSql {
    #[must_use]
    pub fn sql(&self) -> &str {
        &self.sql
    }

    /// Parameter names (without sigil) in placeholder order.
    #[must_use]
    pub fn param_names(&self) -> &[String] {
        &self.params
    }

    #[must_use]
    pub fn has_params(&self) -> bool {
        !self.params.is_empty()
    }
}

/// Rewrite `:name` markers into `style` placeholders.
///
/// Markers inside string literals, quoted identifiers and comments are left alone, as are
/// `::` casts. Dollar-quoted bodies are only recognised for [`PlaceholderStyle::Postgres`],
/// since `$name` is an ordinary parameter in `SQLite`.
///
/// ```rust
/// use sql_operations::prelude::*;
///
/// let compiled = compile_named_markers("select * from t where a = :a or b = :a", PlaceholderStyle::Postgres);
/// assert_eq!(compiled.sql(), "select * from t where a = $1 or b = $1");
/// assert_eq!(compiled.param_names(), ["a".to_string()]);
/// ```
#[must_use]
pub fn compile_named_markers(sql: &str, style: PlaceholderStyle) -> CompiledSql {
    let cur = Cursor::new(sql);
    let mut out = String::with_capacity(sql.len());
    let mut params: Vec<String> = Vec::new();
    let mut copied = 0;
    let mut state = State::Normal;
    let mut pos = 0;

    while pos < cur.len() {
        let Some(b) = cur.at(pos) else { break };
        // bytes consumed by this step
        let mut step = 1;
        state = match state {
            State::Normal => match b {
                b'\'' => State::SingleQuoted,
                b'"' => State::DoubleQuoted,
                b'-' if cur.starts_with(pos, b"--") => {
                    step = 2;
                    State::LineComment
                }
                b'/' if cur.starts_with(pos, b"/*") => {
                    step = 2;
                    State::BlockComment(1)
                }
                b'$' if style == PlaceholderStyle::Postgres => match cur.dollar_tag(pos) {
                    Some((tag, close)) => {
                        step = close + 1 - pos;
                        State::DollarQuoted(tag)
                    }
                    None => State::Normal,
                },
                b':' if cur.at(pos + 1) == Some(b':') => {
                    step = 2;
                    State::Normal
                }
                b':' => {
                    if let Some(end) = cur.identifier_end(pos + 1) {
                        let name = &sql[pos + 1..end];
                        let slot = slot_for(&mut params, name);
                        out.push_str(&sql[copied..pos]);
                        push_placeholder(&mut out, style, name, slot);
                        copied = end;
                        step = end - pos;
                    }
                    State::Normal
                }
                _ => State::Normal,
            },
            State::SingleQuoted if b == b'\'' => {
                if cur.at(pos + 1) == Some(b'\'') {
                    step = 2;
                    State::SingleQuoted
                } else {
                    State::Normal
                }
            }
            State::DoubleQuoted if b == b'"' => {
                if cur.at(pos + 1) == Some(b'"') {
                    step = 2;
                    State::DoubleQuoted
                } else {
                    State::Normal
                }
            }
            State::LineComment if b == b'\n' => State::Normal,
            State::BlockComment(depth) if cur.starts_with(pos, b"/*") => {
                step = 2;
                State::BlockComment(depth + 1)
            }
            State::BlockComment(depth) if cur.starts_with(pos, b"*/") => {
                step = 2;
                if depth == 1 {
                    State::Normal
                } else {
                    State::BlockComment(depth - 1)
                }
            }
            State::DollarQuoted(tag) if cur.closes_dollar(pos, &tag) => {
                step = tag.len() + 2;
                State::Normal
            }
            other => other,
        };
        pos += step;
    }

    out.push_str(&sql[copied..]);
    CompiledSql { sql: out, params }
}

/// One-based slot of `name`, appending it on first sight.
fn slot_for(params: &mut Vec<String>, name: &str) -> usize {
    if let Some(pos) = params.iter().position(|p| p == name) {
        return pos + 1;
    }
    params.push(name.to_string());
    params.len()
}

fn push_placeholder(out: &mut String, style: PlaceholderStyle, name: &str, slot: usize) {
    match style {
        PlaceholderStyle::Sqlite => {
            out.push('?');
            out.push_str(&slot.to_string());
        }
        PlaceholderStyle::Postgres => {
            out.push('$');
            out.push_str(&slot.to_string());
        }
        PlaceholderStyle::Named => {
            out.push(':');
            out.push_str(name);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compiles_to_sqlite_numbered() {
        let res = compile_named_markers(
            "insert into t(a, b) values(:a, :b)",
            PlaceholderStyle::Sqlite,
        );
        assert_eq!(res.sql(), "insert into t(a, b) values(?1, ?2)");
        assert_eq!(res.param_names(), ["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn repeated_names_share_a_slot() {
        let res = compile_named_markers(
            "select * from t where a = :x and b = :y or c = :x",
            PlaceholderStyle::Postgres,
        );
        assert_eq!(res.sql(), "select * from t where a = $1 and b = $2 or c = $1");
        assert_eq!(res.param_names().len(), 2);
    }

    #[test]
    fn skips_inside_literals_and_comments() {
        let sql = "select ':a', \":b\" -- :c\n/* :d */ from t where a = :e";
        let res = compile_named_markers(sql, PlaceholderStyle::Sqlite);
        assert_eq!(
            res.sql(),
            "select ':a', \":b\" -- :c\n/* :d */ from t where a = ?1"
        );
        assert_eq!(res.param_names(), ["e".to_string()]);
    }

    #[test]
    fn leaves_casts_and_escaped_quotes_alone() {
        let sql = "select a::text, 'it''s :x' from t where b = :b";
        let res = compile_named_markers(sql, PlaceholderStyle::Postgres);
        assert_eq!(res.sql(), "select a::text, 'it''s :x' from t where b = $1");
    }

    #[test]
    fn skips_dollar_quoted_blocks_for_postgres() {
        let sql = "$body$ select :a $body$ where a = :a";
        let res = compile_named_markers(sql, PlaceholderStyle::Postgres);
        assert_eq!(res.sql(), "$body$ select :a $body$ where a = $1");
    }

    #[test]
    fn named_style_keeps_markers_and_non_ascii_text() {
        let sql = "select 'café' from t where name = :name";
        let res = compile_named_markers(sql, PlaceholderStyle::Named);
        assert_eq!(res.sql(), sql);
        assert!(res.has_params());
    }

    #[test]
    fn sql_without_markers_has_no_params() {
        let res = compile_named_markers("select 1", PlaceholderStyle::Sqlite);
        assert_eq!(res.sql(), "select 1");
        assert!(!res.has_params());
    }
}
