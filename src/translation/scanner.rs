/// Lexical context of the byte under the cursor.
#[derive(Clone)]
pub(super) enum State {
    Normal,
    SingleQuoted,
    DoubleQuoted,
    LineComment,
    BlockComment(u32),
    DollarQuoted(String),
}

/// Byte-level lookahead over SQL text.
pub(super) struct Cursor<'a> {
    bytes: &'a [u8],
}

impl<'a> Cursor<'a> {
    pub(super) fn new(sql: &'a str) -> Self {
        Self {
            bytes: sql.as_bytes(),
        }
    }

    pub(super) fn len(&self) -> usize {
        self.bytes.len()
    }

    pub(super) fn at(&self, pos: usize) -> Option<u8> {
        self.bytes.get(pos).copied()
    }

    pub(super) fn starts_with(&self, pos: usize, pattern: &[u8]) -> bool {
        self.bytes
            .get(pos..)
            .is_some_and(|rest| rest.starts_with(pattern))
    }

    /// End of a `[A-Za-z_][A-Za-z0-9_]*` run starting at `pos`.
    pub(super) fn identifier_end(&self, pos: usize) -> Option<usize> {
        let first = self.at(pos)?;
        if !(first.is_ascii_alphabetic() || first == b'_') {
            return None;
        }
        let tail = self.bytes[pos + 1..]
            .iter()
            .take_while(|b| b.is_ascii_alphanumeric() || **b == b'_')
            .count();
        Some(pos + 1 + tail)
    }

    /// For a `$` at `pos` opening `$tag$`, the tag and the position of its closing `$`.
    pub(super) fn dollar_tag(&self, pos: usize) -> Option<(String, usize)> {
        let body = self.bytes.get(pos + 1..)?;
        let len = body
            .iter()
            .take_while(|b| b.is_ascii_alphanumeric() || **b == b'_')
            .count();
        if body.get(len) != Some(&b'$') {
            return None;
        }
        let tag = std::str::from_utf8(&body[..len]).ok()?;
        Some((tag.to_string(), pos + 1 + len))
    }

    /// Whether `$tag$` starts at `pos`.
    pub(super) fn closes_dollar(&self, pos: usize, tag: &str) -> bool {
        let Some(rest) = self.bytes.get(pos..) else {
            return false;
        };
        rest.len() >= tag.len() + 2
            && rest[0] == b'$'
            && &rest[1..=tag.len()] == tag.as_bytes()
            && rest[tag.len() + 1] == b'$'
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identifiers_stop_at_punctuation() {
        let cur = Cursor::new(":user_id)");
        assert_eq!(cur.identifier_end(1), Some(8));
        assert_eq!(Cursor::new(":1abc").identifier_end(1), None);
    }

    #[test]
    fn dollar_tags() {
        let cur = Cursor::new("$body$ x $body$");
        assert_eq!(cur.dollar_tag(0), Some(("body".to_string(), 5)));
        assert!(cur.closes_dollar(9, "body"));
        assert_eq!(Cursor::new("$1").dollar_tag(0), None);
        assert_eq!(Cursor::new("$$").dollar_tag(0), Some((String::new(), 1)));
    }
}
