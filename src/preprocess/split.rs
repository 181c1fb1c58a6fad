use sqlparser::keywords::Keyword;
use sqlparser::tokenizer::Token;

/// Split a token stream on top-level semicolons.
///
/// `BEGIN ... END` bodies (triggers) and `CASE ... END` expressions are tracked so the
/// semicolons inside them stay with their statement. A `BEGIN` that opens a statement is
/// a transaction start, not a body.
pub(super) fn split_statements(tokens: Vec<Token>) -> Vec<Vec<Token>> {
    let mut statements = Vec::new();
    let mut current: Vec<Token> = Vec::new();
    let mut body_depth: usize = 0;
    let mut significant = 0usize;

    for token in tokens {
        match &token {
            Token::SemiColon if body_depth == 0 => {
                statements.push(std::mem::take(&mut current));
                significant = 0;
                continue;
            }
            Token::Word(word) if word.quote_style.is_none() => match word.keyword {
                Keyword::BEGIN if significant > 0 => body_depth += 1,
                Keyword::CASE => body_depth += 1,
                Keyword::END if body_depth > 0 => body_depth -= 1,
                _ => {}
            },
            _ => {}
        }

        if !matches!(token, Token::Whitespace(_)) {
            significant += 1;
        }
        current.push(token);
    }

    statements.push(current);
    statements
}
