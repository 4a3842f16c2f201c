use lazy_static::lazy_static;
use regex::Regex;

use crate::{
    error::SyntaxError,
    types::Position,
    utils::{quote, width},
};

lazy_static! {
    pub static ref TOKEN_REGEX:   Regex = Regex::new(r"(\b[A-Za-z_][A-Za-z0-9_]*\b|[{};]|#[^\n]*|\s+)").unwrap();
    pub static ref WHITESPACE_RX: Regex = Regex::new(r"^(#[^\n]*|\s+)$").unwrap();
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub text:   String,
    pub line:   usize,
    pub column: usize,
}

impl Token {
    pub fn position(&self) -> Position {
        Position::new(self.line, self.column)
    }

    pub fn is_eof(&self) -> bool {
        self.text.is_empty()
    }
}

/// Splits IDL source into tokens, dropping whitespace and `#` comments.
/// The last token is always the empty end-of-input token.
#[tracing::instrument(skip_all, fields(source_len = text.len()))]
pub fn tokenize(text: &str) -> Result<Vec<Token>, SyntaxError> {
    let mut tokens   = Vec::new();
    let mut line     = 1;
    let mut column   = 1;
    let mut last_end = 0;

    for mat in TOKEN_REGEX.find_iter(text) {
        let start = mat.start();
        let part  = mat.as_str();

        if start > last_end {
            return Err(SyntaxError::new(
                "a token",
                quote(&text[last_end..start]),
                Position::new(line, column),
            ));
        }

        if !WHITESPACE_RX.is_match(part) {
            tokens.push(Token {
                text: part.to_string(),
                line,
                column,
            });
        }

        let newline_count = part.matches('\n').count();
        if newline_count > 0 {
            line += newline_count;
            if let Some(last_line_part) = part.split('\n').last() {
                column = width(last_line_part) + 1;
            }
        } else {
            column += width(part);
        }

        last_end = mat.end();
    }

    if last_end != text.len() {
        return Err(SyntaxError::new(
            "a token",
            quote(&text[last_end..]),
            Position::new(line, column),
        ));
    }

    tokens.push(Token {
        text: String::new(),
        line,
        column,
    });
    tracing::debug!(count = tokens.len(), "tokenized source");
    Ok(tokens)
}
