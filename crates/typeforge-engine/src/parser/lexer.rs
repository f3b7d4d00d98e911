//! Lexer for forge script.
//!
//! Wraps the logos-generated token stream and attaches line/column
//! information to every token.

use crate::parser::token::{Span, Token};
use logos::Logos;
use thiserror::Error;

/// Lexer error types.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LexError {
    #[error("Unexpected character '{char}' at {span}")]
    UnexpectedCharacter { char: char, span: Span },
    #[error("Unterminated or malformed string literal at {span}")]
    UnterminatedString { span: Span },
    #[error("Invalid number '{text}' at {span}")]
    InvalidNumber { text: String, span: Span },
    #[error("Unterminated block comment at {span}")]
    UnterminatedComment { span: Span },
}

impl LexError {
    pub fn span(&self) -> Span {
        match self {
            LexError::UnexpectedCharacter { span, .. }
            | LexError::UnterminatedString { span }
            | LexError::InvalidNumber { span, .. }
            | LexError::UnterminatedComment { span } => *span,
        }
    }
}

/// Maps byte offsets to 1-based line and column numbers.
#[derive(Debug, Clone)]
pub struct LineIndex {
    line_starts: Vec<usize>,
}

impl LineIndex {
    pub fn new(source: &str) -> Self {
        let mut line_starts = vec![0];
        line_starts.extend(
            source
                .bytes()
                .enumerate()
                .filter(|(_, b)| *b == b'\n')
                .map(|(i, _)| i + 1),
        );
        Self { line_starts }
    }

    /// Line and column (both 1-based) of a byte offset.
    pub fn position(&self, offset: usize) -> (u32, u32) {
        let line = match self.line_starts.binary_search(&offset) {
            Ok(exact) => exact,
            Err(next) => next - 1,
        };
        let column = offset - self.line_starts[line];
        (line as u32 + 1, column as u32 + 1)
    }

    pub fn span(&self, start: usize, end: usize) -> Span {
        let (line, column) = self.position(start);
        Span::new(start, end, line, column)
    }
}

/// Main lexer structure.
pub struct Lexer<'a> {
    source: &'a str,
    index: LineIndex,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str) -> Self {
        Self {
            source,
            index: LineIndex::new(source),
        }
    }

    /// Tokenize the whole source.
    ///
    /// Lexing never stops at the first error: every bad character is
    /// reported and skipped. The token stream always ends with `Token::Eof`.
    pub fn tokenize(self) -> (Vec<(Token, Span)>, Vec<LexError>) {
        let mut tokens = Vec::new();
        let mut errors = Vec::new();
        let mut lex = Token::lexer(self.source);

        while let Some(result) = lex.next() {
            let range = lex.span();
            let span = self.index.span(range.start, range.end);
            match result {
                Ok(token) => tokens.push((token, span)),
                Err(()) => {
                    let text = lex.slice();
                    if text.starts_with("/*") {
                        errors.push(LexError::UnterminatedComment { span });
                        continue;
                    }
                    let error = match text.chars().next() {
                        Some('"') => LexError::UnterminatedString { span },
                        Some(c) if c.is_ascii_digit() => LexError::InvalidNumber {
                            text: text.to_string(),
                            span,
                        },
                        Some(c) => LexError::UnexpectedCharacter { char: c, span },
                        None => continue,
                    };
                    errors.push(error);
                }
            }
        }

        let end = self.source.len();
        tokens.push((Token::Eof, self.index.span(end, end)));
        (tokens, errors)
    }
}
