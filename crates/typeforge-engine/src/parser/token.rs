//! Token definitions for forge script.
//!
//! This module defines all tokens that can appear in forge script source,
//! including keywords, operators, literals, and source spans.

use logos::{FilterResult, Logos};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A token in forge script.
#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\r\n\f]+")]
#[logos(skip r"//[^\n]*")]
pub enum Token {
    // Declarations
    #[token("using")]
    Using,
    #[token("namespace")]
    Namespace,
    #[token("class")]
    Class,

    // Modifiers
    #[token("public")]
    Public,
    #[token("private")]
    Private,
    #[token("protected")]
    Protected,
    #[token("internal")]
    Internal,
    #[token("static")]
    Static,
    #[token("sealed")]
    Sealed,
    #[token("abstract")]
    Abstract,
    #[token("virtual")]
    Virtual,
    #[token("override")]
    Override,
    #[token("readonly")]
    Readonly,

    // Builtin type keywords
    #[token("void")]
    Void,
    #[token("bool")]
    Bool,
    #[token("int")]
    Int,
    #[token("long")]
    Long,
    #[token("double")]
    Double,
    #[token("string")]
    String,
    #[token("object")]
    Object,
    #[token("var")]
    Var,

    // Control flow
    #[token("if")]
    If,
    #[token("else")]
    Else,
    #[token("while")]
    While,
    #[token("return")]
    Return,
    #[token("break")]
    Break,
    #[token("continue")]
    Continue,

    // Expressions
    #[token("this")]
    This,
    #[token("true")]
    True,
    #[token("false")]
    False,
    #[token("null")]
    Null,

    // Literals
    #[regex(r"[0-9]+\.[0-9]+", |lex| lex.slice().parse::<f64>().ok())]
    FloatLiteral(f64),
    /// Magnitude only; the parser folds a leading `-` into the constant.
    #[regex(r"[0-9]+", |lex| lex.slice().parse::<u64>().ok())]
    IntLiteral(u64),
    #[regex(r#""([^"\\\n]|\\.)*""#, parse_string)]
    StringLiteral(String),

    /// Never emitted: the callback skips the comment or fails on a missing `*/`.
    #[token("/*", block_comment)]
    BlockComment,

    // Identifiers
    #[regex(r"[A-Za-z_][A-Za-z0-9_]*", |lex| lex.slice().to_string())]
    Identifier(String),

    // Punctuation
    #[token("{")]
    LeftBrace,
    #[token("}")]
    RightBrace,
    #[token("(")]
    LeftParen,
    #[token(")")]
    RightParen,
    #[token(";")]
    Semicolon,
    #[token(",")]
    Comma,
    #[token(".")]
    Dot,
    #[token(":")]
    Colon,

    // Operators
    #[token("=")]
    Equal,
    #[token("+=")]
    PlusEqual,
    #[token("-=")]
    MinusEqual,
    #[token("+")]
    Plus,
    #[token("-")]
    Minus,
    #[token("*")]
    Star,
    #[token("/")]
    Slash,
    #[token("%")]
    Percent,
    #[token("!")]
    Bang,
    #[token("<")]
    Less,
    #[token("<=")]
    LessEqual,
    #[token(">")]
    Greater,
    #[token(">=")]
    GreaterEqual,
    #[token("==")]
    EqualEqual,
    #[token("!=")]
    BangEqual,
    #[token("&&")]
    AmpAmp,
    #[token("||")]
    PipePipe,

    /// End of input (never produced by logos, appended by the lexer)
    Eof,
}

impl Token {
    /// Whether this token is an accessibility or member modifier.
    pub fn is_modifier(&self) -> bool {
        matches!(
            self,
            Token::Public
                | Token::Private
                | Token::Protected
                | Token::Internal
                | Token::Static
                | Token::Sealed
                | Token::Abstract
                | Token::Virtual
                | Token::Override
                | Token::Readonly
        )
    }

    /// Whether this token names a builtin type.
    pub fn is_builtin_type(&self) -> bool {
        matches!(
            self,
            Token::Void
                | Token::Bool
                | Token::Int
                | Token::Long
                | Token::Double
                | Token::String
                | Token::Object
        )
    }
}

fn block_comment(lex: &mut logos::Lexer<'_, Token>) -> FilterResult<(), ()> {
    match lex.remainder().find("*/") {
        Some(end) => {
            lex.bump(end + 2);
            FilterResult::Skip
        }
        None => {
            lex.bump(lex.remainder().len());
            FilterResult::Error(())
        }
    }
}

fn parse_string(lex: &mut logos::Lexer<'_, Token>) -> Option<String> {
    let s = lex.slice();
    let inner = &s[1..s.len() - 1];
    unescape_string(inner)
}

/// Resolve backslash escapes inside a string literal body.
///
/// Returns `None` for an unknown escape so the lexer reports it.
pub fn unescape_string(s: &str) -> Option<String> {
    let mut result = String::with_capacity(s.len());
    let mut chars = s.chars();

    while let Some(c) = chars.next() {
        if c != '\\' {
            result.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => result.push('\n'),
            Some('r') => result.push('\r'),
            Some('t') => result.push('\t'),
            Some('\\') => result.push('\\'),
            Some('"') => result.push('"'),
            Some('\'') => result.push('\''),
            Some('0') => result.push('\0'),
            _ => return None,
        }
    }

    Some(result)
}

/// Escape a string so that it lexes back to the same value.
pub fn escape_string(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    for c in s.chars() {
        match c {
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\0' => out.push_str("\\0"),
            c => out.push(c),
        }
    }
    out
}

/// Whether `text` is exactly one identifier token (not a keyword).
pub fn is_identifier(text: &str) -> bool {
    let mut lex = Token::lexer(text);
    matches!(lex.next(), Some(Ok(Token::Identifier(_)))) && lex.span() == (0..text.len()) && lex.next().is_none()
}

/// Whether `text` is a dot-separated sequence of identifiers.
pub fn is_qualified_identifier(text: &str) -> bool {
    !text.is_empty() && text.split('.').all(is_identifier)
}

/// Source location information for a token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
    pub line: u32,
    pub column: u32,
}

impl Span {
    pub fn new(start: usize, end: usize, line: u32, column: u32) -> Self {
        Self {
            start,
            end,
            line,
            column,
        }
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    pub fn slice<'a>(&self, source: &'a str) -> &'a str {
        &source[self.start..self.end]
    }

    pub fn merge(&self, other: &Span) -> Span {
        let (line, column) = if (self.line, self.column) <= (other.line, other.column) {
            (self.line, self.column)
        } else {
            (other.line, other.column)
        };
        Span {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
            line,
            column,
        }
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Using => write!(f, "using"),
            Token::Namespace => write!(f, "namespace"),
            Token::Class => write!(f, "class"),
            Token::Public => write!(f, "public"),
            Token::Private => write!(f, "private"),
            Token::Protected => write!(f, "protected"),
            Token::Internal => write!(f, "internal"),
            Token::Static => write!(f, "static"),
            Token::Sealed => write!(f, "sealed"),
            Token::Abstract => write!(f, "abstract"),
            Token::Virtual => write!(f, "virtual"),
            Token::Override => write!(f, "override"),
            Token::Readonly => write!(f, "readonly"),
            Token::Void => write!(f, "void"),
            Token::Bool => write!(f, "bool"),
            Token::Int => write!(f, "int"),
            Token::Long => write!(f, "long"),
            Token::Double => write!(f, "double"),
            Token::String => write!(f, "string"),
            Token::Object => write!(f, "object"),
            Token::Var => write!(f, "var"),
            Token::If => write!(f, "if"),
            Token::Else => write!(f, "else"),
            Token::While => write!(f, "while"),
            Token::Return => write!(f, "return"),
            Token::Break => write!(f, "break"),
            Token::Continue => write!(f, "continue"),
            Token::This => write!(f, "this"),
            Token::True => write!(f, "true"),
            Token::False => write!(f, "false"),
            Token::Null => write!(f, "null"),
            Token::FloatLiteral(v) => write!(f, "{}", v),
            Token::IntLiteral(v) => write!(f, "{}", v),
            Token::StringLiteral(s) => write!(f, "\"{}\"", escape_string(s)),
            Token::BlockComment => write!(f, "/*"),
            Token::Identifier(name) => write!(f, "{}", name),
            Token::LeftBrace => write!(f, "{{"),
            Token::RightBrace => write!(f, "}}"),
            Token::LeftParen => write!(f, "("),
            Token::RightParen => write!(f, ")"),
            Token::Semicolon => write!(f, ";"),
            Token::Comma => write!(f, ","),
            Token::Dot => write!(f, "."),
            Token::Colon => write!(f, ":"),
            Token::Equal => write!(f, "="),
            Token::PlusEqual => write!(f, "+="),
            Token::MinusEqual => write!(f, "-="),
            Token::Plus => write!(f, "+"),
            Token::Minus => write!(f, "-"),
            Token::Star => write!(f, "*"),
            Token::Slash => write!(f, "/"),
            Token::Percent => write!(f, "%"),
            Token::Bang => write!(f, "!"),
            Token::Less => write!(f, "<"),
            Token::LessEqual => write!(f, "<="),
            Token::Greater => write!(f, ">"),
            Token::GreaterEqual => write!(f, ">="),
            Token::EqualEqual => write!(f, "=="),
            Token::BangEqual => write!(f, "!="),
            Token::AmpAmp => write!(f, "&&"),
            Token::PipePipe => write!(f, "||"),
            Token::Eof => write!(f, "end of file"),
        }
    }
}
