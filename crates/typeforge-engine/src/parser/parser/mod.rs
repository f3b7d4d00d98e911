//! Recursive-descent parser for forge script.
//!
//! The parser never gives up on the first error: it records the error,
//! resynchronizes at the next member or statement boundary and keeps going,
//! so a single compile reports every syntax problem it can find.

mod decl;
mod expr;
pub(crate) mod guards;
mod recovery;
mod stmt;

use crate::parser::ast::CompilationUnit;
use crate::parser::lexer::{LexError, Lexer};
use crate::parser::token::{Span, Token};
use std::fmt;

/// A syntax error with a stable diagnostic code.
#[derive(Debug, Clone, PartialEq)]
pub struct ParseError {
    /// Diagnostic identifier (e.g. "TF1002")
    pub code: &'static str,
    pub message: String,
    pub span: Span,
}

impl ParseError {
    pub fn new(code: &'static str, message: impl Into<String>, span: Span) -> Self {
        Self {
            code,
            message: message.into(),
            span,
        }
    }

    /// Error for a missing token, using the conventional code for the token.
    pub fn expected(expected: &Token, found: &Token, span: Span) -> Self {
        let (code, message) = match expected {
            Token::Semicolon => ("TF1002", "; expected".to_string()),
            Token::RightBrace => ("TF1513", "} expected".to_string()),
            Token::LeftBrace => ("TF1514", "{ expected".to_string()),
            Token::RightParen => ("TF1026", ") expected".to_string()),
            Token::LeftParen => ("TF1003", "Syntax error, '(' expected".to_string()),
            Token::Identifier(_) => ("TF1001", "Identifier expected".to_string()),
            other => ("TF1003", format!("Syntax error, '{}' expected", other)),
        };
        Self::new(code, format!("{} (found '{}')", message, found), span)
    }

    pub fn parser_limit_exceeded(message: impl Into<String>, span: Span) -> Self {
        Self::new("TF8025", message, span)
    }
}

impl From<LexError> for ParseError {
    fn from(error: LexError) -> Self {
        let span = error.span();
        match error {
            LexError::UnexpectedCharacter { char, .. } => {
                ParseError::new("TF1056", format!("Unexpected character '{}'", char), span)
            }
            LexError::UnterminatedString { .. } => {
                ParseError::new("TF1010", "Newline in constant", span)
            }
            LexError::InvalidNumber { text, .. } => {
                ParseError::new("TF1021", format!("Integral constant is too large: {}", text), span)
            }
            LexError::UnterminatedComment { .. } => {
                ParseError::new("TF1035", "End-of-file found, '*/' expected", span)
            }
        }
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {} (line {}:{})", self.code, self.message, self.span.line, self.span.column)
    }
}

impl std::error::Error for ParseError {}

/// Parser state over a lexed token stream.
pub struct Parser {
    tokens: Vec<(Token, Span)>,
    pos: usize,
    pub(crate) depth: usize,
    errors: Vec<ParseError>,
}

impl Parser {
    /// Lex `source` and prepare to parse it. Lex errors are carried into the
    /// parse result.
    pub fn new(source: &str) -> Self {
        let (tokens, lex_errors) = Lexer::new(source).tokenize();
        Self {
            tokens,
            pos: 0,
            depth: 0,
            errors: lex_errors.into_iter().map(ParseError::from).collect(),
        }
    }

    /// Parse a whole compilation unit.
    ///
    /// Always produces a (possibly partial) tree together with every error found.
    pub fn parse(mut self) -> (CompilationUnit, Vec<ParseError>) {
        let unit = decl::parse_compilation_unit(&mut self);
        (unit, self.errors)
    }

    // ------------------------------------------------------------------
    // Token cursor helpers
    // ------------------------------------------------------------------

    pub(crate) fn current(&self) -> &Token {
        &self.tokens[self.pos].0
    }

    pub(crate) fn current_span(&self) -> Span {
        self.tokens[self.pos].1
    }

    pub(crate) fn peek(&self) -> &Token {
        self.peek_at(1)
    }

    pub(crate) fn peek_at(&self, offset: usize) -> &Token {
        let index = (self.pos + offset).min(self.tokens.len() - 1);
        &self.tokens[index].0
    }

    pub(crate) fn previous_span(&self) -> Span {
        if self.pos == 0 {
            self.current_span()
        } else {
            self.tokens[self.pos - 1].1
        }
    }

    pub(crate) fn at_eof(&self) -> bool {
        matches!(self.current(), Token::Eof)
    }

    pub(crate) fn position(&self) -> usize {
        self.pos
    }

    pub(crate) fn advance(&mut self) -> (Token, Span) {
        let entry = self.tokens[self.pos].clone();
        if !self.at_eof() {
            self.pos += 1;
        }
        entry
    }

    pub(crate) fn check(&self, token: &Token) -> bool {
        std::mem::discriminant(self.current()) == std::mem::discriminant(token)
    }

    /// Consume `token` if it is next.
    pub(crate) fn eat(&mut self, token: &Token) -> bool {
        if self.check(token) {
            self.advance();
            true
        } else {
            false
        }
    }

    pub(crate) fn expect(&mut self, token: &Token) -> Result<Span, ParseError> {
        if self.check(token) {
            Ok(self.advance().1)
        } else {
            Err(ParseError::expected(token, self.current(), self.current_span()))
        }
    }

    pub(crate) fn expect_identifier(&mut self) -> Result<(String, Span), ParseError> {
        match self.current().clone() {
            Token::Identifier(name) => {
                let span = self.advance().1;
                Ok((name, span))
            }
            other => Err(ParseError::expected(
                &Token::Identifier(String::new()),
                &other,
                self.current_span(),
            )),
        }
    }

    pub(crate) fn record(&mut self, error: ParseError) {
        self.errors.push(error);
    }

    pub(crate) fn span_from(&self, start: Span) -> Span {
        start.merge(&self.previous_span())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::ast::*;

    fn parse_ok(source: &str) -> CompilationUnit {
        let (unit, errors) = Parser::new(source).parse();
        assert!(errors.is_empty(), "unexpected parse errors: {:?}", errors);
        unit
    }

    fn parse_errors(source: &str) -> Vec<ParseError> {
        Parser::new(source).parse().1
    }

    #[test]
    fn test_parse_namespace_with_class() {
        let unit = parse_ok(
            "using System;\nnamespace Demo.Models\n{\n    public class Point : Base, IThing\n    {\n    }\n}\n",
        );
        assert_eq!(unit.usings.len(), 1);
        assert_eq!(unit.usings[0].name, "System");
        assert_eq!(unit.namespaces.len(), 1);
        let ns = &unit.namespaces[0];
        assert_eq!(ns.name, "Demo.Models");
        let class = &ns.classes[0];
        assert_eq!(class.name, "Point");
        assert_eq!(class.modifiers.visibility, Some(Visibility::Public));
        assert_eq!(class.bases.len(), 2);
        assert_eq!(class.bases[1].name, TypeName::Named("IThing".to_string()));
    }

    #[test]
    fn test_nested_namespaces_are_flattened() {
        let unit = parse_ok("namespace A { using B; namespace C { class D { } } }");
        let names: Vec<_> = unit.namespaces.iter().map(|n| n.name.as_str()).collect();
        assert_eq!(names, vec!["A", "A.C"]);
        assert_eq!(unit.namespaces[1].usings[0].name, "B");
    }

    #[test]
    fn test_parse_members() {
        let unit = parse_ok(
            r#"
            class Counter
            {
                // the count
                public int Count = 5;
                public string Name { get; set; }
                public string Id { get; }
                public Counter(int start) { this.Count = start; }
                public int Add(int x) { return Count + x; }
            }
            "#,
        );
        let members = &unit.classes[0].members;
        assert_eq!(members.len(), 5);
        match &members[0] {
            MemberDecl::Field(f) => {
                assert_eq!(f.name, "Count");
                assert_eq!(f.initializer.as_ref().and_then(|e| e.as_constant()), Some(Literal::Int(5)));
            }
            other => panic!("expected field, got {:?}", other),
        }
        match &members[2] {
            MemberDecl::Property(p) => {
                assert!(p.has_get);
                assert!(!p.has_set);
            }
            other => panic!("expected property, got {:?}", other),
        }
        assert!(matches!(&members[3], MemberDecl::Constructor(c) if c.params.len() == 1));
        assert!(matches!(&members[4], MemberDecl::Method(m) if m.name == "Add"));
    }

    #[test]
    fn test_operator_precedence() {
        let unit = parse_ok("class A { int F() { return 1 + 2 * 3; } }");
        let MemberDecl::Method(method) = &unit.classes[0].members[0] else {
            panic!("expected method");
        };
        let Statement::Return(ret) = &method.body.statements[0] else {
            panic!("expected return");
        };
        match ret.value.as_ref() {
            Some(Expression::Binary { op: BinaryOp::Add, right, .. }) => {
                assert!(matches!(**right, Expression::Binary { op: BinaryOp::Multiply, .. }));
            }
            other => panic!("unexpected tree {:?}", other),
        }
    }

    #[test]
    fn test_local_declarations() {
        let unit = parse_ok("class A { void F() { var a = 1; int b = 2; Point p = null; System.Object o = null; } }");
        let MemberDecl::Method(method) = &unit.classes[0].members[0] else {
            panic!("expected method");
        };
        assert_eq!(method.body.statements.len(), 4);
        for statement in &method.body.statements {
            assert!(matches!(statement, Statement::Local(_)));
        }
    }

    #[test]
    fn test_missing_semicolon_is_reported() {
        let errors = parse_errors("class A { int F() { return 1 } }");
        assert!(errors.iter().any(|e| e.code == "TF1002"), "{:?}", errors);
    }

    #[test]
    fn test_parser_recovers_and_reports_multiple_errors() {
        let errors = parse_errors(
            "class A { int F() { return 1 } int G() { var x = ; return 2; } public int H = 3; }",
        );
        assert!(errors.len() >= 2, "{:?}", errors);
    }

    #[test]
    fn test_write_only_property_parses() {
        let unit = parse_ok("class A { int P { set; } }");
        assert!(matches!(&unit.classes[0].members[0], MemberDecl::Property(p) if !p.has_get && p.has_set));
    }

    #[test]
    fn test_unknown_accessor_is_error() {
        let errors = parse_errors("class A { int P { fetch; } }");
        assert!(!errors.is_empty());
    }

    #[test]
    fn test_deep_nesting_hits_limit() {
        let mut body = String::new();
        for _ in 0..200 {
            body.push('(');
        }
        body.push('1');
        for _ in 0..200 {
            body.push(')');
        }
        let source = format!("class A {{ int F() {{ return {}; }} }}", body);
        let errors = parse_errors(&source);
        assert!(errors.iter().any(|e| e.code == "TF8025"));
    }
}
