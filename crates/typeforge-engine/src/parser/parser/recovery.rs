//! Error recovery strategies for the parser.
//!
//! When the parser encounters an error, it uses these strategies to
//! resynchronize and continue parsing to find more errors. Every strategy
//! consumes at least one token unless it is already sitting on a closing
//! brace or the end of input, so the callers' loops always make progress.

use super::guards::LoopGuard;
use super::Parser;
use crate::parser::token::Token;

/// Synchronize to the next statement boundary.
///
/// Stops after a `;`, or before a `}` or a token that starts a statement.
pub fn sync_to_statement_boundary(parser: &mut Parser, start: usize) {
    let mut guard = LoopGuard::new("statement_recovery");

    while !parser.at_eof() {
        if guard.check().is_err() {
            return;
        }

        match parser.current() {
            Token::Semicolon => {
                parser.advance();
                return;
            }
            Token::RightBrace => return,
            Token::If
            | Token::While
            | Token::Return
            | Token::Break
            | Token::Continue
            | Token::Var
            | Token::LeftBrace
                if parser.position() > start =>
            {
                return;
            }
            _ => {
                parser.advance();
            }
        }
    }
}

/// Synchronize to the next class member.
///
/// Skips brace-balanced so a broken member body is dropped as a whole. Stops
/// after a `;` or a balanced `}` at member level, or before a modifier, the
/// class's own closing brace, or the end of input.
pub fn sync_to_member_boundary(parser: &mut Parser, start: usize) {
    let mut guard = LoopGuard::new("member_recovery");
    let mut depth = 0usize;

    while !parser.at_eof() {
        if guard.check().is_err() {
            return;
        }

        match parser.current() {
            Token::LeftBrace => {
                depth += 1;
                parser.advance();
            }
            Token::RightBrace => {
                if depth == 0 {
                    return;
                }
                depth -= 1;
                parser.advance();
                if depth == 0 {
                    return;
                }
            }
            Token::Semicolon if depth == 0 => {
                parser.advance();
                return;
            }
            token if depth == 0 && token.is_modifier() && parser.position() > start => return,
            _ => {
                parser.advance();
            }
        }
    }
}

/// Synchronize to the next top-level declaration (`using`, `namespace`,
/// `class` or a modifier), skipping brace-balanced.
pub fn sync_to_declaration_boundary(parser: &mut Parser, start: usize) {
    let mut guard = LoopGuard::new("declaration_recovery");
    let mut depth = 0usize;

    while !parser.at_eof() {
        if guard.check().is_err() {
            return;
        }

        match parser.current() {
            Token::LeftBrace => depth += 1,
            Token::RightBrace if depth == 0 => return,
            Token::RightBrace => depth -= 1,
            Token::Using | Token::Namespace | Token::Class
                if depth == 0 && parser.position() > start =>
            {
                return;
            }
            token if depth == 0 && token.is_modifier() && parser.position() > start => return,
            _ => {}
        }
        parser.advance();
    }
}
