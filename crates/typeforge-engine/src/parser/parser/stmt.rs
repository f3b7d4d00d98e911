//! Statement parsing

use super::decl::parse_type;
use super::expr::parse_expression;
use super::guards::{nested, LoopGuard};
use super::recovery::sync_to_statement_boundary;
use super::{ParseError, Parser};
use crate::parser::ast::*;
use crate::parser::token::Token;

/// Parse `{ statements }`, recovering from errors statement by statement.
pub fn parse_block(parser: &mut Parser) -> Result<Block, ParseError> {
    let start = parser.expect(&Token::LeftBrace)?;
    let mut statements = Vec::new();
    let mut guard = LoopGuard::new("block");

    while !parser.check(&Token::RightBrace) && !parser.at_eof() {
        guard.check()?;
        let statement_start = parser.position();
        match parse_statement(parser) {
            Ok(statement) => statements.push(statement),
            Err(error) => {
                parser.record(error);
                sync_to_statement_boundary(parser, statement_start);
            }
        }
    }

    parser.expect(&Token::RightBrace)?;
    Ok(Block {
        statements,
        span: parser.span_from(start),
    })
}

/// Parse a statement.
pub fn parse_statement(parser: &mut Parser) -> Result<Statement, ParseError> {
    nested(parser, "statement", parse_statement_inner)
}

fn parse_statement_inner(parser: &mut Parser) -> Result<Statement, ParseError> {
    match parser.current() {
        Token::LeftBrace => parse_block(parser).map(Statement::Block),
        Token::If => parse_if_statement(parser),
        Token::While => parse_while_statement(parser),
        Token::Return => parse_return_statement(parser),
        Token::Break => {
            let (_, span) = parser.advance();
            parser.expect(&Token::Semicolon)?;
            Ok(Statement::Break(parser.span_from(span)))
        }
        Token::Continue => {
            let (_, span) = parser.advance();
            parser.expect(&Token::Semicolon)?;
            Ok(Statement::Continue(parser.span_from(span)))
        }
        Token::Var => parse_var_declaration(parser),
        Token::Void => Err(ParseError::new(
            "TF1547",
            "Keyword 'void' cannot be used in this context",
            parser.current_span(),
        )),
        token if token.is_builtin_type() => parse_typed_declaration(parser),
        Token::Identifier(_) if starts_local_declaration(parser) => parse_typed_declaration(parser),
        _ => {
            let expression = parse_expression(parser)?;
            parser.expect(&Token::Semicolon)?;
            Ok(Statement::Expression(ExpressionStatement {
                span: parser.span_from(expression.span()),
                expression,
            }))
        }
    }
}

/// `Name Ident` or `A.B.Name Ident` begins a local declaration.
fn starts_local_declaration(parser: &Parser) -> bool {
    let mut offset = 0;
    loop {
        if !matches!(parser.peek_at(offset), Token::Identifier(_)) {
            return false;
        }
        match parser.peek_at(offset + 1) {
            Token::Dot => offset += 2,
            Token::Identifier(_) => return true,
            _ => return false,
        }
    }
}

fn parse_var_declaration(parser: &mut Parser) -> Result<Statement, ParseError> {
    let start = parser.expect(&Token::Var)?;
    let (name, name_span) = parser.expect_identifier()?;
    if !parser.eat(&Token::Equal) {
        return Err(ParseError::new(
            "TF0818",
            "Implicitly-typed variables must be initialized",
            name_span,
        ));
    }
    let initializer = parse_expression(parser)?;
    parser.expect(&Token::Semicolon)?;
    Ok(Statement::Local(LocalDecl {
        ty: None,
        name,
        initializer: Some(initializer),
        span: parser.span_from(start),
    }))
}

fn parse_typed_declaration(parser: &mut Parser) -> Result<Statement, ParseError> {
    let ty = parse_type(parser)?;
    let (name, _) = parser.expect_identifier()?;
    let initializer = if parser.eat(&Token::Equal) {
        Some(parse_expression(parser)?)
    } else {
        None
    };
    parser.expect(&Token::Semicolon)?;
    Ok(Statement::Local(LocalDecl {
        span: parser.span_from(ty.span),
        ty: Some(ty),
        name,
        initializer,
    }))
}

fn parse_condition(parser: &mut Parser) -> Result<Expression, ParseError> {
    parser.expect(&Token::LeftParen)?;
    let condition = parse_expression(parser)?;
    parser.expect(&Token::RightParen)?;
    Ok(condition)
}

fn parse_if_statement(parser: &mut Parser) -> Result<Statement, ParseError> {
    let start = parser.expect(&Token::If)?;
    let condition = parse_condition(parser)?;
    let then_branch = Box::new(parse_statement(parser)?);
    let else_branch = if parser.eat(&Token::Else) {
        Some(Box::new(parse_statement(parser)?))
    } else {
        None
    };
    Ok(Statement::If(IfStatement {
        condition,
        then_branch,
        else_branch,
        span: parser.span_from(start),
    }))
}

fn parse_while_statement(parser: &mut Parser) -> Result<Statement, ParseError> {
    let start = parser.expect(&Token::While)?;
    let condition = parse_condition(parser)?;
    let body = Box::new(parse_statement(parser)?);
    Ok(Statement::While(WhileStatement {
        condition,
        body,
        span: parser.span_from(start),
    }))
}

fn parse_return_statement(parser: &mut Parser) -> Result<Statement, ParseError> {
    let start = parser.expect(&Token::Return)?;
    let value = if parser.check(&Token::Semicolon) {
        None
    } else {
        Some(parse_expression(parser)?)
    };
    parser.expect(&Token::Semicolon)?;
    Ok(Statement::Return(ReturnStatement {
        value,
        span: parser.span_from(start),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn statements(body: &str) -> Vec<Statement> {
        let mut parser = Parser::new(&format!("{{ {} }}", body));
        let block = parse_block(&mut parser).expect("block should parse");
        block.statements
    }

    #[test]
    fn test_if_else_chain() {
        let parsed = statements("if (a) return 1; else if (b) return 2; else return 3;");
        let Statement::If(outer) = &parsed[0] else {
            panic!("expected if");
        };
        assert!(matches!(outer.else_branch.as_deref(), Some(Statement::If(_))));
    }

    #[test]
    fn test_while_with_break_and_continue() {
        let parsed = statements("while (true) { if (x) break; continue; }");
        let Statement::While(w) = &parsed[0] else {
            panic!("expected while");
        };
        let Statement::Block(body) = w.body.as_ref() else {
            panic!("expected block body");
        };
        assert!(matches!(body.statements[1], Statement::Continue(_)));
    }

    #[test]
    fn test_member_call_is_expression_statement() {
        let parsed = statements("this.Name.ToUpper(); Log(1, 2);");
        assert!(parsed.iter().all(|s| matches!(s, Statement::Expression(_))));
    }

    #[test]
    fn test_var_requires_initializer() {
        let (_, errors) = Parser::new("class A { void F() { var x; } }").parse();
        assert_eq!(errors.first().map(|e| e.code), Some("TF0818"));
    }
}
