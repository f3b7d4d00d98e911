//! Expression parsing, one function per precedence level.

use super::guards::{nested, LoopGuard};
use super::{ParseError, Parser};
use crate::parser::ast::*;
use crate::parser::token::Token;

/// Parse an expression (lowest precedence: assignment).
pub fn parse_expression(parser: &mut Parser) -> Result<Expression, ParseError> {
    nested(parser, "expression", parse_assignment)
}

fn parse_assignment(parser: &mut Parser) -> Result<Expression, ParseError> {
    let target = parse_or(parser)?;
    let op = match parser.current() {
        Token::Equal => AssignOp::Assign,
        Token::PlusEqual => AssignOp::AddAssign,
        Token::MinusEqual => AssignOp::SubtractAssign,
        _ => return Ok(target),
    };
    parser.advance();
    let value = parse_expression(parser)?;
    Ok(Expression::Assign {
        op,
        span: target.span().merge(&value.span()),
        target: Box::new(target),
        value: Box::new(value),
    })
}

/// Left-associative binary level driven by a token-to-operator table.
fn parse_binary_level(
    parser: &mut Parser,
    operand: fn(&mut Parser) -> Result<Expression, ParseError>,
    operator: fn(&Token) -> Option<BinaryOp>,
) -> Result<Expression, ParseError> {
    let mut left = operand(parser)?;
    let mut guard = LoopGuard::new("binary_expression");
    while let Some(op) = operator(parser.current()) {
        guard.check()?;
        parser.advance();
        let right = operand(parser)?;
        left = Expression::Binary {
            op,
            span: left.span().merge(&right.span()),
            left: Box::new(left),
            right: Box::new(right),
        };
    }
    Ok(left)
}

fn parse_or(parser: &mut Parser) -> Result<Expression, ParseError> {
    parse_binary_level(parser, parse_and, |t| match t {
        Token::PipePipe => Some(BinaryOp::Or),
        _ => None,
    })
}

fn parse_and(parser: &mut Parser) -> Result<Expression, ParseError> {
    parse_binary_level(parser, parse_equality, |t| match t {
        Token::AmpAmp => Some(BinaryOp::And),
        _ => None,
    })
}

fn parse_equality(parser: &mut Parser) -> Result<Expression, ParseError> {
    parse_binary_level(parser, parse_relational, |t| match t {
        Token::EqualEqual => Some(BinaryOp::Equal),
        Token::BangEqual => Some(BinaryOp::NotEqual),
        _ => None,
    })
}

fn parse_relational(parser: &mut Parser) -> Result<Expression, ParseError> {
    parse_binary_level(parser, parse_additive, |t| match t {
        Token::Less => Some(BinaryOp::Less),
        Token::LessEqual => Some(BinaryOp::LessEqual),
        Token::Greater => Some(BinaryOp::Greater),
        Token::GreaterEqual => Some(BinaryOp::GreaterEqual),
        _ => None,
    })
}

fn parse_additive(parser: &mut Parser) -> Result<Expression, ParseError> {
    parse_binary_level(parser, parse_multiplicative, |t| match t {
        Token::Plus => Some(BinaryOp::Add),
        Token::Minus => Some(BinaryOp::Subtract),
        _ => None,
    })
}

fn parse_multiplicative(parser: &mut Parser) -> Result<Expression, ParseError> {
    parse_binary_level(parser, parse_unary, |t| match t {
        Token::Star => Some(BinaryOp::Multiply),
        Token::Slash => Some(BinaryOp::Divide),
        Token::Percent => Some(BinaryOp::Remainder),
        _ => None,
    })
}

fn parse_unary(parser: &mut Parser) -> Result<Expression, ParseError> {
    if parser.check(&Token::Minus) {
        if let Some(constant) = parse_negative_int(parser)? {
            return Ok(constant);
        }
    }
    let op = match parser.current() {
        Token::Minus => UnaryOp::Negate,
        Token::Bang => UnaryOp::Not,
        _ => return parse_postfix(parser),
    };
    let (_, start) = parser.advance();
    let operand = nested(parser, "unary expression", parse_unary)?;
    Ok(Expression::Unary {
        op,
        span: start.merge(&operand.span()),
        operand: Box::new(operand),
    })
}

/// `-` directly before an integer literal is one constant, so `-2147483648`
/// is an `int` and `-9223372036854775808` a `long`.
fn parse_negative_int(parser: &mut Parser) -> Result<Option<Expression>, ParseError> {
    let Token::IntLiteral(magnitude) = *parser.peek() else {
        return Ok(None);
    };
    if matches!(parser.peek_at(2), Token::Dot | Token::LeftParen) {
        return Ok(None);
    }
    let (_, start) = parser.advance();
    let (_, end) = parser.advance();
    let value = 0i64.checked_sub_unsigned(magnitude).ok_or_else(|| {
        ParseError::new("TF1021", format!("Integral constant is too large: {}", magnitude), end)
    })?;
    Ok(Some(Expression::Literal {
        value: Literal::Int(value),
        span: start.merge(&end),
    }))
}

/// Member access and calls: `a.b`, `a.b(c)`, `f(x)(y)`.
fn parse_postfix(parser: &mut Parser) -> Result<Expression, ParseError> {
    let mut expression = parse_primary(parser)?;
    let mut guard = LoopGuard::new("postfix_expression");

    loop {
        guard.check()?;
        match parser.current() {
            Token::Dot => {
                parser.advance();
                let (name, name_span) = parser.expect_identifier()?;
                expression = Expression::Member {
                    span: expression.span().merge(&name_span),
                    object: Box::new(expression),
                    name,
                };
            }
            Token::LeftParen => {
                parser.advance();
                let args = parse_arguments(parser)?;
                expression = Expression::Call {
                    span: parser.span_from(expression.span()),
                    callee: Box::new(expression),
                    args,
                };
            }
            _ => return Ok(expression),
        }
    }
}

/// Arguments after an already consumed `(`, through the closing `)`.
fn parse_arguments(parser: &mut Parser) -> Result<Vec<Expression>, ParseError> {
    let mut args = Vec::new();
    if parser.eat(&Token::RightParen) {
        return Ok(args);
    }
    loop {
        args.push(parse_expression(parser)?);
        if !parser.eat(&Token::Comma) {
            break;
        }
    }
    parser.expect(&Token::RightParen)?;
    Ok(args)
}

fn parse_primary(parser: &mut Parser) -> Result<Expression, ParseError> {
    let span = parser.current_span();
    let value = match parser.current().clone() {
        Token::IntLiteral(v) => match i64::try_from(v) {
            Ok(v) => Literal::Int(v),
            Err(_) => {
                return Err(ParseError::new(
                    "TF1021",
                    format!("Integral constant is too large: {}", v),
                    span,
                ))
            }
        },
        Token::FloatLiteral(v) => Literal::Float(v),
        Token::StringLiteral(s) => Literal::String(s),
        Token::True => Literal::Bool(true),
        Token::False => Literal::Bool(false),
        Token::Null => Literal::Null,
        Token::This => {
            parser.advance();
            return Ok(Expression::This { span });
        }
        Token::Identifier(name) => {
            parser.advance();
            return Ok(Expression::Name { name, span });
        }
        Token::LeftParen => {
            parser.advance();
            let inner = parse_expression(parser)?;
            parser.expect(&Token::RightParen)?;
            return Ok(inner);
        }
        other => {
            return Err(ParseError::new(
                "TF1525",
                format!("Invalid expression term '{}'", other),
                span,
            ))
        }
    };
    parser.advance();
    Ok(Expression::Literal { value, span })
}
