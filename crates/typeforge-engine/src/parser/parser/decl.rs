//! Declaration parsing: compilation units, namespaces, classes and members.

use super::guards::LoopGuard;
use super::recovery::{sync_to_declaration_boundary, sync_to_member_boundary};
use super::{stmt, ParseError, Parser};
use crate::parser::ast::*;
use crate::parser::token::{Span, Token};

/// Parse the whole token stream.
pub fn parse_compilation_unit(parser: &mut Parser) -> CompilationUnit {
    let mut unit = CompilationUnit::default();
    let mut guard = LoopGuard::new("compilation_unit");

    while !parser.at_eof() {
        if let Err(error) = guard.check() {
            parser.record(error);
            break;
        }

        let start = parser.position();
        let result = match parser.current() {
            Token::Using => parse_using(parser).map(|using| unit.usings.push(using)),
            Token::Namespace => {
                let inherited = unit.usings.clone();
                parse_namespace(parser, "", &inherited, &mut unit.namespaces)
            }
            token if token.is_modifier() || matches!(token, Token::Class) => {
                parse_class(parser).map(|class| unit.classes.push(class))
            }
            other => Err(ParseError::new(
                "TF1022",
                format!("Type or namespace definition, or end-of-file expected (found '{}')", other),
                parser.current_span(),
            )),
        };

        if let Err(error) = result {
            parser.record(error);
            sync_to_declaration_boundary(parser, start);
            if parser.check(&Token::RightBrace) {
                // stray closing brace at top level
                parser.advance();
            }
        }
    }

    unit
}

/// `using A.B.C;`
fn parse_using(parser: &mut Parser) -> Result<UsingDirective, ParseError> {
    let start = parser.expect(&Token::Using)?;
    let (name, _) = parse_qualified_name(parser)?;
    parser.expect(&Token::Semicolon)?;
    Ok(UsingDirective {
        name,
        span: parser.span_from(start),
    })
}

/// `namespace A.B { ... }`, flattening nested namespaces into `out`.
fn parse_namespace(
    parser: &mut Parser,
    prefix: &str,
    inherited: &[UsingDirective],
    out: &mut Vec<NamespaceDecl>,
) -> Result<(), ParseError> {
    let start = parser.expect(&Token::Namespace)?;
    let (name, _) = parse_qualified_name(parser)?;
    let full_name = if prefix.is_empty() {
        name
    } else {
        format!("{}.{}", prefix, name)
    };
    parser.expect(&Token::LeftBrace)?;

    let index = out.len();
    out.push(NamespaceDecl {
        name: full_name.clone(),
        usings: inherited.to_vec(),
        classes: Vec::new(),
        span: start,
    });

    let mut guard = LoopGuard::new("namespace_body");
    while !parser.check(&Token::RightBrace) && !parser.at_eof() {
        guard.check()?;
        let member_start = parser.position();
        let result = match parser.current() {
            Token::Using => parse_using(parser).map(|using| out[index].usings.push(using)),
            Token::Namespace => {
                let usings = out[index].usings.clone();
                parse_namespace(parser, &full_name, &usings, out)
            }
            token if token.is_modifier() || matches!(token, Token::Class) => {
                parse_class(parser).map(|class| out[index].classes.push(class))
            }
            other => Err(ParseError::new(
                "TF0116",
                format!("A namespace cannot directly contain members such as '{}'", other),
                parser.current_span(),
            )),
        };
        if let Err(error) = result {
            parser.record(error);
            sync_to_declaration_boundary(parser, member_start);
        }
    }

    parser.expect(&Token::RightBrace)?;
    out[index].span = parser.span_from(start);
    Ok(())
}

/// Parse `A.B.C`, returning the dotted name.
pub(super) fn parse_qualified_name(parser: &mut Parser) -> Result<(String, Span), ParseError> {
    let (mut name, start) = parser.expect_identifier()?;
    while parser.check(&Token::Dot) {
        parser.advance();
        let (part, _) = parser.expect_identifier()?;
        name.push('.');
        name.push_str(&part);
    }
    Ok((name, parser.span_from(start)))
}

/// Parse a type: a builtin keyword or a (dotted) class name.
pub(super) fn parse_type(parser: &mut Parser) -> Result<TypeAnnotation, ParseError> {
    let span = parser.current_span();
    let builtin = match parser.current() {
        Token::Void => Some(TypeName::Void),
        Token::Bool => Some(TypeName::Bool),
        Token::Int => Some(TypeName::Int),
        Token::Long => Some(TypeName::Long),
        Token::Double => Some(TypeName::Double),
        Token::String => Some(TypeName::String),
        Token::Object => Some(TypeName::Object),
        _ => None,
    };
    if let Some(name) = builtin {
        parser.advance();
        return Ok(TypeAnnotation { name, span });
    }

    if matches!(parser.current(), Token::Identifier(_)) {
        let (name, span) = parse_qualified_name(parser)?;
        return Ok(TypeAnnotation {
            name: TypeName::Named(name),
            span,
        });
    }

    Err(ParseError::new(
        "TF1031",
        format!("Type expected (found '{}')", parser.current()),
        span,
    ))
}

fn parse_modifiers(parser: &mut Parser) -> Modifiers {
    let mut modifiers = Modifiers {
        span: parser.current_span(),
        ..Modifiers::default()
    };

    while parser.current().is_modifier() {
        let (token, span) = parser.advance();
        let visibility = match token {
            Token::Public => Some(Visibility::Public),
            Token::Private => Some(Visibility::Private),
            Token::Protected => Some(Visibility::Protected),
            Token::Internal => Some(Visibility::Internal),
            _ => None,
        };
        if let Some(visibility) = visibility {
            if modifiers.visibility.is_some() {
                parser.record(ParseError::new(
                    "TF0107",
                    "More than one protection modifier",
                    span,
                ));
            }
            modifiers.visibility = Some(visibility);
            continue;
        }
        let flag = match token {
            Token::Static => &mut modifiers.is_static,
            Token::Sealed => &mut modifiers.is_sealed,
            Token::Abstract => &mut modifiers.is_abstract,
            Token::Virtual => &mut modifiers.is_virtual,
            Token::Override => &mut modifiers.is_override,
            _ => &mut modifiers.is_readonly,
        };
        if *flag {
            parser.record(ParseError::new(
                "TF1004",
                format!("Duplicate '{}' modifier", token),
                span,
            ));
        }
        *flag = true;
    }

    modifiers.span = parser.span_from(modifiers.span);
    modifiers
}

/// `[modifiers] class Name [: Base, IFace] { members }`
pub(super) fn parse_class(parser: &mut Parser) -> Result<ClassDecl, ParseError> {
    let start = parser.current_span();
    let modifiers = parse_modifiers(parser);
    parser.expect(&Token::Class)?;
    let (name, _) = parser.expect_identifier()?;

    let mut bases = Vec::new();
    if parser.eat(&Token::Colon) {
        bases.push(parse_type(parser)?);
        while parser.eat(&Token::Comma) {
            bases.push(parse_type(parser)?);
        }
    }

    parser.expect(&Token::LeftBrace)?;
    let mut members = Vec::new();
    let mut guard = LoopGuard::new("class_body");

    while !parser.check(&Token::RightBrace) && !parser.at_eof() {
        guard.check()?;
        let member_start = parser.position();
        match parse_member(parser) {
            Ok(member) => members.push(member),
            Err(error) => {
                parser.record(error);
                sync_to_member_boundary(parser, member_start);
            }
        }
    }

    parser.expect(&Token::RightBrace)?;
    Ok(ClassDecl {
        modifiers,
        name,
        bases,
        members,
        span: parser.span_from(start),
    })
}

fn parse_member(parser: &mut Parser) -> Result<MemberDecl, ParseError> {
    let start = parser.current_span();
    let modifiers = parse_modifiers(parser);

    if parser.check(&Token::Class) {
        return Err(ParseError::new(
            "TF1519",
            "Invalid token 'class' in class member declaration: nested types are not supported",
            parser.current_span(),
        ));
    }

    // `Name(` starts a constructor; whether the name matches is checked later
    if matches!(parser.current(), Token::Identifier(_)) && matches!(parser.peek(), Token::LeftParen) {
        let (name, _) = parser.expect_identifier()?;
        let params = parse_parameters(parser)?;
        let body = stmt::parse_block(parser)?;
        return Ok(MemberDecl::Constructor(FunctionDecl {
            modifiers,
            return_type: None,
            name,
            params,
            body,
            span: parser.span_from(start),
        }));
    }

    let ty = parse_type(parser)?;
    let (name, _) = parser.expect_identifier()?;

    match parser.current() {
        Token::LeftParen => {
            let params = parse_parameters(parser)?;
            let body = stmt::parse_block(parser)?;
            Ok(MemberDecl::Method(FunctionDecl {
                modifiers,
                return_type: Some(ty),
                name,
                params,
                body,
                span: parser.span_from(start),
            }))
        }
        Token::LeftBrace => {
            let (has_get, has_set) = parse_accessors(parser)?;
            Ok(MemberDecl::Property(PropertyDecl {
                modifiers,
                ty,
                name,
                has_get,
                has_set,
                span: parser.span_from(start),
            }))
        }
        Token::Equal | Token::Semicolon => {
            let initializer = if parser.eat(&Token::Equal) {
                Some(super::expr::parse_expression(parser)?)
            } else {
                None
            };
            parser.expect(&Token::Semicolon)?;
            Ok(MemberDecl::Field(FieldDecl {
                modifiers,
                ty,
                name,
                initializer,
                span: parser.span_from(start),
            }))
        }
        other => Err(ParseError::new(
            "TF1519",
            format!("Invalid token '{}' in class member declaration", other),
            parser.current_span(),
        )),
    }
}

fn parse_parameters(parser: &mut Parser) -> Result<Vec<Parameter>, ParseError> {
    parser.expect(&Token::LeftParen)?;
    let mut params = Vec::new();
    if parser.eat(&Token::RightParen) {
        return Ok(params);
    }

    loop {
        let ty = parse_type(parser)?;
        let (name, name_span) = parser.expect_identifier()?;
        params.push(Parameter {
            span: ty.span.merge(&name_span),
            ty,
            name,
        });
        if !parser.eat(&Token::Comma) {
            break;
        }
    }

    parser.expect(&Token::RightParen)?;
    Ok(params)
}

/// `{ get; set; }` and its variants. Returns `(has_get, has_set)`.
fn parse_accessors(parser: &mut Parser) -> Result<(bool, bool), ParseError> {
    let open = parser.expect(&Token::LeftBrace)?;
    let mut has_get = false;
    let mut has_set = false;

    while !parser.check(&Token::RightBrace) && !parser.at_eof() {
        let (token, span) = parser.advance();
        let slot = match &token {
            Token::Identifier(name) if name == "get" => &mut has_get,
            Token::Identifier(name) if name == "set" => &mut has_set,
            other => {
                return Err(ParseError::new(
                    "TF1014",
                    format!("A get or set accessor expected (found '{}')", other),
                    span,
                ))
            }
        };
        if *slot {
            parser.record(ParseError::new("TF1007", "Property accessor already defined", span));
        }
        *slot = true;
        parser.expect(&Token::Semicolon)?;
    }

    parser.expect(&Token::RightBrace)?;
    if !has_get && !has_set {
        return Err(ParseError::new(
            "TF0548",
            "Property must have at least one accessor",
            parser.span_from(open),
        ));
    }
    Ok((has_get, has_set))
}
