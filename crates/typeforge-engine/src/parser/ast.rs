//! Abstract syntax tree for forge script.
//!
//! The tree is serializable: method and constructor bodies travel inside
//! compiled module images and are executed by the interpreter after loading.

use crate::parser::token::Span;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A whole source file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompilationUnit {
    /// File-level `using` directives
    pub usings: Vec<UsingDirective>,
    /// Namespace blocks (nested namespaces are flattened with dotted names)
    pub namespaces: Vec<NamespaceDecl>,
    /// Classes declared outside any namespace
    pub classes: Vec<ClassDecl>,
}

impl CompilationUnit {
    /// Iterate every class together with its namespace ("" for the global one).
    pub fn all_classes(&self) -> impl Iterator<Item = (&str, &ClassDecl)> {
        self.classes
            .iter()
            .map(|c| ("", c))
            .chain(
                self.namespaces
                    .iter()
                    .flat_map(|ns| ns.classes.iter().map(move |c| (ns.name.as_str(), c))),
            )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsingDirective {
    pub name: String,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamespaceDecl {
    pub name: String,
    /// Usings declared inside this block and every enclosing block
    pub usings: Vec<UsingDirective>,
    pub classes: Vec<ClassDecl>,
    pub span: Span,
}

/// Accessibility of a declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Visibility {
    Public,
    Internal,
    Protected,
    Private,
}

impl fmt::Display for Visibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Visibility::Public => "public",
            Visibility::Internal => "internal",
            Visibility::Protected => "protected",
            Visibility::Private => "private",
        };
        f.write_str(text)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Modifiers {
    pub visibility: Option<Visibility>,
    pub is_static: bool,
    pub is_sealed: bool,
    pub is_abstract: bool,
    pub is_virtual: bool,
    pub is_override: bool,
    pub is_readonly: bool,
    pub span: Span,
}

impl Modifiers {
    /// Declared visibility, or the language default (private for members).
    pub fn visibility_or(&self, default: Visibility) -> Visibility {
        self.visibility.unwrap_or(default)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassDecl {
    pub modifiers: Modifiers,
    pub name: String,
    /// Base class and implemented interfaces, in source order
    pub bases: Vec<TypeAnnotation>,
    pub members: Vec<MemberDecl>,
    pub span: Span,
}

/// A type written in source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeAnnotation {
    pub name: TypeName,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TypeName {
    Void,
    Bool,
    Int,
    Long,
    Double,
    String,
    Object,
    /// A class or interface name, possibly dotted
    Named(String),
}

impl TypeName {
    /// Whether values of this type can never be null.
    pub fn is_value_type(&self) -> bool {
        matches!(
            self,
            TypeName::Bool | TypeName::Int | TypeName::Long | TypeName::Double
        )
    }
}

impl fmt::Display for TypeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeName::Void => f.write_str("void"),
            TypeName::Bool => f.write_str("bool"),
            TypeName::Int => f.write_str("int"),
            TypeName::Long => f.write_str("long"),
            TypeName::Double => f.write_str("double"),
            TypeName::String => f.write_str("string"),
            TypeName::Object => f.write_str("object"),
            TypeName::Named(name) => f.write_str(name),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum MemberDecl {
    Field(FieldDecl),
    Property(PropertyDecl),
    Constructor(FunctionDecl),
    Method(FunctionDecl),
}

impl MemberDecl {
    pub fn name(&self) -> &str {
        match self {
            MemberDecl::Field(f) => &f.name,
            MemberDecl::Property(p) => &p.name,
            MemberDecl::Constructor(c) | MemberDecl::Method(c) => &c.name,
        }
    }

    pub fn span(&self) -> Span {
        match self {
            MemberDecl::Field(f) => f.span,
            MemberDecl::Property(p) => p.span,
            MemberDecl::Constructor(c) | MemberDecl::Method(c) => c.span,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDecl {
    pub modifiers: Modifiers,
    pub ty: TypeAnnotation,
    pub name: String,
    pub initializer: Option<Expression>,
    pub span: Span,
}

/// An auto-implemented property.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyDecl {
    pub modifiers: Modifiers,
    pub ty: TypeAnnotation,
    pub name: String,
    pub has_get: bool,
    pub has_set: bool,
    pub span: Span,
}

/// A method or constructor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionDecl {
    pub modifiers: Modifiers,
    /// `None` for constructors
    pub return_type: Option<TypeAnnotation>,
    pub name: String,
    pub params: Vec<Parameter>,
    pub body: Block,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    pub ty: TypeAnnotation,
    pub name: String,
    pub span: Span,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Block {
    pub statements: Vec<Statement>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Statement {
    Block(Block),
    Local(LocalDecl),
    If(IfStatement),
    While(WhileStatement),
    Return(ReturnStatement),
    Break(Span),
    Continue(Span),
    Expression(ExpressionStatement),
}

impl Statement {
    pub fn span(&self) -> Span {
        match self {
            Statement::Block(b) => b.span,
            Statement::Local(l) => l.span,
            Statement::If(i) => i.span,
            Statement::While(w) => w.span,
            Statement::Return(r) => r.span,
            Statement::Break(span) | Statement::Continue(span) => *span,
            Statement::Expression(e) => e.span,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocalDecl {
    /// `None` for `var`
    pub ty: Option<TypeAnnotation>,
    pub name: String,
    pub initializer: Option<Expression>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IfStatement {
    pub condition: Expression,
    pub then_branch: Box<Statement>,
    pub else_branch: Option<Box<Statement>>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WhileStatement {
    pub condition: Expression,
    pub body: Box<Statement>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReturnStatement {
    pub value: Option<Expression>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpressionStatement {
    pub expression: Expression,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Literal {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
}

impl Literal {
    /// Name of the literal's static type, as the checker reports it.
    pub fn type_name(&self) -> &'static str {
        match self {
            Literal::Null => "null",
            Literal::Bool(_) => "bool",
            Literal::Int(_) => "int",
            Literal::Float(_) => "double",
            Literal::String(_) => "string",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnaryOp {
    Negate,
    Not,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinaryOp {
    Add,
    Subtract,
    Multiply,
    Divide,
    Remainder,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
    Equal,
    NotEqual,
    And,
    Or,
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            BinaryOp::Add => "+",
            BinaryOp::Subtract => "-",
            BinaryOp::Multiply => "*",
            BinaryOp::Divide => "/",
            BinaryOp::Remainder => "%",
            BinaryOp::Less => "<",
            BinaryOp::LessEqual => "<=",
            BinaryOp::Greater => ">",
            BinaryOp::GreaterEqual => ">=",
            BinaryOp::Equal => "==",
            BinaryOp::NotEqual => "!=",
            BinaryOp::And => "&&",
            BinaryOp::Or => "||",
        };
        f.write_str(text)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AssignOp {
    Assign,
    AddAssign,
    SubtractAssign,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Expression {
    Literal {
        value: Literal,
        span: Span,
    },
    Name {
        name: String,
        span: Span,
    },
    This {
        span: Span,
    },
    Member {
        object: Box<Expression>,
        name: String,
        span: Span,
    },
    Call {
        callee: Box<Expression>,
        args: Vec<Expression>,
        span: Span,
    },
    Unary {
        op: UnaryOp,
        operand: Box<Expression>,
        span: Span,
    },
    Binary {
        op: BinaryOp,
        left: Box<Expression>,
        right: Box<Expression>,
        span: Span,
    },
    Assign {
        op: AssignOp,
        target: Box<Expression>,
        value: Box<Expression>,
        span: Span,
    },
}

impl Expression {
    pub fn span(&self) -> Span {
        match self {
            Expression::Literal { span, .. }
            | Expression::Name { span, .. }
            | Expression::This { span }
            | Expression::Member { span, .. }
            | Expression::Call { span, .. }
            | Expression::Unary { span, .. }
            | Expression::Binary { span, .. }
            | Expression::Assign { span, .. } => *span,
        }
    }

    /// The literal value if this expression is a (possibly negated) constant.
    pub fn as_constant(&self) -> Option<Literal> {
        match self {
            Expression::Literal { value, .. } => Some(value.clone()),
            Expression::Unary {
                op: UnaryOp::Negate,
                operand,
                ..
            } => match operand.as_constant()? {
                Literal::Int(v) => Some(Literal::Int(-v)),
                Literal::Float(v) => Some(Literal::Float(-v)),
                _ => None,
            },
            _ => None,
        }
    }
}
