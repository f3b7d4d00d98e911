//! Compiled type metadata.
//!
//! This is what a module image carries: every class with resolved type
//! signatures, plus the syntax trees of member bodies for the interpreter.

use crate::parser::ast::{Block, Expression, Visibility};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Qualified name of the root of every class hierarchy.
pub const OBJECT_TYPE: &str = "System.Object";

/// A resolved type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TypeSig {
    Void,
    Bool,
    Int,
    Long,
    Double,
    String,
    Object,
    /// A class or interface by qualified name
    Class(String),
}

impl TypeSig {
    pub fn is_value_type(&self) -> bool {
        matches!(self, TypeSig::Bool | TypeSig::Int | TypeSig::Long | TypeSig::Double)
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, TypeSig::Int | TypeSig::Long | TypeSig::Double)
    }

    /// Rank used for numeric widening (`int` < `long` < `double`).
    pub fn numeric_rank(&self) -> Option<u8> {
        match self {
            TypeSig::Int => Some(0),
            TypeSig::Long => Some(1),
            TypeSig::Double => Some(2),
            _ => None,
        }
    }
}

impl fmt::Display for TypeSig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeSig::Void => f.write_str("void"),
            TypeSig::Bool => f.write_str("bool"),
            TypeSig::Int => f.write_str("int"),
            TypeSig::Long => f.write_str("long"),
            TypeSig::Double => f.write_str("double"),
            TypeSig::String => f.write_str("string"),
            TypeSig::Object => f.write_str("object"),
            TypeSig::Class(name) => f.write_str(name),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClassKind {
    Class,
    Interface,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDef {
    pub name: String,
    pub ty: TypeSig,
    pub visibility: Visibility,
    pub is_readonly: bool,
    pub initializer: Option<Expression>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyDef {
    pub name: String,
    pub ty: TypeSig,
    pub visibility: Visibility,
    pub has_get: bool,
    pub has_set: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParamDef {
    pub name: String,
    pub ty: TypeSig,
}

/// A method or constructor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodDef {
    pub name: String,
    pub visibility: Visibility,
    pub params: Vec<ParamDef>,
    pub return_type: TypeSig,
    pub is_virtual: bool,
    pub is_override: bool,
    /// `None` for interface members and runtime-provided methods
    pub body: Option<Block>,
}

impl MethodDef {
    pub fn signature(&self) -> String {
        let params: Vec<String> = self.params.iter().map(|p| p.ty.to_string()).collect();
        format!("{}({})", self.name, params.join(", "))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassDef {
    pub kind: ClassKind,
    pub namespace: String,
    pub name: String,
    pub visibility: Visibility,
    pub is_sealed: bool,
    pub is_abstract: bool,
    /// Qualified base class name; `None` only for `System.Object` and interfaces
    pub base: Option<String>,
    /// Qualified names of implemented interfaces
    pub interfaces: Vec<String>,
    pub fields: Vec<FieldDef>,
    pub properties: Vec<PropertyDef>,
    pub constructor: Option<MethodDef>,
    pub methods: Vec<MethodDef>,
    /// Declared member names in source order
    pub member_order: Vec<String>,
}

impl ClassDef {
    pub fn qualified_name(&self) -> String {
        qualify(&self.namespace, &self.name)
    }

    pub fn is_interface(&self) -> bool {
        self.kind == ClassKind::Interface
    }

    pub fn field(&self, name: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn property(&self, name: &str) -> Option<&PropertyDef> {
        self.properties.iter().find(|p| p.name == name)
    }

    pub fn method(&self, name: &str) -> Option<&MethodDef> {
        self.methods.iter().find(|m| m.name == name)
    }

    /// Whether any member (field, property or method) is named `name`.
    pub fn declares(&self, name: &str) -> bool {
        self.field(name).is_some() || self.property(name).is_some() || self.method(name).is_some()
    }
}

/// Join a namespace and a simple name.
pub fn qualify(namespace: &str, name: &str) -> String {
    if namespace.is_empty() {
        name.to_string()
    } else {
        format!("{}.{}", namespace, name)
    }
}
