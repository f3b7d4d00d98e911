//! Runtime values

use crate::compiler::metadata::{TypeSig, OBJECT_TYPE};
use crate::parser::ast::Literal;
use crate::vm::object::Instance;
use std::fmt;
use std::sync::Arc;

/// A forge script value.
///
/// Primitives are stored inline; objects are shared handles, so cloning a
/// `Value::Object` aliases the same instance.
#[derive(Debug, Clone, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Int(i32),
    Long(i64),
    Double(f64),
    Str(Arc<str>),
    Object(Instance),
}

impl Value {
    /// Default value of a declared type (`0`, `false`, or null).
    pub fn default_for(ty: &TypeSig) -> Value {
        match ty {
            TypeSig::Bool => Value::Bool(false),
            TypeSig::Int => Value::Int(0),
            TypeSig::Long => Value::Long(0),
            TypeSig::Double => Value::Double(0.0),
            _ => Value::Null,
        }
    }

    /// Value of a source literal. Integers that do not fit `int` are `long`.
    pub fn from_literal(literal: &Literal) -> Value {
        match literal {
            Literal::Null => Value::Null,
            Literal::Bool(b) => Value::Bool(*b),
            Literal::Int(v) => match i32::try_from(*v) {
                Ok(small) => Value::Int(small),
                Err(_) => Value::Long(*v),
            },
            Literal::Float(v) => Value::Double(*v),
            Literal::String(s) => Value::Str(Arc::from(s.as_str())),
        }
    }

    pub fn str(s: &str) -> Value {
        Value::Str(Arc::from(s))
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Name of the runtime type, as shown in error messages.
    pub fn type_name(&self) -> String {
        match self {
            Value::Null => "null".to_string(),
            Value::Bool(_) => "bool".to_string(),
            Value::Int(_) => "int".to_string(),
            Value::Long(_) => "long".to_string(),
            Value::Double(_) => "double".to_string(),
            Value::Str(_) => "string".to_string(),
            Value::Object(instance) => instance.qualified_name(),
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(v) => Some(i64::from(*v)),
            Value::Long(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(v) => Some(f64::from(*v)),
            Value::Long(v) => Some(*v as f64),
            Value::Double(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_instance(&self) -> Option<&Instance> {
        match self {
            Value::Object(instance) => Some(instance),
            _ => None,
        }
    }

    /// Numeric widening rank (`int` < `long` < `double`).
    pub(crate) fn numeric_rank(&self) -> Option<u8> {
        match self {
            Value::Int(_) => Some(0),
            Value::Long(_) => Some(1),
            Value::Double(_) => Some(2),
            _ => None,
        }
    }

    /// Convert for storage into a slot of type `ty`, applying implicit
    /// numeric widening. Returns `None` when no implicit conversion exists.
    pub fn coerce(self, ty: &TypeSig) -> Option<Value> {
        match (self, ty) {
            (_, TypeSig::Void) => None,
            (value, TypeSig::Object) => Some(value),
            (Value::Null, ty) if !ty.is_value_type() => Some(Value::Null),
            (Value::Bool(b), TypeSig::Bool) => Some(Value::Bool(b)),
            (Value::Int(v), TypeSig::Int) => Some(Value::Int(v)),
            (Value::Int(v), TypeSig::Long) => Some(Value::Long(i64::from(v))),
            (Value::Int(v), TypeSig::Double) => Some(Value::Double(f64::from(v))),
            (Value::Long(v), TypeSig::Long) => Some(Value::Long(v)),
            (Value::Long(v), TypeSig::Double) => Some(Value::Double(v as f64)),
            (Value::Double(v), TypeSig::Double) => Some(Value::Double(v)),
            (Value::Str(s), TypeSig::String) => Some(Value::Str(s)),
            (Value::Object(instance), TypeSig::Class(name)) => {
                if name == OBJECT_TYPE || instance.is_instance_of(name) {
                    Some(Value::Object(instance))
                } else {
                    None
                }
            }
            _ => None,
        }
    }

    /// Text produced by `ToString()` and string concatenation.
    pub fn to_display_string(&self) -> String {
        match self {
            Value::Null => String::new(),
            Value::Bool(true) => "True".to_string(),
            Value::Bool(false) => "False".to_string(),
            Value::Int(v) => v.to_string(),
            Value::Long(v) => v.to_string(),
            Value::Double(v) => format_double(*v),
            Value::Str(s) => s.to_string(),
            Value::Object(instance) => instance.qualified_name(),
        }
    }
}

fn format_double(v: f64) -> String {
    if v.is_nan() {
        "NaN".to_string()
    } else if v.is_infinite() {
        if v > 0.0 { "Infinity" } else { "-Infinity" }.to_string()
    } else {
        v.to_string()
    }
}

/// Equality as `==` sees it: numbers compare after widening, strings by
/// content, objects by identity.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => Instance::ptr_eq(a, b),
            (a, b) => match (a.numeric_rank(), b.numeric_rank()) {
                (Some(ra), Some(rb)) if ra.max(rb) < 2 => a.as_i64() == b.as_i64(),
                (Some(_), Some(_)) => a.as_f64() == b.as_f64(),
                _ => false,
            },
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("null"),
            Value::Str(s) => write!(f, "\"{}\"", s),
            other => f.write_str(&other.to_display_string()),
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Int(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Long(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Double(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::str(value)
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Str(Arc::from(value))
    }
}

impl From<Instance> for Value {
    fn from(value: Instance) -> Self {
        Value::Object(value)
    }
}
