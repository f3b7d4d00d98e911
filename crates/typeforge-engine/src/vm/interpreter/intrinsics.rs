//! Runtime-provided methods and arithmetic

use crate::parser::ast::BinaryOp;
use crate::vm::object::Instance;
use crate::vm::value::Value;
use crate::vm::{RuntimeError, RuntimeResult};
use rustc_hash::FxHasher;
use std::cmp::Ordering;
use std::hash::{Hash, Hasher};

fn missing(type_name: String, member: &str) -> RuntimeError {
    RuntimeError::MemberNotFound {
        type_name,
        member: member.to_string(),
    }
}

/// `System.Object` methods without a body.
pub(super) fn object_method(this: &Instance, name: &str, args: &[Value]) -> RuntimeResult<Value> {
    match (name, args) {
        ("ToString", []) => Ok(Value::from(this.qualified_name())),
        ("Equals", [other]) => Ok(Value::Bool(
            other.as_instance().is_some_and(|other| Instance::ptr_eq(this, other)),
        )),
        ("GetHashCode", []) => Ok(Value::Int(this.identity_hash())),
        _ => Err(missing(this.qualified_name(), name)),
    }
}

fn string_arg<'a>(method: &str, args: &'a [Value]) -> RuntimeResult<&'a str> {
    match args {
        [Value::Str(s)] => Ok(s.as_ref()),
        [Value::Null] => Err(RuntimeError::NullReference(format!("string.{}", method))),
        [other] => Err(RuntimeError::TypeMismatch {
            target: format!("string.{}", method),
            expected: "string".to_string(),
            actual: other.type_name(),
        }),
        _ => Err(RuntimeError::ArgumentCount {
            method: format!("string.{}", method),
            expected: 1,
            actual: args.len(),
        }),
    }
}

fn hash_of(value: &Value) -> i32 {
    match value {
        Value::Null => 0,
        Value::Bool(b) => i32::from(*b),
        Value::Int(v) => *v,
        Value::Long(v) => (*v ^ (*v >> 32)) as i32,
        Value::Double(v) => {
            let bits = v.to_bits();
            (bits ^ (bits >> 32)) as i32
        }
        Value::Str(s) => {
            let mut hasher = FxHasher::default();
            s.hash(&mut hasher);
            hasher.finish() as i32
        }
        Value::Object(instance) => instance.identity_hash(),
    }
}

/// Methods on primitive values and strings.
pub(super) fn value_method(value: &Value, name: &str, args: &[Value]) -> RuntimeResult<Value> {
    match (name, args) {
        ("ToString", []) => return Ok(Value::from(value.to_display_string())),
        ("Equals", [other]) => return Ok(Value::Bool(value == other)),
        ("GetHashCode", []) => return Ok(Value::Int(hash_of(value))),
        _ => {}
    }

    let Value::Str(s) = value else {
        return Err(missing(value.type_name(), name));
    };
    match name {
        "ToUpper" if args.is_empty() => Ok(Value::from(s.to_uppercase())),
        "ToLower" if args.is_empty() => Ok(Value::from(s.to_lowercase())),
        "Trim" if args.is_empty() => Ok(Value::str(s.trim())),
        "Contains" => Ok(Value::Bool(s.contains(string_arg(name, args)?))),
        "StartsWith" => Ok(Value::Bool(s.starts_with(string_arg(name, args)?))),
        "EndsWith" => Ok(Value::Bool(s.ends_with(string_arg(name, args)?))),
        _ => Err(missing("string".to_string(), name)),
    }
}

fn type_error(op: BinaryOp, left: &Value, right: &Value) -> RuntimeError {
    RuntimeError::TypeError(format!(
        "operator '{}' cannot be applied to '{}' and '{}'",
        op,
        left.type_name(),
        right.type_name()
    ))
}

fn compare(op: BinaryOp, ordering: Option<Ordering>) -> Value {
    let result = match (op, ordering) {
        (_, None) => false,
        (BinaryOp::Less, Some(o)) => o == Ordering::Less,
        (BinaryOp::LessEqual, Some(o)) => o != Ordering::Greater,
        (BinaryOp::Greater, Some(o)) => o == Ordering::Greater,
        (BinaryOp::GreaterEqual, Some(o)) => o != Ordering::Less,
        _ => false,
    };
    Value::Bool(result)
}

/// Numeric operators. Integer arithmetic wraps; integer division by zero
/// is an error.
pub(super) fn arithmetic(op: BinaryOp, left: &Value, right: &Value) -> RuntimeResult<Value> {
    let rank = match (left.numeric_rank(), right.numeric_rank()) {
        (Some(a), Some(b)) => a.max(b),
        _ => return Err(type_error(op, left, right)),
    };

    if rank == 2 {
        let (a, b) = match (left.as_f64(), right.as_f64()) {
            (Some(a), Some(b)) => (a, b),
            _ => return Err(type_error(op, left, right)),
        };
        return Ok(match op {
            BinaryOp::Add => Value::Double(a + b),
            BinaryOp::Subtract => Value::Double(a - b),
            BinaryOp::Multiply => Value::Double(a * b),
            BinaryOp::Divide => Value::Double(a / b),
            BinaryOp::Remainder => Value::Double(a % b),
            _ => compare(op, a.partial_cmp(&b)),
        });
    }

    let (a, b) = match (left.as_i64(), right.as_i64()) {
        (Some(a), Some(b)) => (a, b),
        _ => return Err(type_error(op, left, right)),
    };
    if matches!(op, BinaryOp::Divide | BinaryOp::Remainder) && b == 0 {
        return Err(RuntimeError::DivideByZero);
    }

    if rank == 0 {
        let (a, b) = (a as i32, b as i32);
        return Ok(match op {
            BinaryOp::Add => Value::Int(a.wrapping_add(b)),
            BinaryOp::Subtract => Value::Int(a.wrapping_sub(b)),
            BinaryOp::Multiply => Value::Int(a.wrapping_mul(b)),
            BinaryOp::Divide => Value::Int(a.wrapping_div(b)),
            BinaryOp::Remainder => Value::Int(a.wrapping_rem(b)),
            _ => compare(op, Some(a.cmp(&b))),
        });
    }

    Ok(match op {
        BinaryOp::Add => Value::Long(a.wrapping_add(b)),
        BinaryOp::Subtract => Value::Long(a.wrapping_sub(b)),
        BinaryOp::Multiply => Value::Long(a.wrapping_mul(b)),
        BinaryOp::Divide => Value::Long(a.wrapping_div(b)),
        BinaryOp::Remainder => Value::Long(a.wrapping_rem(b)),
        _ => compare(op, Some(a.cmp(&b))),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_int_arithmetic_wraps() {
        let result = arithmetic(BinaryOp::Add, &Value::Int(i32::MAX), &Value::Int(1)).unwrap();
        assert_eq!(result, Value::Int(i32::MIN));
    }

    #[test]
    fn test_mixed_arithmetic_widens() {
        assert!(matches!(
            arithmetic(BinaryOp::Multiply, &Value::Int(2), &Value::Long(3)).unwrap(),
            Value::Long(6)
        ));
        assert!(matches!(
            arithmetic(BinaryOp::Divide, &Value::Int(1), &Value::Double(4.0)).unwrap(),
            Value::Double(v) if v == 0.25
        ));
    }

    #[test]
    fn test_integer_divide_by_zero() {
        assert_eq!(
            arithmetic(BinaryOp::Remainder, &Value::Long(5), &Value::Int(0)),
            Err(RuntimeError::DivideByZero)
        );
    }

    #[test]
    fn test_comparisons() {
        assert_eq!(arithmetic(BinaryOp::LessEqual, &Value::Int(2), &Value::Int(2)).unwrap(), Value::Bool(true));
        assert_eq!(
            arithmetic(BinaryOp::Greater, &Value::Double(f64::NAN), &Value::Int(0)).unwrap(),
            Value::Bool(false)
        );
    }

    #[test]
    fn test_string_methods() {
        let s = Value::str("Hello");
        assert_eq!(value_method(&s, "ToUpper", &[]).unwrap(), Value::str("HELLO"));
        assert_eq!(value_method(&s, "StartsWith", &[Value::str("He")]).unwrap(), Value::Bool(true));
        assert!(matches!(
            value_method(&s, "Contains", &[Value::Null]),
            Err(RuntimeError::NullReference(_))
        ));
        assert_eq!(value_method(&Value::Int(5), "ToString", &[]).unwrap(), Value::str("5"));
    }
}
