//! Statement execution and expression evaluation

use super::{coerce, intrinsics, Flow, Frame, Interpreter};
use crate::compiler::metadata::TypeSig;
use crate::parser::ast::*;
use crate::vm::object::Instance;
use crate::vm::value::Value;
use crate::vm::{RuntimeError, RuntimeResult};

/// Runtime type of a builtin local annotation. Class-typed locals need no
/// conversion, so they map to `None`.
fn local_type(annotation: &TypeAnnotation) -> Option<TypeSig> {
    match annotation.name {
        TypeName::Bool => Some(TypeSig::Bool),
        TypeName::Int => Some(TypeSig::Int),
        TypeName::Long => Some(TypeSig::Long),
        TypeName::Double => Some(TypeSig::Double),
        TypeName::String => Some(TypeSig::String),
        TypeName::Object => Some(TypeSig::Object),
        TypeName::Void | TypeName::Named(_) => None,
    }
}

impl Interpreter {
    pub(super) fn exec_statements(&mut self, frame: &mut Frame, statements: &[Statement]) -> RuntimeResult<Flow> {
        for statement in statements {
            match self.exec_statement(frame, statement)? {
                Flow::Normal => {}
                other => return Ok(other),
            }
        }
        Ok(Flow::Normal)
    }

    fn exec_scoped(&mut self, frame: &mut Frame, statement: &Statement) -> RuntimeResult<Flow> {
        frame.push_scope();
        let flow = self.exec_statement(frame, statement);
        frame.pop_scope();
        flow
    }

    fn exec_statement(&mut self, frame: &mut Frame, statement: &Statement) -> RuntimeResult<Flow> {
        match statement {
            Statement::Block(block) => {
                frame.push_scope();
                let flow = self.exec_statements(frame, &block.statements);
                frame.pop_scope();
                flow
            }
            Statement::Local(local) => {
                let ty = local.ty.as_ref().and_then(local_type);
                let value = match (&local.initializer, &ty) {
                    (Some(initializer), Some(ty)) => {
                        let value = self.eval(frame, initializer)?;
                        coerce(value, ty, &local.name)?
                    }
                    (Some(initializer), None) => self.eval(frame, initializer)?,
                    (None, Some(ty)) => Value::default_for(ty),
                    (None, None) => Value::Null,
                };
                frame.declare(&local.name, value, ty);
                Ok(Flow::Normal)
            }
            Statement::If(stmt) => {
                if self.eval_condition(frame, &stmt.condition)? {
                    self.exec_scoped(frame, &stmt.then_branch)
                } else if let Some(branch) = &stmt.else_branch {
                    self.exec_scoped(frame, branch)
                } else {
                    Ok(Flow::Normal)
                }
            }
            Statement::While(stmt) => {
                while self.eval_condition(frame, &stmt.condition)? {
                    match self.exec_scoped(frame, &stmt.body)? {
                        Flow::Break => break,
                        Flow::Normal | Flow::Continue => {}
                        flow @ Flow::Return(_) => return Ok(flow),
                    }
                }
                Ok(Flow::Normal)
            }
            Statement::Return(ret) => {
                let value = match &ret.value {
                    Some(expression) => self.eval(frame, expression)?,
                    None => Value::Null,
                };
                Ok(Flow::Return(value))
            }
            Statement::Break(_) => Ok(Flow::Break),
            Statement::Continue(_) => Ok(Flow::Continue),
            Statement::Expression(stmt) => {
                self.eval(frame, &stmt.expression)?;
                Ok(Flow::Normal)
            }
        }
    }

    fn eval_condition(&mut self, frame: &mut Frame, condition: &Expression) -> RuntimeResult<bool> {
        let value = self.eval(frame, condition)?;
        value
            .as_bool()
            .ok_or_else(|| RuntimeError::TypeError(format!("condition evaluated to '{}'", value.type_name())))
    }

    pub(super) fn eval(&mut self, frame: &mut Frame, expression: &Expression) -> RuntimeResult<Value> {
        match expression {
            Expression::Literal { value, .. } => Ok(Value::from_literal(value)),
            Expression::This { .. } => Ok(Value::Object(frame.this.clone())),
            Expression::Name { name, .. } => {
                if let Some(local) = frame.local(name) {
                    return Ok(local.value.clone());
                }
                frame.this.slot(name).ok_or_else(|| RuntimeError::MemberNotFound {
                    type_name: frame.this.qualified_name(),
                    member: name.clone(),
                })
            }
            Expression::Member { object, name, .. } => {
                let target = self.eval(frame, object)?;
                member_value(&target, name)
            }
            Expression::Call { callee, args, .. } => self.eval_call(frame, callee, args),
            Expression::Unary { op, operand, .. } => {
                let value = self.eval(frame, operand)?;
                match (op, value) {
                    (UnaryOp::Negate, Value::Int(v)) => Ok(Value::Int(v.wrapping_neg())),
                    (UnaryOp::Negate, Value::Long(v)) => Ok(Value::Long(v.wrapping_neg())),
                    (UnaryOp::Negate, Value::Double(v)) => Ok(Value::Double(-v)),
                    (UnaryOp::Not, Value::Bool(b)) => Ok(Value::Bool(!b)),
                    (_, other) => Err(RuntimeError::TypeError(format!(
                        "unary operator cannot be applied to '{}'",
                        other.type_name()
                    ))),
                }
            }
            Expression::Binary { op, left, right, .. } => match op {
                BinaryOp::And | BinaryOp::Or => {
                    let left = self.eval_condition(frame, left)?;
                    if (*op == BinaryOp::And) != left {
                        return Ok(Value::Bool(left));
                    }
                    Ok(Value::Bool(self.eval_condition(frame, right)?))
                }
                _ => {
                    let left = self.eval(frame, left)?;
                    let right = self.eval(frame, right)?;
                    self.binary(*op, left, right)
                }
            },
            Expression::Assign { op, target, value, .. } => {
                let value = match op {
                    AssignOp::Assign => self.eval(frame, value)?,
                    AssignOp::AddAssign | AssignOp::SubtractAssign => {
                        let current = self.eval(frame, target)?;
                        let rhs = self.eval(frame, value)?;
                        let op = if *op == AssignOp::AddAssign {
                            BinaryOp::Add
                        } else {
                            BinaryOp::Subtract
                        };
                        self.binary(op, current, rhs)?
                    }
                };
                self.store(frame, target, value)
            }
        }
    }

    fn eval_call(&mut self, frame: &mut Frame, callee: &Expression, args: &[Expression]) -> RuntimeResult<Value> {
        match callee {
            Expression::Name { name, .. } => {
                let args = self.eval_args(frame, args)?;
                let this = frame.this.clone();
                self.dispatch(&this, name, args, Some(frame.owner.as_str()))
            }
            Expression::Member { object, name, .. } => {
                let through_this = matches!(**object, Expression::This { .. });
                let receiver = self.eval(frame, object)?;
                let args = self.eval_args(frame, args)?;
                match receiver {
                    Value::Object(instance) => {
                        let from = through_this.then_some(frame.owner.as_str());
                        self.dispatch(&instance, name, args, from)
                    }
                    Value::Null => Err(RuntimeError::NullReference(name.clone())),
                    other => intrinsics::value_method(&other, name, &args),
                }
            }
            other => Err(RuntimeError::TypeError(format!(
                "expression at {} is not callable",
                other.span()
            ))),
        }
    }

    fn eval_args(&mut self, frame: &mut Frame, args: &[Expression]) -> RuntimeResult<Vec<Value>> {
        args.iter().map(|arg| self.eval(frame, arg)).collect()
    }

    /// Assign `value` to an assignable expression and return the stored value.
    fn store(&mut self, frame: &mut Frame, target: &Expression, value: Value) -> RuntimeResult<Value> {
        match target {
            Expression::Name { name, .. } => {
                if let Some(local) = frame.local_mut(name) {
                    let stored = match &local.ty {
                        Some(ty) => coerce(value, ty, name)?,
                        None => value,
                    };
                    local.value = stored.clone();
                    return Ok(stored);
                }
                let this = frame.this.clone();
                store_member(&this, name, value)
            }
            Expression::Member { object, name, .. } => match self.eval(frame, object)? {
                Value::Object(instance) => store_member(&instance, name, value),
                Value::Null => Err(RuntimeError::NullReference(name.clone())),
                other => Err(RuntimeError::TypeError(format!(
                    "cannot assign member '{}' of '{}'",
                    name,
                    other.type_name()
                ))),
            },
            other => Err(RuntimeError::TypeError(format!(
                "expression at {} is not assignable",
                other.span()
            ))),
        }
    }

    fn binary(&mut self, op: BinaryOp, left: Value, right: Value) -> RuntimeResult<Value> {
        match op {
            BinaryOp::Equal => return Ok(Value::Bool(left == right)),
            BinaryOp::NotEqual => return Ok(Value::Bool(left != right)),
            BinaryOp::Add if matches!(left, Value::Str(_)) || matches!(right, Value::Str(_)) => {
                let text = format!("{}{}", self.stringify(&left)?, self.stringify(&right)?);
                return Ok(Value::from(text));
            }
            _ => {}
        }
        intrinsics::arithmetic(op, &left, &right)
    }

    /// Text of a value in string concatenation; objects use their `ToString`.
    fn stringify(&mut self, value: &Value) -> RuntimeResult<String> {
        match value {
            Value::Object(instance) => {
                let text = self.dispatch(instance, "ToString", Vec::new(), None)?;
                Ok(text.to_display_string())
            }
            other => Ok(other.to_display_string()),
        }
    }
}

fn member_value(target: &Value, name: &str) -> RuntimeResult<Value> {
    match target {
        Value::Object(instance) => instance.slot(name).ok_or_else(|| RuntimeError::MemberNotFound {
            type_name: instance.qualified_name(),
            member: name.to_string(),
        }),
        Value::Str(s) if name == "Length" => Ok(Value::Int(s.encode_utf16().count() as i32)),
        Value::Null => Err(RuntimeError::NullReference(name.to_string())),
        other => Err(RuntimeError::MemberNotFound {
            type_name: other.type_name(),
            member: name.to_string(),
        }),
    }
}

/// Write a field or property slot from inside the object's code.
fn store_member(instance: &Instance, name: &str, value: Value) -> RuntimeResult<Value> {
    let member = instance.class().data_member(name).ok_or_else(|| RuntimeError::MemberNotFound {
        type_name: instance.qualified_name(),
        member: name.to_string(),
    })?;
    let stored = coerce(value, &member.ty, &format!("{}.{}", instance.qualified_name(), name))?;
    instance.set_slot(name, stored.clone());
    Ok(stored)
}
