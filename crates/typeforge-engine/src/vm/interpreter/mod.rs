//! Tree-walking interpreter for method and constructor bodies
//!
//! Bodies are executed directly from the syntax trees carried in module
//! images. The checker has already validated names and types, so most
//! failures here are genuine runtime conditions (null receivers, division
//! by zero, recursion depth) or host calls with bad arguments.

mod exec;
mod intrinsics;

use crate::compiler::metadata::{MethodDef, TypeSig};
use crate::parser::ast::Visibility;
use crate::vm::object::{Instance, LoadedModule, RuntimeClass};
use crate::vm::value::Value;
use crate::vm::{RuntimeError, RuntimeResult};
use rustc_hash::FxHashMap;
use std::sync::Arc;

/// Maximum nesting of method calls.
pub const MAX_CALL_DEPTH: usize = 100;

/// How a statement finished.
#[derive(Debug)]
pub(crate) enum Flow {
    Normal,
    Return(Value),
    Break,
    Continue,
}

#[derive(Debug)]
struct Local {
    value: Value,
    /// Declared type; `None` for `var` and class-typed locals
    ty: Option<TypeSig>,
}

/// Activation of one method, constructor or field initializer.
pub(crate) struct Frame {
    this: Instance,
    /// Qualified name of the class whose code is running
    owner: String,
    scopes: Vec<FxHashMap<String, Local>>,
}

impl Frame {
    fn new(this: Instance, owner: String) -> Self {
        Self {
            this,
            owner,
            scopes: vec![FxHashMap::default()],
        }
    }

    fn push_scope(&mut self) {
        self.scopes.push(FxHashMap::default());
    }

    fn pop_scope(&mut self) {
        self.scopes.pop();
    }

    fn declare(&mut self, name: &str, value: Value, ty: Option<TypeSig>) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name.to_string(), Local { value, ty });
        }
    }

    fn local(&self, name: &str) -> Option<&Local> {
        self.scopes.iter().rev().find_map(|scope| scope.get(name))
    }

    fn local_mut(&mut self, name: &str) -> Option<&mut Local> {
        self.scopes.iter_mut().rev().find_map(|scope| scope.get_mut(name))
    }
}

/// Executes code for one host call.
#[derive(Debug, Default)]
pub struct Interpreter {
    depth: usize,
}

impl Interpreter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an instance: for each class from the root down, fields get
    /// their defaults, then their initializers, then the constructor body
    /// runs. Base constructors must be parameterless; `args` go to the
    /// constructor of `class` itself.
    pub fn construct(
        &mut self,
        class: Arc<RuntimeClass>,
        module: Arc<LoadedModule>,
        args: &[Value],
    ) -> RuntimeResult<Instance> {
        let type_name = class.qualified_name();
        if class.def.is_abstract || class.def.is_interface() {
            return Err(RuntimeError::AbstractType(type_name));
        }
        let accepts = match &class.def.constructor {
            Some(ctor) => ctor.params.len() == args.len(),
            None => args.is_empty(),
        };
        if !accepts {
            return Err(RuntimeError::MissingConstructor {
                type_name,
                arity: args.len(),
            });
        }

        let instance = Instance::allocate(class.clone(), module);
        let mut chain: Vec<&RuntimeClass> = class.ancestors().collect();
        chain.reverse();
        let last = chain.len() - 1;

        for (index, part) in chain.into_iter().enumerate() {
            self.initialize_part(&instance, part)?;
            let Some(ctor) = &part.def.constructor else {
                continue;
            };
            let ctor_args = if index == last {
                args.to_vec()
            } else if ctor.params.is_empty() {
                Vec::new()
            } else {
                return Err(RuntimeError::MissingConstructor {
                    type_name: part.qualified_name(),
                    arity: 0,
                });
            };
            self.execute(&instance, part, ctor, ctor_args)?;
        }
        Ok(instance)
    }

    fn initialize_part(&mut self, instance: &Instance, part: &RuntimeClass) -> RuntimeResult<()> {
        for field in &part.def.fields {
            instance.set_slot(&field.name, Value::default_for(&field.ty));
        }
        for property in &part.def.properties {
            instance.set_slot(&property.name, Value::default_for(&property.ty));
        }

        let mut frame = Frame::new(instance.clone(), part.qualified_name());
        for field in &part.def.fields {
            let Some(initializer) = &field.initializer else {
                continue;
            };
            let value = self.eval(&mut frame, initializer)?;
            let target = format!("{}.{}", part.qualified_name(), field.name);
            let value = coerce(value, &field.ty, &target)?;
            instance.set_slot(&field.name, value);
        }
        Ok(())
    }

    /// Invoke a public method from the host.
    pub fn invoke_public(&mut self, this: &Instance, name: &str, args: &[Value]) -> RuntimeResult<Value> {
        let class = this.class().clone();
        match class.find_method(name) {
            Some((_, method)) if method.visibility == Visibility::Public => {
                self.dispatch(this, name, args.to_vec(), None)
            }
            _ => Err(RuntimeError::MemberNotFound {
                type_name: this.qualified_name(),
                member: name.to_string(),
            }),
        }
    }

    /// Resolve and run `name` on `this`.
    ///
    /// Lookup starts at `from` (the calling class, for calls through `this`)
    /// or at the object's own class. Virtual and override methods are then
    /// re-resolved from the object's class.
    pub(crate) fn dispatch(
        &mut self,
        this: &Instance,
        name: &str,
        args: Vec<Value>,
        from: Option<&str>,
    ) -> RuntimeResult<Value> {
        let class = this.class().clone();
        let start = from
            .and_then(|owner| class.ancestors().find(|c| c.qualified_name() == owner))
            .unwrap_or(class.as_ref());
        let (mut owner, mut method) = start.find_method(name).ok_or_else(|| RuntimeError::MemberNotFound {
            type_name: this.qualified_name(),
            member: name.to_string(),
        })?;
        if method.is_virtual || method.is_override {
            if let Some(found) = class.find_method(name) {
                (owner, method) = found;
            }
        }
        self.execute(this, owner, method, args)
    }

    fn execute(
        &mut self,
        this: &Instance,
        owner: &RuntimeClass,
        method: &MethodDef,
        args: Vec<Value>,
    ) -> RuntimeResult<Value> {
        let display = format!("{}.{}", owner.qualified_name(), method.name);
        if args.len() != method.params.len() {
            return Err(RuntimeError::ArgumentCount {
                method: display,
                expected: method.params.len(),
                actual: args.len(),
            });
        }
        let mut arguments = Vec::with_capacity(args.len());
        for (arg, param) in args.into_iter().zip(&method.params) {
            arguments.push(coerce(arg, &param.ty, &format!("{}({})", display, param.name))?);
        }

        let Some(body) = &method.body else {
            return intrinsics::object_method(this, &method.name, &arguments);
        };

        if self.depth >= MAX_CALL_DEPTH {
            return Err(RuntimeError::StackOverflow(MAX_CALL_DEPTH));
        }
        self.depth += 1;

        let mut frame = Frame::new(this.clone(), owner.qualified_name());
        for (param, value) in method.params.iter().zip(arguments) {
            frame.declare(&param.name, value, Some(param.ty.clone()));
        }
        let flow = self.exec_statements(&mut frame, &body.statements);
        self.depth -= 1;

        match flow? {
            Flow::Return(value) if method.return_type != TypeSig::Void => {
                coerce(value, &method.return_type, &display)
            }
            _ => Ok(Value::Null),
        }
    }
}

/// Convert for storage, reporting a mismatch against `target`.
pub(crate) fn coerce(value: Value, ty: &TypeSig, target: &str) -> RuntimeResult<Value> {
    let actual = value.type_name();
    value.coerce(ty).ok_or_else(|| RuntimeError::TypeMismatch {
        target: target.to_string(),
        expected: ty.to_string(),
        actual,
    })
}
