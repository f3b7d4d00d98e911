//! Statement and expression checking for member bodies.

use super::env::{FoundMember, MemberKind, Origin, TypeEnv};
use super::{resolve_type, NsContext, Report};
use crate::compiler::metadata::{ClassDef, MethodDef, TypeSig, OBJECT_TYPE};
use crate::parser::ast::*;
use crate::parser::token::Span;
use rustc_hash::FxHashMap;

/// Static type of an expression.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Ty {
    Known(TypeSig),
    /// The `null` literal
    Null,
    /// Could not be determined; an error has already been reported
    Unknown,
}

impl Ty {
    fn display(&self) -> String {
        match self {
            Ty::Known(ty) => ty.to_string(),
            Ty::Null => "<null>".to_string(),
            Ty::Unknown => "?".to_string(),
        }
    }

    fn is(&self, ty: &TypeSig) -> bool {
        matches!(self, Ty::Known(t) if t == ty)
    }

    fn numeric_rank(&self) -> Option<u8> {
        match self {
            Ty::Known(ty) => ty.numeric_rank(),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BodyKind {
    Method,
    Constructor,
    FieldInitializer,
}

/// Signature of something callable.
struct Callable {
    display: String,
    params: Vec<TypeSig>,
    return_type: TypeSig,
}

/// Methods every value supports, provided by the runtime.
fn universal_method(name: &str) -> Option<(Vec<TypeSig>, TypeSig)> {
    match name {
        "ToString" => Some((Vec::new(), TypeSig::String)),
        "Equals" => Some((vec![TypeSig::Object], TypeSig::Bool)),
        "GetHashCode" => Some((Vec::new(), TypeSig::Int)),
        _ => None,
    }
}

/// Extra methods on `string`.
fn string_method(name: &str) -> Option<(Vec<TypeSig>, TypeSig)> {
    match name {
        "ToUpper" | "ToLower" | "Trim" => Some((Vec::new(), TypeSig::String)),
        "Contains" | "StartsWith" | "EndsWith" => Some((vec![TypeSig::String], TypeSig::Bool)),
        _ => universal_method(name),
    }
}

pub(crate) struct BodyChecker<'c> {
    env: &'c TypeEnv,
    report: &'c mut Report,
    ctx: &'c NsContext,
    class: &'c ClassDef,
    class_name: String,
    kind: BodyKind,
    member: String,
    return_type: TypeSig,
    scopes: Vec<FxHashMap<String, Ty>>,
    loop_depth: usize,
}

impl<'c> BodyChecker<'c> {
    pub fn new(env: &'c TypeEnv, report: &'c mut Report, ctx: &'c NsContext, class: &'c ClassDef) -> Self {
        Self {
            env,
            report,
            ctx,
            class,
            class_name: class.qualified_name(),
            kind: BodyKind::Method,
            member: String::new(),
            return_type: TypeSig::Void,
            scopes: Vec::new(),
            loop_depth: 0,
        }
    }

    fn reset(&mut self, kind: BodyKind, member: String, return_type: TypeSig) {
        self.kind = kind;
        self.member = member;
        self.return_type = return_type;
        self.scopes = vec![FxHashMap::default()];
        self.loop_depth = 0;
    }

    pub fn check_field_initializer(&mut self, initializer: &Expression, ty: &TypeSig) {
        self.reset(BodyKind::FieldInitializer, self.class_name.clone(), TypeSig::Void);
        let value = self.check_expr(initializer);
        self.require_convertible(&value, &Ty::Known(ty.clone()), initializer.span());
    }

    pub fn check_method(&mut self, decl: &FunctionDecl, lowered: &MethodDef) {
        let display = format!("{}.{}", self.class_name, lowered.signature());
        self.reset(BodyKind::Method, display.clone(), lowered.return_type.clone());
        self.declare_params(decl, lowered);
        let completes = self.check_statements(&decl.body.statements);
        if completes && lowered.return_type != TypeSig::Void {
            self.report.error(
                "TF0161",
                format!("'{}': not all code paths return a value", display),
                decl.span,
            );
        }
    }

    pub fn check_constructor(&mut self, decl: &FunctionDecl, lowered: &MethodDef) {
        let params: Vec<String> = lowered.params.iter().map(|p| p.ty.to_string()).collect();
        let display = format!("{}.{}({})", self.class_name, self.class.name, params.join(", "));
        self.reset(BodyKind::Constructor, display, TypeSig::Void);
        self.declare_params(decl, lowered);
        self.check_statements(&decl.body.statements);
    }

    fn declare_params(&mut self, decl: &FunctionDecl, lowered: &MethodDef) {
        for (param, def) in decl.params.iter().zip(&lowered.params) {
            if let Some(scope) = self.scopes.last_mut() {
                scope.insert(param.name.clone(), Ty::Known(def.ty.clone()));
            }
        }
    }

    // ------------------------------------------------------------------
    // Statements
    // ------------------------------------------------------------------

    /// Check a statement list; returns whether its end is reachable.
    fn check_statements(&mut self, statements: &[Statement]) -> bool {
        let mut reachable = true;
        let mut warned = false;
        for statement in statements {
            if !reachable && !warned {
                self.report.warning("TF0162", "Unreachable code detected", statement.span());
                warned = true;
            }
            let completes = self.check_statement(statement);
            reachable = reachable && completes;
        }
        reachable
    }

    fn check_embedded(&mut self, statement: &Statement) -> bool {
        if let Statement::Local(local) = statement {
            self.report.error(
                "TF1023",
                "Embedded statement cannot be a declaration or labeled statement",
                local.span,
            );
        }
        self.scopes.push(FxHashMap::default());
        let completes = self.check_statement(statement);
        self.scopes.pop();
        completes
    }

    fn check_statement(&mut self, statement: &Statement) -> bool {
        match statement {
            Statement::Block(block) => {
                self.scopes.push(FxHashMap::default());
                let completes = self.check_statements(&block.statements);
                self.scopes.pop();
                completes
            }
            Statement::Local(local) => {
                self.check_local(local);
                true
            }
            Statement::If(stmt) => {
                self.check_condition(&stmt.condition);
                let then_completes = self.check_embedded(&stmt.then_branch);
                let else_completes = match &stmt.else_branch {
                    Some(branch) => self.check_embedded(branch),
                    None => true,
                };
                then_completes || else_completes
            }
            Statement::While(stmt) => {
                self.check_condition(&stmt.condition);
                self.loop_depth += 1;
                self.check_embedded(&stmt.body);
                self.loop_depth -= 1;
                let infinite = matches!(
                    stmt.condition,
                    Expression::Literal {
                        value: Literal::Bool(true),
                        ..
                    }
                );
                !infinite || contains_break(&stmt.body)
            }
            Statement::Return(ret) => {
                self.check_return(ret);
                false
            }
            Statement::Break(span) | Statement::Continue(span) => {
                if self.loop_depth == 0 {
                    self.report.error(
                        "TF0139",
                        "No enclosing loop out of which to break or continue",
                        *span,
                    );
                }
                false
            }
            Statement::Expression(stmt) => {
                if !matches!(stmt.expression, Expression::Assign { .. } | Expression::Call { .. }) {
                    self.report.error(
                        "TF0201",
                        "Only assignment and call expressions can be used as a statement",
                        stmt.span,
                    );
                }
                self.check_expr(&stmt.expression);
                true
            }
        }
    }

    fn check_local(&mut self, local: &LocalDecl) {
        let declared = match &local.ty {
            Some(annotation) => Some(
                resolve_type(self.env, self.report, annotation, self.ctx)
                    .map(Ty::Known)
                    .unwrap_or(Ty::Unknown),
            ),
            None => None,
        };
        let initializer = local.initializer.as_ref().map(|e| (self.check_expr(e), e.span()));

        let ty = match (declared, initializer) {
            (Some(declared), Some((value, span))) => {
                self.require_convertible(&value, &declared, span);
                declared
            }
            (Some(declared), None) => declared,
            (None, Some((Ty::Null, span))) => {
                self.report.error("TF0815", "Cannot assign <null> to an implicitly-typed variable", span);
                Ty::Unknown
            }
            (None, Some((Ty::Known(TypeSig::Void), span))) => {
                self.report.error("TF0815", "Cannot assign void to an implicitly-typed variable", span);
                Ty::Unknown
            }
            (None, Some((value, _))) => value,
            (None, None) => Ty::Unknown,
        };

        if self.lookup_local(&local.name).is_some() {
            self.report.error(
                "TF0128",
                format!("A local variable or parameter named '{}' is already defined in this scope", local.name),
                local.span,
            );
            return;
        }
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(local.name.clone(), ty);
        }
    }

    fn check_condition(&mut self, condition: &Expression) {
        let ty = self.check_expr(condition);
        self.require_convertible(&ty, &Ty::Known(TypeSig::Bool), condition.span());
    }

    fn check_return(&mut self, ret: &ReturnStatement) {
        let value = ret.value.as_ref().map(|e| (self.check_expr(e), e.span()));
        match value {
            Some((_, span)) if self.return_type == TypeSig::Void => {
                self.report.error(
                    "TF0127",
                    format!(
                        "Since '{}' returns void, a return keyword must not be followed by an object expression",
                        self.member
                    ),
                    span,
                );
            }
            Some((ty, span)) => {
                let expected = Ty::Known(self.return_type.clone());
                self.require_convertible(&ty, &expected, span);
            }
            None if self.return_type != TypeSig::Void => {
                self.report.error(
                    "TF0126",
                    format!("An object of a type convertible to '{}' is required", self.return_type),
                    ret.span,
                );
            }
            None => {}
        }
    }

    // ------------------------------------------------------------------
    // Expressions
    // ------------------------------------------------------------------

    fn check_expr(&mut self, expression: &Expression) -> Ty {
        match expression {
            Expression::Literal { value, .. } => literal_type(value),
            Expression::This { span } => {
                if self.kind == BodyKind::FieldInitializer {
                    self.report.error("TF0027", "Keyword 'this' is not available in the current context", *span);
                    return Ty::Unknown;
                }
                Ty::Known(TypeSig::Class(self.class_name.clone()))
            }
            Expression::Name { name, span } => self.check_name(name, *span),
            Expression::Member { object, name, span } => {
                let object_ty = self.check_expr(object);
                self.member_type(&object_ty, name, *span)
            }
            Expression::Call { callee, args, span } => self.check_call(callee, args, *span),
            Expression::Unary { op, operand, span } => {
                let ty = self.check_expr(operand);
                let ok = match op {
                    UnaryOp::Negate => ty.numeric_rank().is_some(),
                    UnaryOp::Not => ty.is(&TypeSig::Bool),
                };
                if ty == Ty::Unknown || ok {
                    return ty;
                }
                let symbol = if *op == UnaryOp::Negate { "-" } else { "!" };
                self.report.error(
                    "TF0023",
                    format!("Operator '{}' cannot be applied to operand of type '{}'", symbol, ty.display()),
                    *span,
                );
                Ty::Unknown
            }
            Expression::Binary { op, left, right, span } => {
                let left_ty = self.check_expr(left);
                let right_ty = self.check_expr(right);
                self.binary_type(*op, &left_ty, &right_ty, *span)
            }
            Expression::Assign { op, target, value, span } => self.check_assign(*op, target, value, *span),
        }
    }

    fn find(&self, class: &str, name: &str) -> Option<FoundMember<'c>> {
        let env: &'c TypeEnv = self.env;
        env.find_member(class, name)
    }

    fn lookup_local(&self, name: &str) -> Option<&Ty> {
        self.scopes.iter().rev().find_map(|scope| scope.get(name))
    }

    fn check_accessible(&mut self, found: &FoundMember<'_>, name: &str, visibility: Visibility, span: Span) -> bool {
        let owner = found.owner_name();
        let accessible = match visibility {
            Visibility::Public => true,
            Visibility::Internal => matches!(self.env.entry(&owner).map(|e| &e.origin), Some(Origin::Unit)),
            Visibility::Private => owner == self.class_name,
            Visibility::Protected => self.env.is_subtype(&self.class_name, &owner),
        };
        if !accessible {
            self.report.error(
                "TF0122",
                format!("'{}.{}' is inaccessible due to its protection level", owner, name),
                span,
            );
        }
        accessible
    }

    fn member_visibility(kind: &MemberKind<'_>) -> Visibility {
        match kind {
            MemberKind::Field(f) => f.visibility,
            MemberKind::Property(p) => p.visibility,
            MemberKind::Method(m) => m.visibility,
        }
    }

    /// Find a member of the current class (implicit `this`).
    fn own_member(&mut self, name: &str, span: Span) -> Option<FoundMember<'c>> {
        let found = self.find(&self.class_name, name)?;
        if self.kind == BodyKind::FieldInitializer {
            self.report.error(
                "TF0236",
                format!("A field initializer cannot reference the non-static field, method, or property '{}.{}'", found.owner_name(), name),
                span,
            );
            return None;
        }
        let visibility = Self::member_visibility(&found.kind);
        self.check_accessible(&found, name, visibility, span);
        Some(found)
    }

    fn check_name(&mut self, name: &str, span: Span) -> Ty {
        if let Some(ty) = self.lookup_local(name) {
            return ty.clone();
        }
        if self.find(&self.class_name, name).is_none() {
            self.report.error("TF0103", format!("The name '{}' does not exist in the current context", name), span);
            return Ty::Unknown;
        }
        match self.own_member(name, span).map(|f| f.kind) {
            Some(MemberKind::Field(field)) => Ty::Known(field.ty.clone()),
            Some(MemberKind::Property(property)) => Ty::Known(property.ty.clone()),
            Some(MemberKind::Method(_)) => {
                self.report.error(
                    "TF0428",
                    format!("Cannot convert method group '{}' to non-delegate type", name),
                    span,
                );
                Ty::Unknown
            }
            None => Ty::Unknown,
        }
    }

    fn class_of(ty: &TypeSig) -> Option<&str> {
        match ty {
            TypeSig::Class(name) => Some(name),
            TypeSig::Object => Some(OBJECT_TYPE),
            _ => None,
        }
    }

    /// Type of `object.name` used as a value.
    fn member_type(&mut self, object: &Ty, name: &str, span: Span) -> Ty {
        let ty = match object {
            Ty::Unknown => return Ty::Unknown,
            Ty::Null => {
                self.report.error("TF0023", "Operator '.' cannot be applied to operand of type '<null>'", span);
                return Ty::Unknown;
            }
            Ty::Known(ty) => ty,
        };

        if *ty == TypeSig::String && name == "Length" {
            return Ty::Known(TypeSig::Int);
        }

        let found = Self::class_of(ty).and_then(|class| self.find(class, name));
        match found {
            Some(found) => {
                let visibility = Self::member_visibility(&found.kind);
                if !self.check_accessible(&found, name, visibility, span) {
                    return Ty::Unknown;
                }
                match found.kind {
                    MemberKind::Field(field) => Ty::Known(field.ty.clone()),
                    MemberKind::Property(property) => Ty::Known(property.ty.clone()),
                    MemberKind::Method(_) => {
                        self.report.error(
                            "TF0428",
                            format!("Cannot convert method group '{}' to non-delegate type", name),
                            span,
                        );
                        Ty::Unknown
                    }
                }
            }
            None => {
                let is_method = match ty {
                    TypeSig::String => string_method(name).is_some(),
                    _ => universal_method(name).is_some(),
                };
                if is_method {
                    self.report.error(
                        "TF0428",
                        format!("Cannot convert method group '{}' to non-delegate type", name),
                        span,
                    );
                } else {
                    self.report.error(
                        "TF1061",
                        format!("'{}' does not contain a definition for '{}'", ty, name),
                        span,
                    );
                }
                Ty::Unknown
            }
        }
    }

    fn callable_from(found: &FoundMember<'_>, method: &MethodDef) -> Callable {
        Callable {
            display: format!("{}.{}", found.owner_name(), method.name),
            params: method.params.iter().map(|p| p.ty.clone()).collect(),
            return_type: method.return_type.clone(),
        }
    }

    fn resolve_callee(&mut self, callee: &Expression) -> Option<Callable> {
        match callee {
            Expression::Name { name, span } => {
                if self.lookup_local(name).is_some() {
                    self.report.error("TF0149", "Method name expected", *span);
                    return None;
                }
                if self.find(&self.class_name, name).is_none() {
                    self.report.error("TF0103", format!("The name '{}' does not exist in the current context", name), *span);
                    return None;
                }
                let found = self.own_member(name, *span)?;
                match found.kind {
                    MemberKind::Method(method) => Some(Self::callable_from(&found, method)),
                    _ => {
                        self.report.error(
                            "TF1955",
                            format!("Non-invocable member '{}' cannot be used like a method", name),
                            *span,
                        );
                        None
                    }
                }
            }
            Expression::Member { object, name, span } => {
                let object_ty = self.check_expr(object);
                let ty = match object_ty {
                    Ty::Unknown => return None,
                    Ty::Null => {
                        self.report.error("TF0023", "Operator '.' cannot be applied to operand of type '<null>'", *span);
                        return None;
                    }
                    Ty::Known(ty) => ty,
                };

                if let Some(found) = Self::class_of(&ty).and_then(|class| self.find(class, name)) {
                    let visibility = Self::member_visibility(&found.kind);
                    if !self.check_accessible(&found, name, visibility, *span) {
                        return None;
                    }
                    return match found.kind {
                        MemberKind::Method(method) => Some(Self::callable_from(&found, method)),
                        _ => {
                            self.report.error(
                                "TF1955",
                                format!("Non-invocable member '{}' cannot be used like a method", name),
                                *span,
                            );
                            None
                        }
                    };
                }

                let intrinsic = match ty {
                    TypeSig::String => string_method(name),
                    _ => universal_method(name),
                };
                match intrinsic {
                    Some((params, return_type)) => Some(Callable {
                        display: format!("{}.{}", ty, name),
                        params,
                        return_type,
                    }),
                    None if ty == TypeSig::String && name == "Length" => {
                        self.report.error(
                            "TF1955",
                            "Non-invocable member 'string.Length' cannot be used like a method",
                            *span,
                        );
                        None
                    }
                    None => {
                        self.report.error(
                            "TF1061",
                            format!("'{}' does not contain a definition for '{}'", ty, name),
                            *span,
                        );
                        None
                    }
                }
            }
            other => {
                self.check_expr(other);
                self.report.error("TF0149", "Method name expected", other.span());
                None
            }
        }
    }

    fn check_call(&mut self, callee: &Expression, args: &[Expression], span: Span) -> Ty {
        let callable = self.resolve_callee(callee);
        let arg_types: Vec<(Ty, Span)> = args.iter().map(|a| (self.check_expr(a), a.span())).collect();
        let Some(callable) = callable else {
            return Ty::Unknown;
        };

        if callable.params.len() != arg_types.len() {
            self.report.error(
                "TF1501",
                format!("No overload for method '{}' takes {} arguments", callable.display, arg_types.len()),
                span,
            );
        } else {
            for (index, ((arg, arg_span), param)) in arg_types.iter().zip(&callable.params).enumerate() {
                if !self.convertible(arg, &Ty::Known(param.clone())) {
                    self.report.error(
                        "TF1503",
                        format!("Argument {}: cannot convert from '{}' to '{}'", index + 1, arg.display(), param),
                        *arg_span,
                    );
                }
            }
        }
        Ty::Known(callable.return_type)
    }

    /// Validate an assignment target and return its type.
    fn check_target(&mut self, target: &Expression) -> Ty {
        match target {
            Expression::Name { name, span } => {
                if let Some(ty) = self.lookup_local(name) {
                    return ty.clone();
                }
                if self.find(&self.class_name, name).is_none() {
                    self.report.error("TF0103", format!("The name '{}' does not exist in the current context", name), *span);
                    return Ty::Unknown;
                }
                match self.own_member(name, *span) {
                    Some(found) => self.writable_member_type(&found, name, true, *span),
                    None => Ty::Unknown,
                }
            }
            Expression::Member { object, name, span } => {
                let through_this = matches!(**object, Expression::This { .. });
                let object_ty = self.check_expr(object);
                let ty = match &object_ty {
                    Ty::Known(ty) => ty.clone(),
                    Ty::Unknown => return Ty::Unknown,
                    Ty::Null => {
                        self.report.error("TF0023", "Operator '.' cannot be applied to operand of type '<null>'", *span);
                        return Ty::Unknown;
                    }
                };
                if ty == TypeSig::String && name == "Length" {
                    self.report.error(
                        "TF0200",
                        "Property or indexer 'string.Length' cannot be assigned to -- it is read only",
                        *span,
                    );
                    return Ty::Unknown;
                }
                match Self::class_of(&ty).and_then(|class| self.find(class, name)) {
                    Some(found) => {
                        let visibility = Self::member_visibility(&found.kind);
                        if !self.check_accessible(&found, name, visibility, *span) {
                            return Ty::Unknown;
                        }
                        self.writable_member_type(&found, name, through_this, *span)
                    }
                    None => {
                        self.report.error(
                            "TF1061",
                            format!("'{}' does not contain a definition for '{}'", ty, name),
                            *span,
                        );
                        Ty::Unknown
                    }
                }
            }
            other => {
                self.check_expr(other);
                self.report.error(
                    "TF0131",
                    "The left-hand side of an assignment must be a variable, property or indexer",
                    other.span(),
                );
                Ty::Unknown
            }
        }
    }

    fn writable_member_type(&mut self, found: &FoundMember<'_>, name: &str, through_this: bool, span: Span) -> Ty {
        let in_own_constructor =
            self.kind == BodyKind::Constructor && through_this && found.owner_name() == self.class_name;
        match found.kind {
            MemberKind::Field(field) => {
                if field.is_readonly && !in_own_constructor {
                    self.report.error(
                        "TF0191",
                        format!(
                            "A readonly field '{}.{}' cannot be assigned to (except in a constructor or a variable initializer)",
                            found.owner_name(),
                            name
                        ),
                        span,
                    );
                }
                Ty::Known(field.ty.clone())
            }
            MemberKind::Property(property) => {
                if !property.has_set && !in_own_constructor {
                    self.report.error(
                        "TF0200",
                        format!(
                            "Property or indexer '{}.{}' cannot be assigned to -- it is read only",
                            found.owner_name(),
                            name
                        ),
                        span,
                    );
                }
                Ty::Known(property.ty.clone())
            }
            MemberKind::Method(_) => {
                self.report.error(
                    "TF0131",
                    "The left-hand side of an assignment must be a variable, property or indexer",
                    span,
                );
                Ty::Unknown
            }
        }
    }

    fn check_assign(&mut self, op: AssignOp, target: &Expression, value: &Expression, span: Span) -> Ty {
        let target_ty = self.check_target(target);
        let value_ty = self.check_expr(value);
        let stored = match op {
            AssignOp::Assign => value_ty,
            AssignOp::AddAssign => self.binary_type(BinaryOp::Add, &target_ty, &value_ty, span),
            AssignOp::SubtractAssign => self.binary_type(BinaryOp::Subtract, &target_ty, &value_ty, span),
        };
        self.require_convertible(&stored, &target_ty, value.span());
        target_ty
    }

    fn binary_type(&mut self, op: BinaryOp, left: &Ty, right: &Ty, span: Span) -> Ty {
        let comparison = matches!(
            op,
            BinaryOp::Less
                | BinaryOp::LessEqual
                | BinaryOp::Greater
                | BinaryOp::GreaterEqual
                | BinaryOp::Equal
                | BinaryOp::NotEqual
                | BinaryOp::And
                | BinaryOp::Or
        );
        if *left == Ty::Unknown || *right == Ty::Unknown {
            return if comparison { Ty::Known(TypeSig::Bool) } else { Ty::Unknown };
        }

        let wider = match (left.numeric_rank(), right.numeric_rank()) {
            (Some(a), Some(b)) => match a.max(b) {
                0 => Some(TypeSig::Int),
                1 => Some(TypeSig::Long),
                _ => Some(TypeSig::Double),
            },
            _ => None,
        };

        let result = match op {
            BinaryOp::Add if left.is(&TypeSig::String) || right.is(&TypeSig::String) => {
                Some(TypeSig::String)
            }
            BinaryOp::Add
            | BinaryOp::Subtract
            | BinaryOp::Multiply
            | BinaryOp::Divide
            | BinaryOp::Remainder => wider,
            BinaryOp::Less | BinaryOp::LessEqual | BinaryOp::Greater | BinaryOp::GreaterEqual => {
                wider.map(|_| TypeSig::Bool)
            }
            BinaryOp::Equal | BinaryOp::NotEqual => {
                let comparable = wider.is_some()
                    || self.convertible(left, right)
                    || self.convertible(right, left);
                comparable.then_some(TypeSig::Bool)
            }
            BinaryOp::And | BinaryOp::Or => {
                (left.is(&TypeSig::Bool) && right.is(&TypeSig::Bool)).then_some(TypeSig::Bool)
            }
        };

        match result {
            Some(ty) => Ty::Known(ty),
            None => {
                self.report.error(
                    "TF0019",
                    format!(
                        "Operator '{}' cannot be applied to operands of type '{}' and '{}'",
                        op,
                        left.display(),
                        right.display()
                    ),
                    span,
                );
                if comparison {
                    Ty::Known(TypeSig::Bool)
                } else {
                    Ty::Unknown
                }
            }
        }
    }

    fn convertible(&self, from: &Ty, to: &Ty) -> bool {
        match (from, to) {
            (Ty::Unknown, _) | (_, Ty::Unknown) => true,
            (Ty::Null, Ty::Null) => true,
            (Ty::Null, Ty::Known(to)) => !to.is_value_type() && *to != TypeSig::Void,
            (Ty::Known(_), Ty::Null) => false,
            (Ty::Known(TypeSig::Void), Ty::Known(_)) => false,
            (Ty::Known(from), Ty::Known(to)) => self.env.is_convertible(from, to),
        }
    }

    fn require_convertible(&mut self, from: &Ty, to: &Ty, span: Span) {
        if self.convertible(from, to) {
            return;
        }
        match (from, to) {
            (Ty::Null, Ty::Known(to)) => self.report.error(
                "TF0037",
                format!("Cannot convert null to '{}' because it is a non-nullable value type", to),
                span,
            ),
            _ => self.report.error(
                "TF0029",
                format!("Cannot implicitly convert type '{}' to '{}'", from.display(), to.display()),
                span,
            ),
        }
    }
}

fn literal_type(value: &Literal) -> Ty {
    match value {
        Literal::Null => Ty::Null,
        Literal::Bool(_) => Ty::Known(TypeSig::Bool),
        Literal::Int(v) if i32::try_from(*v).is_ok() => Ty::Known(TypeSig::Int),
        Literal::Int(_) => Ty::Known(TypeSig::Long),
        Literal::Float(_) => Ty::Known(TypeSig::Double),
        Literal::String(_) => Ty::Known(TypeSig::String),
    }
}

/// Whether `statement` contains a `break` that exits the innermost enclosing loop.
fn contains_break(statement: &Statement) -> bool {
    match statement {
        Statement::Break(_) => true,
        Statement::Block(block) => block.statements.iter().any(contains_break),
        Statement::If(stmt) => {
            contains_break(&stmt.then_branch) || stmt.else_branch.as_deref().is_some_and(contains_break)
        }
        _ => false,
    }
}
