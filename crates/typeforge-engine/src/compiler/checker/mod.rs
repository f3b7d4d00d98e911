//! Semantic checker for forge script.
//!
//! Works in four passes over a parsed [`CompilationUnit`]:
//! 1. register every declared class name (so declarations may refer to each other)
//! 2. lower declarations into [`ClassDef`]s with resolved signatures
//! 3. hierarchy checks (bases, interfaces, overrides, hiding)
//! 4. member bodies and field initializers
//!
//! All problems are reported as diagnostics; checking never stops early.

mod body;
mod env;

pub use env::{ClassEntry, FoundMember, MemberKind, Origin, TypeEnv};

use crate::compiler::diagnostic::Diagnostic;
use crate::compiler::metadata::{
    qualify, ClassDef, ClassKind, FieldDef, MethodDef, ParamDef, PropertyDef, TypeSig, OBJECT_TYPE,
};
use crate::compiler::module::Dependency;
use crate::compiler::references::MetadataReference;
use crate::parser::ast::*;
use crate::parser::token::Span;
use rustc_hash::FxHashSet;

/// Name under which constructors are stored.
pub const CONSTRUCTOR_NAME: &str = ".ctor";

/// Collected diagnostics.
#[derive(Debug, Default)]
pub(crate) struct Report {
    pub diagnostics: Vec<Diagnostic>,
}

impl Report {
    pub fn error(&mut self, id: &str, message: impl Into<String>, span: Span) {
        self.diagnostics.push(Diagnostic::error(id, message, span));
    }

    pub fn warning(&mut self, id: &str, message: impl Into<String>, span: Span) {
        self.diagnostics.push(Diagnostic::warning(id, message, span));
    }
}

/// Namespace and `using` directives in effect for a class.
#[derive(Debug, Clone, Default)]
pub(crate) struct NsContext {
    pub namespace: String,
    pub usings: Vec<String>,
}

/// Result of checking a compilation unit.
#[derive(Debug, Default)]
pub struct CheckOutput {
    /// Lowered classes, in declaration order
    pub classes: Vec<ClassDef>,
    /// Namespaces declared by the unit
    pub namespaces: Vec<String>,
    /// Non-core references whose types the unit's signatures use
    pub dependencies: Vec<Dependency>,
    pub diagnostics: Vec<Diagnostic>,
}

struct UnitClass<'a> {
    qualified: String,
    decl: &'a ClassDecl,
    ctx: NsContext,
}

pub struct Checker<'a> {
    unit: &'a CompilationUnit,
    env: TypeEnv,
    report: Report,
}

enum Lookup {
    Found(String),
    Ambiguous(String, String),
    Missing,
}

fn lookup_class(env: &TypeEnv, name: &str, ctx: &NsContext) -> Lookup {
    let mut prefix = ctx.namespace.as_str();
    while !prefix.is_empty() {
        let candidate = qualify(prefix, name);
        if env.contains(&candidate) {
            return Lookup::Found(candidate);
        }
        prefix = match prefix.rfind('.') {
            Some(index) => &prefix[..index],
            None => "",
        };
    }

    let mut matches: Vec<String> = Vec::new();
    for using in &ctx.usings {
        let candidate = qualify(using, name);
        if env.contains(&candidate) && !matches.contains(&candidate) {
            matches.push(candidate);
        }
    }
    match matches.len() {
        0 if env.contains(name) => Lookup::Found(name.to_string()),
        0 => Lookup::Missing,
        1 => Lookup::Found(matches.remove(0)),
        _ => Lookup::Ambiguous(matches.remove(0), matches.remove(0)),
    }
}

/// Resolve a written type against the environment, reporting failures.
pub(crate) fn resolve_type(
    env: &TypeEnv,
    report: &mut Report,
    annotation: &TypeAnnotation,
    ctx: &NsContext,
) -> Option<TypeSig> {
    let name = match &annotation.name {
        TypeName::Void => return Some(TypeSig::Void),
        TypeName::Bool => return Some(TypeSig::Bool),
        TypeName::Int => return Some(TypeSig::Int),
        TypeName::Long => return Some(TypeSig::Long),
        TypeName::Double => return Some(TypeSig::Double),
        TypeName::String => return Some(TypeSig::String),
        TypeName::Object => return Some(TypeSig::Object),
        TypeName::Named(name) => name,
    };

    match lookup_class(env, name, ctx) {
        Lookup::Found(qualified) if qualified == OBJECT_TYPE => Some(TypeSig::Object),
        Lookup::Found(qualified) => Some(TypeSig::Class(qualified)),
        Lookup::Ambiguous(a, b) => {
            report.error(
                "TF0104",
                format!("'{}' is an ambiguous reference between '{}' and '{}'", name, a, b),
                annotation.span,
            );
            None
        }
        Lookup::Missing => {
            report.error(
                "TF0246",
                format!(
                    "The type or namespace name '{}' could not be found (are you missing a using directive or an assembly reference?)",
                    name
                ),
                annotation.span,
            );
            None
        }
    }
}

impl<'a> Checker<'a> {
    pub fn new(unit: &'a CompilationUnit, references: &[MetadataReference]) -> Self {
        let mut env = TypeEnv::new();
        for reference in references {
            for namespace in &reference.image.namespaces {
                env.add_namespace(namespace);
            }
            for class in &reference.image.classes {
                env.add_class(
                    class.clone(),
                    Origin::Reference {
                        location: reference.location.clone(),
                        module: reference.image.name.clone(),
                        core: reference.is_core(),
                    },
                );
            }
        }
        Self {
            unit,
            env,
            report: Report::default(),
        }
    }

    /// Run every pass and return the lowered classes with all diagnostics.
    pub fn check(mut self) -> CheckOutput {
        let unit = self.unit;
        let mut namespaces = Vec::new();
        for namespace in &unit.namespaces {
            self.env.add_namespace(&namespace.name);
            if !namespaces.contains(&namespace.name) {
                namespaces.push(namespace.name.clone());
            }
        }

        self.check_usings();
        let classes = self.register_classes();
        for class in &classes {
            let def = self.lower_class(class);
            self.env.replace_class(def);
        }
        for class in &classes {
            self.check_hierarchy(class);
        }
        for class in &classes {
            self.check_bodies(class);
        }

        let dependencies = self.collect_dependencies(&classes);
        let lowered = classes
            .iter()
            .filter_map(|c| self.env.class(&c.qualified).cloned())
            .collect();

        CheckOutput {
            classes: lowered,
            namespaces,
            dependencies,
            diagnostics: self.report.diagnostics,
        }
    }

    fn check_usings(&mut self) {
        let mut seen = FxHashSet::default();
        let all = self
            .unit
            .usings
            .iter()
            .chain(self.unit.namespaces.iter().flat_map(|ns| ns.usings.iter()));
        for using in all {
            if !seen.insert((using.span.start, using.span.end)) {
                continue;
            }
            if !self.env.has_namespace(&using.name) {
                self.report.error(
                    "TF0246",
                    format!(
                        "The type or namespace name '{}' could not be found (are you missing a using directive or an assembly reference?)",
                        using.name
                    ),
                    using.span,
                );
            }
        }
    }

    /// Pass 1: make every declared class name resolvable.
    fn register_classes(&mut self) -> Vec<UnitClass<'a>> {
        let unit = self.unit;
        let global_ctx = NsContext {
            namespace: String::new(),
            usings: unit.usings.iter().map(|u| u.name.clone()).collect(),
        };
        let mut pending: Vec<(&'a ClassDecl, NsContext)> =
            unit.classes.iter().map(|c| (c, global_ctx.clone())).collect();
        for namespace in &unit.namespaces {
            let ctx = NsContext {
                namespace: namespace.name.clone(),
                usings: namespace.usings.iter().map(|u| u.name.clone()).collect(),
            };
            pending.extend(namespace.classes.iter().map(|c| (c, ctx.clone())));
        }

        let mut registered = Vec::new();
        for (decl, ctx) in pending {
            let placeholder = ClassDef {
                kind: ClassKind::Class,
                namespace: ctx.namespace.clone(),
                name: decl.name.clone(),
                visibility: decl.modifiers.visibility_or(Visibility::Internal),
                is_sealed: decl.modifiers.is_sealed,
                is_abstract: decl.modifiers.is_abstract,
                base: None,
                interfaces: Vec::new(),
                fields: Vec::new(),
                properties: Vec::new(),
                constructor: None,
                methods: Vec::new(),
                member_order: Vec::new(),
            };
            let qualified = placeholder.qualified_name();
            if self.env.add_class(placeholder, Origin::Unit) {
                registered.push(UnitClass {
                    qualified,
                    decl,
                    ctx,
                });
            } else {
                let place = if ctx.namespace.is_empty() {
                    "<global namespace>".to_string()
                } else {
                    ctx.namespace.clone()
                };
                self.report.error(
                    "TF0101",
                    format!("The namespace '{}' already contains a definition for '{}'", place, decl.name),
                    decl.span,
                );
            }
        }
        registered
    }

    fn resolve(&mut self, annotation: &TypeAnnotation, ctx: &NsContext) -> Option<TypeSig> {
        resolve_type(&self.env, &mut self.report, annotation, ctx)
    }

    fn invalid_modifier(&mut self, modifier: &str, span: Span) {
        self.report.error(
            "TF0106",
            format!("The modifier '{}' is not valid for this item", modifier),
            span,
        );
    }

    fn check_member_modifiers(&mut self, modifiers: &Modifiers, allow_virtual: bool, allow_readonly: bool) {
        let checks = [
            (modifiers.is_static, "static"),
            (modifiers.is_sealed, "sealed"),
            (modifiers.is_abstract, "abstract"),
            (modifiers.is_virtual && !allow_virtual, "virtual"),
            (modifiers.is_override && !allow_virtual, "override"),
            (modifiers.is_readonly && !allow_readonly, "readonly"),
        ];
        for (present, name) in checks {
            if present {
                self.invalid_modifier(name, modifiers.span);
            }
        }
    }

    fn resolve_params(&mut self, params: &[Parameter], ctx: &NsContext) -> Vec<ParamDef> {
        let mut seen = FxHashSet::default();
        let mut result = Vec::new();
        for param in params {
            if !seen.insert(param.name.as_str()) {
                self.report.error(
                    "TF0100",
                    format!("The parameter name '{}' is a duplicate", param.name),
                    param.span,
                );
            }
            let ty = match self.resolve(&param.ty, ctx) {
                Some(TypeSig::Void) => {
                    self.report.error("TF1536", "Invalid parameter type 'void'", param.ty.span);
                    TypeSig::Object
                }
                Some(ty) => ty,
                None => TypeSig::Object,
            };
            result.push(ParamDef {
                name: param.name.clone(),
                ty,
            });
        }
        result
    }

    fn resolve_value_type(&mut self, annotation: &TypeAnnotation, ctx: &NsContext, what: &str) -> TypeSig {
        match self.resolve(annotation, ctx) {
            Some(TypeSig::Void) => {
                self.report.error("TF0670", format!("{} cannot have void type", what), annotation.span);
                TypeSig::Object
            }
            Some(ty) => ty,
            None => TypeSig::Object,
        }
    }

    /// Pass 2: resolve a class declaration into its compiled form.
    fn lower_class(&mut self, class: &UnitClass<'a>) -> ClassDef {
        let decl = class.decl;
        let ctx = &class.ctx;

        let class_modifiers = [
            (decl.modifiers.is_static, "static"),
            (decl.modifiers.is_readonly, "readonly"),
            (decl.modifiers.is_virtual, "virtual"),
            (decl.modifiers.is_override, "override"),
        ];
        for (present, name) in class_modifiers {
            if present {
                self.invalid_modifier(name, decl.modifiers.span);
            }
        }
        if decl.modifiers.is_abstract && decl.modifiers.is_sealed {
            self.report.error(
                "TF0418",
                format!("'{}': an abstract class cannot be sealed", class.qualified),
                decl.span,
            );
        }

        let (base, interfaces) = self.lower_bases(class);

        let mut def = ClassDef {
            kind: ClassKind::Class,
            namespace: ctx.namespace.clone(),
            name: decl.name.clone(),
            visibility: decl.modifiers.visibility_or(Visibility::Internal),
            is_sealed: decl.modifiers.is_sealed,
            is_abstract: decl.modifiers.is_abstract,
            base,
            interfaces,
            fields: Vec::new(),
            properties: Vec::new(),
            constructor: None,
            methods: Vec::new(),
            member_order: Vec::new(),
        };

        let mut seen: FxHashSet<String> = FxHashSet::default();
        for member in &decl.members {
            if let MemberDecl::Constructor(ctor) = member {
                self.lower_constructor(&mut def, ctor, ctx);
                continue;
            }

            let name = member.name().to_string();
            if name == decl.name {
                self.report.error(
                    "TF0542",
                    format!("'{}': member names cannot be the same as their enclosing type", name),
                    member.span(),
                );
                continue;
            }
            if !seen.insert(name.clone()) {
                self.report.error(
                    "TF0102",
                    format!("The type '{}' already contains a definition for '{}'", class.qualified, name),
                    member.span(),
                );
                continue;
            }

            match member {
                MemberDecl::Field(field) => {
                    self.check_member_modifiers(&field.modifiers, false, true);
                    let ty = self.resolve_value_type(&field.ty, ctx, "Field");
                    def.fields.push(FieldDef {
                        name: field.name.clone(),
                        ty,
                        visibility: field.modifiers.visibility_or(Visibility::Private),
                        is_readonly: field.modifiers.is_readonly,
                        initializer: field.initializer.clone(),
                    });
                }
                MemberDecl::Property(property) => {
                    self.check_member_modifiers(&property.modifiers, false, false);
                    if !property.has_get {
                        self.report.error(
                            "TF8051",
                            format!("Auto-implemented property '{}.{}' must have a get accessor", class.qualified, property.name),
                            property.span,
                        );
                    }
                    let ty = self.resolve_value_type(&property.ty, ctx, "Property");
                    def.properties.push(PropertyDef {
                        name: property.name.clone(),
                        ty,
                        visibility: property.modifiers.visibility_or(Visibility::Private),
                        has_get: property.has_get,
                        has_set: property.has_set,
                    });
                }
                MemberDecl::Method(method) => {
                    self.check_member_modifiers(&method.modifiers, true, false);
                    if method.modifiers.is_virtual && method.modifiers.is_override {
                        self.report.error(
                            "TF0113",
                            format!("A member '{}.{}' marked as override cannot be marked as new or virtual", class.qualified, method.name),
                            method.modifiers.span,
                        );
                    }
                    let params = self.resolve_params(&method.params, ctx);
                    let return_type = match &method.return_type {
                        Some(annotation) => self.resolve(annotation, ctx).unwrap_or(TypeSig::Object),
                        None => TypeSig::Void,
                    };
                    def.methods.push(MethodDef {
                        name: method.name.clone(),
                        visibility: method.modifiers.visibility_or(Visibility::Private),
                        params,
                        return_type,
                        is_virtual: method.modifiers.is_virtual,
                        is_override: method.modifiers.is_override,
                        body: Some(method.body.clone()),
                    });
                }
                MemberDecl::Constructor(_) => {}
            }
            def.member_order.push(name);
        }

        def
    }

    fn lower_constructor(&mut self, def: &mut ClassDef, ctor: &FunctionDecl, ctx: &NsContext) {
        if ctor.name != def.name {
            self.report.error("TF1520", "Method must have a return type", ctor.span);
            return;
        }
        self.check_member_modifiers(&ctor.modifiers, false, false);
        if ctor.modifiers.is_virtual || ctor.modifiers.is_override {
            self.invalid_modifier(if ctor.modifiers.is_virtual { "virtual" } else { "override" }, ctor.modifiers.span);
        }
        if def.constructor.is_some() {
            self.report.error(
                "TF0111",
                format!("Type '{}' already defines a constructor", def.qualified_name()),
                ctor.span,
            );
            return;
        }
        let params = self.resolve_params(&ctor.params, ctx);
        def.constructor = Some(MethodDef {
            name: CONSTRUCTOR_NAME.to_string(),
            visibility: ctor.modifiers.visibility_or(Visibility::Private),
            params,
            return_type: TypeSig::Void,
            is_virtual: false,
            is_override: false,
            body: Some(ctor.body.clone()),
        });
        def.member_order.push(CONSTRUCTOR_NAME.to_string());
    }

    fn lower_bases(&mut self, class: &UnitClass<'a>) -> (Option<String>, Vec<String>) {
        let mut base: Option<String> = None;
        let mut interfaces: Vec<String> = Vec::new();

        for (index, annotation) in class.decl.bases.iter().enumerate() {
            let Some(ty) = self.resolve(annotation, &class.ctx) else {
                continue;
            };
            let name = match ty {
                TypeSig::Object => OBJECT_TYPE.to_string(),
                TypeSig::Class(name) => name,
                other => {
                    self.report.error(
                        "TF0509",
                        format!("'{}': cannot derive from sealed type '{}'", class.qualified, other),
                        annotation.span,
                    );
                    continue;
                }
            };
            let is_interface = self.env.class(&name).is_some_and(ClassDef::is_interface);
            if is_interface {
                if interfaces.contains(&name) {
                    self.report.error(
                        "TF0528",
                        format!("'{}' is already listed in interface list", name),
                        annotation.span,
                    );
                } else {
                    interfaces.push(name);
                }
            } else if index == 0 {
                base = Some(name);
            } else if let Some(existing) = &base {
                self.report.error(
                    "TF1721",
                    format!("Class '{}' cannot have multiple base classes: '{}' and '{}'", class.qualified, existing, name),
                    annotation.span,
                );
            } else {
                self.report.error(
                    "TF1721",
                    format!("Base class '{}' must come before any interfaces", name),
                    annotation.span,
                );
            }
        }

        if base.is_none() {
            if !self.env.contains(OBJECT_TYPE) {
                self.report.error(
                    "TF0518",
                    format!("Predefined type '{}' is not defined or imported", OBJECT_TYPE),
                    class.decl.span,
                );
            }
            base = Some(OBJECT_TYPE.to_string());
        }
        (base, interfaces)
    }

    fn member_span(class: &UnitClass<'_>, name: &str) -> Span {
        class
            .decl
            .members
            .iter()
            .find(|m| m.name() == name && !matches!(m, MemberDecl::Constructor(_)))
            .map(MemberDecl::span)
            .unwrap_or(class.decl.span)
    }

    /// Pass 3: inheritance rules.
    fn check_hierarchy(&mut self, class: &UnitClass<'a>) {
        let Some(def) = self.env.class(&class.qualified).cloned() else {
            return;
        };

        if self.env.has_cycle(&class.qualified) {
            self.report.error(
                "TF0146",
                format!(
                    "Circular base type dependency involving '{}' and '{}'",
                    class.qualified,
                    def.base.clone().unwrap_or_default()
                ),
                class.decl.span,
            );
            return;
        }

        if let Some(base) = def.base.as_deref().and_then(|b| self.env.class(b)).cloned() {
            if base.is_sealed {
                self.report.error(
                    "TF0509",
                    format!("'{}': cannot derive from sealed type '{}'", class.qualified, base.qualified_name()),
                    class.decl.span,
                );
            }
            if let Some(param) = base.constructor.as_ref().and_then(|c| c.params.first()) {
                self.report.error(
                    "TF7036",
                    format!(
                        "There is no argument given that corresponds to the required parameter '{}' of '{}'",
                        param.name,
                        base.qualified_name()
                    ),
                    class.decl.span,
                );
            }
        }

        for interface in &def.interfaces {
            let Some(interface_def) = self.env.class(interface).cloned() else {
                continue;
            };
            for required in &interface_def.methods {
                let implemented = match self.env.find_member(&class.qualified, &required.name) {
                    Some(FoundMember {
                        kind: MemberKind::Method(method),
                        ..
                    }) => {
                        method.visibility == Visibility::Public
                            && method.return_type == required.return_type
                            && method.params.iter().map(|p| &p.ty).eq(required.params.iter().map(|p| &p.ty))
                    }
                    _ => false,
                };
                if !implemented {
                    self.report.error(
                        "TF0535",
                        format!(
                            "'{}' does not implement interface member '{}.{}'",
                            class.qualified,
                            interface,
                            required.signature()
                        ),
                        class.decl.span,
                    );
                }
            }
        }

        for method in &def.methods {
            let span = Self::member_span(class, &method.name);
            let inherited = self.env.find_inherited(&class.qualified, &method.name);
            if method.is_override {
                let message = match inherited {
                    Some(FoundMember {
                        kind: MemberKind::Method(base),
                        owner,
                    }) => {
                        if !(base.is_virtual || base.is_override) {
                            Some((
                                "TF0506",
                                format!(
                                    "'{}.{}': cannot override inherited member '{}.{}' because it is not marked virtual, abstract, or override",
                                    class.qualified,
                                    method.signature(),
                                    owner.qualified_name(),
                                    base.signature()
                                ),
                            ))
                        } else if base.return_type != method.return_type
                            || !base.params.iter().map(|p| &p.ty).eq(method.params.iter().map(|p| &p.ty))
                        {
                            Some((
                                "TF0115",
                                format!("'{}.{}': no suitable method found to override", class.qualified, method.signature()),
                            ))
                        } else {
                            None
                        }
                    }
                    _ => Some((
                        "TF0115",
                        format!("'{}.{}': no suitable method found to override", class.qualified, method.signature()),
                    )),
                };
                if let Some((id, message)) = message {
                    self.report.error(id, message, span);
                }
            } else if let Some(found) = inherited {
                let owner = found.owner_name();
                self.report.warning(
                    "TF0108",
                    format!(
                        "'{}.{}' hides inherited member '{}.{}'. Use the new keyword if hiding was intended.",
                        class.qualified, method.name, owner, method.name
                    ),
                    span,
                );
            }
        }

        let data_members = def
            .fields
            .iter()
            .map(|f| f.name.as_str())
            .chain(def.properties.iter().map(|p| p.name.as_str()));
        for name in data_members {
            if let Some(found) = self.env.find_inherited(&class.qualified, name) {
                let owner = found.owner_name();
                self.report.warning(
                    "TF0108",
                    format!(
                        "'{}.{}' hides inherited member '{}.{}'. Use the new keyword if hiding was intended.",
                        class.qualified, name, owner, name
                    ),
                    Self::member_span(class, name),
                );
            }
        }
    }

    /// Pass 4: member bodies.
    fn check_bodies(&mut self, class: &UnitClass<'a>) {
        let Some(def) = self.env.class(&class.qualified).cloned() else {
            return;
        };
        let mut checker = body::BodyChecker::new(&self.env, &mut self.report, &class.ctx, &def);
        let mut checked_methods: FxHashSet<&str> = FxHashSet::default();
        let mut checked_constructor = false;

        for member in &class.decl.members {
            match member {
                MemberDecl::Field(field) => {
                    if let (Some(initializer), Some(lowered)) = (&field.initializer, def.field(&field.name)) {
                        checker.check_field_initializer(initializer, &lowered.ty);
                    }
                }
                MemberDecl::Method(method) => {
                    if !checked_methods.insert(method.name.as_str()) {
                        continue;
                    }
                    if let Some(lowered) = def.method(&method.name) {
                        checker.check_method(method, lowered);
                    }
                }
                MemberDecl::Constructor(ctor) => {
                    if checked_constructor || ctor.name != def.name {
                        continue;
                    }
                    checked_constructor = true;
                    if let Some(lowered) = &def.constructor {
                        checker.check_constructor(ctor, lowered);
                    }
                }
                MemberDecl::Property(_) => {}
            }
        }
    }

    fn collect_dependencies(&self, classes: &[UnitClass<'a>]) -> Vec<Dependency> {
        fn add(names: &mut Vec<String>, name: &str) {
            if !names.iter().any(|n| n == name) {
                names.push(name.to_string());
            }
        }
        fn add_sig(names: &mut Vec<String>, ty: &TypeSig) {
            if let TypeSig::Class(name) = ty {
                add(names, name);
            }
        }

        let mut names: Vec<String> = Vec::new();
        for class in classes {
            for def in self.env.hierarchy(&class.qualified) {
                add(&mut names, &def.qualified_name());
                for interface in &def.interfaces {
                    add(&mut names, interface);
                }
            }
            let Some(def) = self.env.class(&class.qualified) else {
                continue;
            };
            for field in &def.fields {
                add_sig(&mut names, &field.ty);
            }
            for property in &def.properties {
                add_sig(&mut names, &property.ty);
            }
            for method in def.methods.iter().chain(def.constructor.iter()) {
                add_sig(&mut names, &method.return_type);
                for param in &method.params {
                    add_sig(&mut names, &param.ty);
                }
            }
        }

        let mut dependencies: Vec<Dependency> = Vec::new();
        for name in &names {
            if let Some(ClassEntry {
                origin:
                    Origin::Reference {
                        location,
                        module,
                        core: false,
                    },
                ..
            }) = self.env.entry(name)
            {
                if !dependencies.iter().any(|d| &d.location == location) {
                    dependencies.push(Dependency {
                        name: module.clone(),
                        location: location.clone(),
                    });
                }
            }
        }
        dependencies
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::compiler::core_lib::CORE_LOCATIONS;
    use crate::parser::Parser;

    /// Parse and check `source` against the core references.
    pub(crate) fn check_source(source: &str) -> CheckOutput {
        let (unit, errors) = Parser::new(source).parse();
        assert!(errors.is_empty(), "unexpected parse errors: {:?}", errors);
        let references: Vec<MetadataReference> = CORE_LOCATIONS
            .iter()
            .map(|location| MetadataReference::from_location(location).unwrap())
            .collect();
        Checker::new(&unit, &references).check()
    }

    pub(crate) fn codes(output: &CheckOutput) -> Vec<String> {
        output.diagnostics.iter().map(|d| d.id.clone()).collect()
    }

    fn assert_clean(source: &str) -> CheckOutput {
        let output = check_source(source);
        assert!(output.diagnostics.is_empty(), "unexpected diagnostics: {:?}", output.diagnostics);
        output
    }

    #[test]
    fn test_simple_class_lowers() {
        let output = assert_clean(
            "using System;\nnamespace Demo { public class Point { public int X { get; set; } public int Y { get; set; } } }",
        );
        assert_eq!(output.namespaces, vec!["Demo".to_string()]);
        let point = &output.classes[0];
        assert_eq!(point.qualified_name(), "Demo.Point");
        assert_eq!(point.base.as_deref(), Some(OBJECT_TYPE));
        assert_eq!(point.member_order, vec!["X".to_string(), "Y".to_string()]);
    }

    #[test]
    fn test_without_core_reference_object_is_missing() {
        let (unit, _) = Parser::new("public class A { }").parse();
        let output = Checker::new(&unit, &[]).check();
        assert!(codes(&output).contains(&"TF0518".to_string()));
    }

    #[test]
    fn test_unknown_using_is_reported() {
        let output = check_source("using Nope.Nothing;\npublic class A { }");
        assert!(codes(&output).contains(&"TF0246".to_string()));
    }

    #[test]
    fn test_duplicate_class_and_member() {
        let output = check_source("class A { int x; string x; }\nclass A { }");
        let codes = codes(&output);
        assert!(codes.contains(&"TF0101".to_string()));
        assert!(codes.contains(&"TF0102".to_string()));
    }

    #[test]
    fn test_member_named_like_class() {
        let output = check_source("class A { int A; }");
        assert!(codes(&output).contains(&"TF0542".to_string()));
    }

    #[test]
    fn test_sealed_base_is_rejected() {
        let output = check_source("sealed class A { }\nclass B : A { }");
        assert!(codes(&output).contains(&"TF0509".to_string()));
    }

    #[test]
    fn test_inheritance_cycle() {
        let output = check_source("class A : B { }\nclass B : A { }");
        assert!(codes(&output).contains(&"TF0146".to_string()));
    }

    #[test]
    fn test_interface_implementation_required() {
        let output = check_source("using System;\nclass Res : IDisposable { }");
        assert!(codes(&output).contains(&"TF0535".to_string()));

        assert_clean("using System;\nclass Res : IDisposable { public void Dispose() { } }");
    }

    #[test]
    fn test_override_rules() {
        assert_clean(
            "class A { public virtual int F() { return 1; } }\nclass B : A { public override int F() { return 2; } }",
        );
        let output = check_source("class A { public int F() { return 1; } }\nclass B : A { public override int F() { return 2; } }");
        assert!(codes(&output).contains(&"TF0506".to_string()));

        let output = check_source("class A { public override string Nothing() { return \"\"; } }");
        assert!(codes(&output).contains(&"TF0115".to_string()));
    }

    #[test]
    fn test_tostring_override_is_allowed() {
        assert_clean("public class A { public override string ToString() { return \"A\"; } }");
    }

    #[test]
    fn test_hiding_is_a_warning() {
        let output = check_source("class A { public int F() { return 1; } }\nclass B : A { public int F() { return 2; } }");
        assert_eq!(codes(&output), vec!["TF0108".to_string()]);
        assert!(!output.diagnostics[0].is_blocking());
    }

    #[test]
    fn test_constructor_rules() {
        let output = check_source("class A { public B() { } }");
        assert!(codes(&output).contains(&"TF1520".to_string()));

        let output = check_source("class A { public A() { } public A(int x) { } }");
        assert!(codes(&output).contains(&"TF0111".to_string()));

        let output = check_source("class A { public A(int x) { } }\nclass B : A { }");
        assert!(codes(&output).contains(&"TF7036".to_string()));

        let output = assert_clean("class A { public A(int x) { } }");
        let ctor = output.classes[0].constructor.as_ref().unwrap();
        assert_eq!(ctor.name, CONSTRUCTOR_NAME);
        assert_eq!(ctor.params.len(), 1);
    }

    #[test]
    fn test_invalid_modifiers() {
        let output = check_source("abstract sealed class A { }");
        assert!(codes(&output).contains(&"TF0418".to_string()));

        let output = check_source("class A { virtual int x; }");
        assert!(codes(&output).contains(&"TF0106".to_string()));
    }

    #[test]
    fn test_void_field_and_getless_property() {
        let output = check_source("class A { void x; int P { set; } }");
        let codes = codes(&output);
        assert!(codes.contains(&"TF0670".to_string()));
        assert!(codes.contains(&"TF8051".to_string()));
    }
}
