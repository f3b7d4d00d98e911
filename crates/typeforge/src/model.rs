//! In-memory description of one generated class
//!
//! A [`TypeModel`] is plain data: it never parses method text and never
//! checks member names against each other. Those problems surface when the
//! rendered source is compiled.

use crate::error::{ForgeError, ForgeResult};
use std::fmt;
use typeforge_engine::parser::{is_identifier, is_qualified_identifier};

pub use typeforge_engine::ast::Visibility;

/// Parse a visibility keyword (`public`, `internal`, `protected`, `private`).
pub fn parse_visibility(text: &str) -> ForgeResult<Visibility> {
    match text.trim() {
        "public" => Ok(Visibility::Public),
        "internal" => Ok(Visibility::Internal),
        "protected" => Ok(Visibility::Protected),
        "private" => Ok(Visibility::Private),
        other => Err(ForgeError::invalid(format!("unknown visibility '{}'", other))),
    }
}

/// Type of a field, property or parameter.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeRef {
    Void,
    Bool,
    Int,
    Long,
    Double,
    String,
    Object,
    /// A class or interface, possibly namespace-qualified
    Named(String),
}

impl TypeRef {
    /// Parse a type name as written in source (`int`, `System.IDisposable`).
    pub fn parse(text: &str) -> ForgeResult<TypeRef> {
        let text = text.trim();
        let ty = match text {
            "void" => TypeRef::Void,
            "bool" => TypeRef::Bool,
            "int" => TypeRef::Int,
            "long" => TypeRef::Long,
            "double" => TypeRef::Double,
            "string" => TypeRef::String,
            "object" => TypeRef::Object,
            "" => return Err(ForgeError::invalid("type name must not be empty")),
            named if is_qualified_identifier(named) => TypeRef::Named(named.to_string()),
            other => return Err(ForgeError::invalid(format!("'{}' is not a valid type name", other))),
        };
        Ok(ty)
    }

    pub fn named(name: impl Into<String>) -> TypeRef {
        TypeRef::Named(name.into())
    }

    fn validate(&self) -> ForgeResult<()> {
        match self {
            TypeRef::Named(name) if name.is_empty() => Err(ForgeError::invalid("type name must not be empty")),
            TypeRef::Named(name) if !is_qualified_identifier(name) => {
                Err(ForgeError::invalid(format!("'{}' is not a valid type name", name)))
            }
            _ => Ok(()),
        }
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeRef::Void => f.write_str("void"),
            TypeRef::Bool => f.write_str("bool"),
            TypeRef::Int => f.write_str("int"),
            TypeRef::Long => f.write_str("long"),
            TypeRef::Double => f.write_str("double"),
            TypeRef::String => f.write_str("string"),
            TypeRef::Object => f.write_str("object"),
            TypeRef::Named(name) => f.write_str(name),
        }
    }
}

/// Default value of a field.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
}

impl From<bool> for Literal {
    fn from(value: bool) -> Self {
        Literal::Bool(value)
    }
}

impl From<i32> for Literal {
    fn from(value: i32) -> Self {
        Literal::Int(i64::from(value))
    }
}

impl From<i64> for Literal {
    fn from(value: i64) -> Self {
        Literal::Int(value)
    }
}

impl From<f64> for Literal {
    fn from(value: f64) -> Self {
        Literal::Float(value)
    }
}

impl From<&str> for Literal {
    fn from(value: &str) -> Self {
        Literal::String(value.to_string())
    }
}

impl From<String> for Literal {
    fn from(value: String) -> Self {
        Literal::String(value)
    }
}

fn check_identifier(what: &str, name: &str) -> ForgeResult<()> {
    if name.is_empty() {
        return Err(ForgeError::invalid(format!("{} name must not be empty", what)));
    }
    if !is_identifier(name) {
        return Err(ForgeError::invalid(format!("'{}' is not a valid {} name", name, what)));
    }
    Ok(())
}

fn check_namespace(namespace: &str) -> ForgeResult<()> {
    if namespace.is_empty() {
        return Err(ForgeError::invalid("namespace must not be empty"));
    }
    if !is_qualified_identifier(namespace) {
        return Err(ForgeError::invalid(format!("'{}' is not a valid namespace", namespace)));
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldSpec {
    pub name: String,
    pub ty: TypeRef,
    pub default_value: Option<Literal>,
    pub visibility: Visibility,
    pub comment: Option<String>,
}

impl FieldSpec {
    /// A public field without a default value.
    pub fn new(name: impl Into<String>, ty: TypeRef) -> Self {
        Self {
            name: name.into(),
            ty,
            default_value: None,
            visibility: Visibility::Public,
            comment: None,
        }
    }

    pub fn with_default(mut self, value: impl Into<Literal>) -> Self {
        self.default_value = Some(value.into());
        self
    }

    pub fn with_visibility(mut self, visibility: Visibility) -> Self {
        self.visibility = visibility;
        self
    }

    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    pub fn validate(&self) -> ForgeResult<()> {
        check_identifier("field", &self.name)?;
        self.ty.validate()?;
        if self.ty == TypeRef::Void {
            return Err(ForgeError::invalid(format!("field '{}' cannot have type void", self.name)));
        }
        match &self.default_value {
            Some(Literal::Float(v)) if !v.is_finite() => Err(ForgeError::invalid(format!(
                "default value of field '{}' must be finite",
                self.name
            ))),
            Some(Literal::Int(v)) if self.ty == TypeRef::Int && i32::try_from(*v).is_err() => {
                Err(ForgeError::invalid(format!(
                    "default value {} of int field '{}' is out of range",
                    v, self.name
                )))
            }
            _ => Ok(()),
        }
    }
}

/// An auto-implemented property.
#[derive(Debug, Clone, PartialEq)]
pub struct PropertySpec {
    pub name: String,
    pub ty: TypeRef,
    pub visibility: Visibility,
    pub comment: Option<String>,
    pub has_get: bool,
    pub has_set: bool,
}

impl PropertySpec {
    /// A public read-write property.
    pub fn new(name: impl Into<String>, ty: TypeRef) -> Self {
        Self {
            name: name.into(),
            ty,
            visibility: Visibility::Public,
            comment: None,
            has_get: true,
            has_set: true,
        }
    }

    /// A public property with only a getter.
    pub fn read_only(name: impl Into<String>, ty: TypeRef) -> Self {
        Self::new(name, ty).with_accessors(true, false)
    }

    pub fn with_accessors(mut self, has_get: bool, has_set: bool) -> Self {
        self.has_get = has_get;
        self.has_set = has_set;
        self
    }

    pub fn with_visibility(mut self, visibility: Visibility) -> Self {
        self.visibility = visibility;
        self
    }

    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    pub fn validate(&self) -> ForgeResult<()> {
        check_identifier("property", &self.name)?;
        self.ty.validate()?;
        if self.ty == TypeRef::Void {
            return Err(ForgeError::invalid(format!("property '{}' cannot have type void", self.name)));
        }
        if !self.has_get {
            return Err(ForgeError::invalid(format!(
                "property '{}' must have a getter; write-only properties are not supported",
                self.name
            )));
        }
        Ok(())
    }
}

/// A constructor parameter, optionally stored into a field of the class.
#[derive(Debug, Clone, PartialEq)]
pub struct ParamSpec {
    pub ty: TypeRef,
    pub name: String,
    /// Field assigned from this parameter in the constructor body
    pub backing_field: Option<String>,
}

impl ParamSpec {
    pub fn new(ty: TypeRef, name: impl Into<String>) -> Self {
        Self {
            ty,
            name: name.into(),
            backing_field: None,
        }
    }

    pub fn with_backing_field(mut self, field: impl Into<String>) -> Self {
        self.backing_field = Some(field.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConstructorSpec {
    pub visibility: Visibility,
    pub params: Vec<ParamSpec>,
}

impl Default for ConstructorSpec {
    fn default() -> Self {
        Self {
            visibility: Visibility::Public,
            params: Vec::new(),
        }
    }
}

impl ConstructorSpec {
    pub fn new(params: Vec<ParamSpec>) -> Self {
        Self {
            params,
            ..Self::default()
        }
    }

    pub fn with_visibility(mut self, visibility: Visibility) -> Self {
        self.visibility = visibility;
        self
    }

    /// Assignments the constructor body performs, as `(field, parameter)`
    /// pairs in parameter order.
    pub fn assignments(&self) -> impl Iterator<Item = (&str, &str)> {
        self.params
            .iter()
            .filter_map(|p| p.backing_field.as_deref().map(|field| (field, p.name.as_str())))
    }

    pub fn validate(&self) -> ForgeResult<()> {
        for (index, param) in self.params.iter().enumerate() {
            check_identifier("parameter", &param.name)?;
            param.ty.validate()?;
            if param.ty == TypeRef::Void {
                return Err(ForgeError::invalid(format!("parameter '{}' cannot have type void", param.name)));
            }
            if self.params[..index].iter().any(|p| p.name == param.name) {
                return Err(ForgeError::invalid(format!("duplicate parameter '{}'", param.name)));
            }
            if let Some(field) = &param.backing_field {
                check_identifier("backing field", field)?;
            }
        }
        Ok(())
    }
}

/// A method given as raw source text (signature and body).
#[derive(Debug, Clone, PartialEq)]
pub struct MethodSpec {
    pub text: String,
    pub comment: Option<String>,
}

impl MethodSpec {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            comment: None,
        }
    }

    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    pub fn validate(&self) -> ForgeResult<()> {
        if self.text.trim().is_empty() {
            return Err(ForgeError::invalid("method text must not be empty"));
        }
        Ok(())
    }
}

/// One member of the class, in insertion order.
#[derive(Debug, Clone, PartialEq)]
pub enum MemberSpec {
    Field(FieldSpec),
    Property(PropertySpec),
    Constructor(ConstructorSpec),
    Method(MethodSpec),
}

/// Description of one class to generate.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeModel {
    namespace: String,
    class_name: String,
    qualified_name: String,
    visibility: Visibility,
    imports: Vec<String>,
    bases: Vec<String>,
    members: Vec<MemberSpec>,
}

impl TypeModel {
    pub fn new(namespace: &str, class_name: &str, visibility: Visibility) -> ForgeResult<Self> {
        check_namespace(namespace)?;
        check_identifier("class", class_name)?;
        Ok(Self {
            namespace: namespace.to_string(),
            class_name: class_name.to_string(),
            qualified_name: format!("{}.{}", namespace, class_name),
            visibility,
            imports: Vec::new(),
            bases: Vec::new(),
            members: Vec::new(),
        })
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn class_name(&self) -> &str {
        &self.class_name
    }

    /// `namespace.ClassName`
    pub fn qualified_name(&self) -> &str {
        &self.qualified_name
    }

    pub fn visibility(&self) -> Visibility {
        self.visibility
    }

    /// Imported namespaces, in insertion order.
    pub fn imports(&self) -> &[String] {
        &self.imports
    }

    /// Base class and interfaces, in insertion order.
    pub fn bases(&self) -> &[String] {
        &self.bases
    }

    pub fn members(&self) -> &[MemberSpec] {
        &self.members
    }

    pub fn constructor(&self) -> Option<&ConstructorSpec> {
        self.members.iter().find_map(|m| match m {
            MemberSpec::Constructor(ctor) => Some(ctor),
            _ => None,
        })
    }

    pub fn fields(&self) -> impl Iterator<Item = &FieldSpec> {
        self.members.iter().filter_map(|m| match m {
            MemberSpec::Field(field) => Some(field),
            _ => None,
        })
    }

    pub fn properties(&self) -> impl Iterator<Item = &PropertySpec> {
        self.members.iter().filter_map(|m| match m {
            MemberSpec::Property(property) => Some(property),
            _ => None,
        })
    }

    pub fn methods(&self) -> impl Iterator<Item = &MethodSpec> {
        self.members.iter().filter_map(|m| match m {
            MemberSpec::Method(method) => Some(method),
            _ => None,
        })
    }

    pub fn validate_import(namespace: &str) -> ForgeResult<()> {
        check_namespace(namespace)
    }

    pub fn validate_base(name: &str) -> ForgeResult<()> {
        if name.is_empty() {
            return Err(ForgeError::invalid("base type name must not be empty"));
        }
        if !is_qualified_identifier(name) {
            return Err(ForgeError::invalid(format!("'{}' is not a valid base type name", name)));
        }
        Ok(())
    }

    /// Add an imported namespace. Returns false if it was already present.
    pub fn add_import(&mut self, namespace: &str) -> ForgeResult<bool> {
        Self::validate_import(namespace)?;
        if self.imports.iter().any(|i| i == namespace) {
            return Ok(false);
        }
        self.imports.push(namespace.to_string());
        Ok(true)
    }

    /// Add a base class or interface. Returns false if it was already present.
    pub fn add_base(&mut self, name: &str) -> ForgeResult<bool> {
        Self::validate_base(name)?;
        if self.bases.iter().any(|b| b == name) {
            return Ok(false);
        }
        self.bases.push(name.to_string());
        Ok(true)
    }

    /// Validate a member against the model without adding it.
    pub fn check_member(&self, member: &MemberSpec) -> ForgeResult<()> {
        match member {
            MemberSpec::Field(field) => field.validate(),
            MemberSpec::Property(property) => property.validate(),
            MemberSpec::Method(method) => method.validate(),
            MemberSpec::Constructor(ctor) => {
                if self.constructor().is_some() {
                    return Err(ForgeError::invalid(format!(
                        "'{}' already has a constructor",
                        self.qualified_name
                    )));
                }
                ctor.validate()
            }
        }
    }

    pub fn add_member(&mut self, member: MemberSpec) -> ForgeResult<()> {
        self.check_member(&member)?;
        self.members.push(member);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn model() -> TypeModel {
        TypeModel::new("Demo", "Widget", Visibility::Public).unwrap()
    }

    #[test]
    fn test_qualified_name_is_fixed_at_construction() {
        let model = model();
        assert_eq!(model.qualified_name(), "Demo.Widget");
        assert!(TypeModel::new("", "Widget", Visibility::Public).is_err());
        assert!(TypeModel::new("Demo", "", Visibility::Public).is_err());
        assert!(TypeModel::new("Demo", "class", Visibility::Public).is_err());
    }

    #[test]
    fn test_imports_and_bases_are_sets() {
        let mut model = model();
        assert!(model.add_import("System").unwrap());
        assert!(!model.add_import("System").unwrap());
        assert!(model.add_base("Base").unwrap());
        assert!(model.add_base("System.IDisposable").unwrap());
        assert!(!model.add_base("Base").unwrap());
        assert_eq!(model.imports(), ["System".to_string()]);
        assert_eq!(model.bases(), ["Base".to_string(), "System.IDisposable".to_string()]);
    }

    #[test]
    fn test_type_ref_parse() {
        assert_eq!(TypeRef::parse("int").unwrap(), TypeRef::Int);
        assert_eq!(TypeRef::parse(" string ").unwrap(), TypeRef::String);
        assert_eq!(
            TypeRef::parse("System.IDisposable").unwrap(),
            TypeRef::named("System.IDisposable")
        );
        assert!(TypeRef::parse("").is_err());
        assert!(TypeRef::parse("List<int>").is_err());
    }

    #[test]
    fn test_property_needs_getter() {
        let mut model = model();
        let err = model
            .add_member(MemberSpec::Property(
                PropertySpec::new("Secret", TypeRef::String).with_accessors(false, true),
            ))
            .unwrap_err();
        assert!(matches!(err, ForgeError::InvalidArgument(_)));
        assert!(model.members().is_empty());
    }

    #[test]
    fn test_single_constructor() {
        let mut model = model();
        model.add_member(MemberSpec::Constructor(ConstructorSpec::default())).unwrap();
        assert!(model
            .add_member(MemberSpec::Constructor(ConstructorSpec::default()))
            .is_err());
        assert_eq!(model.members().len(), 1);
    }

    #[test]
    fn test_constructor_assignments_follow_parameter_order() {
        let ctor = ConstructorSpec::new(vec![
            ParamSpec::new(TypeRef::Int, "a").with_backing_field("first"),
            ParamSpec::new(TypeRef::String, "b"),
            ParamSpec::new(TypeRef::Bool, "c").with_backing_field("third"),
        ]);
        let pairs: Vec<_> = ctor.assignments().collect();
        assert_eq!(pairs, vec![("first", "a"), ("third", "c")]);
    }

    #[test]
    fn test_member_validation() {
        assert!(FieldSpec::new("", TypeRef::Int).validate().is_err());
        assert!(FieldSpec::new("x y", TypeRef::Int).validate().is_err());
        assert!(FieldSpec::new("x", TypeRef::Void).validate().is_err());
        assert!(FieldSpec::new("x", TypeRef::Double)
            .with_default(f64::NAN)
            .validate()
            .is_err());
        assert!(MethodSpec::new("   ").validate().is_err());
        assert!(ConstructorSpec::new(vec![
            ParamSpec::new(TypeRef::Int, "a"),
            ParamSpec::new(TypeRef::Int, "a"),
        ])
        .validate()
        .is_err());
    }

    #[test]
    fn test_int_default_range() {
        let int_field = |v: i64| FieldSpec::new("x", TypeRef::Int).with_default(v);
        assert!(int_field(i32::MIN as i64).validate().is_ok());
        assert!(int_field(i32::MAX as i64).validate().is_ok());
        assert!(int_field(5_000_000_000).validate().is_err());
        assert!(int_field(i32::MIN as i64 - 1).validate().is_err());
        assert!(FieldSpec::new("x", TypeRef::Long)
            .with_default(5_000_000_000i64)
            .validate()
            .is_ok());
    }

    #[test]
    fn test_parse_visibility() {
        assert_eq!(parse_visibility("private").unwrap(), Visibility::Private);
        assert!(parse_visibility("friend").is_err());
    }
}
