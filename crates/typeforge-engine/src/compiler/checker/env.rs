//! Type environment: every class visible to a compilation.

use crate::compiler::metadata::{ClassDef, FieldDef, MethodDef, PropertyDef, TypeSig, OBJECT_TYPE};
use rustc_hash::{FxHashMap, FxHashSet};

/// Upper bound on inheritance depth, which also stops walks over cyclic
/// hierarchies.
const MAX_HIERARCHY_DEPTH: usize = 64;

/// Where a class definition came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Origin {
    /// Declared in the text being compiled
    Unit,
    /// Provided by a metadata reference
    Reference {
        location: String,
        module: String,
        core: bool,
    },
}

#[derive(Debug, Clone)]
pub struct ClassEntry {
    pub def: ClassDef,
    pub origin: Origin,
}

#[derive(Debug, Clone, Copy)]
pub enum MemberKind<'e> {
    Field(&'e FieldDef),
    Property(&'e PropertyDef),
    Method(&'e MethodDef),
}

/// A member found by walking a class hierarchy.
#[derive(Debug, Clone, Copy)]
pub struct FoundMember<'e> {
    pub owner: &'e ClassDef,
    pub kind: MemberKind<'e>,
}

impl FoundMember<'_> {
    pub fn owner_name(&self) -> String {
        self.owner.qualified_name()
    }
}

#[derive(Debug, Default)]
pub struct TypeEnv {
    classes: FxHashMap<String, ClassEntry>,
    namespaces: FxHashSet<String>,
}

impl TypeEnv {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a namespace and all of its parents.
    pub fn add_namespace(&mut self, namespace: &str) {
        let mut current = namespace;
        while !current.is_empty() {
            self.namespaces.insert(current.to_string());
            current = match current.rfind('.') {
                Some(index) => &current[..index],
                None => "",
            };
        }
    }

    pub fn has_namespace(&self, namespace: &str) -> bool {
        self.namespaces.contains(namespace)
    }

    /// Add a class. Returns `false` if the qualified name is already taken.
    pub fn add_class(&mut self, def: ClassDef, origin: Origin) -> bool {
        let name = def.qualified_name();
        if self.classes.contains_key(&name) {
            return false;
        }
        self.add_namespace(&def.namespace);
        self.classes.insert(name, ClassEntry { def, origin });
        true
    }

    pub fn replace_class(&mut self, def: ClassDef) {
        if let Some(entry) = self.classes.get_mut(&def.qualified_name()) {
            entry.def = def;
        }
    }

    pub fn entry(&self, name: &str) -> Option<&ClassEntry> {
        self.classes.get(name)
    }

    pub fn class(&self, name: &str) -> Option<&ClassDef> {
        self.classes.get(name).map(|e| &e.def)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.classes.contains_key(name)
    }

    /// The class followed by its base classes, most derived first.
    pub fn hierarchy(&self, name: &str) -> Vec<&ClassDef> {
        let mut chain = Vec::new();
        let mut current = self.class(name);
        while let Some(def) = current {
            if chain.len() >= MAX_HIERARCHY_DEPTH {
                break;
            }
            chain.push(def);
            current = def.base.as_deref().and_then(|base| self.class(base));
        }
        chain
    }

    /// Whether following base links from `name` comes back to `name`.
    pub fn has_cycle(&self, name: &str) -> bool {
        let mut seen = FxHashSet::default();
        let mut current = Some(name.to_string());
        while let Some(class) = current {
            if !seen.insert(class.clone()) {
                return class == name || seen.len() > MAX_HIERARCHY_DEPTH;
            }
            current = self.class(&class).and_then(|def| def.base.clone());
        }
        false
    }

    /// Every interface implemented by `name` directly or through base classes.
    pub fn interfaces_of(&self, name: &str) -> Vec<String> {
        let mut result: Vec<String> = Vec::new();
        for def in self.hierarchy(name) {
            for interface in &def.interfaces {
                if !result.contains(interface) {
                    result.push(interface.clone());
                }
            }
        }
        result
    }

    /// Whether a value of class `sub` can be used where `sup` is expected.
    pub fn is_subtype(&self, sub: &str, sup: &str) -> bool {
        if sub == sup || sup == OBJECT_TYPE {
            return true;
        }
        self.hierarchy(sub)
            .iter()
            .any(|def| def.qualified_name() == sup || def.interfaces.iter().any(|i| i == sup))
    }

    /// Whether `from` converts implicitly to `to`.
    pub fn is_convertible(&self, from: &TypeSig, to: &TypeSig) -> bool {
        if from == to || *to == TypeSig::Object {
            return true;
        }
        if let (Some(a), Some(b)) = (from.numeric_rank(), to.numeric_rank()) {
            return a <= b;
        }
        match (from, to) {
            (TypeSig::Class(a), TypeSig::Class(b)) => self.is_subtype(a, b),
            _ => false,
        }
    }

    /// Find a member by walking the hierarchy, then `System.Object`.
    pub fn find_member(&self, class: &str, name: &str) -> Option<FoundMember<'_>> {
        let chain = self.hierarchy(class);
        let is_interface = chain.first().is_some_and(|d| d.is_interface());
        for def in &chain {
            if let Some(found) = Self::member_of(def, name) {
                return Some(found);
            }
        }
        if is_interface {
            for interface in chain.first().map(|d| d.interfaces.clone()).unwrap_or_default() {
                if let Some(found) = self.find_member(&interface, name) {
                    return Some(found);
                }
            }
            return self.class(OBJECT_TYPE).and_then(|d| Self::member_of(d, name));
        }
        None
    }

    /// Find a member inherited by `class`, skipping its own declarations.
    pub fn find_inherited(&self, class: &str, name: &str) -> Option<FoundMember<'_>> {
        let base = self.class(class)?.base.clone()?;
        self.find_member(&base, name)
    }

    fn member_of<'e>(def: &'e ClassDef, name: &str) -> Option<FoundMember<'e>> {
        let kind = if let Some(field) = def.field(name) {
            MemberKind::Field(field)
        } else if let Some(property) = def.property(name) {
            MemberKind::Property(property)
        } else {
            MemberKind::Method(def.method(name)?)
        };
        Some(FoundMember { owner: def, kind })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::core_lib::core_lib;
    use crate::parser::ast::Visibility;

    fn class(ns: &str, name: &str, base: Option<&str>) -> ClassDef {
        let mut def = core_lib().find_class(OBJECT_TYPE).unwrap().clone();
        def.namespace = ns.to_string();
        def.name = name.to_string();
        def.base = base.map(str::to_string);
        def.methods.clear();
        def.visibility = Visibility::Public;
        def
    }

    fn env() -> TypeEnv {
        let mut env = TypeEnv::new();
        for def in &core_lib().classes {
            env.add_class(
                def.clone(),
                Origin::Reference {
                    location: "core:System.Private.CoreLib".into(),
                    module: "System.Private.CoreLib".into(),
                    core: true,
                },
            );
        }
        env
    }

    #[test]
    fn test_namespaces_register_parents() {
        let mut env = TypeEnv::new();
        env.add_namespace("A.B.C");
        assert!(env.has_namespace("A"));
        assert!(env.has_namespace("A.B"));
        assert!(!env.has_namespace("B"));
    }

    #[test]
    fn test_subtype_through_base_chain() {
        let mut env = env();
        env.add_class(class("Demo", "Base", Some(OBJECT_TYPE)), Origin::Unit);
        let mut derived = class("Demo", "Derived", Some("Demo.Base"));
        derived.interfaces.push("System.IDisposable".into());
        env.add_class(derived, Origin::Unit);

        assert!(env.is_subtype("Demo.Derived", "Demo.Base"));
        assert!(env.is_subtype("Demo.Derived", "System.IDisposable"));
        assert!(!env.is_subtype("Demo.Base", "Demo.Derived"));
        assert_eq!(env.hierarchy("Demo.Derived").len(), 3);
    }

    #[test]
    fn test_object_members_are_inherited() {
        let mut env = env();
        env.add_class(class("Demo", "A", Some(OBJECT_TYPE)), Origin::Unit);
        let found = env.find_member("Demo.A", "ToString").unwrap();
        assert_eq!(found.owner_name(), OBJECT_TYPE);
    }

    #[test]
    fn test_cycle_detection() {
        let mut env = env();
        env.add_class(class("Demo", "A", Some("Demo.B")), Origin::Unit);
        env.add_class(class("Demo", "B", Some("Demo.A")), Origin::Unit);
        assert!(env.has_cycle("Demo.A"));
        assert!(!env.has_cycle(OBJECT_TYPE));
    }

    #[test]
    fn test_numeric_widening() {
        let env = TypeEnv::new();
        assert!(env.is_convertible(&TypeSig::Int, &TypeSig::Double));
        assert!(!env.is_convertible(&TypeSig::Double, &TypeSig::Int));
        assert!(env.is_convertible(&TypeSig::String, &TypeSig::Object));
    }
}
