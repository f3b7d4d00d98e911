//! Built-in core library images.
//!
//! The core library is addressed through `core:` locations instead of files.
//! `System.Object` lives here, so a compilation without the core library
//! cannot declare any class.

use crate::compiler::metadata::{ClassDef, ClassKind, MethodDef, ParamDef, TypeSig, OBJECT_TYPE};
use crate::compiler::module::{flags, ModuleImage};
use crate::parser::ast::Visibility;
use once_cell::sync::Lazy;
use std::sync::Arc;

/// Prefix of locations served by the built-in core library.
pub const CORE_PREFIX: &str = "core:";

/// Location of the image defining `System.Object` and the core interfaces.
pub const CORE_LIB: &str = "core:System.Private.CoreLib";

/// Location of the image contributing the `System.Runtime` namespace.
pub const CORE_RUNTIME: &str = "core:System.Runtime";

/// Every built-in location, in the order they are added to a reference set.
pub const CORE_LOCATIONS: [&str; 2] = [CORE_LIB, CORE_RUNTIME];

static CORE_LIB_IMAGE: Lazy<Arc<ModuleImage>> = Lazy::new(|| Arc::new(build_core_lib()));
static CORE_RUNTIME_IMAGE: Lazy<Arc<ModuleImage>> = Lazy::new(|| {
    let mut image = ModuleImage::new("System.Runtime");
    image.flags |= flags::CORE;
    image.namespaces.push("System.Runtime".to_string());
    Arc::new(image)
});

/// Whether `location` names a built-in image.
pub fn is_core_location(location: &str) -> bool {
    location.starts_with(CORE_PREFIX)
}

/// Look up a built-in image by location.
pub fn core_image(location: &str) -> Option<Arc<ModuleImage>> {
    match location {
        CORE_LIB => Some(CORE_LIB_IMAGE.clone()),
        CORE_RUNTIME => Some(CORE_RUNTIME_IMAGE.clone()),
        _ => None,
    }
}

/// The image that defines `System.Object`.
pub fn core_lib() -> Arc<ModuleImage> {
    CORE_LIB_IMAGE.clone()
}

fn method(name: &str, params: Vec<ParamDef>, return_type: TypeSig, is_virtual: bool) -> MethodDef {
    MethodDef {
        name: name.to_string(),
        visibility: Visibility::Public,
        params,
        return_type,
        is_virtual,
        is_override: false,
        body: None,
    }
}

fn class(kind: ClassKind, name: &str, methods: Vec<MethodDef>) -> ClassDef {
    ClassDef {
        kind,
        namespace: "System".to_string(),
        name: name.to_string(),
        visibility: Visibility::Public,
        is_sealed: false,
        is_abstract: kind == ClassKind::Interface,
        base: None,
        interfaces: Vec::new(),
        fields: Vec::new(),
        properties: Vec::new(),
        constructor: None,
        member_order: methods.iter().map(|m| m.name.clone()).collect(),
        methods,
    }
}

fn build_core_lib() -> ModuleImage {
    let object = class(
        ClassKind::Class,
        "Object",
        vec![
            method("ToString", Vec::new(), TypeSig::String, true),
            method(
                "Equals",
                vec![ParamDef {
                    name: "obj".to_string(),
                    ty: TypeSig::Object,
                }],
                TypeSig::Bool,
                true,
            ),
            method("GetHashCode", Vec::new(), TypeSig::Int, true),
        ],
    );
    debug_assert_eq!(object.qualified_name(), OBJECT_TYPE);

    let disposable = class(
        ClassKind::Interface,
        "IDisposable",
        vec![method("Dispose", Vec::new(), TypeSig::Void, false)],
    );
    let cloneable = class(
        ClassKind::Interface,
        "ICloneable",
        vec![method("Clone", Vec::new(), TypeSig::Object, false)],
    );

    let mut image = ModuleImage::new("System.Private.CoreLib");
    image.flags |= flags::CORE;
    image.namespaces.push("System".to_string());
    image.classes = vec![object, disposable, cloneable];
    image
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_core_lib_defines_object_and_interfaces() {
        let image = core_image(CORE_LIB).unwrap();
        assert!(image.is_core());
        assert!(image.find_class(OBJECT_TYPE).is_some());
        assert!(image.find_class("System.IDisposable").unwrap().is_interface());
        assert!(image.find_class("System.ICloneable").is_some());
    }

    #[test]
    fn test_core_runtime_contributes_namespace() {
        let image = core_image(CORE_RUNTIME).unwrap();
        assert_eq!(image.namespaces, vec!["System.Runtime".to_string()]);
        assert!(image.classes.is_empty());
    }

    #[test]
    fn test_unknown_core_location() {
        assert!(core_image("core:System.Nope").is_none());
        assert!(is_core_location("core:anything"));
        assert!(!is_core_location("/tmp/core.tfm"));
    }
}
