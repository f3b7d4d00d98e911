//! Base-class linking for module images.
//!
//! Every base class and interface named by an image is resolved, in order,
//! against the image itself, the modules already resident in the load
//! context, and the built-in core library.

use crate::compiler::core_lib::core_lib;
use crate::compiler::metadata::ClassDef;
use crate::compiler::module::ModuleImage;
use crate::vm::object::{LoadedModule, RuntimeClass};
use crate::vm::LoadError;
use once_cell::sync::Lazy;
use rustc_hash::{FxHashMap, FxHashSet};
use std::sync::Arc;

/// Linked classes of the core library, shared by every context.
static CORE_CLASSES: Lazy<FxHashMap<String, Arc<RuntimeClass>>> = Lazy::new(|| {
    let image = core_lib();
    let mut linker = Linker::new(&image, &[]);
    let mut classes = FxHashMap::default();
    for def in &image.classes {
        // The core image only names classes it defines itself.
        if let Ok(class) = linker.link_class(def) {
            classes.insert(def.qualified_name(), class);
        }
    }
    classes
});

/// Look up a core library class by qualified name.
pub(crate) fn core_class(name: &str) -> Option<Arc<RuntimeClass>> {
    CORE_CLASSES.get(name).cloned()
}

pub(crate) struct Linker<'a> {
    image: &'a ModuleImage,
    resident: &'a [Arc<LoadedModule>],
    linked: FxHashMap<String, Arc<RuntimeClass>>,
    visiting: FxHashSet<String>,
}

impl<'a> Linker<'a> {
    pub fn new(image: &'a ModuleImage, resident: &'a [Arc<LoadedModule>]) -> Self {
        Self {
            image,
            resident,
            linked: FxHashMap::default(),
            visiting: FxHashSet::default(),
        }
    }

    /// Link every class in the image.
    pub fn link_all(mut self) -> Result<FxHashMap<String, Arc<RuntimeClass>>, LoadError> {
        let image = self.image;
        for def in &image.classes {
            self.link_class(def)?;
        }
        Ok(self.linked)
    }

    fn link_class(&mut self, def: &'a ClassDef) -> Result<Arc<RuntimeClass>, LoadError> {
        let qualified = def.qualified_name();
        if let Some(class) = self.linked.get(&qualified) {
            return Ok(class.clone());
        }
        if !self.visiting.insert(qualified.clone()) {
            return Err(LoadError::CircularBase(qualified));
        }

        let base = match &def.base {
            Some(name) => Some(self.resolve(&qualified, name)?),
            None => None,
        };
        for interface in &def.interfaces {
            self.resolve(&qualified, interface)?;
        }

        self.visiting.remove(&qualified);
        let class = Arc::new(RuntimeClass {
            def: def.clone(),
            base,
            module_name: self.image.name.clone(),
        });
        self.linked.insert(qualified, class.clone());
        Ok(class)
    }

    fn resolve(&mut self, class: &str, name: &str) -> Result<Arc<RuntimeClass>, LoadError> {
        let image = self.image;
        if let Some(def) = image.find_class(name) {
            return self.link_class(def);
        }
        if let Some(found) = self.resident.iter().find_map(|module| module.class(name)) {
            return Ok(found.clone());
        }
        core_class(name).ok_or_else(|| LoadError::UnresolvedType {
            class: class.to_string(),
            base: name.to_string(),
        })
    }
}
