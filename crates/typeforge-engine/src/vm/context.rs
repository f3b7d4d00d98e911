//! Load contexts
//!
//! A load context verifies module images, links their classes and keeps the
//! resulting modules resident. Modules are deduplicated by the SHA-256 of
//! their bytes, so loading the same image twice is a no-op.
//!
//! A `Default` context never gives modules back. A `Collectable` context can
//! be unloaded: it refuses further loads and drops its references, and each
//! module is freed once the last instance created from it is dropped.

use crate::compiler::module::ModuleImage;
use crate::vm::linker::{core_class, Linker};
use crate::vm::object::{LoadedModule, RuntimeClass};
use crate::vm::LoadError;
use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use sha2::{Digest, Sha256};
use std::sync::Arc;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextKind {
    /// Modules stay resident for the lifetime of the context
    Default,
    /// Supports [`LoadContext::unload`]
    Collectable,
}

#[derive(Debug, Default)]
struct ContextState {
    /// Resident modules in load order
    modules: Vec<Arc<LoadedModule>>,
    by_checksum: FxHashMap<[u8; 32], Arc<LoadedModule>>,
    unloaded: bool,
}

#[derive(Debug)]
pub struct LoadContext {
    name: String,
    kind: ContextKind,
    state: Mutex<ContextState>,
}

impl LoadContext {
    pub fn new(name: impl Into<String>, kind: ContextKind) -> Self {
        Self {
            name: name.into(),
            kind,
            state: Mutex::new(ContextState::default()),
        }
    }

    /// A context that never unloads.
    pub fn default_context() -> Self {
        Self::new("default", ContextKind::Default)
    }

    pub fn collectable(name: impl Into<String>) -> Self {
        Self::new(name, ContextKind::Collectable)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> ContextKind {
        self.kind
    }

    /// Verify, link and register an encoded module image.
    pub fn load(&self, bytes: &[u8]) -> Result<Arc<LoadedModule>, LoadError> {
        let checksum: [u8; 32] = Sha256::digest(bytes).into();
        let mut state = self.state.lock();
        if state.unloaded {
            return Err(LoadError::ContextUnloaded(self.name.clone()));
        }
        if let Some(existing) = state.by_checksum.get(&checksum) {
            debug!(module = existing.name(), context = %self.name, "module already resident");
            return Ok(existing.clone());
        }

        let image = ModuleImage::decode(bytes)?;
        if state.modules.iter().any(|m| m.name() == image.name) {
            return Err(LoadError::DuplicateModule(image.name));
        }

        let classes = Linker::new(&image, &state.modules).link_all()?;
        let module = Arc::new(LoadedModule::new(image, self.name.clone(), checksum, classes));
        state.modules.push(module.clone());
        state.by_checksum.insert(checksum, module.clone());
        info!(
            module = module.name(),
            context = %self.name,
            classes = module.image().classes.len(),
            resident = state.modules.len(),
            "module loaded"
        );
        Ok(module)
    }

    /// Encode and load an in-memory image.
    pub fn load_image(&self, image: &ModuleImage) -> Result<Arc<LoadedModule>, LoadError> {
        let bytes = image.encode()?;
        self.load(&bytes)
    }

    pub fn find_module(&self, name: &str) -> Option<Arc<LoadedModule>> {
        self.state.lock().modules.iter().find(|m| m.name() == name).cloned()
    }

    pub fn modules(&self) -> Vec<Arc<LoadedModule>> {
        self.state.lock().modules.clone()
    }

    /// Number of modules currently held by the context.
    pub fn resident_count(&self) -> usize {
        self.state.lock().modules.len()
    }

    /// Find a class in the resident modules, then in the core library.
    pub fn resolve_class(&self, qualified_name: &str) -> Option<Arc<RuntimeClass>> {
        let state = self.state.lock();
        state
            .modules
            .iter()
            .find_map(|m| m.class(qualified_name).cloned())
            .or_else(|| core_class(qualified_name))
    }

    pub fn is_unloaded(&self) -> bool {
        self.state.lock().unloaded
    }

    /// Drop every module reference held by a collectable context.
    ///
    /// Returns the number of modules released. Instances that are still
    /// alive keep their own module resident until they are dropped.
    pub fn unload(&self) -> Result<usize, LoadError> {
        if self.kind != ContextKind::Collectable {
            return Err(LoadError::NotCollectable(self.name.clone()));
        }
        let mut state = self.state.lock();
        state.unloaded = true;
        state.by_checksum.clear();
        let released = std::mem::take(&mut state.modules).len();
        info!(context = %self.name, released, "context unloaded");
        Ok(released)
    }
}
