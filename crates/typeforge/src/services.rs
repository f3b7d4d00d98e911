//! Shared state used by every builder
//!
//! The reference set, the singleton registry, the load context and the
//! run-once gate live here. Builders hold an `Arc<Services>`;
//! [`Services::global`] is the process-wide instance.

use crate::config::ForgeConfig;
use crate::error::ForgeResult;
use crate::hooks::{HookFailurePolicy, OnceGate};
use crate::pipeline::CompilerLoader;
use crate::references::ReferenceSet;
use crate::registry::SingletonRegistry;
use once_cell::sync::Lazy;
use parking_lot::RwLock;
use serde::Deserialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::info;
use typeforge_engine::{CompilationOptions, LoadContext, LoadError};

/// Where compiled modules are loaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoadMode {
    /// One default context; modules stay resident for the process lifetime
    #[default]
    Default,
    /// One collectable context per cache generation, see
    /// [`Services::rotate_generation`]
    #[serde(rename = "collectable", alias = "collectable-per-generation")]
    CollectablePerGeneration,
}

static GLOBAL: Lazy<Arc<Services>> = Lazy::new(|| Arc::new(Services::new()));

#[derive(Debug)]
pub struct Services {
    references: ReferenceSet,
    registry: SingletonRegistry,
    once_gate: OnceGate,
    loader: CompilerLoader,
    mode: LoadMode,
    hook_policy: HookFailurePolicy,
    context: RwLock<Arc<LoadContext>>,
    generation: AtomicU64,
}

impl Default for Services {
    fn default() -> Self {
        Self::new()
    }
}

impl Services {
    pub fn new() -> Self {
        Self::from_config(&ForgeConfig::default())
    }

    pub fn from_config(config: &ForgeConfig) -> Self {
        let mode = config.load.mode;
        let options = CompilationOptions::library().with_warnings_as_errors(config.compile.warnings_as_errors);
        Self {
            references: ReferenceSet::new(config.references.scan_options(), config.references.dedup),
            registry: SingletonRegistry::new(),
            once_gate: OnceGate::new(),
            loader: CompilerLoader::new(options),
            mode,
            hook_policy: config.hooks.failure,
            context: RwLock::new(Arc::new(new_context(mode, 0))),
            generation: AtomicU64::new(0),
        }
    }

    /// The process-wide instance, created with default configuration on
    /// first use.
    pub fn global() -> Arc<Services> {
        GLOBAL.clone()
    }

    pub fn references(&self) -> &ReferenceSet {
        &self.references
    }

    pub fn registry(&self) -> &SingletonRegistry {
        &self.registry
    }

    pub fn once_gate(&self) -> &OnceGate {
        &self.once_gate
    }

    pub fn loader(&self) -> &CompilerLoader {
        &self.loader
    }

    pub fn mode(&self) -> LoadMode {
        self.mode
    }

    /// Failure policy given to new builders' hooks
    pub fn hook_policy(&self) -> HookFailurePolicy {
        self.hook_policy
    }

    /// The context new modules are loaded into.
    pub fn context(&self) -> Arc<LoadContext> {
        self.context.read().clone()
    }

    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    /// Start a new cache generation: clear the registry, unload the current
    /// collectable context and load into a fresh one from now on.
    ///
    /// Modules of the old generation are freed once the last instance
    /// created from them is dropped. Fails in [`LoadMode::Default`].
    pub fn rotate_generation(&self) -> ForgeResult<u64> {
        if self.mode != LoadMode::CollectablePerGeneration {
            return Err(LoadError::NotCollectable(self.context.read().name().to_string()).into());
        }

        let mut context = self.context.write();
        let cleared = self.registry.clear();
        let next = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let previous = std::mem::replace(&mut *context, Arc::new(new_context(self.mode, next)));
        let released = previous.unload()?;
        info!(
            generation = next,
            cleared,
            released,
            context = context.name(),
            "started new load generation"
        );
        Ok(next)
    }
}

fn new_context(mode: LoadMode, generation: u64) -> LoadContext {
    match mode {
        LoadMode::Default => LoadContext::default_context(),
        LoadMode::CollectablePerGeneration => LoadContext::collectable(format!("generation-{}", generation)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ForgeError;
    use std::sync::Arc;
    use typeforge_engine::{ContextKind, CORE_LOCATIONS};

    fn collectable() -> Services {
        let mut config = ForgeConfig::default();
        config.load.mode = LoadMode::CollectablePerGeneration;
        Services::from_config(&config)
    }

    fn core() -> Vec<String> {
        CORE_LOCATIONS.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_default_mode_cannot_rotate() {
        let services = Services::new();
        assert_eq!(services.context().kind(), ContextKind::Default);
        let err = services.rotate_generation().unwrap_err();
        assert!(matches!(err, ForgeError::LoadFailed(LoadError::NotCollectable(_))));
        assert_eq!(services.generation(), 0);
    }

    #[test]
    fn test_config_flows_into_services() {
        let config = ForgeConfig::from_str("[compile]\nwarnings_as_errors = true\n[hooks]\nfailure = \"report\"\n").unwrap();
        let services = Services::from_config(&config);
        assert!(services.loader().options().warnings_as_errors);
        assert_eq!(services.hook_policy(), HookFailurePolicy::Report);
    }

    #[test]
    fn test_global_is_shared() {
        assert!(Arc::ptr_eq(&Services::global(), &Services::global()));
    }

    #[test]
    fn test_rotation_frees_old_generation() {
        let services = collectable();
        let first_context = services.context();
        let module = services
            .loader()
            .compile_and_load("namespace N { public class A { } }", &core(), &first_context)
            .unwrap();
        let instance = module.create_instance("N.A", &[]).unwrap();
        services.registry().update("N.A", instance.clone());
        let weak = Arc::downgrade(&module);
        drop(module);

        assert_eq!(services.rotate_generation().unwrap(), 1);
        assert!(services.registry().is_empty());
        assert!(first_context.is_unloaded());
        assert!(!services.context().is_unloaded());
        assert_eq!(services.context().name(), "generation-1");

        // The live instance still holds its module.
        assert!(weak.upgrade().is_some());
        drop(instance);
        assert!(weak.upgrade().is_none());
    }
}
