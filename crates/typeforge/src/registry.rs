//! Process-wide cache of created instances

use crate::error::ForgeResult;
use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use tracing::debug;
use typeforge_engine::Instance;

/// Maps keys to instances. Cached instances stay alive until deleted or
/// replaced.
#[derive(Debug, Default)]
pub struct SingletonRegistry {
    entries: Mutex<FxHashMap<String, Instance>>,
}

impl SingletonRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has(&self, key: &str) -> bool {
        self.entries.lock().contains_key(key)
    }

    pub fn get_or_null(&self, key: &str) -> Option<Instance> {
        self.entries.lock().get(key).cloned()
    }

    /// Insert or replace. Returns the previous instance, if any.
    pub fn update(&self, key: impl Into<String>, instance: Instance) -> Option<Instance> {
        self.entries.lock().insert(key.into(), instance)
    }

    pub fn delete(&self, key: &str) -> Option<Instance> {
        self.entries.lock().remove(key)
    }

    /// Return the cached instance for `key`, or build and cache one.
    ///
    /// `build` runs without the lock held. If another caller caches an
    /// instance first, that instance wins and is returned to both. A failed
    /// build caches nothing.
    pub fn create_or_get<F>(&self, key: &str, build: F) -> ForgeResult<Instance>
    where
        F: FnOnce() -> ForgeResult<Instance>,
    {
        if let Some(existing) = self.get_or_null(key) {
            debug!(key, "singleton cache hit");
            return Ok(existing);
        }

        let built = build()?;
        let mut entries = self.entries.lock();
        let cached = entries.entry(key.to_string()).or_insert(built);
        debug!(key, "singleton cached");
        Ok(cached.clone())
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Cached keys, sorted.
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.entries.lock().keys().cloned().collect();
        keys.sort();
        keys
    }

    /// Remove every entry, returning how many were removed.
    pub fn clear(&self) -> usize {
        let mut entries = self.entries.lock();
        let count = entries.len();
        entries.clear();
        count
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ForgeError;
    use crate::pipeline::CompilerLoader;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use typeforge_engine::{LoadContext, LoadedModule, CORE_LOCATIONS};

    fn module() -> Arc<LoadedModule> {
        let core: Vec<String> = CORE_LOCATIONS.iter().map(|s| s.to_string()).collect();
        CompilerLoader::default()
            .compile_and_load("namespace N { public class A { } }", &core, &LoadContext::default_context())
            .unwrap()
    }

    #[test]
    fn test_create_or_get_builds_once() {
        let registry = SingletonRegistry::new();
        let module = module();
        let builds = AtomicUsize::new(0);
        let build = || {
            builds.fetch_add(1, Ordering::SeqCst);
            module.create_instance("N.A", &[]).map_err(ForgeError::from)
        };

        let first = registry.create_or_get("K", build).unwrap();
        let second = registry.create_or_get("K", build).unwrap();
        assert!(Instance::ptr_eq(&first, &second));
        assert_eq!(builds.load(Ordering::SeqCst), 1);

        assert!(registry.delete("K").is_some());
        let third = registry.create_or_get("K", build).unwrap();
        assert!(!Instance::ptr_eq(&first, &third));
        assert_eq!(builds.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_failed_build_caches_nothing() {
        let registry = SingletonRegistry::new();
        let err = registry
            .create_or_get("K", || Err(ForgeError::TypeNotFound("N.Nope".to_string())))
            .unwrap_err();
        assert!(matches!(err, ForgeError::TypeNotFound(_)));
        assert!(!registry.has("K"));
    }

    #[test]
    fn test_update_replaces_and_keys_are_sorted() {
        let registry = SingletonRegistry::new();
        let module = module();
        let a = module.create_instance("N.A", &[]).unwrap();
        let b = module.create_instance("N.A", &[]).unwrap();

        assert!(registry.update("z", a.clone()).is_none());
        assert!(registry.update("a", a.clone()).is_none());
        let previous = registry.update("z", b.clone()).unwrap();
        assert!(Instance::ptr_eq(&previous, &a));
        assert!(Instance::ptr_eq(&registry.get_or_null("z").unwrap(), &b));
        assert_eq!(registry.keys(), vec!["a".to_string(), "z".to_string()]);
        assert_eq!(registry.clear(), 2);
        assert!(registry.is_empty());
    }

    #[test]
    fn test_concurrent_callers_share_first_instance() {
        let registry = Arc::new(SingletonRegistry::new());
        let module = module();
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let registry = registry.clone();
                let module = module.clone();
                std::thread::spawn(move || {
                    registry
                        .create_or_get("shared", || module.create_instance("N.A", &[]).map_err(ForgeError::from))
                        .unwrap()
                })
            })
            .collect();
        let instances: Vec<Instance> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        for instance in &instances[1..] {
            assert!(Instance::ptr_eq(&instances[0], instance));
        }
        assert_eq!(registry.len(), 1);
    }
}
