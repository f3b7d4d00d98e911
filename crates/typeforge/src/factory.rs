//! Creating instances from loaded modules

use crate::error::{ForgeError, ForgeResult};
use std::sync::Arc;
use tracing::debug;
use typeforge_engine::{Instance, LoadedModule, Value};

/// Creates objects of a named type from a loaded module.
pub struct InstanceFactory;

impl InstanceFactory {
    /// Create a default instance: field initializers run base parts first,
    /// then the parameterless constructor if one is declared.
    pub fn create(module: &Arc<LoadedModule>, qualified_name: &str) -> ForgeResult<Instance> {
        Self::create_with_args(module, qualified_name, &[])
    }

    /// Create an instance through the constructor taking `args`.
    pub fn create_with_args(
        module: &Arc<LoadedModule>,
        qualified_name: &str,
        args: &[Value],
    ) -> ForgeResult<Instance> {
        if qualified_name.is_empty() {
            return Err(ForgeError::invalid("type name must not be empty"));
        }
        let instance = module.create_instance(qualified_name, args)?;
        debug!(
            type_name = qualified_name,
            module = module.name(),
            args = args.len(),
            "created instance"
        );
        Ok(instance)
    }
}
