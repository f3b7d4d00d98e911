//! Compile rendered source and load the result into a load context

use crate::error::{ForgeError, ForgeResult};
use std::sync::Arc;
use tracing::{debug, info, warn};
use typeforge_engine::compiler::core_lib::is_core_location;
use typeforge_engine::{Compilation, CompilationOptions, LoadContext, LoadedModule};

/// Compiles one source text per call into an independent module.
#[derive(Debug, Clone, Default)]
pub struct CompilerLoader {
    options: CompilationOptions,
}

/// Random module name for one compile attempt.
fn unit_name() -> String {
    format!("typeforge_{}", hex::encode(rand::random::<[u8; 8]>()))
}

impl CompilerLoader {
    pub fn new(options: CompilationOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &CompilationOptions {
        &self.options
    }

    /// Compile `source` against `locations` and return the encoded image.
    /// Fails with the blocking diagnostics when compilation fails.
    pub fn compile(&self, source: &str, locations: &[String]) -> ForgeResult<Vec<u8>> {
        let name = unit_name();
        debug!(%name, references = locations.len(), "compiling");
        let result = Compilation::create(&name, source, locations, self.options.clone()).emit();

        match result.image {
            Some(image) if result.success => {
                if !result.diagnostics.is_empty() {
                    debug!(%name, warnings = result.diagnostics.len(), "compiled with warnings");
                }
                Ok(image)
            }
            _ => {
                let blocking = result.diagnostics.into_blocking();
                warn!(%name, errors = blocking.len(), "compilation failed\n{}", source);
                Err(ForgeError::Compilation(blocking))
            }
        }
    }

    /// Load `image` into `context`. Non-core modules it was compiled against
    /// are loaded first; loading the same bytes twice is a no-op.
    pub fn load(&self, image: &[u8], context: &LoadContext) -> ForgeResult<Arc<LoadedModule>> {
        let decoded = typeforge_engine::ModuleImage::decode(image).map_err(typeforge_engine::LoadError::from)?;
        for dependency in &decoded.dependencies {
            if is_core_location(&dependency.location) || context.find_module(&dependency.name).is_some() {
                continue;
            }
            let bytes = std::fs::read(&dependency.location)?;
            context.load(&bytes)?;
            debug!(module = %dependency.name, location = %dependency.location, "loaded dependency");
        }

        let module = context.load(image)?;
        info!(
            module = module.name(),
            context = context.name(),
            resident = context.resident_count(),
            "loaded compiled module"
        );
        Ok(module)
    }

    pub fn compile_and_load(
        &self,
        source: &str,
        locations: &[String],
        context: &LoadContext,
    ) -> ForgeResult<Arc<LoadedModule>> {
        let image = self.compile(source, locations)?;
        self.load(&image, context)
    }
}
