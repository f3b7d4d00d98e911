//! Metadata references: modules a compilation is checked against.

use crate::compiler::core_lib::{core_image, is_core_location};
use crate::compiler::module::{ModuleError, ModuleImage};
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReferenceError {
    #[error("Metadata file '{0}' could not be found")]
    NotFound(String),

    #[error("Metadata file '{location}' could not be opened: {source}")]
    Unreadable {
        location: String,
        #[source]
        source: ModuleError,
    },
}

/// A decoded module offered to the compiler as a dependency.
#[derive(Debug, Clone)]
pub struct MetadataReference {
    pub location: String,
    pub image: Arc<ModuleImage>,
}

impl MetadataReference {
    /// Resolve a location: `core:` names map to built-in images, anything
    /// else is read from disk and verified.
    pub fn from_location(location: &str) -> Result<Self, ReferenceError> {
        if is_core_location(location) {
            let image = core_image(location).ok_or_else(|| ReferenceError::NotFound(location.to_string()))?;
            return Ok(Self {
                location: location.to_string(),
                image,
            });
        }

        let path = Path::new(location);
        if !path.is_file() {
            return Err(ReferenceError::NotFound(location.to_string()));
        }
        let image = ModuleImage::read_from(path).map_err(|source| ReferenceError::Unreadable {
            location: location.to_string(),
            source,
        })?;
        Ok(Self {
            location: location.to_string(),
            image: Arc::new(image),
        })
    }

    pub fn is_core(&self) -> bool {
        self.image.is_core()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::core_lib::CORE_LIB;

    #[test]
    fn test_core_location_resolves_without_disk() {
        let reference = MetadataReference::from_location(CORE_LIB).unwrap();
        assert!(reference.is_core());
    }

    #[test]
    fn test_missing_file_is_not_found() {
        let err = MetadataReference::from_location("/definitely/not/here.tfm").unwrap_err();
        assert!(matches!(err, ReferenceError::NotFound(_)));
    }

    #[test]
    fn test_garbage_file_is_unreadable() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("junk.tfm");
        std::fs::write(&path, b"not a module").unwrap();
        let err = MetadataReference::from_location(path.to_str().unwrap()).unwrap_err();
        assert!(matches!(err, ReferenceError::Unreadable { .. }));
    }
}
