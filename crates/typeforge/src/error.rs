//! Error types for the type builder

use crate::config::ConfigError;
use crate::hooks::HookError;
use thiserror::Error;
use typeforge_engine::{Diagnostics, LoadError, RuntimeError};

/// Errors raised while building, compiling or instantiating a type.
#[derive(Debug, Error)]
pub enum ForgeError {
    /// A builder argument was empty, malformed or not allowed
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The rendered source failed to compile. Holds only blocking
    /// diagnostics (errors and promoted warnings).
    #[error("Compilation failed with {count} error(s):\n{0}", count = .0.len())]
    Compilation(Diagnostics),

    /// The compiled module does not define the requested type
    #[error("Type '{0}' was not found in the compiled module")]
    TypeNotFound(String),

    /// The compiled image could not be loaded
    #[error("Failed to load compiled module: {0}")]
    LoadFailed(#[from] LoadError),

    /// No constructor accepts the given number of arguments
    #[error("Type '{type_name}' has no constructor taking {arity} argument(s)")]
    MissingConstructor { type_name: String, arity: usize },

    /// A lifecycle hook failed under the propagate policy
    #[error(transparent)]
    Hook(#[from] HookError),

    /// Code in the compiled type failed while running
    #[error("Runtime error: {0}")]
    Runtime(RuntimeError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl From<RuntimeError> for ForgeError {
    fn from(error: RuntimeError) -> Self {
        match error {
            RuntimeError::TypeNotFound(name) => ForgeError::TypeNotFound(name),
            RuntimeError::MissingConstructor { type_name, arity } => {
                ForgeError::MissingConstructor { type_name, arity }
            }
            other => ForgeError::Runtime(other),
        }
    }
}

impl ForgeError {
    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        ForgeError::InvalidArgument(message.into())
    }

    /// Diagnostics of a failed compilation.
    pub fn diagnostics(&self) -> Option<&Diagnostics> {
        match self {
            ForgeError::Compilation(diagnostics) => Some(diagnostics),
            _ => None,
        }
    }
}

/// Result alias for builder operations
pub type ForgeResult<T> = Result<T, ForgeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_runtime_errors_map_to_specific_variants() {
        let err: ForgeError = RuntimeError::TypeNotFound("A.B".to_string()).into();
        assert!(matches!(err, ForgeError::TypeNotFound(name) if name == "A.B"));

        let err: ForgeError = RuntimeError::MissingConstructor {
            type_name: "A.B".to_string(),
            arity: 2,
        }
        .into();
        assert!(matches!(err, ForgeError::MissingConstructor { arity: 2, .. }));

        let err: ForgeError = RuntimeError::DivideByZero.into();
        assert!(matches!(err, ForgeError::Runtime(RuntimeError::DivideByZero)));
    }
}
