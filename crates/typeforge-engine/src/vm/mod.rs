//! Forge script runtime
//!
//! - Load contexts that verify, link and keep module images resident
//! - Runtime classes and reflective instances
//! - A tree-walking interpreter for method and constructor bodies

pub mod context;
pub mod interpreter;
mod linker;
pub mod object;
pub mod value;

pub use context::{ContextKind, LoadContext};
pub use interpreter::Interpreter;
pub use object::{Instance, LoadedModule, RuntimeClass};
pub use value::Value;

use crate::compiler::module::ModuleError;

/// Errors raised while loading a module image into a context.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    /// The image failed verification or decoding
    #[error("Invalid module image: {0}")]
    Module(#[from] ModuleError),

    /// A base class or interface could not be found in the module, the
    /// context or the core library
    #[error("Could not resolve type '{base}' required by '{class}'")]
    UnresolvedType { class: String, base: String },

    /// Base classes form a cycle
    #[error("Circular base type dependency involving '{0}'")]
    CircularBase(String),

    /// A different module with the same name is already resident
    #[error("A different module named '{0}' is already loaded in this context")]
    DuplicateModule(String),

    /// The context has been unloaded
    #[error("Load context '{0}' has been unloaded")]
    ContextUnloaded(String),

    /// Default contexts keep their modules for the process lifetime
    #[error("Load context '{0}' is not collectable")]
    NotCollectable(String),
}

/// Errors raised while creating instances or running code.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RuntimeError {
    #[error("Type '{0}' was not found in the module")]
    TypeNotFound(String),

    #[error("Cannot create an instance of the abstract type or interface '{0}'")]
    AbstractType(String),

    #[error("Type '{type_name}' has no constructor taking {arity} arguments")]
    MissingConstructor { type_name: String, arity: usize },

    #[error("'{type_name}' does not contain an accessible member '{member}'")]
    MemberNotFound { type_name: String, member: String },

    #[error("Member '{type_name}.{member}' is read only")]
    ReadOnlyMember { type_name: String, member: String },

    #[error("'{method}' takes {expected} arguments but {actual} were given")]
    ArgumentCount {
        method: String,
        expected: usize,
        actual: usize,
    },

    #[error("Cannot convert value of type '{actual}' to '{expected}' for '{target}'")]
    TypeMismatch {
        target: String,
        expected: String,
        actual: String,
    },

    #[error("Object reference not set to an instance of an object ({0})")]
    NullReference(String),

    #[error("Attempted to divide by zero")]
    DivideByZero,

    #[error("Call depth exceeded {0}")]
    StackOverflow(usize),

    #[error("Type error: {0}")]
    TypeError(String),
}

/// Runtime result alias
pub type RuntimeResult<T> = Result<T, RuntimeError>;
