//! Forge script compiler
//!
//! Turns checked source text into a binary [`ModuleImage`]:
//! - `checker`: name resolution, type checking and inheritance rules
//! - `metadata`: resolved class/member descriptions carried by images
//! - `module`: the checksummed binary image format
//! - `references`: metadata references (files and the built-in core library)
//! - `compilation`: the driver producing an [`EmitResult`]

pub mod checker;
pub mod compilation;
pub mod core_lib;
pub mod diagnostic;
pub mod metadata;
pub mod module;
pub mod references;

pub use compilation::{Compilation, CompilationOptions, EmitResult, OutputKind};
pub use core_lib::{CORE_LIB, CORE_LOCATIONS, CORE_RUNTIME};
pub use diagnostic::{Diagnostic, DiagnosticSeverity, Diagnostics};
pub use metadata::{ClassDef, ClassKind, FieldDef, MethodDef, ParamDef, PropertyDef, TypeSig, OBJECT_TYPE};
pub use module::{Dependency, ModuleError, ModuleImage};
pub use references::{MetadataReference, ReferenceError};
