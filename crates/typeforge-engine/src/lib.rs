//! Typeforge script engine
//!
//! This crate provides the embedded compiler service and runtime used by the
//! `typeforge` type builder:
//! - **Parser**: lexer and recursive-descent parser for forge script (`parser` module)
//! - **Compiler**: checker, metadata references and binary module images (`compiler` module)
//! - **VM**: load contexts, the object model and the interpreter (`vm` module)
//!
//! # Example
//!
//! ```rust,ignore
//! use typeforge_engine::{Compilation, CompilationOptions, LoadContext, CORE_LOCATIONS};
//!
//! let source = r#"
//!     namespace Demo {
//!         public class Greeter {
//!             public string Greet(string name) { return "Hello " + name; }
//!         }
//!     }
//! "#;
//!
//! let refs: Vec<String> = CORE_LOCATIONS.iter().map(|s| s.to_string()).collect();
//! let result = Compilation::create("demo", source, &refs, CompilationOptions::library()).emit();
//! let module = LoadContext::default_context().load(&result.image.unwrap()).unwrap();
//! let greeter = module.create_instance("Demo.Greeter", &[]).unwrap();
//! let text = greeter.invoke("Greet", &["World".into()]).unwrap();
//! ```

#![warn(rust_2018_idioms)]
#![allow(clippy::result_large_err)]

/// Parser module: lexer, tokens and syntax tree
pub mod parser;

/// Compiler module: checker, diagnostics and module images
pub mod compiler;

/// VM module: load contexts, instances and the interpreter
pub mod vm;

// ============================================================================
// Re-exports
// ============================================================================

pub use parser::{ast, LexError, Lexer, ParseError, Parser, Span, Token};

pub use compiler::{
    ClassDef, Compilation, CompilationOptions, Diagnostic, DiagnosticSeverity, Diagnostics, EmitResult,
    MetadataReference, ModuleError, ModuleImage, OutputKind, ReferenceError, TypeSig, CORE_LIB, CORE_LOCATIONS,
    CORE_RUNTIME,
};

pub use vm::{
    ContextKind, Instance, Interpreter, LoadContext, LoadError, LoadedModule, RuntimeClass, RuntimeError,
    RuntimeResult, Value,
};

/// Extension of binary module image files.
pub const MODULE_EXTENSION: &str = "tfm";
