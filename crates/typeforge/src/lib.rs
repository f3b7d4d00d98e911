//! Typeforge
//!
//! Describe a class in code, render it to forge script, compile it with the
//! embedded compiler, load it and create instances of it at runtime.
//!
//! # Pipeline
//!
//! ```text
//! TypeBuilder ──▶ TypeModel ──▶ render ──▶ CompilerLoader ──▶ LoadedModule
//!                                              ▲                   │
//!                                   ReferenceSet                   ▼
//!                                                 InstanceFactory ──▶ Instance
//!                                                                        │
//!                                                       SingletonRegistry ◀┘
//! ```
//!
//! # Modules
//!
//! - [`model`]: the type description and member specs
//! - [`builder`]: fluent construction with lifecycle hooks
//! - [`render`]: model to source text
//! - [`references`]: module locations offered to the compiler
//! - [`pipeline`]: compile and load
//! - [`factory`]: instance creation
//! - [`registry`]: keyed instance cache
//! - [`hooks`]: lifecycle hooks and the run-once gate
//! - [`services`]: shared state passed to builders
//! - [`config`]: `typeforge.toml`
//! - [`logging`]: subscriber setup and log sinks

#![warn(rust_2018_idioms)]
#![allow(clippy::result_large_err)]

pub mod builder;
pub mod config;
pub mod error;
pub mod factory;
pub mod hooks;
pub mod logging;
pub mod model;
pub mod pipeline;
pub mod references;
pub mod registry;
pub mod render;
pub mod services;

pub use builder::{BuilderOptions, TypeBuilder};
pub use config::{ConfigError, ForgeConfig};
pub use error::{ForgeError, ForgeResult};
pub use factory::InstanceFactory;
pub use hooks::{HookError, HookFailurePolicy, LifecycleHooks, OnceGate, Phase, Stage};
pub use logging::{init_logging, BufferSink, LogSink, TracingSink};
pub use model::{
    ConstructorSpec, FieldSpec, Literal, MemberSpec, MethodSpec, ParamSpec, PropertySpec, TypeModel, TypeRef,
    Visibility,
};
pub use pipeline::CompilerLoader;
pub use references::{DedupPolicy, ReferenceSet, ScanOptions};
pub use registry::SingletonRegistry;
pub use render::{render, Bracing, CodeProvider, ForgeScriptProvider, RenderStyle};
pub use services::{LoadMode, Services};

pub use typeforge_engine::{Diagnostic, DiagnosticSeverity, Diagnostics, Instance, LoadError, LoadedModule, RuntimeError, Value};
