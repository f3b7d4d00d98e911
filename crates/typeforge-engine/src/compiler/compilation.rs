//! Compilation driver: source text + references in, module image out.

use crate::compiler::checker::Checker;
use crate::compiler::diagnostic::{Diagnostic, DiagnosticSeverity, Diagnostics};
use crate::compiler::module::ModuleImage;
use crate::compiler::references::{MetadataReference, ReferenceError};
use crate::parser::{ParseError, Parser};
use tracing::debug;

/// Kind of binary a compilation produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputKind {
    /// A loadable module with no entry point
    #[default]
    DynamicallyLinkedLibrary,
}

#[derive(Debug, Clone, Default)]
pub struct CompilationOptions {
    pub output_kind: OutputKind,
    /// Treat every warning as a blocking diagnostic
    pub warnings_as_errors: bool,
}

impl CompilationOptions {
    pub fn library() -> Self {
        Self::default()
    }

    pub fn with_warnings_as_errors(mut self, enabled: bool) -> Self {
        self.warnings_as_errors = enabled;
        self
    }
}

/// Outcome of [`Compilation::emit`].
#[derive(Debug, Clone)]
pub struct EmitResult {
    pub success: bool,
    /// Every diagnostic produced, in source order
    pub diagnostics: Diagnostics,
    /// Encoded module image; present exactly when `success` is true
    pub image: Option<Vec<u8>>,
}

/// One compilation unit with its metadata references.
#[derive(Debug, Clone)]
pub struct Compilation {
    name: String,
    source: String,
    references: Vec<MetadataReference>,
    /// Problems found while resolving reference locations
    reference_diagnostics: Diagnostics,
    options: CompilationOptions,
}

impl Compilation {
    /// Create a compilation. Locations that cannot be resolved are reported
    /// as `TF0006` when the compilation is emitted.
    pub fn create(
        name: impl Into<String>,
        source: impl Into<String>,
        locations: &[String],
        options: CompilationOptions,
    ) -> Self {
        let mut references = Vec::with_capacity(locations.len());
        let mut reference_diagnostics = Diagnostics::new();
        for location in locations {
            match MetadataReference::from_location(location) {
                Ok(reference) => references.push(reference),
                Err(error) => reference_diagnostics.push(reference_diagnostic(&error)),
            }
        }
        Self {
            name: name.into(),
            source: source.into(),
            references,
            reference_diagnostics,
            options,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn references(&self) -> &[MetadataReference] {
        &self.references
    }

    pub fn options(&self) -> &CompilationOptions {
        &self.options
    }

    /// Parse, check and encode.
    pub fn emit(&self) -> EmitResult {
        let mut diagnostics = self.reference_diagnostics.clone();

        let (unit, parse_errors) = Parser::new(&self.source).parse();
        let syntax_ok = parse_errors.is_empty();
        diagnostics.extend(parse_errors.iter().map(syntax_diagnostic));

        let mut image = None;
        if syntax_ok {
            let output = Checker::new(&unit, &self.references).check();
            diagnostics.extend(output.diagnostics);

            let mut module = ModuleImage::new(self.name.clone());
            module.dependencies = output.dependencies;
            module.namespaces = output.namespaces;
            module.classes = output.classes;
            image = Some(module);
        }

        if self.options.warnings_as_errors {
            diagnostics.promote_warnings();
        }
        diagnostics.sort();

        let bytes = match image {
            Some(module) if !diagnostics.has_errors() => match module.encode() {
                Ok(bytes) => Some(bytes),
                Err(error) => {
                    diagnostics.push(Diagnostic::new(
                        "TF7038",
                        DiagnosticSeverity::Error,
                        format!("Failed to emit module '{}': {}", self.name, error),
                        None,
                    ));
                    None
                }
            },
            _ => None,
        };

        let success = bytes.is_some();
        debug!(
            compilation = %self.name,
            success,
            diagnostics = diagnostics.len(),
            "emit finished"
        );
        EmitResult {
            success,
            diagnostics,
            image: bytes,
        }
    }
}

fn syntax_diagnostic(error: &ParseError) -> Diagnostic {
    Diagnostic::error(error.code, error.message.clone(), error.span)
}

fn reference_diagnostic(error: &ReferenceError) -> Diagnostic {
    Diagnostic::new("TF0006", DiagnosticSeverity::Error, error.to_string(), None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::core_lib::CORE_LOCATIONS;

    fn core() -> Vec<String> {
        CORE_LOCATIONS.iter().map(|s| s.to_string()).collect()
    }

    fn emit(source: &str, options: CompilationOptions) -> EmitResult {
        Compilation::create("test_unit", source, &core(), options).emit()
    }

    #[test]
    fn test_successful_emit_produces_decodable_image() {
        let result = emit(
            "using System;\nnamespace Demo\n{\n    public class Box\n    {\n        public int Size = 3;\n    }\n}\n",
            CompilationOptions::library(),
        );
        assert!(result.success, "{}", result.diagnostics);
        let image = ModuleImage::decode(result.image.as_deref().unwrap()).unwrap();
        assert_eq!(image.name, "test_unit");
        assert!(image.find_class("Demo.Box").is_some());
        assert!(image.dependencies.is_empty());
    }

    #[test]
    fn test_syntax_error_fails_without_image() {
        let result = emit("public class Box { public int Size() { return 1 } }", CompilationOptions::library());
        assert!(!result.success);
        assert!(result.image.is_none());
        assert!(result.diagnostics.contains("TF1002"));
    }

    #[test]
    fn test_missing_reference_is_tf0006() {
        let mut locations = core();
        locations.push("/no/such/module.tfm".to_string());
        let result = Compilation::create("x", "public class A { }", &locations, CompilationOptions::library()).emit();
        assert!(!result.success);
        assert!(result.diagnostics.contains("TF0006"));
    }

    #[test]
    fn test_warnings_only_block_when_promoted() {
        let source = "public class A { public int F() { return 1; int dead = 2; } }";
        let relaxed = emit(source, CompilationOptions::library());
        assert!(relaxed.success);
        assert!(relaxed.diagnostics.contains("TF0162"));

        let strict = emit(source, CompilationOptions::library().with_warnings_as_errors(true));
        assert!(!strict.success);
        assert_eq!(strict.diagnostics.clone().into_blocking().len(), 1);
    }

    #[test]
    fn test_diagnostics_render_with_codes() {
        let result = emit("public class A { int F() { return missing; } }", CompilationOptions::library());
        let rendered = result.diagnostics.render("A.tf", "public class A { int F() { return missing; } }");
        assert!(rendered.contains("TF0103"), "{}", rendered);
    }
}
