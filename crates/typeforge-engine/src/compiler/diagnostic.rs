//! Diagnostic infrastructure for compiler output
//!
//! Every problem the compiler finds becomes a [`Diagnostic`] with a stable
//! identifier, a severity and an optional source span. [`Diagnostics`] is the
//! ordered collection returned from an emit, and can render itself with source
//! context through `codespan-reporting`.

use crate::parser::token::Span;
use codespan_reporting::diagnostic::{Diagnostic as CsDiagnostic, Label, Severity};
use codespan_reporting::files::SimpleFile;
use codespan_reporting::term;
use codespan_reporting::term::termcolor::{ColorChoice, NoColor, StandardStream, WriteColor};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Diagnostic severity, lowest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum DiagnosticSeverity {
    Hidden,
    Info,
    Warning,
    Error,
}

impl fmt::Display for DiagnosticSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            DiagnosticSeverity::Hidden => "hidden",
            DiagnosticSeverity::Info => "info",
            DiagnosticSeverity::Warning => "warning",
            DiagnosticSeverity::Error => "error",
        };
        f.write_str(text)
    }
}

/// A single compiler message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnostic {
    /// Stable identifier (e.g. "TF0103")
    pub id: String,
    pub severity: DiagnosticSeverity,
    pub message: String,
    /// Location in the compiled text; `None` for reference problems
    pub span: Option<Span>,
    /// A warning promoted to an error by `warnings_as_errors`
    pub is_warning_as_error: bool,
}

impl Diagnostic {
    pub fn new(
        id: impl Into<String>,
        severity: DiagnosticSeverity,
        message: impl Into<String>,
        span: Option<Span>,
    ) -> Self {
        Self {
            id: id.into(),
            severity,
            message: message.into(),
            span,
            is_warning_as_error: false,
        }
    }

    pub fn error(id: impl Into<String>, message: impl Into<String>, span: Span) -> Self {
        Self::new(id, DiagnosticSeverity::Error, message, Some(span))
    }

    pub fn warning(id: impl Into<String>, message: impl Into<String>, span: Span) -> Self {
        Self::new(id, DiagnosticSeverity::Warning, message, Some(span))
    }

    /// Whether this diagnostic makes the compilation fail.
    pub fn is_blocking(&self) -> bool {
        self.severity == DiagnosticSeverity::Error || self.is_warning_as_error
    }

    /// Convert into a codespan diagnostic for the single compiled file.
    pub fn to_codespan(&self, source_len: usize) -> CsDiagnostic<()> {
        let severity = match self.severity {
            DiagnosticSeverity::Error => Severity::Error,
            DiagnosticSeverity::Warning if self.is_warning_as_error => Severity::Error,
            DiagnosticSeverity::Warning => Severity::Warning,
            DiagnosticSeverity::Info => Severity::Note,
            DiagnosticSeverity::Hidden => Severity::Help,
        };
        let mut diagnostic = CsDiagnostic::new(severity)
            .with_code(self.id.clone())
            .with_message(self.message.clone());
        if let Some(span) = self.span {
            let start = span.start.min(source_len);
            let end = span.end.clamp(start, source_len);
            diagnostic = diagnostic.with_labels(vec![Label::primary((), start..end)]);
        }
        if self.is_warning_as_error {
            diagnostic = diagnostic.with_notes(vec!["warning treated as error".to_string()]);
        }
        diagnostic
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let severity = if self.is_warning_as_error {
            DiagnosticSeverity::Error
        } else {
            self.severity
        };
        match self.span {
            Some(span) => write!(f, "({}): {} {}: {}", span, severity, self.id, self.message),
            None => write!(f, "{} {}: {}", severity, self.id, self.message),
        }
    }
}

/// Ordered collection of diagnostics from one compilation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Diagnostics(Vec<Diagnostic>);

impl Diagnostics {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        self.0.push(diagnostic);
    }

    pub fn extend(&mut self, diagnostics: impl IntoIterator<Item = Diagnostic>) {
        self.0.extend(diagnostics);
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Diagnostic> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Whether any diagnostic makes the compilation fail.
    pub fn has_errors(&self) -> bool {
        self.0.iter().any(Diagnostic::is_blocking)
    }

    /// Keep only errors and promoted warnings.
    pub fn into_blocking(self) -> Diagnostics {
        Diagnostics(self.0.into_iter().filter(Diagnostic::is_blocking).collect())
    }

    /// Whether a diagnostic with `id` is present.
    pub fn contains(&self, id: &str) -> bool {
        self.0.iter().any(|d| d.id == id)
    }

    /// Promote every warning to an error.
    pub fn promote_warnings(&mut self) {
        for diagnostic in &mut self.0 {
            if diagnostic.severity == DiagnosticSeverity::Warning {
                diagnostic.is_warning_as_error = true;
            }
        }
    }

    /// Sort by source position, keeping span-less diagnostics first.
    pub fn sort(&mut self) {
        self.0
            .sort_by_key(|d| d.span.map(|s| (s.start, s.end)).unwrap_or((0, 0)));
    }

    /// Render every diagnostic with source context to `writer`.
    pub fn emit_to(
        &self,
        writer: &mut dyn WriteColor,
        file_name: &str,
        source: &str,
    ) -> Result<(), codespan_reporting::files::Error> {
        let file = SimpleFile::new(file_name, source);
        let config = term::Config::default();
        for diagnostic in &self.0 {
            term::emit(writer, &config, &file, &diagnostic.to_codespan(source.len()))?;
        }
        Ok(())
    }

    /// Emit the diagnostics to stderr with colors
    pub fn emit(&self, file_name: &str, source: &str) -> Result<(), codespan_reporting::files::Error> {
        let mut writer = StandardStream::stderr(ColorChoice::Auto);
        self.emit_to(&mut writer, file_name, source)
    }

    /// Render without colors into a string (for logs and tests).
    pub fn render(&self, file_name: &str, source: &str) -> String {
        let mut writer = NoColor::new(Vec::new());
        if self.emit_to(&mut writer, file_name, source).is_err() {
            return self.to_string();
        }
        String::from_utf8_lossy(&writer.into_inner()).into_owned()
    }
}

impl fmt::Display for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, diagnostic) in self.0.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{}", diagnostic)?;
        }
        Ok(())
    }
}

impl IntoIterator for Diagnostics {
    type Item = Diagnostic;
    type IntoIter = std::vec::IntoIter<Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a Diagnostics {
    type Item = &'a Diagnostic;
    type IntoIter = std::slice::Iter<'a, Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl FromIterator<Diagnostic> for Diagnostics {
    fn from_iter<T: IntoIterator<Item = Diagnostic>>(iter: T) -> Self {
        Diagnostics(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Diagnostics {
        let mut diagnostics = Diagnostics::new();
        diagnostics.push(Diagnostic::warning("TF0162", "Unreachable code detected", Span::new(10, 14, 2, 3)));
        diagnostics.push(Diagnostic::error("TF0103", "The name 'x' does not exist", Span::new(4, 5, 1, 5)));
        diagnostics
    }

    #[test]
    fn test_blocking_filters_out_warnings() {
        let blocking = sample().into_blocking();
        assert_eq!(blocking.len(), 1);
        assert!(blocking.contains("TF0103"));
    }

    #[test]
    fn test_promoted_warning_is_blocking() {
        let mut diagnostics = sample();
        diagnostics.promote_warnings();
        assert_eq!(diagnostics.into_blocking().len(), 2);
    }

    #[test]
    fn test_display_includes_position_and_id() {
        let text = sample().to_string();
        assert!(text.contains("(1:5): error TF0103"));
        assert!(text.contains("warning TF0162"));
    }

    #[test]
    fn test_render_shows_source_context() {
        let source = "int x\n  foo y;";
        let rendered = sample().render("demo.tf", source);
        assert!(rendered.contains("TF0103"));
        assert!(rendered.contains("demo.tf"));
    }

    #[test]
    fn test_span_out_of_range_is_clamped() {
        let diagnostic = Diagnostic::error("TF1002", "; expected", Span::new(50, 60, 1, 1));
        let cs = diagnostic.to_codespan(5);
        assert_eq!(cs.labels[0].range, 5..5);
    }
}
