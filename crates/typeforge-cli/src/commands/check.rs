//! `typeforge check`: compile a source file against the reference set.

use super::Session;
use anyhow::{bail, Context, Result};
use std::path::Path;
use typeforge_engine::{Compilation, CompilationOptions};

pub fn execute(session: &Session, source: &Path, warnings_as_errors: bool) -> Result<()> {
    let text = std::fs::read_to_string(source).with_context(|| format!("failed to read {}", source.display()))?;
    let locations = session.services.references().resolve()?;
    let options = CompilationOptions::library()
        .with_warnings_as_errors(warnings_as_errors || session.config.compile.warnings_as_errors);

    let name = source
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "check".to_string());
    let result = Compilation::create(&name, &text, &locations, options).emit();

    let file_name = source.display().to_string();
    if !result.diagnostics.is_empty() {
        result.diagnostics.emit(&file_name, &text)?;
    }
    if !result.success {
        bail!("{}: compilation failed", file_name);
    }
    println!("{}: ok ({} warning(s))", file_name, result.diagnostics.len());
    Ok(())
}
