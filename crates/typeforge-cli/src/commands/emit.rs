//! `typeforge emit`: write a model's compiled module image to disk.

use super::{report, source_name, Session};
use anyhow::{Context, Result};
use std::path::Path;

pub fn execute(session: &Session, model: &Path, output: &Path) -> Result<()> {
    let builder = session.builder(model)?;
    let source = builder.render_source_text();
    let locations = session.services.references().resolve()?;

    let image = match session.services.loader().compile(&source, &locations) {
        Ok(image) => image,
        Err(error) => return Err(report(error, &source_name(&builder), &source)),
    };
    std::fs::write(output, &image).with_context(|| format!("failed to write {}", output.display()))?;
    println!("Wrote {} ({} bytes)", output.display(), image.len());
    Ok(())
}
