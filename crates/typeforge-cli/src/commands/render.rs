//! `typeforge render`: print or write the source text for a model.

use super::Session;
use anyhow::Result;
use std::path::Path;

pub fn execute(session: &Session, model: &Path, output: Option<&Path>) -> Result<()> {
    let builder = session.builder(model)?;
    match output {
        Some(path) => {
            builder.write_source_file(path)?;
            println!("Wrote {}", path.display());
        }
        None => print!("{}", builder.render_source_text()),
    }
    Ok(())
}
