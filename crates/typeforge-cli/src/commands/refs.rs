//! `typeforge refs`: list the module locations offered to the compiler.

use super::Session;
use anyhow::Result;

pub fn execute(session: &Session, reload: bool) -> Result<()> {
    let references = session.services.references();
    if reload {
        references.request_reload();
    }
    for location in references.resolve()? {
        println!("{}", location);
    }
    Ok(())
}
