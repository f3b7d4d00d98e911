//! `typeforge build`: compile a model, create an instance and use it.

use super::{parse_value, report, source_name, Session};
use anyhow::{bail, Result};
use std::path::Path;
use typeforge::Value;

pub fn execute(session: &Session, model: &Path, args: &[String], invoke: Option<&[String]>) -> Result<()> {
    let mut builder = session.builder(model)?;
    let args: Vec<Value> = args.iter().map(|a| parse_value(a)).collect();

    let instance = match builder.create_instance_with(&args) {
        Ok(instance) => instance,
        Err(error) => return Err(report(error, &source_name(&builder), &builder.render_source_text())),
    };

    println!("{}", instance.qualified_name());
    for name in instance.field_names() {
        println!("  {} = {}", name, instance.get(&name)?);
    }

    if let Some(call) = invoke {
        let Some((method, rest)) = call.split_first() else {
            bail!("--invoke needs a method name");
        };
        let call_args: Vec<Value> = rest.iter().map(|a| parse_value(a)).collect();
        let result = instance.invoke(method, &call_args)?;
        println!("{}() -> {}", method, result);
    }
    Ok(())
}
