//! Command implementations

pub mod build;
pub mod check;
pub mod emit;
pub mod refs;
pub mod render;

use crate::model_file::ModelFile;
use anyhow::{anyhow, Context, Result};
use std::path::Path;
use std::sync::Arc;
use typeforge::{ForgeConfig, ForgeError, Services, TypeBuilder, Value};

/// Configuration and services shared by every command.
pub struct Session {
    pub config: ForgeConfig,
    pub services: Arc<Services>,
}

impl Session {
    pub fn open(config_path: Option<&Path>) -> Result<Self> {
        let config = match config_path {
            Some(path) => {
                ForgeConfig::from_file(path).with_context(|| format!("failed to load config {}", path.display()))?
            }
            None => ForgeConfig::discover(&std::env::current_dir()?)?,
        };
        typeforge::init_logging(Some(&config.log.filter));
        tracing::debug!(
            directory = ?config.references.directory,
            mode = ?config.load.mode,
            "configuration loaded"
        );
        let services = Arc::new(Services::from_config(&config));
        Ok(Self { config, services })
    }

    pub fn builder(&self, model: &Path) -> Result<TypeBuilder> {
        ModelFile::from_file(model)?.into_builder(self.services.clone())
    }
}

/// Print compile diagnostics against `source`, then convert the error.
pub fn report(error: ForgeError, file_name: &str, source: &str) -> anyhow::Error {
    match error.diagnostics() {
        Some(diagnostics) => {
            if diagnostics.emit(file_name, source).is_err() {
                eprintln!("{}", diagnostics);
            }
            anyhow!("compilation failed with {} error(s)", diagnostics.len())
        }
        None => error.into(),
    }
}

/// Parse a command-line value: null, true/false, integers, decimals, or text.
pub fn parse_value(text: &str) -> Value {
    match text {
        "null" => return Value::Null,
        "true" => return Value::Bool(true),
        "false" => return Value::Bool(false),
        _ => {}
    }
    if let Ok(int) = text.parse::<i32>() {
        return Value::Int(int);
    }
    if let Ok(long) = text.parse::<i64>() {
        return Value::Long(long);
    }
    if text.contains('.') {
        if let Ok(double) = text.parse::<f64>() {
            return Value::Double(double);
        }
    }
    Value::str(text)
}

/// Source file name shown in diagnostics for a model.
pub fn source_name(builder: &TypeBuilder) -> String {
    format!("{}.fs", builder.model().qualified_name())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_value() {
        assert_eq!(parse_value("null"), Value::Null);
        assert_eq!(parse_value("true"), Value::Bool(true));
        assert_eq!(parse_value("-3"), Value::Int(-3));
        assert_eq!(parse_value("5000000000"), Value::Long(5_000_000_000));
        assert_eq!(parse_value("0.5"), Value::Double(0.5));
        assert_eq!(parse_value("Ada"), Value::str("Ada"));
        assert_eq!(parse_value("1e3"), Value::str("1e3"));
    }
}
