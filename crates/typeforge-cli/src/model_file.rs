//! Model description files
//!
//! A TOML file describing one class:
//!
//! ```toml
//! namespace = "Demo"
//! class_name = "Greeter"
//! imports = ["System.Text"]
//! inherits = ["System.IDisposable"]
//!
//! [[fields]]
//! name = "greeting"
//! type = "string"
//! default = "Hello"
//!
//! [[properties]]
//! name = "Name"
//! type = "string"
//!
//! [constructor]
//! params = [{ type = "string", name = "name", field = "Name" }]
//!
//! [[methods]]
//! text = "public string Greet() { return greeting + \", \" + Name; }"
//! ```

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use typeforge::model::parse_visibility;
use typeforge::{
    BuilderOptions, ConstructorSpec, FieldSpec, Literal, MethodSpec, ParamSpec, PropertySpec, Services, TypeBuilder,
    TypeRef,
};

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ModelFile {
    pub namespace: String,
    pub class_name: String,
    #[serde(default = "default_visibility")]
    pub visibility: String,
    #[serde(default)]
    pub imports: Vec<String>,
    #[serde(default)]
    pub inherits: Vec<String>,
    /// Module files to compile against, relative to the model file
    #[serde(default)]
    pub references: Vec<PathBuf>,
    #[serde(default)]
    pub fields: Vec<FieldEntry>,
    #[serde(default)]
    pub properties: Vec<PropertyEntry>,
    pub constructor: Option<ConstructorEntry>,
    #[serde(default)]
    pub methods: Vec<MethodEntry>,
}

fn default_visibility() -> String {
    "public".to_string()
}

fn yes() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FieldEntry {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: String,
    pub default: Option<toml::Value>,
    #[serde(default = "default_visibility")]
    pub visibility: String,
    pub comment: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PropertyEntry {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: String,
    #[serde(default = "default_visibility")]
    pub visibility: String,
    pub comment: Option<String>,
    #[serde(default = "yes")]
    pub get: bool,
    #[serde(default = "yes")]
    pub set: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConstructorEntry {
    #[serde(default = "default_visibility")]
    pub visibility: String,
    #[serde(default)]
    pub params: Vec<ParamEntry>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ParamEntry {
    #[serde(rename = "type")]
    pub ty: String,
    pub name: String,
    /// Field assigned from this parameter
    pub field: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MethodEntry {
    pub text: String,
    pub comment: Option<String>,
}

fn literal(value: &toml::Value) -> Result<Literal> {
    Ok(match value {
        toml::Value::String(s) => Literal::String(s.clone()),
        toml::Value::Integer(i) => Literal::Int(*i),
        toml::Value::Float(f) => Literal::Float(*f),
        toml::Value::Boolean(b) => Literal::Bool(*b),
        other => bail!("unsupported default value: {}", other),
    })
}

impl ModelFile {
    pub fn from_file(path: &Path) -> Result<Self> {
        let content =
            std::fs::read_to_string(path).with_context(|| format!("failed to read model {}", path.display()))?;
        let mut model = Self::from_str(&content).with_context(|| format!("invalid model {}", path.display()))?;
        if let Some(dir) = path.parent() {
            for reference in &mut model.references {
                if reference.is_relative() {
                    *reference = dir.join(&*reference);
                }
            }
        }
        Ok(model)
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Create a builder on `services` and add everything the file describes.
    pub fn into_builder(self, services: Arc<Services>) -> Result<TypeBuilder> {
        let options = BuilderOptions::new(&self.namespace, &self.class_name)
            .with_visibility(parse_visibility(&self.visibility)?);
        let mut builder = TypeBuilder::with_services(options, services)?;

        builder.add_namespaces(&self.imports)?;
        for base in &self.inherits {
            builder.add_inherit(base)?;
        }
        let references: Vec<String> = self
            .references
            .iter()
            .map(|p| p.to_string_lossy().into_owned())
            .collect();
        builder.add_references(&references)?;

        let mut fields = Vec::with_capacity(self.fields.len());
        for entry in &self.fields {
            let mut field = FieldSpec::new(&entry.name, TypeRef::parse(&entry.ty)?)
                .with_visibility(parse_visibility(&entry.visibility)?);
            if let Some(value) = &entry.default {
                field = field.with_default(literal(value).with_context(|| format!("field '{}'", entry.name))?);
            }
            if let Some(comment) = &entry.comment {
                field = field.with_comment(comment);
            }
            fields.push(field);
        }
        builder.add_fields(fields)?;

        let mut properties = Vec::with_capacity(self.properties.len());
        for entry in &self.properties {
            let mut property = PropertySpec::new(&entry.name, TypeRef::parse(&entry.ty)?)
                .with_accessors(entry.get, entry.set)
                .with_visibility(parse_visibility(&entry.visibility)?);
            if let Some(comment) = &entry.comment {
                property = property.with_comment(comment);
            }
            properties.push(property);
        }
        builder.add_properties(properties)?;

        if let Some(ctor) = &self.constructor {
            let mut params = Vec::with_capacity(ctor.params.len());
            for entry in &ctor.params {
                let mut param = ParamSpec::new(TypeRef::parse(&entry.ty)?, &entry.name);
                if let Some(field) = &entry.field {
                    param = param.with_backing_field(field);
                }
                params.push(param);
            }
            builder.add_constructor(ConstructorSpec::new(params).with_visibility(parse_visibility(&ctor.visibility)?))?;
        }

        let methods = self.methods.iter().map(|entry| {
            let method = MethodSpec::new(&entry.text);
            match &entry.comment {
                Some(comment) => method.with_comment(comment),
                None => method,
            }
        });
        builder.add_methods(methods)?;

        Ok(builder)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use typeforge::{ForgeConfig, Value};

    fn services() -> Arc<Services> {
        let mut config = ForgeConfig::default();
        config.references.directory = Some(PathBuf::from("/nonexistent/typeforge/refs"));
        Arc::new(Services::from_config(&config))
    }

    fn fixture() -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("fixtures/greeter.toml")
    }

    #[test]
    fn test_fixture_builds() {
        let model = ModelFile::from_file(&fixture()).unwrap();
        assert_eq!(model.class_name, "Greeter");

        let mut builder = model.into_builder(services()).unwrap();
        let text = builder.render_source_text();
        assert!(text.contains("public Greeter(string name)"));
        assert!(text.contains("this.Name = name;"));

        let greeter = builder.create_instance_with(&[Value::str("Ada")]).unwrap();
        assert_eq!(greeter.invoke("Greet", &[]).unwrap(), Value::str("Hello, Ada!"));
    }

    #[test]
    fn test_defaults_and_literals() {
        let model = ModelFile::from_str(
            r#"
            namespace = "Demo"
            class_name = "Flags"

            [[fields]]
            name = "on"
            type = "bool"
            default = true

            [[fields]]
            name = "ratio"
            type = "double"
            default = 2.0
            "#,
        )
        .unwrap();
        assert_eq!(model.visibility, "public");
        let text = model.into_builder(services()).unwrap().render_source_text();
        assert!(text.contains("public bool on = true;"));
        assert!(text.contains("public double ratio = 2.0;"));
    }

    #[test]
    fn test_invalid_entries() {
        assert!(ModelFile::from_str("namespace = \"Demo\"").is_err());
        assert!(ModelFile::from_str("namespace = \"Demo\"\nclass_name = \"A\"\ncolour = 1").is_err());

        let model = ModelFile::from_str(
            "namespace = \"Demo\"\nclass_name = \"A\"\n[[properties]]\nname = \"P\"\ntype = \"int\"\nget = false\n",
        )
        .unwrap();
        assert!(model.into_builder(services()).is_err());

        let model = ModelFile::from_str(
            "namespace = \"Demo\"\nclass_name = \"A\"\n[[fields]]\nname = \"f\"\ntype = \"int\"\ndefault = [1]\n",
        )
        .unwrap();
        assert!(model.into_builder(services()).is_err());
    }
}
