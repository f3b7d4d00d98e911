//! Rendering a [`TypeModel`] to forge script text
//!
//! Rendering is a pure function of the model and the style, so the text
//! shown by `log`, written to disk and handed to the compiler is always the
//! same.

use crate::model::{ConstructorSpec, FieldSpec, Literal, MemberSpec, MethodSpec, PropertySpec, TypeModel};
use std::fmt::Write;
use typeforge_engine::parser::token::escape_string;

/// Placement of opening braces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Bracing {
    /// Opening brace on its own line
    #[default]
    C,
    /// Opening brace at the end of the header line
    Block,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderStyle {
    pub bracing: Bracing,
    pub indent_width: usize,
}

impl Default for RenderStyle {
    fn default() -> Self {
        Self {
            bracing: Bracing::C,
            indent_width: 4,
        }
    }
}

/// Turns a type model into source text.
pub trait CodeProvider: Send + Sync {
    /// Language name shown in logs
    fn language(&self) -> &str;

    fn generate(&self, model: &TypeModel, style: &RenderStyle) -> String;
}

/// Renders forge script, the language accepted by the embedded compiler.
#[derive(Debug, Clone, Copy, Default)]
pub struct ForgeScriptProvider;

const BANNER: &str = "\
//------------------------------------------------------------------------------
// <auto-generated>
//     This code was generated by typeforge.
//
//     Changes to this file may cause incorrect behavior and will be lost if
//     the code is regenerated.
// </auto-generated>
//------------------------------------------------------------------------------
";

impl CodeProvider for ForgeScriptProvider {
    fn language(&self) -> &str {
        "forge"
    }

    fn generate(&self, model: &TypeModel, style: &RenderStyle) -> String {
        let mut writer = SourceWriter::new(*style);
        writer.raw(BANNER);
        writer.blank();

        if !model.imports().is_empty() {
            for import in model.imports() {
                writer.line(&format!("using {};", import));
            }
            writer.blank();
        }

        writer.open(&format!("namespace {}", model.namespace()));

        let mut header = format!("{} class {}", model.visibility(), model.class_name());
        if !model.bases().is_empty() {
            let _ = write!(header, " : {}", model.bases().join(", "));
        }
        writer.open(&header);

        for (index, member) in model.members().iter().enumerate() {
            if index > 0 {
                writer.blank();
            }
            match member {
                MemberSpec::Field(field) => render_field(&mut writer, field),
                MemberSpec::Property(property) => render_property(&mut writer, property),
                MemberSpec::Constructor(ctor) => render_constructor(&mut writer, model, ctor),
                MemberSpec::Method(method) => render_method(&mut writer, method),
            }
        }

        writer.close();
        writer.close();
        writer.finish()
    }
}

/// Render with the default provider and style.
pub fn render(model: &TypeModel) -> String {
    ForgeScriptProvider.generate(model, &RenderStyle::default())
}

fn render_comment(writer: &mut SourceWriter, comment: Option<&str>) {
    if let Some(comment) = comment {
        for line in comment.lines() {
            writer.line(format!("// {}", line).trim_end());
        }
    }
}

fn render_literal(literal: &Literal) -> String {
    match literal {
        Literal::Null => "null".to_string(),
        Literal::Bool(b) => b.to_string(),
        Literal::Int(v) => v.to_string(),
        Literal::Float(v) => {
            let text = v.to_string();
            if text.contains('.') {
                text
            } else {
                format!("{}.0", text)
            }
        }
        Literal::String(s) => format!("\"{}\"", escape_string(s)),
    }
}

fn render_field(writer: &mut SourceWriter, field: &FieldSpec) {
    render_comment(writer, field.comment.as_deref());
    let mut line = format!("{} {} {}", field.visibility, field.ty, field.name);
    if let Some(value) = &field.default_value {
        let _ = write!(line, " = {}", render_literal(value));
    }
    line.push(';');
    writer.line(&line);
}

fn render_property(writer: &mut SourceWriter, property: &PropertySpec) {
    render_comment(writer, property.comment.as_deref());
    let accessors = if property.has_set { "{ get; set; }" } else { "{ get; }" };
    writer.line(&format!(
        "{} {} {} {}",
        property.visibility, property.ty, property.name, accessors
    ));
}

fn render_constructor(writer: &mut SourceWriter, model: &TypeModel, ctor: &ConstructorSpec) {
    let params: Vec<String> = ctor.params.iter().map(|p| format!("{} {}", p.ty, p.name)).collect();
    writer.open(&format!(
        "{} {}({})",
        ctor.visibility,
        model.class_name(),
        params.join(", ")
    ));
    for (field, param) in ctor.assignments() {
        writer.line(&format!("this.{} = {};", field, param));
    }
    writer.close();
}

fn render_method(writer: &mut SourceWriter, method: &MethodSpec) {
    render_comment(writer, method.comment.as_deref());
    for line in dedent(&method.text) {
        if line.is_empty() {
            writer.blank();
        } else {
            writer.line(&line);
        }
    }
}

/// Split raw member text into lines with surrounding blank lines dropped
/// and the common leading whitespace removed.
fn dedent(text: &str) -> Vec<String> {
    let lines: Vec<&str> = text.lines().map(str::trim_end).collect();
    let start = lines.iter().position(|l| !l.is_empty()).unwrap_or(lines.len());
    let end = lines.iter().rposition(|l| !l.is_empty()).map_or(start, |i| i + 1);
    let body = &lines[start..end];

    let indent = body
        .iter()
        .filter(|l| !l.is_empty())
        .map(|l| l.len() - l.trim_start().len())
        .min()
        .unwrap_or(0);

    body.iter()
        .map(|l| l.get(indent..).unwrap_or_else(|| l.trim_start()).to_string())
        .collect()
}

struct SourceWriter {
    style: RenderStyle,
    out: String,
    depth: usize,
}

impl SourceWriter {
    fn new(style: RenderStyle) -> Self {
        Self {
            style,
            out: String::new(),
            depth: 0,
        }
    }

    fn raw(&mut self, text: &str) {
        self.out.push_str(text);
    }

    fn blank(&mut self) {
        self.out.push('\n');
    }

    fn line(&mut self, text: &str) {
        let width = self.depth * self.style.indent_width;
        let _ = writeln!(self.out, "{:width$}{}", "", text, width = width);
    }

    fn open(&mut self, header: &str) {
        match self.style.bracing {
            Bracing::C => {
                self.line(header);
                self.line("{");
            }
            Bracing::Block => self.line(&format!("{} {{", header)),
        }
        self.depth += 1;
    }

    fn close(&mut self) {
        self.depth = self.depth.saturating_sub(1);
        self.line("}");
    }

    fn finish(self) -> String {
        self.out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ParamSpec, TypeRef, Visibility};

    fn model() -> TypeModel {
        TypeModel::new("Demo", "Widget", Visibility::Public).unwrap()
    }

    #[test]
    fn test_empty_class_layout() {
        let mut model = model();
        model.add_import("System").unwrap();
        let text = render(&model);
        let body = text.trim_start_matches(BANNER);
        assert_eq!(
            body,
            "\nusing System;\n\nnamespace Demo\n{\n    public class Widget\n    {\n    }\n}\n"
        );
    }

    #[test]
    fn test_members_in_insertion_order() {
        let mut model = model();
        model.add_base("Base").unwrap();
        model.add_base("System.IDisposable").unwrap();
        model
            .add_member(MemberSpec::Method(MethodSpec::new("public void Dispose() { }")))
            .unwrap();
        model
            .add_member(MemberSpec::Field(
                FieldSpec::new("count", TypeRef::Int)
                    .with_visibility(Visibility::Private)
                    .with_default(3)
                    .with_comment("how many"),
            ))
            .unwrap();
        model
            .add_member(MemberSpec::Property(PropertySpec::read_only("Id", TypeRef::String)))
            .unwrap();

        let text = render(&model);
        assert!(text.contains("    public class Widget : Base, System.IDisposable\n"));
        let dispose = text.find("public void Dispose()").unwrap();
        let comment = text.find("// how many").unwrap();
        let field = text.find("private int count = 3;").unwrap();
        let property = text.find("public string Id { get; }").unwrap();
        assert!(dispose < comment && comment < field && field < property);
    }

    #[test]
    fn test_constructor_assigns_backing_fields_only() {
        let mut model = model();
        model
            .add_member(MemberSpec::Constructor(ConstructorSpec::new(vec![
                ParamSpec::new(TypeRef::Int, "p1").with_backing_field("f1"),
                ParamSpec::new(TypeRef::String, "p2"),
                ParamSpec::new(TypeRef::Bool, "p3").with_backing_field("f3"),
            ])))
            .unwrap();
        let text = render(&model);
        assert!(text.contains(
            "        public Widget(int p1, string p2, bool p3)\n        {\n            this.f1 = p1;\n            this.f3 = p3;\n        }\n"
        ));
    }

    #[test]
    fn test_literals() {
        assert_eq!(render_literal(&Literal::Float(2.0)), "2.0");
        assert_eq!(render_literal(&Literal::Float(0.25)), "0.25");
        assert_eq!(render_literal(&Literal::String("a\"b\n".to_string())), "\"a\\\"b\\n\"");
        assert_eq!(render_literal(&Literal::Bool(true)), "true");
        assert_eq!(render_literal(&Literal::Null), "null");
    }

    #[test]
    fn test_method_text_is_reindented() {
        let mut model = model();
        model
            .add_member(MemberSpec::Method(MethodSpec::new(
                "\n        public int Two()\n        {\n            return 2;\n        }\n",
            )))
            .unwrap();
        let text = render(&model);
        assert!(text.contains("        public int Two()\n        {\n            return 2;\n        }\n"));
    }

    #[test]
    fn test_block_bracing() {
        let style = RenderStyle {
            bracing: Bracing::Block,
            indent_width: 2,
        };
        let text = ForgeScriptProvider.generate(&model(), &style);
        assert!(text.contains("namespace Demo {\n  public class Widget {\n  }\n}\n"));
    }

    #[test]
    fn test_rendering_is_deterministic() {
        let mut model = model();
        model.add_member(MemberSpec::Field(FieldSpec::new("a", TypeRef::Long))).unwrap();
        assert_eq!(render(&model), render(&model.clone()));
    }
}
