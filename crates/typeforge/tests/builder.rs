//! End-to-end tests for the builder pipeline
//!
//! Tests cover:
//! - Rendering determinism and member order
//! - Property accessor validation
//! - Constructor backing-field assignments at runtime
//! - Compile failures surfacing diagnostics
//! - Comments and integer boundary values reaching the compiler
//! - Singleton caching through the builder
//! - The run-once hook and hook failure policies

use parking_lot::Mutex;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use typeforge::{
    BuilderOptions, ConstructorSpec, FieldSpec, ForgeConfig, ForgeError, HookError, HookFailurePolicy, Instance,
    MethodSpec, ParamSpec, PropertySpec, Services, Stage, TypeBuilder, TypeRef, Value,
};

fn services_with(configure: impl FnOnce(&mut ForgeConfig)) -> Arc<Services> {
    let mut config = ForgeConfig::default();
    config.references.directory = Some(PathBuf::from("/nonexistent/typeforge/refs"));
    configure(&mut config);
    Arc::new(Services::from_config(&config))
}

fn services() -> Arc<Services> {
    services_with(|_| {})
}

fn greeter(services: Arc<Services>) -> TypeBuilder {
    let mut builder = TypeBuilder::with_services(BuilderOptions::new("Demo", "Greeter"), services).unwrap();
    builder
        .add_field(FieldSpec::new("greeting", TypeRef::String).with_default("Hello"))
        .unwrap()
        .add_property(PropertySpec::new("Name", TypeRef::String).with_comment("Who to greet"))
        .unwrap()
        .add_method(MethodSpec::new(
            r#"
            public string Greet()
            {
                return greeting + ", " + Name + "!";
            }
            "#,
        ))
        .unwrap();
    builder
}

#[test]
fn test_render_is_deterministic_and_ordered() {
    let builder = greeter(services());
    let first = builder.render_source_text();
    assert_eq!(first, builder.render_source_text());

    let field = first.find("public string greeting = \"Hello\";").unwrap();
    let comment = first.find("// Who to greet").unwrap();
    let property = first.find("public string Name { get; set; }").unwrap();
    let method = first.find("public string Greet()").unwrap();
    assert!(field < comment && comment < property && property < method);
    assert!(first.starts_with("//---"));
    assert!(first.contains("using System;\n"));
}

#[test]
fn test_compiled_instance_runs_methods() {
    let mut builder = greeter(services());
    let instance = builder.create_instance().unwrap();
    assert_eq!(instance.qualified_name(), "Demo.Greeter");

    instance.set("Name", Value::Str("Ada".into())).unwrap();
    assert_eq!(instance.invoke("Greet", &[]).unwrap(), Value::Str("Hello, Ada!".into()));
}

#[test]
fn test_get_only_property() {
    let mut builder = TypeBuilder::with_services(BuilderOptions::new("Demo", "Reading"), services()).unwrap();
    builder
        .add_property(PropertySpec::read_only("Value", TypeRef::Int))
        .unwrap();
    assert!(builder.render_source_text().contains("public int Value { get; }"));

    let before = builder.render_source_text();
    for (has_get, has_set) in [(false, true), (false, false)] {
        let err = builder
            .add_property(PropertySpec::new("Broken", TypeRef::Int).with_accessors(has_get, has_set))
            .unwrap_err();
        assert!(matches!(err, ForgeError::InvalidArgument(_)));
    }
    assert_eq!(builder.render_source_text(), before);

    let instance = builder.create_instance().unwrap();
    assert!(instance.set("Value", Value::Int(1)).is_err());
}

#[test]
fn test_constructor_assigns_backing_fields() {
    let mut builder = TypeBuilder::with_services(BuilderOptions::new("Demo", "Triple"), services()).unwrap();
    builder
        .add_fields([FieldSpec::new("x", TypeRef::Int), FieldSpec::new("z", TypeRef::Int)])
        .unwrap()
        .add_constructor(ConstructorSpec::new(vec![
            ParamSpec::new(TypeRef::Int, "a").with_backing_field("x"),
            ParamSpec::new(TypeRef::String, "note"),
            ParamSpec::new(TypeRef::Int, "c").with_backing_field("z"),
        ]))
        .unwrap();

    let text = builder.render_source_text();
    let body = "        public Triple(int a, string note, int c)\n        {\n            this.x = a;\n            this.z = c;\n        }\n";
    assert!(text.contains(body), "{}", text);

    let instance = builder
        .create_instance_with(&[Value::Int(5), Value::Str("ignored".into()), Value::Int(7)])
        .unwrap();
    assert_eq!(instance.get("x").unwrap(), Value::Int(5));
    assert_eq!(instance.get("z").unwrap(), Value::Int(7));

    let err = builder.create_instance().unwrap_err();
    assert!(matches!(err, ForgeError::MissingConstructor { arity: 0, .. }));
}

#[test]
fn test_syntax_error_yields_diagnostics() {
    let mut builder = TypeBuilder::with_services(BuilderOptions::new("Demo", "Broken"), services()).unwrap();
    builder
        .add_method(MethodSpec::new("public int One() { return 1 }"))
        .unwrap();

    let err = builder.create_instance().unwrap_err();
    let diagnostics = err.diagnostics().expect("compilation error");
    assert!(diagnostics.has_errors());
    assert!(!diagnostics.is_empty());
    assert!(builder.services().registry().is_empty());
}

#[test]
fn test_comments_in_method_bodies() {
    let mut builder = TypeBuilder::with_services(BuilderOptions::new("Demo", "Commented"), services()).unwrap();
    builder
        .add_method(MethodSpec::new("public int One() { /* single */ return 1; }"))
        .unwrap()
        .add_method(MethodSpec::new(
            r#"
            /*
             * Doubles the input.
             **/
            public int Twice(int n)
            {
                // line comment
                return n /* inline */ * 2;
            }
            "#,
        ))
        .unwrap();

    let instance = builder.create_instance().unwrap();
    assert_eq!(instance.invoke("One", &[]).unwrap(), Value::Int(1));
    assert_eq!(instance.invoke("Twice", &[Value::Int(21)]).unwrap(), Value::Int(42));
}

#[test]
fn test_unterminated_comment_is_a_compile_error() {
    let mut builder = TypeBuilder::with_services(BuilderOptions::new("Demo", "Open"), services()).unwrap();
    builder
        .add_method(MethodSpec::new("public int One() { /* open\n return 1; }"))
        .unwrap();

    let err = builder.create_instance().unwrap_err();
    assert!(err.diagnostics().expect("compilation error").contains("TF1035"));
}

#[test]
fn test_integer_default_boundaries() {
    let mut builder = TypeBuilder::with_services(BuilderOptions::new("Demo", "Limits"), services()).unwrap();
    builder
        .add_fields([
            FieldSpec::new("intMin", TypeRef::Int).with_default(i32::MIN),
            FieldSpec::new("intMax", TypeRef::Int).with_default(i32::MAX),
            FieldSpec::new("longMin", TypeRef::Long).with_default(i64::MIN),
            FieldSpec::new("longMax", TypeRef::Long).with_default(i64::MAX),
        ])
        .unwrap();
    assert!(builder.render_source_text().contains("public int intMin = -2147483648;"));

    let instance = builder.create_instance().unwrap();
    assert_eq!(instance.get("intMin").unwrap(), Value::Int(i32::MIN));
    assert_eq!(instance.get("intMax").unwrap(), Value::Int(i32::MAX));
    assert_eq!(instance.get("longMin").unwrap(), Value::Long(i64::MIN));
    assert_eq!(instance.get("longMax").unwrap(), Value::Long(i64::MAX));

    let out_of_range = FieldSpec::new("big", TypeRef::Int).with_default(5_000_000_000i64);
    assert!(matches!(builder.add_field(out_of_range), Err(ForgeError::InvalidArgument(_))));
}

#[test]
fn test_singleton_identity_and_rebuild() {
    let mut builder = greeter(services());
    let first = builder.create_instance_of_singleton(Some("K")).unwrap();
    let second = builder.create_instance_of_singleton(Some("K")).unwrap();
    assert!(Instance::ptr_eq(&first, &second));
    let resident = builder.services().context().resident_count();

    builder.services().registry().delete("K").unwrap();
    let third = builder.create_instance_of_singleton(Some("K")).unwrap();
    assert!(!Instance::ptr_eq(&first, &third));
    assert_eq!(builder.services().context().resident_count(), resident + 1);
}

#[test]
fn test_singleton_failure_caches_nothing() {
    let mut builder = TypeBuilder::with_services(BuilderOptions::new("Demo", "Broken"), services()).unwrap();
    builder
        .add_method(MethodSpec::new("public void Bad() { undefined(); }"))
        .unwrap();
    assert!(builder.create_instance_of_singleton(None).is_err());
    assert!(!builder.services().registry().has("Demo.Broken"));
}

#[test]
fn test_once_hook_runs_once_per_services() {
    let services = services();
    let runs = Arc::new(AtomicUsize::new(0));
    for class in ["First", "Second", "Third"] {
        let runs = runs.clone();
        TypeBuilder::with_setup(BuilderOptions::new("Demo", class), services.clone(), move |hooks| {
            hooks.once(move || {
                runs.fetch_add(1, Ordering::SeqCst);
                Ok(())
            });
        })
        .unwrap();
    }
    assert_eq!(runs.load(Ordering::SeqCst), 1);
    assert!(services.once_gate().is_closed());
}

#[test]
fn test_builder_inside_once_hook_is_refused() {
    let services = services();
    let nested_failed = Arc::new(Mutex::new(None));
    let (captured, shared) = (nested_failed.clone(), services.clone());
    TypeBuilder::with_setup(BuilderOptions::new("Demo", "Outer"), services.clone(), move |hooks| {
        hooks.once(move || {
            let inner = TypeBuilder::with_setup(BuilderOptions::new("Demo", "Inner"), shared.clone(), |hooks| {
                hooks.once(|| Ok(()));
            });
            *captured.lock() = Some(matches!(inner, Err(ForgeError::Hook(_))));
            Ok(())
        });
    })
    .unwrap();

    assert_eq!(*nested_failed.lock(), Some(true));
    assert!(services.once_gate().is_closed());
}

#[test]
fn test_failed_once_hook_keeps_gate_open() {
    let services = services();
    let err = TypeBuilder::with_setup(BuilderOptions::new("Demo", "First"), services.clone(), |hooks| {
        hooks.once(|| Err(HookError::new("not ready")));
    })
    .err()
    .unwrap();
    assert!(matches!(err, ForgeError::Hook(HookError { point: None, .. })));
    assert!(!services.once_gate().is_closed());

    TypeBuilder::with_setup(BuilderOptions::new("Demo", "Second"), services.clone(), |hooks| {
        hooks.once(|| Ok(()));
    })
    .unwrap();
    assert!(services.once_gate().is_closed());
}

#[test]
fn test_hook_policy_from_config() {
    let services = services_with(|config| config.hooks.failure = HookFailurePolicy::Report);
    let order = Arc::new(Mutex::new(Vec::new()));
    let seen = order.clone();

    let mut builder = TypeBuilder::with_setup(BuilderOptions::new("Demo", "Noisy"), services, move |hooks| {
        hooks.before(Stage::AddField, || Err(HookError::new("first")));
        hooks.after(Stage::AddField, move || {
            seen.lock().push("after");
            Ok(())
        });
    })
    .unwrap();

    builder.add_field(FieldSpec::new("count", TypeRef::Int)).unwrap();
    assert_eq!(builder.model().fields().count(), 1);
    assert_eq!(*order.lock(), vec!["after"]);
    assert_eq!(builder.hooks().reported()[0].message, "first");
}

#[test]
fn test_implements_core_interface() {
    let mut builder = TypeBuilder::with_services(BuilderOptions::new("Demo", "Handle"), services()).unwrap();
    builder
        .add_inherit("IDisposable")
        .unwrap()
        .add_field(FieldSpec::new("closed", TypeRef::Bool).with_default(false))
        .unwrap()
        .add_method(MethodSpec::new("public void Dispose() { closed = true; }"))
        .unwrap();

    let instance = builder.create_instance().unwrap();
    assert!(instance.is_instance_of("System.IDisposable"));
    instance.invoke("Dispose", &[]).unwrap();
    assert_eq!(instance.get("closed").unwrap(), Value::Bool(true));
}

#[test]
fn test_missing_interface_member_is_a_compile_error() {
    let mut builder = TypeBuilder::with_services(BuilderOptions::new("Demo", "Leaky"), services()).unwrap();
    builder.add_inherit("System.IDisposable").unwrap();
    let err = builder.compile().unwrap_err();
    assert!(err.diagnostics().unwrap().contains("TF0535"));
}
