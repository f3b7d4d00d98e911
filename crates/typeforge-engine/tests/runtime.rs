//! End-to-end tests: compile forge script, load it, create and use instances
//!
//! Tests cover:
//! - Construction order and field initializers
//! - Constructor arguments and arity errors
//! - Virtual dispatch and ToString in concatenation
//! - Property access rules from the host
//! - Runtime errors (division by zero, recursion depth)
//! - Load context residency and collectable unloading

use std::sync::Arc;
use typeforge_engine::{
    Compilation, CompilationOptions, LoadContext, LoadedModule, RuntimeError, Value, CORE_LOCATIONS,
};

fn core() -> Vec<String> {
    CORE_LOCATIONS.iter().map(|s| s.to_string()).collect()
}

fn emit(name: &str, source: &str, locations: &[String]) -> Vec<u8> {
    let result = Compilation::create(name, source, locations, CompilationOptions::library()).emit();
    assert!(result.success, "{}", result.diagnostics.render("test.tf", source));
    result.image.unwrap()
}

fn build(context: &LoadContext, name: &str, source: &str) -> Arc<LoadedModule> {
    context.load(&emit(name, source, &core())).unwrap()
}

const ZOO: &str = r#"
using System;

namespace Zoo
{
    public class Animal
    {
        public string Name { get; set; }

        public virtual string Sound()
        {
            return "...";
        }

        public string Speak()
        {
            return Name + " says " + Sound();
        }

        public override string ToString()
        {
            return "Animal:" + Name;
        }
    }

    public class Dog : Animal
    {
        public Dog()
        {
            Name = "Rex";
        }

        public override string Sound()
        {
            return "Woof";
        }

        public string Tag()
        {
            return "[" + this + "]";
        }
    }
}
"#;

#[test]
fn test_virtual_dispatch_from_base_method() {
    let context = LoadContext::default_context();
    let module = build(&context, "zoo", ZOO);

    let dog = module.create_instance("Zoo.Dog", &[]).unwrap();
    assert_eq!(dog.invoke("Speak", &[]).unwrap(), Value::str("Rex says Woof"));

    let animal = module.create_instance("Zoo.Animal", &[]).unwrap();
    animal.set("Name", "Generic").unwrap();
    assert_eq!(animal.invoke("Speak", &[]).unwrap(), Value::str("Generic says ..."));
}

#[test]
fn test_concatenation_uses_tostring_override() {
    let context = LoadContext::default_context();
    let module = build(&context, "zoo", ZOO);
    let dog = module.create_instance("Zoo.Dog", &[]).unwrap();
    assert_eq!(dog.invoke("Tag", &[]).unwrap(), Value::str("[Animal:Rex]"));
}

#[test]
fn test_instance_reflection() {
    let context = LoadContext::default_context();
    let module = build(&context, "zoo", ZOO);
    let dog = module.create_instance("Zoo.Dog", &[]).unwrap();

    assert_eq!(dog.type_name(), "Dog");
    assert_eq!(dog.qualified_name(), "Zoo.Dog");
    assert!(dog.is_instance_of("Zoo.Animal"));
    assert!(dog.is_instance_of("System.Object"));
    assert_eq!(dog.field_names(), vec!["Name".to_string()]);

    let same = dog.invoke("Equals", &[Value::Object(dog.clone())]).unwrap();
    assert_eq!(same, Value::Bool(true));
    let other = module.create_instance("Zoo.Dog", &[]).unwrap();
    assert_eq!(dog.invoke("Equals", &[Value::Object(other)]).unwrap(), Value::Bool(false));
}

#[test]
fn test_unknown_type_and_member() {
    let context = LoadContext::default_context();
    let module = build(&context, "zoo", ZOO);

    let err = module.create_instance("Zoo.Cat", &[]).unwrap_err();
    assert_eq!(err, RuntimeError::TypeNotFound("Zoo.Cat".to_string()));

    let dog = module.create_instance("Zoo.Dog", &[]).unwrap();
    assert!(matches!(dog.invoke("Fly", &[]), Err(RuntimeError::MemberNotFound { .. })));
    assert!(matches!(dog.get("Legs"), Err(RuntimeError::MemberNotFound { .. })));
}

#[test]
fn test_base_parts_initialize_first() {
    let source = r#"
        namespace Order
        {
            public class Base
            {
                public int Seed = 5;
                public int Copy;
                public Base() { Copy = Seed; }
            }

            public class Derived : Base
            {
                public int Twice;
                public Derived() { Twice = Copy * 2; }
            }
        }
    "#;
    let context = LoadContext::default_context();
    let module = build(&context, "order", source);
    let derived = module.create_instance("Order.Derived", &[]).unwrap();

    assert_eq!(derived.get("Copy").unwrap(), Value::Int(5));
    assert_eq!(derived.get("Twice").unwrap(), Value::Int(10));
    assert_eq!(
        derived.field_names(),
        vec!["Seed".to_string(), "Copy".to_string(), "Twice".to_string()]
    );
}

#[test]
fn test_constructor_arguments() {
    let source = r#"
        namespace Geo
        {
            public class Point
            {
                public int X;
                public long Y;
                public Point(int x, long y) { this.X = x; this.Y = y; }
                public long Sum() { return X + Y; }
            }
        }
    "#;
    let context = LoadContext::default_context();
    let module = build(&context, "geo", source);

    let point = module.create_instance("Geo.Point", &[Value::Int(2), Value::Int(3)]).unwrap();
    assert_eq!(point.get("Y").unwrap(), Value::Long(3));
    assert_eq!(point.invoke("Sum", &[]).unwrap(), Value::Long(5));

    let err = module.create_instance("Geo.Point", &[]).unwrap_err();
    assert_eq!(
        err,
        RuntimeError::MissingConstructor {
            type_name: "Geo.Point".to_string(),
            arity: 0
        }
    );

    let err = module
        .create_instance("Geo.Point", &[Value::str("a"), Value::Int(1)])
        .unwrap_err();
    assert!(matches!(err, RuntimeError::TypeMismatch { .. }));
}

#[test]
fn test_get_only_property_rejects_host_writes() {
    let source = r#"
        public class Token
        {
            public string Id { get; }
            public Token() { Id = "abc"; }
        }
    "#;
    let context = LoadContext::default_context();
    let module = build(&context, "token", source);
    let token = module.create_instance("Token", &[]).unwrap();

    assert_eq!(token.get("Id").unwrap(), Value::str("abc"));
    let err = token.set("Id", "changed").unwrap_err();
    assert!(matches!(err, RuntimeError::ReadOnlyMember { .. }));
    assert_eq!(token.get("Id").unwrap(), Value::str("abc"));
}

#[test]
fn test_host_set_coerces_and_checks_types() {
    let source = "public class Box { public double Size; private int hidden; }";
    let context = LoadContext::default_context();
    let module = build(&context, "box", source);
    let b = module.create_instance("Box", &[]).unwrap();

    b.set("Size", 4).unwrap();
    assert_eq!(b.get("Size").unwrap(), Value::Double(4.0));
    assert!(matches!(b.set("Size", "big"), Err(RuntimeError::TypeMismatch { .. })));
    assert!(matches!(b.get("hidden"), Err(RuntimeError::MemberNotFound { .. })));
}

#[test]
fn test_string_intrinsics_and_loops() {
    let source = r#"
        public class Text
        {
            public string Shout(string s) { return s.Trim().ToUpper() + "!"; }

            public int Count(int n)
            {
                int total = 0;
                int i = 0;
                while (i < n)
                {
                    i += 1;
                    if (i % 2 == 0) { continue; }
                    total += i;
                }
                return total;
            }
        }
    "#;
    let context = LoadContext::default_context();
    let module = build(&context, "text", source);
    let text = module.create_instance("Text", &[]).unwrap();

    assert_eq!(text.invoke("Shout", &[Value::str("  hey ")]).unwrap(), Value::str("HEY!"));
    assert_eq!(text.invoke("Count", &[Value::Int(5)]).unwrap(), Value::Int(9));
    assert!(matches!(
        text.invoke("Shout", &[Value::Null]),
        Err(RuntimeError::NullReference(_))
    ));
}

#[test]
fn test_runtime_errors() {
    let source = r#"
        public class Calc
        {
            public int Div(int a, int b) { return a / b; }
            public int Down(int n) { return Down(n + 1); }
        }
    "#;
    let handle = std::thread::Builder::new()
        .stack_size(32 * 1024 * 1024)
        .spawn(move || {
            let context = LoadContext::default_context();
            let module = build(&context, "calc", source);
            let calc = module.create_instance("Calc", &[]).unwrap();

            assert_eq!(
                calc.invoke("Div", &[Value::Int(1), Value::Int(0)]),
                Err(RuntimeError::DivideByZero)
            );
            assert_eq!(
                calc.invoke("Div", &[Value::Int(1)]),
                Err(RuntimeError::ArgumentCount {
                    method: "Calc.Div".to_string(),
                    expected: 2,
                    actual: 1
                })
            );
            assert_eq!(
                calc.invoke("Down", &[Value::Int(0)]),
                Err(RuntimeError::StackOverflow(typeforge_engine::vm::interpreter::MAX_CALL_DEPTH))
            );
        })
        .unwrap();
    handle.join().unwrap();
}

#[test]
fn test_interface_implementation() {
    let source = r#"
        using System;
        public class Resource : IDisposable
        {
            public bool Closed;
            public void Dispose() { Closed = true; }
        }
    "#;
    let context = LoadContext::default_context();
    let module = build(&context, "res", source);
    let resource = module.create_instance("Resource", &[]).unwrap();

    assert!(resource.is_instance_of("System.IDisposable"));
    resource.invoke("Dispose", &[]).unwrap();
    assert_eq!(resource.get("Closed").unwrap(), Value::Bool(true));
}

#[test]
fn test_default_context_keeps_every_compile_resident() {
    let context = LoadContext::default_context();
    for (index, name) in ["unit_a", "unit_b", "unit_c"].iter().enumerate() {
        build(&context, name, "public class Same { }");
        assert_eq!(context.resident_count(), index + 1);
    }
}

#[test]
fn test_collectable_context_frees_after_last_instance() {
    let context = LoadContext::collectable("generation-1");
    let module = build(&context, "temp", "public class Temp { public int V = 1; }");
    let weak = Arc::downgrade(&module);
    let instance = module.create_instance("Temp", &[]).unwrap();
    drop(module);

    context.unload().unwrap();
    assert!(weak.upgrade().is_some(), "instance keeps its module alive");
    assert_eq!(instance.get("V").unwrap(), Value::Int(1));

    drop(instance);
    assert!(weak.upgrade().is_none());
}

#[test]
fn test_base_class_from_reference_module() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("shapes.tfm");
    let base = emit(
        "shapes",
        "namespace Shapes { public class Shape { public virtual string Kind() { return \"shape\"; } } }",
        &core(),
    );
    std::fs::write(&path, &base).unwrap();

    let mut locations = core();
    locations.push(path.to_string_lossy().into_owned());
    let derived = emit(
        "circles",
        "using Shapes;\nnamespace App { public class Circle : Shape { public override string Kind() { return \"circle\"; } } }",
        &locations,
    );

    let context = LoadContext::default_context();
    context.load(&base).unwrap();
    let module = context.load(&derived).unwrap();
    let circle = module.create_instance("App.Circle", &[]).unwrap();
    assert!(circle.is_instance_of("Shapes.Shape"));
    assert_eq!(circle.invoke("Kind", &[]).unwrap(), Value::str("circle"));
}
