//! Object model: linked runtime classes, loaded modules and instances

use crate::compiler::metadata::{ClassDef, MethodDef, TypeSig, OBJECT_TYPE};
use crate::compiler::module::ModuleImage;
use crate::parser::ast::Visibility;
use crate::vm::interpreter::Interpreter;
use crate::vm::value::Value;
use crate::vm::{RuntimeError, RuntimeResult};
use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use std::fmt;
use std::sync::Arc;

/// A class whose base chain has been linked.
#[derive(Debug)]
pub struct RuntimeClass {
    pub def: ClassDef,
    /// `None` only for `System.Object` and interfaces
    pub base: Option<Arc<RuntimeClass>>,
    /// Name of the module that defined this class
    pub module_name: String,
}

/// A data member (field or property) as seen through a class chain.
#[derive(Debug, Clone)]
pub(crate) struct DataMember {
    pub ty: TypeSig,
    pub visibility: Visibility,
    /// Whether code outside the constructor may write it
    pub writable: bool,
    pub readable: bool,
}

impl RuntimeClass {
    pub fn qualified_name(&self) -> String {
        self.def.qualified_name()
    }

    /// This class followed by every base class, most derived first.
    pub fn ancestors(&self) -> impl Iterator<Item = &RuntimeClass> {
        std::iter::successors(Some(self), |class| class.base.as_deref())
    }

    /// Whether this class is `name`, derives from it, or implements it.
    pub fn is_subclass_of(&self, name: &str) -> bool {
        name == OBJECT_TYPE
            || self
                .ancestors()
                .any(|class| class.qualified_name() == name || class.def.interfaces.iter().any(|i| i == name))
    }

    /// Find a method by walking from this class toward the root.
    pub fn find_method(&self, name: &str) -> Option<(&RuntimeClass, &MethodDef)> {
        self.ancestors()
            .find_map(|class| class.def.method(name).map(|method| (class, method)))
    }

    pub(crate) fn data_member(&self, name: &str) -> Option<DataMember> {
        self.ancestors().find_map(|class| {
            if let Some(field) = class.def.field(name) {
                return Some(DataMember {
                    ty: field.ty.clone(),
                    visibility: field.visibility,
                    writable: !field.is_readonly,
                    readable: true,
                });
            }
            class.def.property(name).map(|property| DataMember {
                ty: property.ty.clone(),
                visibility: property.visibility,
                writable: property.has_set,
                readable: property.has_get,
            })
        })
    }
}

/// A module image that has been verified and linked into a load context.
pub struct LoadedModule {
    name: String,
    context: String,
    checksum: [u8; 32],
    image: ModuleImage,
    classes: FxHashMap<String, Arc<RuntimeClass>>,
}

impl LoadedModule {
    pub(crate) fn new(
        image: ModuleImage,
        context: String,
        checksum: [u8; 32],
        classes: FxHashMap<String, Arc<RuntimeClass>>,
    ) -> Self {
        Self {
            name: image.name.clone(),
            context,
            checksum,
            image,
            classes,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Name of the load context holding this module.
    pub fn context_name(&self) -> &str {
        &self.context
    }

    /// SHA-256 of the image bytes this module was loaded from.
    pub fn checksum(&self) -> &[u8; 32] {
        &self.checksum
    }

    pub fn image(&self) -> &ModuleImage {
        &self.image
    }

    pub fn class(&self, qualified_name: &str) -> Option<&Arc<RuntimeClass>> {
        self.classes.get(qualified_name)
    }

    /// Qualified names of the classes defined here, in declaration order.
    pub fn class_names(&self) -> Vec<String> {
        self.image.classes.iter().map(ClassDef::qualified_name).collect()
    }

    /// Create an instance of `qualified_name`, passing `args` to its constructor.
    pub fn create_instance(self: &Arc<Self>, qualified_name: &str, args: &[Value]) -> RuntimeResult<Instance> {
        let class = self
            .class(qualified_name)
            .cloned()
            .ok_or_else(|| RuntimeError::TypeNotFound(qualified_name.to_string()))?;
        Interpreter::new().construct(class, self.clone(), args)
    }
}

impl fmt::Debug for LoadedModule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoadedModule")
            .field("name", &self.name)
            .field("context", &self.context)
            .field("classes", &self.class_names())
            .finish()
    }
}

struct InstanceInner {
    class: Arc<RuntimeClass>,
    /// Keeps the defining module resident while the instance is alive
    module: Arc<LoadedModule>,
    slots: Mutex<FxHashMap<String, Value>>,
}

/// A shared handle to an object created from a loaded module.
///
/// Host access goes through [`Instance::get`], [`Instance::set`] and
/// [`Instance::invoke`], which only see public members.
#[derive(Clone)]
pub struct Instance(Arc<InstanceInner>);

impl Instance {
    pub(crate) fn allocate(class: Arc<RuntimeClass>, module: Arc<LoadedModule>) -> Self {
        Instance(Arc::new(InstanceInner {
            class,
            module,
            slots: Mutex::new(FxHashMap::default()),
        }))
    }

    /// Whether both handles refer to the same object.
    pub fn ptr_eq(a: &Instance, b: &Instance) -> bool {
        Arc::ptr_eq(&a.0, &b.0)
    }

    pub fn class(&self) -> &Arc<RuntimeClass> {
        &self.0.class
    }

    pub fn module(&self) -> &Arc<LoadedModule> {
        &self.0.module
    }

    /// Simple type name (without namespace).
    pub fn type_name(&self) -> &str {
        &self.0.class.def.name
    }

    pub fn qualified_name(&self) -> String {
        self.0.class.qualified_name()
    }

    pub fn is_instance_of(&self, name: &str) -> bool {
        self.0.class.is_subclass_of(name)
    }

    /// Identity hash, stable for the lifetime of the object.
    pub fn identity_hash(&self) -> i32 {
        let address = Arc::as_ptr(&self.0) as usize as u64;
        ((address >> 3) ^ (address >> 35)) as i32
    }

    /// Public fields and properties, base classes first, in declaration order.
    pub fn field_names(&self) -> Vec<String> {
        let mut chain: Vec<&RuntimeClass> = self.0.class.ancestors().collect();
        chain.reverse();
        let mut names = Vec::new();
        for class in chain {
            for name in &class.def.member_order {
                let public = class
                    .def
                    .field(name)
                    .map(|f| f.visibility == Visibility::Public)
                    .or_else(|| class.def.property(name).map(|p| p.visibility == Visibility::Public))
                    .unwrap_or(false);
                if public && !names.contains(name) {
                    names.push(name.clone());
                }
            }
        }
        names
    }

    fn public_member(&self, name: &str) -> RuntimeResult<DataMember> {
        match self.0.class.data_member(name) {
            Some(member) if member.visibility == Visibility::Public => Ok(member),
            _ => Err(self.member_not_found(name)),
        }
    }

    fn member_not_found(&self, name: &str) -> RuntimeError {
        RuntimeError::MemberNotFound {
            type_name: self.qualified_name(),
            member: name.to_string(),
        }
    }

    /// Read a public field or property.
    pub fn get(&self, name: &str) -> RuntimeResult<Value> {
        let member = self.public_member(name)?;
        if !member.readable {
            return Err(self.member_not_found(name));
        }
        Ok(self.slot(name).unwrap_or_else(|| Value::default_for(&member.ty)))
    }

    /// Write a public field or property. Get-only properties and readonly
    /// fields reject writes from outside the object.
    pub fn set(&self, name: &str, value: impl Into<Value>) -> RuntimeResult<()> {
        let member = self.public_member(name)?;
        if !member.writable {
            return Err(RuntimeError::ReadOnlyMember {
                type_name: self.qualified_name(),
                member: name.to_string(),
            });
        }
        let value = value.into();
        let actual = value.type_name();
        let stored = value.coerce(&member.ty).ok_or_else(|| RuntimeError::TypeMismatch {
            target: format!("{}.{}", self.qualified_name(), name),
            expected: member.ty.to_string(),
            actual,
        })?;
        self.set_slot(name, stored);
        Ok(())
    }

    /// Call a public method with virtual dispatch.
    pub fn invoke(&self, method: &str, args: &[Value]) -> RuntimeResult<Value> {
        Interpreter::new().invoke_public(self, method, args)
    }

    pub(crate) fn slot(&self, name: &str) -> Option<Value> {
        self.0.slots.lock().get(name).cloned()
    }

    pub(crate) fn set_slot(&self, name: &str, value: Value) {
        self.0.slots.lock().insert(name.to_string(), value);
    }
}

impl fmt::Debug for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let slots = self.0.slots.lock();
        let mut names: Vec<&String> = slots.keys().collect();
        names.sort();
        let mut debug = f.debug_struct(&self.qualified_name());
        for name in names {
            match &slots[name] {
                Value::Object(inner) if Instance::ptr_eq(inner, self) => debug.field(name, &"<self>"),
                Value::Object(inner) => debug.field(name, &inner.qualified_name()),
                other => debug.field(name, other),
            };
        }
        debug.finish()
    }
}
