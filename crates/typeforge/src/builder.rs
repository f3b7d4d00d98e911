//! Fluent builder over a [`TypeModel`]
//!
//! Every `add_*` call validates its arguments first, then fires the stage's
//! `Before` hooks, mutates the model and fires the `After` hooks. Batch calls
//! validate every element before anything is added, so a rejected batch
//! leaves the model as it was.
//!
//! ```ignore
//! let mut builder = TypeBuilder::new(BuilderOptions::new("Demo", "Greeter"))?;
//! builder
//!     .add_property(PropertySpec::new("Name", TypeRef::String))?
//!     .add_method(MethodSpec::new("public string Hello() { return \"Hi \" + Name; }"))?;
//! let greeter = builder.create_instance()?;
//! ```

use crate::error::{ForgeError, ForgeResult};
use crate::factory::InstanceFactory;
use crate::hooks::{LifecycleHooks, Phase, Stage};
use crate::logging::{LogSink, TracingSink};
use crate::model::{ConstructorSpec, FieldSpec, MemberSpec, MethodSpec, PropertySpec, TypeModel, Visibility};
use crate::render::{CodeProvider, ForgeScriptProvider, RenderStyle};
use crate::services::Services;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};
use typeforge_engine::{Instance, LoadedModule, Value};

/// Settings fixed when a builder is created.
#[derive(Debug, Clone, PartialEq)]
pub struct BuilderOptions {
    pub namespace: String,
    /// Namespace imported by every model; `None` for no default import
    pub default_import: Option<String>,
    pub class_name: String,
    pub visibility: Visibility,
    /// Target of [`TypeBuilder::write_output_file`]
    pub output_path: Option<PathBuf>,
    /// Rescan the reference directory before the next compile
    pub reload_references: bool,
}

impl Default for BuilderOptions {
    fn default() -> Self {
        Self {
            namespace: "CodeDOM".to_string(),
            default_import: Some("System".to_string()),
            class_name: "CreatedClass".to_string(),
            visibility: Visibility::Public,
            output_path: None,
            reload_references: false,
        }
    }
}

impl BuilderOptions {
    pub fn new(namespace: impl Into<String>, class_name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            class_name: class_name.into(),
            ..Self::default()
        }
    }

    pub fn with_visibility(mut self, visibility: Visibility) -> Self {
        self.visibility = visibility;
        self
    }

    pub fn with_default_import(mut self, namespace: Option<&str>) -> Self {
        self.default_import = namespace.map(str::to_string);
        self
    }

    pub fn with_output_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.output_path = Some(path.into());
        self
    }

    pub fn with_reload_references(mut self, reload: bool) -> Self {
        self.reload_references = reload;
        self
    }
}

pub struct TypeBuilder {
    model: TypeModel,
    options: BuilderOptions,
    hooks: LifecycleHooks,
    services: Arc<Services>,
    provider: Arc<dyn CodeProvider>,
    style: RenderStyle,
    sink: Arc<dyn LogSink>,
}

impl fmt::Debug for TypeBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeBuilder")
            .field("model", &self.model)
            .field("options", &self.options)
            .field("hooks", &self.hooks)
            .field("language", &self.provider.language())
            .field("style", &self.style)
            .finish_non_exhaustive()
    }
}

impl TypeBuilder {
    /// Create a builder on the process-wide [`Services`].
    pub fn new(options: BuilderOptions) -> ForgeResult<Self> {
        Self::with_services(options, Services::global())
    }

    pub fn with_services(options: BuilderOptions, services: Arc<Services>) -> ForgeResult<Self> {
        Self::with_setup(options, services, |_| {})
    }

    /// Create a builder, letting `setup` register hooks before any of them
    /// can fire.
    pub fn with_setup<F>(options: BuilderOptions, services: Arc<Services>, setup: F) -> ForgeResult<Self>
    where
        F: FnOnce(&mut LifecycleHooks),
    {
        let mut model = TypeModel::new(&options.namespace, &options.class_name, options.visibility)?;
        if let Some(import) = &options.default_import {
            TypeModel::validate_import(import)?;
        }

        let mut hooks = LifecycleHooks::new(services.hook_policy());
        setup(&mut hooks);
        hooks.fire_once(services.once_gate())?;
        hooks.fire(Stage::Construct, Phase::Before)?;

        if let Some(import) = &options.default_import {
            model.add_import(import)?;
        }
        if options.reload_references {
            services.references().request_reload();
        }
        debug!(type_name = model.qualified_name(), "type model created");

        hooks.fire(Stage::Construct, Phase::After)?;

        Ok(Self {
            model,
            options,
            hooks,
            services,
            provider: Arc::new(ForgeScriptProvider),
            style: RenderStyle::default(),
            sink: Arc::new(TracingSink),
        })
    }

    pub fn model(&self) -> &TypeModel {
        &self.model
    }

    pub fn options(&self) -> &BuilderOptions {
        &self.options
    }

    pub fn hooks(&self) -> &LifecycleHooks {
        &self.hooks
    }

    pub fn hooks_mut(&mut self) -> &mut LifecycleHooks {
        &mut self.hooks
    }

    pub fn services(&self) -> &Arc<Services> {
        &self.services
    }

    pub fn set_log_sink(&mut self, sink: Arc<dyn LogSink>) -> &mut Self {
        self.sink = sink;
        self
    }

    /// Replace the code provider. The compiler still expects forge script.
    pub fn set_provider(&mut self, provider: Arc<dyn CodeProvider>, style: RenderStyle) -> &mut Self {
        self.provider = provider;
        self.style = style;
        self
    }

    fn stage<T>(&mut self, stage: Stage, apply: impl FnOnce(&mut TypeModel) -> ForgeResult<T>) -> ForgeResult<T> {
        self.hooks.fire(stage, Phase::Before)?;
        let result = apply(&mut self.model)?;
        self.hooks.fire(stage, Phase::After)?;
        debug!(%stage, type_name = self.model.qualified_name(), "stage complete");
        Ok(result)
    }

    pub fn add_namespace(&mut self, namespace: &str) -> ForgeResult<&mut Self> {
        self.add_namespaces([namespace])
    }

    pub fn add_namespaces<I, S>(&mut self, namespaces: I) -> ForgeResult<&mut Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let namespaces: Vec<String> = namespaces.into_iter().map(|s| s.as_ref().to_string()).collect();
        for namespace in &namespaces {
            TypeModel::validate_import(namespace)?;
        }
        self.stage(Stage::AddNamespace, |model| {
            for namespace in &namespaces {
                model.add_import(namespace)?;
            }
            Ok(())
        })?;
        Ok(self)
    }

    /// Add a base class or interface.
    pub fn add_inherit(&mut self, name: &str) -> ForgeResult<&mut Self> {
        TypeModel::validate_base(name)?;
        self.stage(Stage::AddInherit, |model| model.add_base(name))?;
        Ok(self)
    }

    pub fn add_constructor(&mut self, constructor: ConstructorSpec) -> ForgeResult<&mut Self> {
        let member = MemberSpec::Constructor(constructor);
        self.model.check_member(&member)?;
        self.stage(Stage::AddConstructor, |model| model.add_member(member))?;
        Ok(self)
    }

    pub fn add_field(&mut self, field: FieldSpec) -> ForgeResult<&mut Self> {
        self.add_fields([field])
    }

    pub fn add_fields(&mut self, fields: impl IntoIterator<Item = FieldSpec>) -> ForgeResult<&mut Self> {
        let members: Vec<MemberSpec> = fields.into_iter().map(MemberSpec::Field).collect();
        self.add_members(Stage::AddField, members)
    }

    pub fn add_property(&mut self, property: PropertySpec) -> ForgeResult<&mut Self> {
        self.add_properties([property])
    }

    pub fn add_properties(&mut self, properties: impl IntoIterator<Item = PropertySpec>) -> ForgeResult<&mut Self> {
        let members: Vec<MemberSpec> = properties.into_iter().map(MemberSpec::Property).collect();
        self.add_members(Stage::AddProperty, members)
    }

    pub fn add_method(&mut self, method: MethodSpec) -> ForgeResult<&mut Self> {
        self.add_methods([method])
    }

    pub fn add_methods(&mut self, methods: impl IntoIterator<Item = MethodSpec>) -> ForgeResult<&mut Self> {
        let members: Vec<MemberSpec> = methods.into_iter().map(MemberSpec::Method).collect();
        self.add_members(Stage::AddMethod, members)
    }

    fn add_members(&mut self, stage: Stage, members: Vec<MemberSpec>) -> ForgeResult<&mut Self> {
        for member in &members {
            self.model.check_member(member)?;
        }
        self.stage(stage, |model| {
            for member in members {
                model.add_member(member)?;
            }
            Ok(())
        })?;
        Ok(self)
    }

    /// Offer a module file to the compiler from the next compile on.
    pub fn add_reference(&mut self, location: &str) -> ForgeResult<&mut Self> {
        self.add_references([location])
    }

    pub fn add_references<I, S>(&mut self, locations: I) -> ForgeResult<&mut Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let locations: Vec<String> = locations.into_iter().map(|s| s.as_ref().to_string()).collect();
        if locations.iter().any(|l| l.trim().is_empty()) {
            return Err(ForgeError::invalid("reference location must not be empty"));
        }
        for location in locations {
            debug!(%location, "queued reference");
            self.services.references().queue(location);
        }
        Ok(self)
    }

    /// The model as source text. Used for logging, file output and
    /// compilation alike.
    pub fn render_source_text(&self) -> String {
        self.provider.generate(&self.model, &self.style)
    }

    pub fn write_source_file(&self, path: &Path) -> ForgeResult<()> {
        if path.as_os_str().is_empty() {
            return Err(ForgeError::invalid("output path must not be empty"));
        }
        std::fs::write(path, self.render_source_text())?;
        info!(path = %path.display(), language = self.provider.language(), "wrote source file");
        Ok(())
    }

    /// Write the source text to the configured output path.
    pub fn write_output_file(&self) -> ForgeResult<PathBuf> {
        let path = self
            .options
            .output_path
            .clone()
            .ok_or_else(|| ForgeError::invalid("no output path configured"))?;
        self.write_source_file(&path)?;
        Ok(path)
    }

    /// Send the source text to the log sink.
    pub fn log(&self) {
        self.sink.write(&self.render_source_text());
    }

    /// Send every resolved reference location to the log sink.
    pub fn log_references(&self) -> ForgeResult<()> {
        for location in self.services.references().resolve()? {
            self.sink.write(&location);
        }
        Ok(())
    }

    /// Compile the current model and load it into the services' context.
    /// Every call produces a new module.
    pub fn compile(&self) -> ForgeResult<Arc<LoadedModule>> {
        let source = self.render_source_text();
        let locations = self.services.references().resolve()?;
        let context = self.services.context();
        self.services.loader().compile_and_load(&source, &locations, &context)
    }

    /// Compile, load and create a default instance of the model's type.
    pub fn create_instance(&mut self) -> ForgeResult<Instance> {
        self.create_instance_with(&[])
    }

    /// Like [`TypeBuilder::create_instance`], passing `args` to the constructor.
    pub fn create_instance_with(&mut self, args: &[Value]) -> ForgeResult<Instance> {
        self.hooks.fire(Stage::CreateInstance, Phase::Before)?;
        let module = self.compile()?;
        let instance = InstanceFactory::create_with_args(&module, self.model.qualified_name(), args)?;
        self.hooks.fire(Stage::CreateInstance, Phase::After)?;
        Ok(instance)
    }

    /// Return the instance cached under `key` (default: the qualified type
    /// name), creating and caching it on first use.
    pub fn create_instance_of_singleton(&mut self, key: Option<&str>) -> ForgeResult<Instance> {
        let key = key.unwrap_or(self.model.qualified_name()).to_string();
        if key.is_empty() {
            return Err(ForgeError::invalid("singleton key must not be empty"));
        }
        let services = self.services.clone();
        services.registry().create_or_get(&key, || self.create_instance())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ForgeConfig;
    use crate::hooks::{HookError, HookFailurePolicy};
    use crate::logging::BufferSink;
    use crate::model::{ParamSpec, TypeRef};
    use parking_lot::Mutex;

    fn services() -> Arc<Services> {
        let mut config = ForgeConfig::default();
        config.references.directory = Some(PathBuf::from("/nonexistent/typeforge/refs"));
        Arc::new(Services::from_config(&config))
    }

    fn builder() -> TypeBuilder {
        TypeBuilder::with_services(BuilderOptions::new("Demo", "Widget"), services()).unwrap()
    }

    fn recorder() -> (Arc<Mutex<Vec<String>>>, impl Fn(&str) -> Box<dyn Fn() -> Result<(), HookError> + Send + Sync>) {
        let log = Arc::new(Mutex::new(Vec::new()));
        let handle = log.clone();
        let make = move |name: &str| {
            let log = handle.clone();
            let name = name.to_string();
            Box::new(move || {
                log.lock().push(name.clone());
                Ok(())
            }) as Box<dyn Fn() -> Result<(), HookError> + Send + Sync>
        };
        (log, make)
    }

    #[test]
    fn test_defaults() {
        let builder = TypeBuilder::with_services(BuilderOptions::default(), services()).unwrap();
        assert_eq!(builder.model().qualified_name(), "CodeDOM.CreatedClass");
        assert_eq!(builder.model().imports(), &["System".to_string()]);
    }

    #[test]
    fn test_invalid_names_rejected_before_hooks() {
        let fired = Arc::new(Mutex::new(false));
        let flag = fired.clone();
        let result = TypeBuilder::with_setup(BuilderOptions::new("", "Widget"), services(), move |hooks| {
            let flag = flag.clone();
            hooks.before(Stage::Construct, move || {
                *flag.lock() = true;
                Ok(())
            });
        });
        assert!(matches!(result, Err(ForgeError::InvalidArgument(_))));
        assert!(!*fired.lock());

        let result = TypeBuilder::with_services(BuilderOptions::new("Demo", "class"), services());
        assert!(matches!(result, Err(ForgeError::InvalidArgument(_))));
    }

    #[test]
    fn test_construct_hook_order() {
        let (log, make) = recorder();
        TypeBuilder::with_setup(BuilderOptions::new("Demo", "Widget"), services(), |hooks| {
            hooks.once(make("once"));
            hooks.on(Stage::Construct, Phase::Before, make("before"));
            hooks.on(Stage::Construct, Phase::After, make("after"));
        })
        .unwrap();
        assert_eq!(*log.lock(), vec!["once", "before", "after"]);
    }

    #[test]
    fn test_stage_hooks_wrap_mutation() {
        let mut builder = builder();
        let (log, make) = recorder();
        builder.hooks_mut().on(Stage::AddField, Phase::Before, make("before"));
        builder.hooks_mut().on(Stage::AddField, Phase::After, make("after"));

        builder
            .add_fields([FieldSpec::new("a", TypeRef::Int), FieldSpec::new("b", TypeRef::Int)])
            .unwrap();
        assert_eq!(*log.lock(), vec!["before", "after"]);
        assert_eq!(builder.model().fields().count(), 2);
    }

    #[test]
    fn test_failing_before_hook_leaves_model_unchanged() {
        let mut builder = builder();
        builder
            .hooks_mut()
            .before(Stage::AddProperty, || Err(HookError::new("denied")));

        let err = builder.add_property(PropertySpec::new("Name", TypeRef::String)).unwrap_err();
        assert!(matches!(err, ForgeError::Hook(ref e) if e.point == Some((Stage::AddProperty, Phase::Before))));
        assert_eq!(builder.model().properties().count(), 0);
    }

    #[test]
    fn test_report_policy_continues() {
        let mut builder = builder();
        builder.hooks_mut().set_policy(HookFailurePolicy::Report);
        builder.hooks_mut().before(Stage::AddMethod, || Err(HookError::new("noisy")));

        builder
            .add_method(MethodSpec::new("public int One() { return 1; }"))
            .unwrap();
        assert_eq!(builder.model().methods().count(), 1);
        assert_eq!(builder.hooks().reported().len(), 1);
    }

    #[test]
    fn test_batch_validates_everything_first() {
        let mut builder = builder();
        let err = builder
            .add_properties([
                PropertySpec::new("Ok", TypeRef::Int),
                PropertySpec::new("Bad", TypeRef::Int).with_accessors(false, true),
            ])
            .unwrap_err();
        assert!(matches!(err, ForgeError::InvalidArgument(_)));
        assert_eq!(builder.model().properties().count(), 0);

        assert!(builder.add_namespaces(["System.Text", ""]).is_err());
        assert_eq!(builder.model().imports().len(), 1);
    }

    #[test]
    fn test_second_constructor_rejected() {
        let mut builder = builder();
        builder.add_constructor(ConstructorSpec::default()).unwrap();
        let err = builder
            .add_constructor(ConstructorSpec::new(vec![ParamSpec::new(TypeRef::Int, "x")]))
            .unwrap_err();
        assert!(matches!(err, ForgeError::InvalidArgument(_)));
        assert!(builder.model().constructor().unwrap().params.is_empty());
    }

    #[test]
    fn test_duplicate_namespace_and_base_are_ignored() {
        let mut builder = builder();
        builder
            .add_namespace("System")
            .unwrap()
            .add_inherit("System.IDisposable")
            .unwrap()
            .add_inherit("System.IDisposable")
            .unwrap();
        assert_eq!(builder.model().imports().len(), 1);
        assert_eq!(builder.model().bases().len(), 1);
    }

    #[test]
    fn test_log_writes_rendered_text() {
        let mut builder = builder();
        let sink = Arc::new(BufferSink::new());
        builder.set_log_sink(sink.clone());
        builder.add_field(FieldSpec::new("count", TypeRef::Int)).unwrap();
        builder.log();
        assert_eq!(sink.contents(), builder.render_source_text());

        builder.log_references().unwrap();
        assert_eq!(sink.entries().len(), 1 + typeforge_engine::CORE_LOCATIONS.len());
    }

    #[test]
    fn test_output_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Widget.fs");
        let widget = TypeBuilder::with_services(
            BuilderOptions::new("Demo", "Widget").with_output_path(&path),
            services(),
        )
        .unwrap();
        assert_eq!(widget.write_output_file().unwrap(), path);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), widget.render_source_text());

        assert!(matches!(widget.write_source_file(Path::new("")), Err(ForgeError::InvalidArgument(_))));
        assert!(matches!(builder().write_output_file(), Err(ForgeError::InvalidArgument(_))));
    }

    #[test]
    fn test_create_instance_hooks_and_result() {
        let mut builder = builder();
        let (log, make) = recorder();
        builder.hooks_mut().on(Stage::CreateInstance, Phase::Before, make("before"));
        builder.hooks_mut().on(Stage::CreateInstance, Phase::After, make("after"));
        builder
            .add_field(FieldSpec::new("count", TypeRef::Int).with_default(3))
            .unwrap();

        let instance = builder.create_instance().unwrap();
        assert_eq!(instance.qualified_name(), "Demo.Widget");
        assert_eq!(instance.get("count").unwrap(), Value::Int(3));
        assert_eq!(*log.lock(), vec!["before", "after"]);
    }

    #[test]
    fn test_failed_compile_skips_after_hook() {
        let mut builder = builder();
        let (log, make) = recorder();
        builder.hooks_mut().on(Stage::CreateInstance, Phase::After, make("after"));
        builder
            .add_method(MethodSpec::new("public int Broken() { return missing; }"))
            .unwrap();

        assert!(matches!(builder.create_instance(), Err(ForgeError::Compilation(_))));
        assert!(log.lock().is_empty());
    }

    #[test]
    fn test_singleton_default_key_is_qualified_name() {
        let mut builder = builder();
        let first = builder.create_instance_of_singleton(None).unwrap();
        let second = builder.create_instance_of_singleton(Some("Demo.Widget")).unwrap();
        assert!(Instance::ptr_eq(&first, &second));
        assert_eq!(builder.services().registry().keys(), vec!["Demo.Widget".to_string()]);
        assert!(builder.create_instance_of_singleton(Some("")).is_err());
    }

    #[test]
    fn test_reference_queue() {
        let mut builder = builder();
        assert!(builder.add_reference(" ").is_err());
        builder.add_reference("/libs/extra.tfm").unwrap();
        let locations = builder.services().references().resolve().unwrap();
        assert_eq!(locations.last().unwrap(), "/libs/extra.tfm");
    }
}
