//! Application contexts and the component runtime
//!
//! A [`Runtime`] owns the catalog, the process-wide singleton cache and a
//! stack of application [`Context`]s. Each context carries its own
//! registrations and flat settings; a context entered for a program starts
//! as a snapshot of the one below it.

use indexmap::IndexMap;
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::naming::{canonicalize, shorten};
use crate::registry::{downcast, Catalog, Component, Instance, Target};
use crate::stringify::stringify;
use crate::value::Value;

/// Registrations and settings of one application
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Context {
    registrations: IndexMap<String, String>,
    settings: IndexMap<String, String>,
}

impl Context {
    /// Create an empty context
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a context seeded with a copy of `parent`
    ///
    /// Later changes to the parent do not show up here.
    pub fn inherit(parent: &Context) -> Self {
        parent.clone()
    }

    /// Point `name` at a canonical name
    pub fn register(&mut self, name: impl Into<String>, class: impl Into<String>) {
        self.registrations.insert(name.into(), class.into());
    }

    /// Remove the entry for `name`, reverting to default resolution
    pub fn unregister(&mut self, name: &str) -> Option<String> {
        self.registrations.shift_remove(name)
    }

    /// Canonical name registered for `name`
    pub fn registration(&self, name: &str) -> Option<&str> {
        self.registrations.get(name).map(String::as_str)
    }

    /// All registration entries in insertion order
    pub fn registrations(&self) -> &IndexMap<String, String> {
        &self.registrations
    }

    /// Store a setting
    ///
    /// Strings are stored as-is. Containers are flattened into dotted keys
    /// (`tietokanta.osoite`); an empty container stores nothing. Null,
    /// false and zero store the empty string; anything else is
    /// stringified.
    pub fn set_config(&mut self, key: &str, value: impl Into<Value>) {
        self.store(key.to_string(), value.into());
    }

    fn store(&mut self, key: String, value: Value) {
        match value {
            Value::String(s) => {
                self.settings.insert(key, s);
            }
            Value::Mapping(map) => {
                for (child, item) in map {
                    self.store(format!("{}.{}", key, child), item);
                }
            }
            Value::Sequence(seq) => {
                for (index, item) in seq.into_iter().enumerate() {
                    self.store(format!("{}.{}", key, index), item);
                }
            }
            value if value.is_falsy() => {
                self.settings.insert(key, String::new());
            }
            value => {
                let text = stringify(&value);
                self.settings.insert(key, text);
            }
        }
    }

    /// Store every top-level entry of a mapping (or sequence) of settings
    ///
    /// Null stores nothing.
    pub fn set_config_all(&mut self, settings: Value) -> Result<()> {
        match settings {
            Value::Null => Ok(()),
            Value::Mapping(map) => {
                for (key, value) in map {
                    self.store(key, value);
                }
                Ok(())
            }
            Value::Sequence(seq) => {
                for (index, value) in seq.into_iter().enumerate() {
                    self.store(index.to_string(), value);
                }
                Ok(())
            }
            other => Err(Error::invalid_argument(
                "settings must be a mapping, not {1}",
                other.type_name(),
            )),
        }
    }

    /// Read a setting
    pub fn config(&self, key: &str) -> Option<&str> {
        self.settings.get(key).map(String::as_str)
    }

    /// All settings in insertion order
    pub fn settings(&self) -> &IndexMap<String, String> {
        &self.settings
    }

    /// Load settings from a YAML (or JSON) document
    pub fn load_settings_yaml(&mut self, text: &str) -> Result<()> {
        let value: Value = serde_yaml::from_str(text).map_err(|e| Error::parse(e.to_string()))?;
        self.set_config_all(value)
    }

    /// Load settings from a YAML (or JSON) file
    pub fn load_settings_file(&mut self, path: impl AsRef<std::path::Path>) -> Result<()> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::io("cannot read settings file {1}", path.display().to_string(), e))?;
        self.load_settings_yaml(&content)
            .map_err(|e| e.with_path(path.display().to_string()))
    }
}

/// Options for a runtime
#[derive(Debug, Clone)]
pub struct RuntimeOptions {
    /// How deeply component construction may nest
    pub max_depth: usize,
}

impl Default for RuntimeOptions {
    fn default() -> Self {
        Self { max_depth: 100 }
    }
}

/// A component that can be run as an application
pub trait Program: Component {
    /// Registrations applied to the program's context before it runs
    fn components(&self) -> Vec<(String, Target)> {
        Vec::new()
    }

    /// Settings applied to the program's context before it runs
    fn settings(&self) -> Value {
        Value::Null
    }

    /// Run the program
    fn run(&self, runtime: &Runtime, args: &[String]) -> Result<Value>;
}

/// A program backed by a closure
pub struct FnProgram<F>
where
    F: Fn(&Runtime, &[String]) -> Result<Value> + Send + Sync,
{
    name: String,
    func: F,
}

impl<F> FnProgram<F>
where
    F: Fn(&Runtime, &[String]) -> Result<Value> + Send + Sync,
{
    /// Create a new function-based program
    pub fn new(name: impl Into<String>, func: F) -> Self {
        Self {
            name: name.into(),
            func,
        }
    }
}

impl<F> Component for FnProgram<F>
where
    F: Fn(&Runtime, &[String]) -> Result<Value> + Send + Sync + 'static,
{
    fn class_name(&self) -> &str {
        &self.name
    }

    fn as_program(self: Arc<Self>) -> Option<Arc<dyn Program>> {
        Some(self)
    }
}

impl<F> Program for FnProgram<F>
where
    F: Fn(&Runtime, &[String]) -> Result<Value> + Send + Sync + 'static,
{
    fn run(&self, runtime: &Runtime, args: &[String]) -> Result<Value> {
        (self.func)(runtime, args)
    }
}

/// What to run: a name to resolve or a ready program
#[derive(Clone)]
pub enum Launch {
    /// Short or canonical name
    Name(String),
    /// Program instance
    Program(Arc<dyn Program>),
}

impl Launch {
    /// Run a closure as a program
    pub fn from_fn<F>(func: F) -> Self
    where
        F: Fn(&Runtime, &[String]) -> Result<Value> + Send + Sync + 'static,
    {
        Launch::Program(Arc::new(FnProgram::new("Savoksi\\Sovellus", func)))
    }
}

impl From<&str> for Launch {
    fn from(name: &str) -> Self {
        Launch::Name(name.to_string())
    }
}

impl From<String> for Launch {
    fn from(name: String) -> Self {
        Launch::Name(name)
    }
}

impl From<Arc<dyn Program>> for Launch {
    fn from(program: Arc<dyn Program>) -> Self {
        Launch::Program(program)
    }
}

/// Pops the context it was created for
struct ContextGuard<'a>(&'a Runtime);

impl Drop for ContextGuard<'_> {
    fn drop(&mut self) {
        self.0.pop();
    }
}

/// Counts one level of component construction
struct DepthGuard<'a>(&'a Cell<usize>);

impl<'a> DepthGuard<'a> {
    fn enter(depth: &'a Cell<usize>) -> Self {
        depth.set(depth.get() + 1);
        Self(depth)
    }
}

impl Drop for DepthGuard<'_> {
    fn drop(&mut self) {
        self.0.set(self.0.get().saturating_sub(1));
    }
}

/// The component runtime
///
/// ```
/// use savoksi_core::{Runtime, Terminal};
///
/// let runtime = Runtime::new();
/// let first = runtime.get_as::<Terminal>("paate").unwrap();
/// let second = runtime.get_as::<Terminal>("Savoksi\\Paate").unwrap();
/// assert!(std::sync::Arc::ptr_eq(&first, &second));
/// ```
pub struct Runtime {
    catalog: Catalog,
    options: RuntimeOptions,
    singletons: RefCell<HashMap<String, Instance>>,
    stack: RefCell<Vec<Context>>,
    depth: Cell<usize>,
}

impl Default for Runtime {
    fn default() -> Self {
        Self::new()
    }
}

impl Runtime {
    /// Create a runtime over the built-in catalog
    pub fn new() -> Self {
        Self::with_catalog(Catalog::with_builtins())
    }

    /// Create a runtime over a custom catalog
    pub fn with_catalog(catalog: Catalog) -> Self {
        Self {
            catalog,
            options: RuntimeOptions::default(),
            singletons: RefCell::new(HashMap::new()),
            stack: RefCell::new(Vec::new()),
            depth: Cell::new(0),
        }
    }

    /// Replace the runtime options
    pub fn with_options(mut self, options: RuntimeOptions) -> Self {
        self.options = options;
        self
    }

    /// The component catalog
    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// The runtime options
    pub fn options(&self) -> &RuntimeOptions {
        &self.options
    }

    /// Make `context` the active context
    pub fn push(&self, context: Context) {
        let mut stack = self.stack.borrow_mut();
        stack.push(context);
        log::debug!("Entered application context (depth {})", stack.len());
    }

    /// Remove the active context
    pub fn pop(&self) -> Option<Context> {
        let mut stack = self.stack.borrow_mut();
        let context = stack.pop();
        log::debug!("Left application context (depth {})", stack.len());
        context
    }

    /// Number of contexts on the stack
    pub fn stack_len(&self) -> usize {
        self.stack.borrow().len()
    }

    /// Snapshot of the active context
    ///
    /// An empty stack gets a default root context first.
    pub fn current(&self) -> Context {
        self.with_current(Context::clone)
    }

    /// Push `context`, run `f`, and pop again on every exit path
    pub fn enter<R>(&self, context: Context, f: impl FnOnce() -> R) -> R {
        self.push(context);
        let _guard = ContextGuard(self);
        f()
    }

    fn ensure_root(&self) {
        let mut stack = self.stack.borrow_mut();
        if stack.is_empty() {
            stack.push(Context::new());
        }
    }

    fn with_current<R>(&self, f: impl FnOnce(&Context) -> R) -> R {
        self.ensure_root();
        let stack = self.stack.borrow();
        match stack.last() {
            Some(context) => f(context),
            None => f(&Context::new()),
        }
    }

    fn with_current_mut<R>(&self, f: impl FnOnce(&mut Context) -> R) -> R {
        self.ensure_root();
        let mut stack = self.stack.borrow_mut();
        match stack.last_mut() {
            Some(context) => f(context),
            None => f(&mut Context::new()),
        }
    }

    /// Resolve a short or canonical name to the canonical name to create
    ///
    /// Registrations under the canonical name win over registrations
    /// under the short name. A name the catalog knows as-is resolves to
    /// itself; anything else to its canonical form.
    pub fn resolve_class(&self, name: &str, suffix: &str) -> Result<String> {
        let long = canonicalize(name, suffix)?;
        if let Some(class) = self.with_current(|ctx| ctx.registration(&long).map(str::to_string)) {
            return Ok(class);
        }

        let short = shorten(name, suffix)?;
        if let Some(class) = self.with_current(|ctx| ctx.registration(&short).map(str::to_string)) {
            return Ok(class);
        }

        if self.catalog.contains(name) {
            return Ok(name.to_string());
        }

        Ok(long)
    }

    /// Create a fresh instance
    pub fn create(&self, name: &str, args: &[Value]) -> Result<Instance> {
        let class = self.resolve_class(name, "")?;
        self.construct(&class, args)
    }

    /// Create a fresh instance of a concrete type
    pub fn create_as<T: Component>(&self, name: &str, args: &[Value]) -> Result<Arc<T>> {
        downcast(self.create(name, args)?)
    }

    fn construct(&self, class: &str, args: &[Value]) -> Result<Instance> {
        if self.depth.get() >= self.options.max_depth {
            return Err(Error::recursion_limit(class, self.options.max_depth));
        }
        let factory = self
            .catalog
            .get(class)
            .cloned()
            .ok_or_else(|| Error::unknown_component(class))?;

        let _depth = DepthGuard::enter(&self.depth);
        log::debug!("Creating component {}", class);
        factory(self, args)
    }

    /// Get the shared instance for a name, creating it on first use
    pub fn get(&self, name: &str, suffix: &str) -> Result<Instance> {
        let class = self.resolve_class(name, suffix)?;
        if let Some(instance) = self.singletons.borrow().get(&class).cloned() {
            log::trace!("Singleton cache hit: {}", class);
            return Ok(instance);
        }

        let short = shorten(name, suffix)?;
        if let Some(instance) = self.singletons.borrow().get(&short).cloned() {
            log::trace!("Singleton cache hit: {}", short);
            return Ok(instance);
        }

        let instance = self.construct(&class, &[])?;
        log::debug!("Caching singleton {}", class);
        let instance = self
            .singletons
            .borrow_mut()
            .entry(class)
            .or_insert(instance)
            .clone();
        Ok(instance)
    }

    /// Get the shared instance of a concrete type
    pub fn get_as<T: Component>(&self, name: &str) -> Result<Arc<T>> {
        downcast(self.get(name, "")?)
    }

    /// Add or remove a registration entry in the active context
    ///
    /// `None` removes the entry. An instance target registers the
    /// instance's own canonical name and seeds the singleton cache.
    pub fn register(&self, name: impl Into<String>, target: Option<Target>) {
        let name = name.into();
        let class = target.map(|target| self.seed(target));
        self.with_current_mut(|ctx| match class {
            Some(class) => ctx.register(name, class),
            None => {
                ctx.unregister(&name);
            }
        });
    }

    /// Register several entries at once
    pub fn register_all<I, N>(&self, entries: I)
    where
        I: IntoIterator<Item = (N, Option<Target>)>,
        N: Into<String>,
    {
        for (name, target) in entries {
            self.register(name, target);
        }
    }

    /// Canonical name for a target, caching instances
    fn seed(&self, target: Target) -> String {
        match target {
            Target::Class(class) => class,
            Target::Instance(instance) => {
                let class = instance.class_name().to_string();
                self.singletons.borrow_mut().insert(class.clone(), instance);
                class
            }
        }
    }

    /// Store a setting in the active context
    pub fn set_config(&self, key: &str, value: impl Into<Value>) {
        let value = value.into();
        self.with_current_mut(|ctx| ctx.set_config(key, value));
    }

    /// Store several settings in the active context
    pub fn set_config_all(&self, settings: Value) -> Result<()> {
        self.with_current_mut(|ctx| ctx.set_config_all(settings))
    }

    /// Read a setting from the active context
    ///
    /// An unset key is logged and reads as `None`.
    pub fn config(&self, key: &str) -> Option<String> {
        let value = self.with_current(|ctx| ctx.config(key).map(str::to_string));
        if value.is_none() {
            log::warn!("Setting '{}' is not set", key);
        }
        value
    }

    /// Run a program in its own context
    ///
    /// A name resolves with the `Sovellus` suffix unless the catalog knows
    /// it as-is.
    pub fn run(&self, launch: impl Into<Launch>, args: &[String]) -> Result<Value> {
        let program = match launch.into() {
            Launch::Name(name) => {
                let class = if self.catalog.contains(&name) {
                    name
                } else {
                    canonicalize(&name, "Sovellus")?
                };
                self.create_program(&class)?
            }
            Launch::Program(program) => program,
        };
        self.execute(program, args)
    }

    pub(crate) fn create_program(&self, name: &str) -> Result<Arc<dyn Program>> {
        let instance = self.create(name, &[])?;
        let class = instance.class_name().to_string();
        instance
            .as_program()
            .ok_or_else(|| Error::invalid_argument("component {1} cannot be run", class))
    }

    pub(crate) fn execute(&self, program: Arc<dyn Program>, args: &[String]) -> Result<Value> {
        let mut context = self.with_current(Context::inherit);
        for (name, target) in program.components() {
            let class = self.seed(target);
            context.register(name, class);
        }
        context.set_config_all(program.settings())?;

        log::debug!("Running {}", program.class_name());
        self.enter(context, || program.run(self, args))
    }
}
