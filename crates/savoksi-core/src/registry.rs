//! Component catalog
//!
//! Canonical names map to factories chosen at startup. Nothing is looked
//! up by reflection: a name the catalog does not know is an unknown
//! component.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::application::{Program, Runtime};
use crate::command::{InstallCommand, PackageManager, UpdateCommand};
use crate::error::{Error, Result};
use crate::terminal::Terminal;
use crate::value::Value;

/// A creatable component
pub trait Component: Any + Send + Sync {
    /// Canonical name of the component's type (e.g., "Savoksi\Paate")
    fn class_name(&self) -> &str;

    /// View the component as a runnable program, if it is one
    fn as_program(self: Arc<Self>) -> Option<Arc<dyn Program>> {
        None
    }
}

/// A shared component instance
pub type Instance = Arc<dyn Component>;

impl fmt::Debug for dyn Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Component").field(&self.class_name()).finish()
    }
}

/// Constructor for a component; receives the runtime and constructor
/// arguments
pub type Factory = Arc<dyn Fn(&Runtime, &[Value]) -> Result<Instance> + Send + Sync>;

/// Downcast an instance to its concrete type
pub fn downcast<T: Component>(instance: Instance) -> Result<Arc<T>> {
    let class = instance.class_name().to_string();
    let any: Arc<dyn Any + Send + Sync> = instance;
    any.downcast::<T>()
        .map_err(|_| Error::invalid_argument("component {1} has an unexpected type", class))
}

/// What a registration entry points at
#[derive(Clone)]
pub enum Target {
    /// Another canonical name
    Class(String),
    /// A pre-built instance, which also seeds the singleton cache
    Instance(Instance),
}

impl fmt::Debug for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::Class(class) => f.debug_tuple("Class").field(class).finish(),
            Target::Instance(instance) => f
                .debug_tuple("Instance")
                .field(&instance.class_name())
                .finish(),
        }
    }
}

impl From<&str> for Target {
    fn from(class: &str) -> Self {
        Target::Class(class.to_string())
    }
}

impl From<String> for Target {
    fn from(class: String) -> Self {
        Target::Class(class)
    }
}

impl From<Instance> for Target {
    fn from(instance: Instance) -> Self {
        Target::Instance(instance)
    }
}

/// Catalog of creatable components
#[derive(Clone)]
pub struct Catalog {
    factories: HashMap<String, Factory>,
}

impl Default for Catalog {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Catalog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&str> = self.factories.keys().map(String::as_str).collect();
        names.sort_unstable();
        f.debug_struct("Catalog").field("factories", &names).finish()
    }
}

impl Catalog {
    /// Create an empty catalog
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// Create a catalog with the built-in components
    pub fn with_builtins() -> Self {
        let mut catalog = Self::new();
        catalog.register_builtin_components();
        catalog
    }

    /// Register the built-in components (terminal, package manager, install
    /// and update commands)
    fn register_builtin_components(&mut self) {
        self.register_fn(Terminal::CLASS, |_, _| Ok(Arc::new(Terminal::new())));
        self.register_fn(PackageManager::CLASS, |_, _| {
            Ok(Arc::new(PackageManager::new()))
        });
        self.register_fn(InstallCommand::CLASS, |_, _| Ok(Arc::new(InstallCommand)));
        self.register_fn(UpdateCommand::CLASS, |_, _| Ok(Arc::new(UpdateCommand)));
    }

    /// Register a factory under a canonical name, replacing any previous one
    pub fn register(&mut self, class: impl Into<String>, factory: Factory) {
        self.factories.insert(class.into(), factory);
    }

    /// Register a function as a factory
    pub fn register_fn<F>(&mut self, class: impl Into<String>, func: F)
    where
        F: Fn(&Runtime, &[Value]) -> Result<Instance> + Send + Sync + 'static,
    {
        self.register(class, Arc::new(func));
    }

    /// Check if a canonical name is creatable
    pub fn contains(&self, class: &str) -> bool {
        self.factories.contains_key(class)
    }

    /// Get the factory for a canonical name
    pub fn get(&self, class: &str) -> Option<&Factory> {
        self.factories.get(class)
    }

    /// Registered canonical names, sorted
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.factories.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}
