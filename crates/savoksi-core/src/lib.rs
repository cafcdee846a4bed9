//! savoksi-core: Component wiring with name resolution, path indexing and
//! message templating
//!
//! This crate resolves short component names to canonical ones, creates
//! and caches components through a catalog of factories, keeps per-context
//! settings, and renders messages from `{...}` templates.
//!
//! # Example
//!
//! ```rust
//! use savoksi_core::{canonicalize, interpolate, Runtime, Value};
//!
//! let runtime = Runtime::new();
//! runtime.set_config("tietokanta", serde_json::json!({"osoite": "localhost"}));
//! assert_eq!(runtime.config("tietokanta.osoite").as_deref(), Some("localhost"));
//!
//! assert_eq!(canonicalize("asenna", "Komento").unwrap(), "Savoksi\\AsennaKomento");
//!
//! let message = interpolate("heippa {nimi}", &[Value::from(serde_json::json!({"nimi": "äiti"}))]);
//! assert_eq!(message, "heippa äiti");
//! ```

pub mod application;
pub mod command;
pub mod error;
pub mod interpolation;
pub mod naming;
pub mod path;
pub mod registry;
pub mod stringify;
pub mod terminal;
pub mod value;

pub use application::{Context, FnProgram, Launch, Program, Runtime, RuntimeOptions};
pub use command::{
    CommandLine, ExternalCommand, InstallCommand, PackageManager, UpdateCommand, Verbosity,
};
pub use error::{Error, ErrorKind, Result};
pub use interpolation::{interpolate, try_interpolate};
pub use naming::{canonicalize, shorten};
pub use path::Path;
pub use registry::{Catalog, Component, Factory, Instance, Target};
pub use stringify::stringify;
pub use terminal::Terminal;
pub use value::{Object, Thunk, Value};
