//! Error types for savoksi
//!
//! Every error carries a message that has already been run through
//! [`interpolate`](crate::interpolation::interpolate), so the offending
//! name or path travels with the text. A missing value is never an error:
//! lookups return `None` for that.

use std::fmt;

use crate::interpolation::interpolate;
use crate::value::Value;

/// Result type alias for savoksi operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for savoksi operations
#[derive(Debug, Clone)]
pub struct Error {
    /// The kind of error that occurred
    pub kind: ErrorKind,
    /// Interpolated message text
    message: String,
    /// Path, name or key the error is about (e.g., "taulu[4].a")
    pub path: Option<String>,
    /// Actionable help message
    pub help: Option<String>,
    /// Underlying cause (as string for Clone compatibility)
    pub cause: Option<String>,
}

/// Categories of errors that can occur
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed path or name syntax
    Lexical,
    /// Incompatible scalar/container replacement during a path assignment
    TypeConflict,
    /// A name resolved to a type nobody registered
    UnknownComponent,
    /// Component construction nested deeper than the configured limit
    RecursionLimit,
    /// An argument of the wrong shape (bad switch, wrong component type)
    InvalidArgument,
    /// An external capability was not wired up
    Unavailable,
    /// Error parsing a YAML/JSON settings document
    Parse,
    /// I/O error (settings file unreadable, process failed to spawn)
    Io,
}

impl Error {
    /// Create an error whose message is `template` interpolated with `args`
    pub fn new(kind: ErrorKind, template: &str, args: &[Value]) -> Self {
        Self {
            kind,
            message: interpolate(template, args),
            path: None,
            help: None,
            cause: None,
        }
    }

    /// Create a lexical error about a malformed name or path
    pub fn lexical(template: &str, subject: impl Into<String>) -> Self {
        let subject = subject.into();
        Self::new(ErrorKind::Lexical, template, &[Value::from(subject.as_str())]).with_path(subject)
    }

    /// Create an error for a name that cannot be canonicalized or shortened
    pub fn invalid_name(name: impl Into<String>) -> Self {
        Self::lexical("invalid class name", name).with_help(
            "Names are words of letters and digits joined by '-' or '_', \
             with ':' or '\\' between namespaces",
        )
    }

    /// Create an error for a malformed index path
    pub fn invalid_index(path: impl Into<String>) -> Self {
        Self::lexical("invalid index", path)
    }

    /// Create an error for trailing characters after a bracketed index
    pub fn unexpected_after_index(path: impl Into<String>) -> Self {
        Self::lexical("unexpected character after index", path)
            .with_help("Separate keys with '.' or start another '[...]' index")
    }

    /// Create a type conflict error for a path assignment
    pub fn type_conflict(reason: &str, path: impl Into<String>) -> Self {
        let path = path.into();
        Self::new(ErrorKind::TypeConflict, reason, &[Value::from(path.as_str())]).with_path(path)
    }

    /// Create an unknown component error
    pub fn unknown_component(class: impl Into<String>) -> Self {
        let class = class.into();
        Self::new(
            ErrorKind::UnknownComponent,
            "unknown component {1}",
            &[Value::from(class.as_str())],
        )
        .with_path(class)
        .with_help("Register a factory for the component in the catalog or check for typos")
    }

    /// Create a recursion limit error
    pub fn recursion_limit(name: impl Into<String>, limit: usize) -> Self {
        let name = name.into();
        Self::new(
            ErrorKind::RecursionLimit,
            "infinite loop while creating {1} (limit {2})",
            &[Value::from(name.as_str()), Value::from(limit)],
        )
        .with_path(name)
        .with_help("A component factory is requesting itself, directly or through others")
    }

    /// Create an invalid argument error
    pub fn invalid_argument(template: &str, argument: impl Into<Value>) -> Self {
        Self::new(ErrorKind::InvalidArgument, template, &[argument.into()])
    }

    /// Create an error for a capability that has not been wired up
    pub fn unavailable(what: impl Into<String>) -> Self {
        let what = what.into();
        Self::new(
            ErrorKind::Unavailable,
            "{1} is not available",
            &[Value::from(what.as_str())],
        )
    }

    /// Create a new parse error
    pub fn parse(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Parse, "settings could not be parsed", &[]).with_cause(message)
    }

    /// Create an I/O error
    pub fn io(template: &str, subject: impl Into<String>, cause: impl fmt::Display) -> Self {
        let subject = subject.into();
        Self::new(ErrorKind::Io, template, &[Value::from(subject.as_str())])
            .with_path(subject)
            .with_cause(cause.to_string())
    }

    /// The interpolated message, without path/help decoration
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Add path context to the error
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Add help message to the error
    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }

    /// Add an underlying cause
    pub fn with_cause(mut self, cause: impl Into<String>) -> Self {
        self.cause = Some(cause.into());
        self
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)?;

        if let Some(cause) = &self.cause {
            write!(f, "\n  {}", cause)?;
        }

        if let Some(help) = &self.help {
            write!(f, "\n  Help: {}", help)?;
        }

        Ok(())
    }
}

impl std::error::Error for Error {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_index_message_carries_path() {
        let err = Error::invalid_index(".b");

        assert_eq!(err.kind, ErrorKind::Lexical);
        assert_eq!(err.message(), "invalid index .b");
        assert_eq!(err.path.as_deref(), Some(".b"));
    }

    #[test]
    fn test_invalid_name_display_has_help() {
        let err = Error::invalid_name("a b");
        let display = err.to_string();

        assert!(display.starts_with("invalid class name a b"));
        assert!(display.contains("Help:"));
    }

    #[test]
    fn test_unknown_component_uses_placeholder() {
        let err = Error::unknown_component("Savoksi\\Puuttuu");

        assert_eq!(err.kind, ErrorKind::UnknownComponent);
        assert_eq!(err.message(), "unknown component Savoksi\\Puuttuu");
    }

    #[test]
    fn test_recursion_limit_message() {
        let err = Error::recursion_limit("Savoksi\\Kehä", 100);

        assert_eq!(err.kind, ErrorKind::RecursionLimit);
        assert_eq!(
            err.message(),
            "infinite loop while creating Savoksi\\Kehä (limit 100)"
        );
    }

    #[test]
    fn test_type_conflict_message() {
        let err = Error::type_conflict("cannot replace scalar with container", "a.b");

        assert_eq!(err.kind, ErrorKind::TypeConflict);
        assert_eq!(err.message(), "cannot replace scalar with container a.b");
    }

    #[test]
    fn test_invalid_argument_attaches_value() {
        let err = Error::invalid_argument("invalid argument", "--foo");

        assert_eq!(err.kind, ErrorKind::InvalidArgument);
        assert_eq!(err.message(), "invalid argument --foo");
    }

    #[test]
    fn test_parse_error_display_includes_cause() {
        let err = Error::parse("did not find expected key");
        let display = err.to_string();

        assert!(display.contains("settings could not be parsed"));
        assert!(display.contains("did not find expected key"));
    }

    #[test]
    fn test_io_error_display() {
        let err = Error::io("cannot read {1}", "asetukset.yaml", "No such file");

        assert_eq!(err.kind, ErrorKind::Io);
        assert!(err.to_string().contains("cannot read asetukset.yaml"));
        assert!(err.to_string().contains("No such file"));
    }
}
