//! Maintenance commands
//!
//! Commands are programs whose arguments go through [`CommandLine::parse`]
//! first. Failures are printed through the terminal component unless the
//! command runs with `-v`, in which case they propagate.

use std::sync::Arc;

use crate::application::{Launch, Program, Runtime};
use crate::error::{Error, Result};
use crate::naming::canonicalize;
use crate::registry::Component;
use crate::terminal::Terminal;
use crate::value::Value;

/// How much a command reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Verbosity {
    /// `-q`: errors are printed, nothing else
    Quiet,
    /// Errors are printed
    #[default]
    Normal,
    /// `-v`: errors propagate to the caller
    Trace,
}

/// Parsed command-line tokens
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CommandLine {
    /// Non-switch arguments
    pub files: Vec<String>,
    /// Requested verbosity
    pub verbosity: Verbosity,
}

impl CommandLine {
    /// Split switches from file arguments
    ///
    /// `--` ends switch parsing. Unknown switches are rejected.
    pub fn parse(args: &[String]) -> Result<Self> {
        let mut line = CommandLine::default();
        let mut tokens = args.iter();

        while let Some(token) = tokens.next() {
            if !token.starts_with('-') {
                line.files.push(token.clone());
                continue;
            }
            match token.as_str() {
                "--" => line.files.extend(tokens.by_ref().cloned()),
                "-q" | "--quiet" => line.verbosity = Verbosity::Quiet,
                "-v" | "--verbose" => line.verbosity = Verbosity::Trace,
                other => return Err(Error::invalid_argument("invalid argument", other)),
            }
        }

        Ok(line)
    }
}

impl Runtime {
    /// Run a command
    ///
    /// A name resolves with the `Komento` suffix (`asenna` runs
    /// `Savoksi\AsennaKomento`). Unless the command line asks for `-v`, a
    /// failing command has its message printed on the terminal and yields
    /// null.
    pub fn command(&self, launch: impl Into<Launch>, args: &[String]) -> Result<Value> {
        let program = match launch.into() {
            Launch::Name(name) => self.create_program(&canonicalize(&name, "Komento")?)?,
            Launch::Program(program) => program,
        };
        let line = CommandLine::parse(args)?;
        log::debug!(
            "Dispatching command {} ({:?})",
            program.class_name(),
            line.verbosity
        );

        match self.execute(program, &line.files) {
            Ok(value) => Ok(value),
            Err(e) if line.verbosity == Verbosity::Trace => Err(e),
            Err(e) => {
                log::warn!("Command failed: {}", e);
                match self.get_as::<Terminal>("paate") {
                    Ok(terminal) => terminal.print(&[Value::from(e.message())])?,
                    Err(lookup) => log::error!("{} (no terminal: {})", e.message(), lookup),
                }
                Ok(Value::Null)
            }
        }
    }
}

/// Capability to run an external program with arguments
pub trait ExternalCommand: Send + Sync {
    /// Run with `args`, failing if the program could not run or failed
    fn run(&self, args: &[String]) -> Result<()>;
}

impl<F> ExternalCommand for F
where
    F: Fn(&[String]) -> Result<()> + Send + Sync,
{
    fn run(&self, args: &[String]) -> Result<()> {
        self(args)
    }
}

/// The package manager used by the install and update commands
///
/// Without a runner every invocation fails as unavailable.
#[derive(Default)]
pub struct PackageManager {
    runner: Option<Arc<dyn ExternalCommand>>,
}

impl PackageManager {
    /// Canonical name of the package manager component
    pub const CLASS: &'static str = "Savoksi\\Composer";

    /// Create a package manager with no runner
    pub fn new() -> Self {
        Self { runner: None }
    }

    /// Create a package manager that invokes `runner`
    pub fn with_runner(runner: impl ExternalCommand + 'static) -> Self {
        Self {
            runner: Some(Arc::new(runner)),
        }
    }

    /// Invoke the package manager
    pub fn run(&self, args: &[String]) -> Result<()> {
        let runner = self
            .runner
            .as_ref()
            .ok_or_else(|| Error::unavailable("package manager"))?;
        log::debug!("Running package manager: {}", args.join(" "));
        runner.run(args)
    }
}

impl Component for PackageManager {
    fn class_name(&self) -> &str {
        Self::CLASS
    }
}

fn package_manager(runtime: &Runtime, verb: &str, files: &[String]) -> Result<Value> {
    let mut args = Vec::with_capacity(files.len() + 1);
    args.push(verb.to_string());
    args.extend_from_slice(files);
    runtime.get_as::<PackageManager>("composer")?.run(&args)?;
    Ok(Value::Null)
}

/// `asenna`: add packages, or install the declared ones
pub struct InstallCommand;

impl InstallCommand {
    /// Canonical name of the install command
    pub const CLASS: &'static str = "Savoksi\\AsennaKomento";
}

impl Component for InstallCommand {
    fn class_name(&self) -> &str {
        Self::CLASS
    }

    fn as_program(self: Arc<Self>) -> Option<Arc<dyn Program>> {
        Some(self)
    }
}

impl Program for InstallCommand {
    fn run(&self, runtime: &Runtime, args: &[String]) -> Result<Value> {
        if args.is_empty() {
            package_manager(runtime, "install", args)
        } else {
            package_manager(runtime, "require", args)
        }
    }
}

/// `paivita`: update packages to their latest versions
pub struct UpdateCommand;

impl UpdateCommand {
    /// Canonical name of the update command
    pub const CLASS: &'static str = "Savoksi\\PaivitaKomento";
}

impl Component for UpdateCommand {
    fn class_name(&self) -> &str {
        Self::CLASS
    }

    fn as_program(self: Arc<Self>) -> Option<Arc<dyn Program>> {
        Some(self)
    }
}

impl Program for UpdateCommand {
    fn run(&self, runtime: &Runtime, args: &[String]) -> Result<Value> {
        package_manager(runtime, "update", args)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::registry::Target;
    use crate::terminal::Capture;
    use pretty_assertions::assert_eq;
    use std::sync::Mutex;

    fn args(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    /// Runtime with a captured terminal and, optionally, a recording
    /// package manager
    fn runtime(wired: bool) -> (Runtime, Capture, Arc<Mutex<Vec<Vec<String>>>>) {
        let runtime = Runtime::new();
        let capture = Capture::default();
        let calls = Arc::new(Mutex::new(Vec::new()));

        runtime.register(
            "paate",
            Some(Target::Instance(Arc::new(Terminal::with_sink(capture.clone())))),
        );
        if wired {
            let recorded = calls.clone();
            let manager = PackageManager::with_runner(move |args: &[String]| -> Result<()> {
                recorded.lock().unwrap().push(args.to_vec());
                Ok(())
            });
            runtime.register("composer", Some(Target::Instance(Arc::new(manager))));
        }

        (runtime, capture, calls)
    }

    #[test]
    fn test_parse_files_and_switches() {
        let line = CommandLine::parse(&args(&["vendor/a", "-q", "vendor/b"])).unwrap();
        assert_eq!(line.files, args(&["vendor/a", "vendor/b"]));
        assert_eq!(line.verbosity, Verbosity::Quiet);

        let line = CommandLine::parse(&args(&["--verbose"])).unwrap();
        assert_eq!(line.verbosity, Verbosity::Trace);
        assert!(line.files.is_empty());
    }

    #[test]
    fn test_parse_double_dash_ends_switches() {
        let line = CommandLine::parse(&args(&["a", "--", "-v", "--quiet"])).unwrap();
        assert_eq!(line.files, args(&["a", "-v", "--quiet"]));
        assert_eq!(line.verbosity, Verbosity::Normal);
    }

    #[test]
    fn test_parse_rejects_unknown_switch() {
        let err = CommandLine::parse(&args(&["--bogus"])).unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidArgument);
        assert_eq!(err.message(), "invalid argument --bogus");
    }

    #[test]
    fn test_install_requires_packages() {
        let (runtime, _, calls) = runtime(true);
        runtime.command("asenna", &args(&["savoksi/testi"])).unwrap();
        runtime.command("asenna", &[]).unwrap();

        assert_eq!(
            *calls.lock().unwrap(),
            vec![args(&["require", "savoksi/testi"]), args(&["install"])]
        );
    }

    #[test]
    fn test_update_passes_packages() {
        let (runtime, _, calls) = runtime(true);
        runtime.command("paivita", &args(&["-q", "savoksi/testi"])).unwrap();

        assert_eq!(*calls.lock().unwrap(), vec![args(&["update", "savoksi/testi"])]);
    }

    #[test]
    fn test_command_by_canonical_name() {
        let (runtime, _, calls) = runtime(true);
        runtime.command("Savoksi\\PaivitaKomento", &[]).unwrap();

        assert_eq!(*calls.lock().unwrap(), vec![args(&["update"])]);
    }

    #[test]
    fn test_failure_is_printed_in_normal_mode() {
        let (runtime, capture, _) = runtime(false);
        let value = runtime.command("asenna", &[]).unwrap();

        assert_eq!(value, Value::Null);
        assert_eq!(capture.text(), "package manager is not available\n");
        assert_eq!(runtime.stack_len(), 1);
    }

    #[test]
    fn test_failure_is_printed_in_quiet_mode() {
        let (runtime, capture, _) = runtime(false);
        runtime.command("paivita", &args(&["-q"])).unwrap();

        assert_eq!(capture.text(), "package manager is not available\n");
    }

    #[test]
    fn test_failure_survives_a_foreign_terminal() {
        let (runtime, capture, _) = runtime(false);
        runtime.register(
            "paate",
            Some(Target::Instance(Arc::new(PackageManager::new()))),
        );

        let value = runtime.command("asenna", &[]).unwrap();
        assert_eq!(value, Value::Null);
        assert_eq!(capture.text(), "");
        assert_eq!(runtime.stack_len(), 1);
    }

    #[test]
    fn test_failure_propagates_in_trace_mode() {
        let (runtime, capture, _) = runtime(false);
        let err = runtime.command("asenna", &args(&["-v"])).unwrap_err();

        assert_eq!(err.kind, ErrorKind::Unavailable);
        assert_eq!(capture.text(), "");
        assert_eq!(runtime.stack_len(), 1);
    }

    #[test]
    fn test_unknown_command() {
        let (runtime, _, _) = runtime(true);
        let err = runtime.command("puuttuu", &[]).unwrap_err();

        assert_eq!(err.kind, ErrorKind::UnknownComponent);
        assert_eq!(err.message(), "unknown component Savoksi\\PuuttuuKomento");
    }

    #[test]
    fn test_invalid_switch_is_not_swallowed() {
        let (runtime, capture, calls) = runtime(true);
        let err = runtime.command("asenna", &args(&["-x"])).unwrap_err();

        assert_eq!(err.kind, ErrorKind::InvalidArgument);
        assert_eq!(capture.text(), "");
        assert!(calls.lock().unwrap().is_empty());
    }

    #[test]
    fn test_closure_command_receives_files() {
        let (runtime, _, _) = runtime(false);
        let value = runtime
            .command(
                Launch::from_fn(|_, files| Ok(Value::from(files.to_vec()))),
                &args(&["a", "-q", "b"]),
            )
            .unwrap();

        assert_eq!(value, Value::from(vec!["a", "b"]));
    }

    #[test]
    fn test_unwired_package_manager() {
        let err = PackageManager::new().run(&args(&["install"])).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Unavailable);
    }
}
