//! savoksi CLI - Maintenance commands and name lookups
//!
//! Usage:
//!   savoksi asenna vendor/paketti -v
//!   savoksi --config asetukset.yaml config tietokanta.osoite
//!   savoksi name luo-tili --suffix Sovellus

use clap::{Parser, Subcommand};
use colored::Colorize;
use savoksi_core::{
    canonicalize, shorten, Context, Error, ExternalCommand, PackageManager, Result, Runtime,
    Target,
};
use std::path::{Path, PathBuf};
use std::process::{Command, ExitCode};
use std::sync::Arc;

/// savoksi - Component wiring and maintenance commands
#[derive(Parser, Debug)]
#[command(name = "savoksi")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Settings file (YAML or JSON) loaded into the root context
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug, PartialEq)]
enum Commands {
    /// Print the canonical form of a component name
    Name {
        /// Short or canonical name (e.g., luo-tili, Savoksi\LuoTili)
        name: String,

        /// Type suffix to apply (e.g., Sovellus, Komento)
        #[arg(short, long, default_value = "")]
        suffix: String,

        /// Print the short form instead
        #[arg(long)]
        short: bool,
    },

    /// Print a setting from the settings file
    Config {
        /// Dotted key (e.g., tietokanta.osoite)
        key: String,
    },

    /// Run a maintenance command (asenna, paivita, ...)
    #[command(external_subcommand)]
    External(Vec<String>),
}

/// Runs the package manager as a child process
struct ProcessRunner {
    program: String,
}

impl ProcessRunner {
    fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl ExternalCommand for ProcessRunner {
    fn run(&self, args: &[String]) -> Result<()> {
        log::debug!("Spawning {} {}", self.program, args.join(" "));
        let status = Command::new(&self.program)
            .args(args)
            .status()
            .map_err(|e| Error::io("cannot run {1}", self.program.as_str(), e))?;

        if status.success() {
            Ok(())
        } else {
            Err(Error::io("{1} failed", self.program.as_str(), status))
        }
    }
}

/// Run the CLI with the process arguments
pub fn run() -> ExitCode {
    let cli = Cli::parse();

    match cli.command {
        Commands::Name {
            name,
            suffix,
            short,
        } => cmd_name(&name, &suffix, short),

        Commands::Config { key } => match runtime(cli.config.as_deref()) {
            Ok(runtime) => cmd_config(&runtime, &key),
            Err(e) => report(&e, 2),
        },

        Commands::External(words) => match runtime(cli.config.as_deref()) {
            Ok(runtime) => cmd_command(&runtime, &words),
            Err(e) => report(&e, 2),
        },
    }
}

/// Build the runtime: root context from the settings file, package manager
/// wired to `composer`
fn runtime(config: Option<&Path>) -> Result<Runtime> {
    let mut root = Context::new();
    if let Some(path) = config {
        root.load_settings_file(path)?;
    }

    let runtime = Runtime::new();
    runtime.push(root);
    runtime.register(
        "composer",
        Some(Target::Instance(Arc::new(PackageManager::with_runner(
            ProcessRunner::new("composer"),
        )))),
    );
    Ok(runtime)
}

fn report(error: &Error, code: u8) -> ExitCode {
    eprintln!("{}", error.to_string().red());
    ExitCode::from(code)
}

fn cmd_name(name: &str, suffix: &str, short: bool) -> ExitCode {
    let result = if short {
        shorten(name, suffix)
    } else {
        canonicalize(name, suffix)
    };

    match result {
        Ok(text) => {
            println!("{}", text);
            ExitCode::SUCCESS
        }
        Err(e) => report(&e, 1),
    }
}

fn cmd_config(runtime: &Runtime, key: &str) -> ExitCode {
    match runtime.config(key) {
        Some(value) => {
            println!("{}", value);
            ExitCode::SUCCESS
        }
        None => {
            eprintln!("{} {} is not set", "✗".red(), key);
            ExitCode::from(1)
        }
    }
}

fn cmd_command(runtime: &Runtime, words: &[String]) -> ExitCode {
    let Some((name, args)) = words.split_first() else {
        eprintln!("{}", "No command given".red());
        return ExitCode::from(2);
    };

    match runtime.command(name.as_str(), args) {
        Ok(value) => {
            if !value.is_null() {
                println!("{}", value);
            }
            ExitCode::SUCCESS
        }
        Err(e) => report(&e, 1),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(args).unwrap()
    }

    #[test]
    fn test_parse_name() {
        let cli = parse(&["savoksi", "name", "luo-tili", "--suffix", "Sovellus"]);
        assert_eq!(
            cli.command,
            Commands::Name {
                name: "luo-tili".to_string(),
                suffix: "Sovellus".to_string(),
                short: false,
            }
        );
        assert!(cli.config.is_none());

        let cli = parse(&["savoksi", "name", "Savoksi\\Paate", "--short"]);
        assert_eq!(
            cli.command,
            Commands::Name {
                name: "Savoksi\\Paate".to_string(),
                suffix: String::new(),
                short: true,
            }
        );
    }

    #[test]
    fn test_parse_config_with_settings_file() {
        let cli = parse(&["savoksi", "--config", "asetukset.yaml", "config", "a.b"]);
        assert_eq!(cli.config, Some(PathBuf::from("asetukset.yaml")));
        assert_eq!(
            cli.command,
            Commands::Config {
                key: "a.b".to_string()
            }
        );
    }

    #[test]
    fn test_parse_external_command_keeps_switches() {
        let cli = parse(&["savoksi", "asenna", "vendor/paketti", "-v"]);
        assert_eq!(
            cli.command,
            Commands::External(vec![
                "asenna".to_string(),
                "vendor/paketti".to_string(),
                "-v".to_string(),
            ])
        );
    }

    #[test]
    fn test_parse_requires_command() {
        assert!(Cli::try_parse_from(["savoksi"]).is_err());
    }

    #[test]
    fn test_runtime_without_settings() {
        let runtime = runtime(None).unwrap();
        assert_eq!(runtime.stack_len(), 1);
        assert_eq!(runtime.config("puuttuu"), None);
        assert!(runtime.get_as::<PackageManager>("composer").is_ok());
    }

    #[test]
    fn test_runtime_with_missing_settings_file() {
        let err = runtime(Some(Path::new("/ei/ole/olemassa.yaml"))).err().unwrap();
        assert_eq!(err.kind, savoksi_core::ErrorKind::Io);
    }
}
