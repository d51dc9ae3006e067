//! Everything needed for parsing the `lumen` CLI's arguments.

use clap::{Args, Parser, Subcommand, ValueEnum};

/// Top-level CLI configuration.
#[derive(Parser, Debug)]
#[command(author, version, about)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Specify the log level of the interpreter.
    #[arg(value_enum, short, long, global = true, default_value_t = LogLevel::default())]
    pub verbosity: LogLevel,
}

impl Cli {
    pub fn init() -> Self {
        Cli::parse()
    }
}

/// Enum for specifying the log level of the interpreter.
#[derive(ValueEnum, Clone, Default, Debug)]
pub enum LogLevel {
    /// The default log level. Only critical errors are logged.
    #[default]
    #[value(alias("0"))]
    Error,

    /// Also logs warnings.
    #[value(alias("1"))]
    Warn,

    /// Also logs general information about loading and evaluating modules.
    #[value(alias("2"))]
    Info,

    /// Logs everything the loader and evaluator do internally.
    #[value(alias("3"))]
    Debug,

    /// Logs extra, very verbose information.
    #[value(alias("4"))]
    Trace,
}

impl From<&LogLevel> for log::Level {
    fn from(value: &LogLevel) -> Self {
        match value {
            LogLevel::Error => log::Level::Error,
            LogLevel::Warn => log::Level::Warn,
            LogLevel::Info => log::Level::Info,
            LogLevel::Debug => log::Level::Debug,
            LogLevel::Trace => log::Level::Trace,
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Run a Lumen source file.
    Run(RunArgs),

    /// Start an interactive read-eval-print loop.
    Repl,

    /// Print version information.
    Version,

    /// Print a short description of the language.
    About,
}

#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    /// The path to the Lumen source file to run.
    #[arg(index = 1)]
    pub file: std::path::PathBuf,
}
