// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;

use clap::error::ErrorKind;
use clap::{Parser, Subcommand, ValueEnum};

/// Command-line arguments for `dockhand`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "dockhand",
    version,
    about = "Run development tasks inside containers.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the config file.
    #[arg(
        short = 'f',
        long = "config-file",
        value_name = "PATH",
        default_value = "batect.yml",
        global = true
    )]
    pub config_file: PathBuf,

    /// Disable coloured output.
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Print plain line-at-a-time output instead of interactive progress.
    #[arg(long, global = true)]
    pub simple_output: bool,

    /// Only print the task's own output (and failures).
    #[arg(long, global = true)]
    pub quiet: bool,

    /// Do not check for newer versions.
    #[arg(long, global = true)]
    pub no_update_notification: bool,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `DOCKHAND_LOG` or a default level is used.
    #[arg(long, value_enum, value_name = "LEVEL", global = true)]
    pub log_level: Option<LogLevel>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Run a task.
    Run {
        /// Name of the task to run.
        task: String,
    },

    /// List the tasks this project defines.
    Tasks,

    /// Upgrade dockhand to the latest version.
    Upgrade,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
///
/// Help output (the `help` subcommand as well as `--help`/`-h`) exits with
/// a non-zero status: asking for help is never a successful task run.
/// `--version` keeps clap's zero exit.
pub fn parse() -> CliArgs {
    match CliArgs::try_parse() {
        Ok(args) => args,
        Err(err) if err.kind() == ErrorKind::DisplayHelp => {
            let _ = err.print();
            std::process::exit(1);
        }
        Err(err) => err.exit(),
    }
}
