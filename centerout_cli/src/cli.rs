//! CLI argument definitions and shared statics.

use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::OnceLock;

pub static FILE_GUARD: OnceLock<tracing_appender::non_blocking::WorkerGuard> = OnceLock::new();
/// Whether the user asked for JSON output (controls structured error output).
pub static JSON_MODE: OnceLock<bool> = OnceLock::new();

#[derive(Parser, Debug)]
#[command(name = "centerout", version, about = "Center-out reaching trial controller")]
pub struct Cli {
    /// Path to settings TOML; built-in defaults apply when omitted
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Log as JSON lines instead of pretty
    #[arg(long, action = ArgAction::SetTrue)]
    pub json: bool,

    /// Console log level (error|warn|info|debug|trace)
    #[arg(long = "log-level", value_name = "LEVEL", default_value = "info")]
    pub log_level: String,

    /// Command to execute
    #[command(subcommand)]
    pub cmd: Commands,
}

/// Parameter and target sources; each falls back to `[sources]` in the settings.
#[derive(clap::Args, Debug, Clone)]
pub struct SourceArgs {
    /// Tab-separated parameter file
    #[arg(long, value_name = "FILE")]
    pub params: Option<String>,

    /// Target index sequence file
    #[arg(long, value_name = "FILE")]
    pub targets: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the controller over stdin/stdout: one JSON event per input line,
    /// one JSON snapshot per output line. EOF or Ctrl-C stops it.
    Run {
        #[command(flatten)]
        sources: SourceArgs,
        /// Seed the hold-time sampler for reproducible runs
        #[arg(long, value_name = "SEED")]
        seed: Option<u64>,
    },
    /// Load and validate both sources, then print the layout and deadlines
    Check {
        #[command(flatten)]
        sources: SourceArgs,
    },
}
