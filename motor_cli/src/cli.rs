//! CLI argument definitions and shared statics.

use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::OnceLock;

/// Whether the user asked for JSON output (controls structured error output).
pub static JSON_MODE: OnceLock<bool> = OnceLock::new();

#[derive(Parser, Debug)]
#[command(name = "motor", version, about = "Closed-loop DC motor controller")]
pub struct Cli {
    /// Path to config TOML (typed)
    #[arg(long, value_name = "FILE", default_value = "etc/motor_config.toml")]
    pub config: PathBuf,

    /// Log as JSON lines and print machine-readable summaries
    #[arg(long, action = ArgAction::SetTrue)]
    pub json: bool,

    /// Console log level (error|warn|info|debug|trace)
    #[arg(long = "log-level", value_name = "LEVEL", default_value = "info")]
    pub log_level: String,

    /// Command to execute
    #[command(subcommand)]
    pub cmd: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Follow the configured sine profile for [runner].duration_s
    Run {
        /// Override [runner].duration_s
        #[arg(long, value_name = "SECS")]
        duration_s: Option<f64>,
        /// Write every control step to this CSV file
        #[arg(long, value_name = "FILE")]
        trace: Option<PathBuf>,
    },
    /// Hold a constant target until the duration elapses or Ctrl-C
    Hold {
        /// Revolutions (position), revolutions/s (velocity) or power in [-1, 1] (raw_power)
        #[arg(long, allow_negative_numbers = true)]
        target: f64,
        /// Override [runner].duration_s
        #[arg(long, value_name = "SECS")]
        duration_s: Option<f64>,
        /// Write every control step to this CSV file
        #[arg(long, value_name = "FILE")]
        trace: Option<PathBuf>,
    },
    /// Run the PID against an ideal plant offline, using [pid] and [sim]
    Simulate {
        /// Write the trace to this CSV file instead of summarizing only
        #[arg(long, value_name = "FILE")]
        trace: Option<PathBuf>,
    },
    /// Build the controller against the configured back-end, then stop it
    SelfCheck,
}
