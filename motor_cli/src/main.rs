#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//! `motor` command-line front end.

mod cli;
mod error_fmt;
mod run;

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use clap::Parser;
use eyre::{Result, WrapErr};
use motor_config::{Config, Logging};
use motor_core::MotorError;
use tracing_appender::non_blocking::WorkerGuard;

use crate::cli::{Cli, Commands, JSON_MODE};
use crate::error_fmt::{exit_code_for_error, format_error_json, humanize};
use crate::run::Plan;

fn main() {
    let cli = Cli::parse();
    let _ = JSON_MODE.set(cli.json);

    if let Err(e) = color_eyre::install() {
        eprintln!("failed to install error hooks: {e}");
    }

    if let Err(err) = real_main(cli) {
        if JSON_MODE.get().copied().unwrap_or(false) {
            eprintln!("{}", format_error_json(&err));
        } else {
            eprintln!("{}", humanize(&err));
        }
        std::process::exit(exit_code_for_error(&err));
    }
}

fn real_main(cli: Cli) -> Result<()> {
    let cfg = load_config(&cli.config)?;
    // Held until exit so the file writer drains.
    let _log_guard = init_tracing(cli.json, &cli.log_level, &cfg.logging)?;
    tracing::debug!(config = %cli.config.display(), backend = ?cfg.backend.kind, "config loaded");

    let shutdown = Arc::new(AtomicBool::new(false));
    {
        let flag = Arc::clone(&shutdown);
        ctrlc::set_handler(move || {
            flag.store(true, Ordering::Relaxed);
        })
        .wrap_err("failed to install Ctrl-C handler")?;
    }

    match cli.cmd {
        Commands::Run { duration_s, trace } => run::run_controller(
            &cfg,
            Plan::Sine,
            duration_s,
            trace.as_deref(),
            &shutdown,
            cli.json,
        ),
        Commands::Hold {
            target,
            duration_s,
            trace,
        } => run::run_controller(
            &cfg,
            Plan::Hold(target),
            duration_s,
            trace.as_deref(),
            &shutdown,
            cli.json,
        ),
        Commands::Simulate { trace } => run::simulate(&cfg, trace.as_deref(), cli.json),
        Commands::SelfCheck => run::self_check(&cfg, cli.json),
    }
}

fn load_config(path: &Path) -> Result<Config> {
    let text = std::fs::read_to_string(path).map_err(|e| {
        eyre::Report::new(MotorError::Io(format!(
            "read config {}: {e}",
            path.display()
        )))
    })?;
    let cfg = motor_config::load_toml(&text).map_err(|e| {
        eyre::Report::new(MotorError::Config(format!(
            "parse {}: {e}",
            path.display()
        )))
    })?;
    cfg.validate()
        .map_err(|e| eyre::Report::new(MotorError::Config(e.to_string())))?;
    Ok(cfg)
}

/// Console layer on stderr (pretty or JSON) filtered by `RUST_LOG` or `--log-level`;
/// optional JSON file layer from `[logging]`, whose flush guard is returned.
fn init_tracing(
    json: bool,
    log_level: &str,
    logging: &Logging,
) -> Result<Option<WorkerGuard>> {
    use tracing_appender::rolling::{RollingFileAppender, Rotation};
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::{EnvFilter, Layer, Registry, fmt};

    let console_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(log_level))
        .map_err(|e| {
            eyre::Report::new(MotorError::Config(format!(
                "invalid log level {log_level:?}: {e}"
            )))
        })?;

    let mut layers: Vec<Box<dyn Layer<Registry> + Send + Sync>> = Vec::new();
    if json {
        layers.push(
            fmt::layer()
                .json()
                .with_writer(std::io::stderr)
                .with_filter(console_filter)
                .boxed(),
        );
    } else {
        layers.push(
            fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr)
                .with_filter(console_filter)
                .boxed(),
        );
    }

    let mut file_guard = None;
    if let Some(file) = logging.file.as_deref() {
        let path = Path::new(file);
        let dir = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let name = path
            .file_name()
            .ok_or_else(|| eyre::eyre!("logging.file {file:?} has no file name"))?
            .to_string_lossy()
            .into_owned();
        let rotation = match logging.rotation.as_deref() {
            Some("daily") => Rotation::DAILY,
            Some("hourly") => Rotation::HOURLY,
            _ => Rotation::NEVER,
        };
        let appender = RollingFileAppender::builder()
            .rotation(rotation)
            .filename_prefix(name)
            .build(dir)
            .wrap_err_with(|| format!("open log file {file}"))?;
        let (writer, guard) = tracing_appender::non_blocking(appender);
        file_guard = Some(guard);

        let level = logging.level.as_deref().unwrap_or("info");
        let file_filter = EnvFilter::try_new(level).map_err(|e| {
            eyre::Report::new(MotorError::Config(format!(
                "invalid logging.level {level:?}: {e}"
            )))
        })?;
        layers.push(
            fmt::layer()
                .json()
                .with_ansi(false)
                .with_writer(writer)
                .with_filter(file_filter)
                .boxed(),
        );
    }

    tracing_subscriber::registry()
        .with(layers)
        .try_init()
        .wrap_err("install tracing subscriber")?;
    Ok(file_guard)
}
