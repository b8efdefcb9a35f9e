//! spritely - sprite sheets, cache busting, styles, templates and live reload
//! for static front-end projects.

#![allow(dead_code)]

mod alert;
mod cli;
mod config;
mod core;
mod embed;
mod logger;
mod reload;
mod serve;
mod sprite;
mod style;
mod task;
mod template;
mod utils;
mod watch;

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{ColorChoice, Parser};
use cli::Cli;
use config::PipelineConfig;
use task::{Session, Task};

fn main() -> Result<ExitCode> {
    // Setup global Ctrl+C handler (before any blocking operations)
    core::setup_shutdown_handler()?;

    let cli = Cli::parse();

    match cli.color {
        ColorChoice::Always => owo_colors::set_override(true),
        ColorChoice::Never => owo_colors::set_override(false),
        ColorChoice::Auto => {} // owo-colors auto-detects TTY
    }
    logger::set_verbose(cli.verbose);

    if cli.list {
        print!("{}", cli::render_task_list());
        return Ok(ExitCode::SUCCESS);
    }

    let config = Arc::new(PipelineConfig::load(&cli.config)?);
    debug!("config"; "root: {}", config.root.display());

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to create tokio runtime")?;

    runtime.block_on(run(config, &cli.tasks))
}

/// Run the requested tasks, then keep watching while the watcher or the
/// server is up.
async fn run(config: Arc<PipelineConfig>, tasks: &[Task]) -> Result<ExitCode> {
    let session = Session::new(config);
    let report = session.run(tasks).await?;

    if !session.is_long_running() {
        if report.is_success() {
            return Ok(ExitCode::SUCCESS);
        }
        let failed: Vec<_> = report.failed().map(Task::name).collect();
        log!("error"; "failed: {}", failed.join(", "));
        return Ok(ExitCode::FAILURE);
    }

    watch::run(Arc::clone(&session)).await?;

    Ok(ExitCode::SUCCESS)
}
