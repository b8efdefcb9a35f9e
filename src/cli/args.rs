//! Command-line interface definitions.

use std::path::PathBuf;

use clap::{ColorChoice, Parser};

use crate::task::Task;

/// Sprite sheets, cache busting, styles, templates and live reload
#[derive(Parser, Debug, Clone)]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Tasks to run, with their dependencies (see --list)
    #[arg(value_name = "TASK", default_value = "default")]
    pub tasks: Vec<Task>,

    /// Config file path, searched upward from the current directory
    #[arg(short = 'C', long, default_value = "spritely.toml", value_hint = clap::ValueHint::FilePath)]
    pub config: PathBuf,

    /// Control colored output (auto, always, never)
    #[arg(long, default_value = "auto")]
    pub color: ColorChoice,

    /// Show debug output
    #[arg(short = 'V', long)]
    pub verbose: bool,

    /// Print the task graph and exit
    #[arg(short, long)]
    pub list: bool,
}
