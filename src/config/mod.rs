//! Pipeline configuration management for `spritely.toml`.
//!
//! # Sections
//!
//! | Section        | Purpose                                            |
//! |----------------|----------------------------------------------------|
//! | `[paths]`      | Source and output directories                      |
//! | `[build]`      | Device target and feature toggles                  |
//! | `[sprite]`     | Packing padding, density ratio, hashing options    |
//! | `[sass]`       | External SCSS compiler                             |
//! | `[template]`   | External template compiler                         |
//! | `[serve]`      | Preview server and live reload ports               |
//!
//! A missing config file is not an error: the built-in defaults describe the
//! conventional `src/` layout, rooted at the current directory.

mod error;
pub mod section;
mod util;

pub use error::{ConfigDiagnostics, ConfigError};
pub use section::{
    BuildConfig, Device, PathsConfig, SassConfig, ServeConfig, SpriteConfig, TemplateConfig,
};

use crate::{debug, log, utils::path::normalize_path};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};
use util::find_config_file;

/// Largest accepted sprite padding, in pixels.
const MAX_PADDING: u32 = 1024;

/// Root configuration structure representing spritely.toml
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Absolute path to the config file (empty when running on defaults)
    #[serde(skip)]
    pub config_path: PathBuf,

    /// Project root directory - parent of config file
    #[serde(skip)]
    pub root: PathBuf,

    pub paths: PathsConfig,
    pub build: BuildConfig,
    pub sprite: SpriteConfig,
    pub sass: SassConfig,
    pub template: TemplateConfig,
    pub serve: ServeConfig,
}

impl PipelineConfig {
    /// Load configuration, searching upward from cwd for `config_name`.
    pub fn load(config_name: &Path) -> Result<Self> {
        let cwd = std::env::current_dir().context("Failed to get current working directory")?;

        let mut config = match find_config_file(config_name) {
            Some(path) => {
                let mut config = Self::from_path(&path)?;
                config.config_path = path;
                config
            }
            None => {
                debug!("config"; "`{}` not found, using defaults", config_name.display());
                Self::default()
            }
        };

        let root = config
            .config_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or(cwd);
        config.finalize(&root);
        config.validate()?;

        Ok(config)
    }

    /// Load configuration from file path with unknown field detection.
    fn from_path(path: &Path) -> Result<Self> {
        let content =
            fs::read_to_string(path).map_err(|err| ConfigError::Io(path.to_path_buf(), err))?;

        let (config, ignored) = Self::parse_with_ignored(&content)?;
        if !ignored.is_empty() {
            Self::print_unknown_fields_warning(&ignored, path);
        }

        Ok(config)
    }

    /// Parse TOML content, collecting any unknown fields.
    fn parse_with_ignored(content: &str) -> Result<(Self, Vec<String>), ConfigError> {
        let mut ignored = Vec::new();
        let deserializer = toml::Deserializer::new(content);
        let config = serde_ignored::deserialize(deserializer, |path: serde_ignored::Path| {
            ignored.push(path.to_string());
        })?;
        Ok((config, ignored))
    }

    fn print_unknown_fields_warning(fields: &[String], path: &Path) {
        let display_path = path
            .file_name()
            .map(|n| n.to_string_lossy())
            .unwrap_or_else(|| path.to_string_lossy());
        log!("warning"; "unknown fields in {}, ignoring:", display_path);
        for field in fields {
            eprintln!("- {}", field);
        }
    }

    /// Anchor every path at the project root.
    fn finalize(&mut self, root: &Path) {
        self.root = normalize_path(root);
        self.paths.resolve(&self.root);
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let mut diag = ConfigDiagnostics::new();

        if self.sprite.padding > MAX_PADDING {
            diag.error(
                "sprite.padding",
                format!("must be at most {MAX_PADDING}, got {}", self.sprite.padding),
            );
        }
        if self.sprite.ratio == Some(0) {
            diag.error("sprite.ratio", "must be at least 1");
        }
        if self.sass.command.is_empty() {
            diag.error("sass.command", "must name a program");
        }
        if self.template.command.is_empty() {
            diag.error("template.command", "must name a program");
        }
        if self.serve.port == self.serve.ws_port {
            diag.error("serve.ws_port", "must differ from serve.port");
        }

        diag.into_result()
    }

    /// Density ratio written into the aggregate sprite map.
    pub fn sprite_ratio(&self) -> u32 {
        self.sprite.ratio.unwrap_or(self.build.device.ratio())
    }

    /// Get path relative to the project root (for log output).
    pub fn root_relative(&self, path: impl AsRef<Path>) -> PathBuf {
        path.as_ref()
            .strip_prefix(&self.root)
            .map(Path::to_path_buf)
            .unwrap_or_else(|_| path.as_ref().to_path_buf())
    }

    /// Build a config rooted at `root` with default settings (tests and fixtures).
    #[cfg(test)]
    pub fn rooted(root: &Path) -> Self {
        let mut config = Self::default();
        config.finalize(root);
        config
    }
}

/// Parse a config snippet, failing on unknown fields.
#[cfg(test)]
pub fn test_parse_config(content: &str) -> PipelineConfig {
    let (parsed, ignored) = PipelineConfig::parse_with_ignored(content).unwrap();
    assert!(
        ignored.is_empty(),
        "test config has unknown fields: {:?}",
        ignored
    );
    parsed
}
