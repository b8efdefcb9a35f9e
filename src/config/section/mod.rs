//! Configuration section definitions, one file per TOML table.

mod build;
mod paths;
mod serve;
mod sprite;
mod tools;

pub use build::{BuildConfig, Device};
pub use paths::PathsConfig;
pub use serve::ServeConfig;
pub use sprite::SpriteConfig;
pub use tools::{SassConfig, TemplateConfig};
