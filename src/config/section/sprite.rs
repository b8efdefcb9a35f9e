//! `[sprite]` section configuration.
//!
//! # Example
//!
//! ```toml
//! [sprite]
//! padding = 10              # Pixels between packed images
//! ratio = 2                 # Override the device density ratio
//! remove_unhashed = false   # Delete sp_<group>.png after hashing
//! ```

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SpriteConfig {
    pub padding: u32,
    pub ratio: Option<u32>,
    pub remove_unhashed: bool,
}

impl Default for SpriteConfig {
    fn default() -> Self {
        Self {
            padding: 10,
            ratio: None,
            remove_unhashed: false,
        }
    }
}
