//! `[build]` section configuration.
//!
//! # Example
//!
//! ```toml
//! [build]
//! device = "mobile"       # mobile | desktop (sprite ratio and CSS prefix targets)
//! browser_sync = true     # Start the preview server with live reload
//! notify = false          # OS notifications on task errors
//! hash = true             # Content-hash sprite sheet filenames
//! ```

use serde::{Deserialize, Serialize};

/// Device class the project targets.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Device {
    Desktop,
    #[default]
    Mobile,
}

impl Device {
    /// Display density the sprite map is authored for.
    pub const fn ratio(self) -> u32 {
        match self {
            Self::Desktop => 1,
            Self::Mobile => 2,
        }
    }
}

/// Feature toggles for a build.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildConfig {
    pub device: Device,
    pub browser_sync: bool,
    pub notify: bool,
    pub hash: bool,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            device: Device::Mobile,
            browser_sync: true,
            notify: false,
            hash: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::test_parse_config;

    #[test]
    fn test_build_defaults() {
        let config = test_parse_config("");
        assert_eq!(config.build.device, Device::Mobile);
        assert!(config.build.browser_sync);
        assert!(!config.build.notify);
        assert!(config.build.hash);
    }

    #[test]
    fn test_build_device_desktop() {
        let config = test_parse_config("[build]\ndevice = \"desktop\"\nhash = false");
        assert_eq!(config.build.device, Device::Desktop);
        assert_eq!(config.build.device.ratio(), 1);
        assert!(!config.build.hash);
        assert!(config.build.browser_sync);
    }
}
