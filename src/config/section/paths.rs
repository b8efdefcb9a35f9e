//! `[paths]` section configuration.
//!
//! Every path is relative to the directory holding `spritely.toml`.
//!
//! # Example
//!
//! ```toml
//! [paths]
//! html_src = "src/templates"      # Markup templates
//! html_dest = "src"               # Compiled HTML output
//! html_path = "src"               # Root served by the preview server
//! sprite_src = "src/sprite"       # One sub-folder per sprite group
//! sprite_dest = "src/img/sprite"  # Packed sprite sheets
//! css_src = "src/scss"            # SCSS sources
//! css_dest = "src/css"            # Compiled CSS output
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Source and output directories of the pipeline.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct PathsConfig {
    pub html_src: PathBuf,
    pub html_dest: PathBuf,
    pub html_path: PathBuf,
    pub sprite_src: PathBuf,
    pub sprite_dest: PathBuf,
    pub css_src: PathBuf,
    pub css_dest: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            html_src: "src/templates".into(),
            html_dest: "src".into(),
            html_path: "src".into(),
            sprite_src: "src/sprite".into(),
            sprite_dest: "src/img/sprite".into(),
            css_src: "src/scss".into(),
            css_dest: "src/css".into(),
        }
    }
}

impl PathsConfig {
    /// Make every relative path absolute against `root`.
    pub fn resolve(&mut self, root: &Path) {
        for path in [
            &mut self.html_src,
            &mut self.html_dest,
            &mut self.html_path,
            &mut self.sprite_src,
            &mut self.sprite_dest,
            &mut self.css_src,
            &mut self.css_dest,
        ] {
            if path.is_relative() {
                *path = root.join(&*path);
            }
        }
    }

    /// Directory receiving the generated `_sp_<group>.scss` fragments.
    pub fn sprite_fragment_dir(&self) -> PathBuf {
        self.css_src.join("sprite")
    }

    /// Directory holding the aggregate sprite map.
    pub fn sprite_map_dir(&self) -> PathBuf {
        self.css_src.join("common")
    }

    /// The aggregate `_sprite_maps.scss` file.
    pub fn sprite_map_file(&self) -> PathBuf {
        self.sprite_map_dir().join("_sprite_maps.scss")
    }
}
