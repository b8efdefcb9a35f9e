//! Sprite-sheet pipeline: scan → pack → map → hash.
//!
//! ```text
//! src/sprite/<group>/*.png
//!        │ scan (one group per folder)
//!        ▼
//! pack ──► src/img/sprite/sp_<group>.png + src/scss/sprite/_sp_<group>.scss
//!        │
//!        ├─► map  ──► src/scss/common/_sprite_maps.scss
//!        └─► hash ──► src/img/sprite/sp_<group>_<hash8>.png (+ rewritten fragments)
//! ```

mod fragment;
pub mod hash;
pub mod layout;
pub mod map;
mod pack;
pub mod scan;


pub use pack::{Frame, PackOptions, PackedSheet, pack_all, pack_group};

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Naming prefix shared by sheets, fragments and SCSS identifiers.
pub const PREFIX: &str = "sp_";

/// `sp_<group>.png`
pub fn sheet_file_name(group: &str) -> String {
    format!("{PREFIX}{group}.png")
}

/// `_sp_<group>.scss`
pub fn fragment_file_name(group: &str) -> String {
    format!("_{PREFIX}{group}.scss")
}

/// `sp_<group>`, the SCSS identifier and import name of a group.
pub fn ident(group: &str) -> String {
    format!("{PREFIX}{group}")
}

/// Whether `group` can be spliced into SCSS identifiers and file names.
pub fn is_valid_group_name(group: &str) -> bool {
    !group.is_empty()
        && group
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

/// Errors raised while packing or renaming sprite sheets.
#[derive(Debug, Error)]
pub enum SpriteError {
    #[error("I/O error on `{}`", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("group name `{0}` may only contain ASCII letters, digits, `_` and `-`")]
    InvalidName(String),

    #[error("failed to decode image `{}`", path.display())]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("failed to encode sprite sheet for `{group}`")]
    Encode {
        group: String,
        #[source]
        source: image::ImageError,
    },

    #[error("failed to remove stale sprite `{}`", path.display())]
    StaleRemove {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid sprite name pattern")]
    Pattern(#[from] regex::Error),
}

impl SpriteError {
    pub(crate) fn io(path: &Path, source: io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// A folder of source images that becomes one sprite sheet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpriteGroup {
    pub name: String,
    pub dir: PathBuf,
    /// Source images, sorted by file name
    pub images: Vec<PathBuf>,
}

impl SpriteGroup {
    /// Load the group `name` under the sprite source directory.
    pub fn load(sprite_src: &Path, name: &str) -> Result<Self, SpriteError> {
        if !is_valid_group_name(name) {
            return Err(SpriteError::InvalidName(name.to_string()));
        }
        let dir = sprite_src.join(name);
        let images = scan::collect_images(&dir).map_err(|e| SpriteError::io(&dir, e))?;
        Ok(Self {
            name: name.to_string(),
            dir,
            images,
        })
    }

    pub fn ident(&self) -> String {
        ident(&self.name)
    }
}

#[cfg(test)]
mod naming_tests {
    use super::*;

    #[test]
    fn test_naming_convention() {
        assert_eq!(sheet_file_name("common"), "sp_common.png");
        assert_eq!(fragment_file_name("common"), "_sp_common.scss");
        assert_eq!(ident("icons"), "sp_icons");
    }

    #[test]
    fn test_group_names_must_be_identifiers() {
        assert!(is_valid_group_name("icons"));
        assert!(is_valid_group_name("ui-2x_hover"));
        assert!(!is_valid_group_name("my icons"));
        assert!(!is_valid_group_name("a.b"));
        assert!(!is_valid_group_name("ümlaut"));
        assert!(!is_valid_group_name(""));
    }

    #[test]
    fn test_load_rejects_invalid_name() {
        let err = SpriteGroup::load(Path::new("src/sprite"), "my icons").unwrap_err();
        assert!(matches!(err, SpriteError::InvalidName(ref n) if n == "my icons"));
        assert!(err.to_string().contains("`my icons`"));
    }

    #[test]
    fn test_error_display_names_path() {
        let err = SpriteError::io(
            Path::new("src/sprite/icons"),
            io::Error::new(io::ErrorKind::PermissionDenied, "denied"),
        );
        assert!(err.to_string().contains("src/sprite/icons"));
    }
}
