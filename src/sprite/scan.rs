//! Folder scanning: sprite groups and their source images.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::utils::path::is_hidden;

/// Raster extensions accepted as sprite sources (lowercase).
const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "webp"];

/// Names of the immediate subdirectories of `dir`, sorted.
///
/// Files and hidden entries are ignored. A missing or unreadable directory
/// yields an empty list.
pub fn scan_groups(dir: &Path) -> Vec<String> {
    let Ok(entries) = fs::read_dir(dir) else {
        return Vec::new();
    };

    let mut groups: Vec<String> = entries
        .filter_map(Result::ok)
        .filter(|entry| entry.path().is_dir() && !is_hidden(&entry.path()))
        .filter_map(|entry| entry.file_name().to_str().map(str::to_string))
        .collect();
    groups.sort();
    groups
}

/// Raster images directly inside `dir`, sorted by file name.
pub fn collect_images(dir: &Path) -> io::Result<Vec<PathBuf>> {
    let mut images: Vec<PathBuf> = fs::read_dir(dir)?
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| path.is_file() && !is_hidden(path) && is_image(path))
        .collect();
    images.sort();
    Ok(images)
}

fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| {
            IMAGE_EXTENSIONS
                .iter()
                .any(|known| known.eq_ignore_ascii_case(ext))
        })
}
