//! Filesystem helpers for generated outputs.

use std::fs;
use std::io;
use std::path::Path;

/// Write `content` only when it differs from what is on disk.
///
/// Returns `true` if the file was written. Parent directories are created.
/// Skipping identical writes keeps the watcher from seeing phantom changes.
pub fn write_if_changed(path: &Path, content: &[u8]) -> io::Result<bool> {
    if let Ok(existing) = fs::read(path)
        && existing == content
    {
        return Ok(false);
    }

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, content)?;
    Ok(true)
}
