//! Aggregate sprite map: imports every fragment and collects them into
//! `$sprite-maps`, keyed by SCSS identifier.

use std::fmt::Write;
use std::path::PathBuf;

use anyhow::{Context, Result};

use super::scan::scan_groups;
use super::{fragment_file_name, ident};
use crate::config::PipelineConfig;
use crate::utils::fs::write_if_changed;
use crate::utils::path::relative_posix;
use crate::utils::plural::plural_count;
use crate::{debug, log};

/// Render the map for `groups` at density `ratio`.
///
/// `import_dir` is the fragment directory relative to the map's directory.
pub fn render(groups: &[String], ratio: u32, import_dir: &str) -> String {
    let mut out = String::from("// Generated sprite map; changes are overwritten.\n");

    // Infallible: writing into a String.
    let _ = writeln!(out, "$sprite-ratio: {ratio};");
    out.push('\n');

    for group in groups {
        let _ = writeln!(out, "@import \"{import_dir}/{}\";", ident(group));
    }
    if !groups.is_empty() {
        out.push('\n');
    }

    out.push_str("$sprite-maps: (\n");
    for group in groups {
        let id = ident(group);
        let _ = writeln!(
            out,
            "  '{id}': (ratio: $sprite-ratio, image: ${id}-image, \
             width: ${id}-width, height: ${id}-height, frames: ${id}),"
        );
    }
    out.push_str(");\n");
    out
}

/// Write `_sprite_maps.scss` for the groups whose fragment exists.
pub fn write_map(config: &PipelineConfig) -> Result<PathBuf> {
    let fragment_dir = config.paths.sprite_fragment_dir();
    let groups: Vec<String> = scan_groups(&config.paths.sprite_src)
        .into_iter()
        .filter(|g| {
            let exists = fragment_dir.join(fragment_file_name(g)).is_file();
            if !exists {
                debug!("sprite"; "`{}` has no fragment, left out of the map", g);
            }
            exists
        })
        .collect();

    let path = config.paths.sprite_map_file();
    let import_dir = relative_posix(&config.paths.sprite_map_dir(), &fragment_dir);
    let text = render(&groups, config.sprite_ratio(), &import_dir);

    let written = write_if_changed(&path, text.as_bytes())
        .with_context(|| format!("Failed to write {}", path.display()))?;
    if written {
        log!("sprite"; "map: {} ({})", config.root_relative(&path).display(),
            plural_count(groups.len(), "group"));
    }
    Ok(path)
}
