//! Stylesheet steps.
//!
//! - `sass`: top-level `css_src/*.scss` → `css_dest`, expanded, with
//!   source maps
//! - `sass-build`: every non-partial `css_src/**/*.scss`, no source maps,
//!   vendor prefixes for the configured device
//! - `minify`: `css_dest/*.css` in place
//!
//! Compilation is delegated to the configured Sass program; prefixing and
//! minification run in-process through lightningcss.

mod css;

pub use css::{autoprefix, minify_css, targets_for};

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use jwalk::WalkDir;
use rayon::prelude::*;
use rustc_hash::FxHashMap;

use crate::config::PipelineConfig;
use crate::utils::exec::{Cmd, FilterRule, resolve_args};
use crate::utils::fs::write_if_changed;
use crate::utils::path::is_hidden;
use crate::utils::plural::plural_count;
use crate::{debug, log};

/// Dart Sass deprecation chatter.
static SASS_FILTER: FilterRule = FilterRule::new(&["DEPRECATION WARNING", "More info"]);

/// Development compile with source maps.
pub fn compile(config: &PipelineConfig) -> Result<Vec<PathBuf>> {
    let entries = top_level_entries(&config.paths.css_src);
    if entries.is_empty() {
        debug!("sass"; "no entry stylesheets in {}",
            config.root_relative(&config.paths.css_src).display());
        return Ok(Vec::new());
    }

    let outputs = run_sass(config, &entries, true)?;
    log!("sass"; "compiled {}", plural_count(outputs.len(), "stylesheet"));
    Ok(outputs)
}

/// Release compile: drop stale source maps, compile every entry, prefix.
pub fn build(config: &PipelineConfig) -> Result<Vec<PathBuf>> {
    let removed = remove_source_maps(&config.paths.css_dest)?;
    if removed > 0 {
        debug!("sass"; "removed {}", plural_count(removed, "source map"));
    }

    let entries = all_entries(&config.paths.css_src);
    if entries.is_empty() {
        debug!("sass"; "nothing to build");
        return Ok(Vec::new());
    }

    let outputs = run_sass(config, &entries, false)?;
    let targets = targets_for(config.build.device);
    outputs.par_iter().try_for_each(|path| -> Result<()> {
        let source =
            fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
        let prefixed = autoprefix(&source, &path.to_string_lossy(), targets)?;
        write_if_changed(path, prefixed.as_bytes())
            .with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(())
    })?;

    log!("sass"; "built {} for {:?}", plural_count(outputs.len(), "stylesheet"), config.build.device);
    Ok(outputs)
}

/// Minify `css_dest/*.css` in place. Returns how many files changed.
pub fn minify(config: &PipelineConfig) -> Result<usize> {
    let dir = &config.paths.css_dest;
    let files = files_with_extension(dir, "css");

    let changed: Vec<bool> = files
        .par_iter()
        .map(|path| -> Result<bool> {
            let source = fs::read_to_string(path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            let minified = minify_css(&source, &path.to_string_lossy())?;
            write_if_changed(path, minified.as_bytes())
                .with_context(|| format!("Failed to write {}", path.display()))
        })
        .collect::<Result<_>>()?;

    let count = changed.into_iter().filter(|c| *c).count();
    log!("minify"; "{} of {} minified", count, plural_count(files.len(), "stylesheet"));
    Ok(count)
}

// ============================================================================
// Sass invocation
// ============================================================================

/// Compile `entries` in one Sass run. Returns the output paths.
fn run_sass(config: &PipelineConfig, entries: &[PathBuf], source_map: bool) -> Result<Vec<PathBuf>> {
    let paths = &config.paths;
    let pairs: Vec<(PathBuf, PathBuf)> = entries
        .iter()
        .map(|entry| (entry.clone(), output_for(entry, &paths.css_src, &paths.css_dest)))
        .collect();

    for (_, out) in &pairs {
        if let Some(parent) = out.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
    }

    let mut vars = FxHashMap::default();
    vars.insert("ROOT", config.root.display().to_string());
    vars.insert("CSS_SRC", paths.css_src.display().to_string());
    vars.insert("CSS_DEST", paths.css_dest.display().to_string());

    let map_flag = if source_map { "--source-map" } else { "--no-source-map" };
    let pair_args = pairs.iter().map(|(src, out)| {
        format!(
            "{}:{}",
            config.root_relative(src).display(),
            config.root_relative(out).display()
        )
    });

    Cmd::from_slice(&config.sass.command)
        .args(resolve_args(&config.sass.args, &vars))
        .args(["--style=expanded", map_flag])
        .args(pair_args)
        .cwd(&config.root)
        .filter(&SASS_FILTER)
        .run()?;

    Ok(pairs.into_iter().map(|(_, out)| out).collect())
}

// ============================================================================
// File selection
// ============================================================================

/// Entry stylesheets directly inside `dir`.
fn top_level_entries(dir: &Path) -> Vec<PathBuf> {
    files_with_extension(dir, "scss")
        .into_iter()
        .filter(|p| !is_partial(p))
        .collect()
}

/// Entry stylesheets anywhere below `dir`.
fn all_entries(dir: &Path) -> Vec<PathBuf> {
    if !dir.is_dir() {
        return Vec::new();
    }
    let mut files: Vec<PathBuf> = WalkDir::new(dir)
        .skip_hidden(true)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file())
        .map(|e| e.path())
        .filter(|p| p.extension().is_some_and(|e| e == "scss") && !is_partial(p))
        .collect();
    files.sort();
    files
}

fn files_with_extension(dir: &Path, ext: &str) -> Vec<PathBuf> {
    let Ok(entries) = fs::read_dir(dir) else {
        return Vec::new();
    };
    let mut files: Vec<PathBuf> = entries
        .filter_map(Result::ok)
        .map(|e| e.path())
        .filter(|p| p.is_file() && !is_hidden(p) && p.extension().is_some_and(|e| e == ext))
        .collect();
    files.sort();
    files
}

/// Sass partials (`_name.scss`) are only compiled through imports.
fn is_partial(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.starts_with('_'))
}

/// `css_src/a/b.scss` → `css_dest/a/b.css`
fn output_for(entry: &Path, css_src: &Path, css_dest: &Path) -> PathBuf {
    let relative = entry.strip_prefix(css_src).unwrap_or(entry);
    css_dest.join(relative).with_extension("css")
}

/// Delete every `*.css.map` below `dir`.
fn remove_source_maps(dir: &Path) -> Result<usize> {
    if !dir.is_dir() {
        return Ok(0);
    }
    let maps: Vec<PathBuf> = WalkDir::new(dir)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file())
        .map(|e| e.path())
        .filter(|p| p.to_string_lossy().ends_with(".css.map"))
        .collect();

    for path in &maps {
        fs::remove_file(path)
            .map_err(|e| anyhow!("Failed to remove {}: {e}", path.display()))?;
    }
    Ok(maps.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn touch(path: &Path) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, "").unwrap();
    }

    #[test]
    fn test_entry_selection() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        for name in ["main.scss", "_vars.scss", "sub/page.scss", "sub/_mixin.scss", "notes.md"] {
            touch(&root.join(name));
        }

        assert_eq!(top_level_entries(root), vec![root.join("main.scss")]);
        assert_eq!(
            all_entries(root),
            vec![root.join("main.scss"), root.join("sub/page.scss")]
        );
        assert!(all_entries(&root.join("missing")).is_empty());
    }

    #[test]
    fn test_output_for_mirrors_tree() {
        assert_eq!(
            output_for(Path::new("/p/scss/sub/page.scss"), Path::new("/p/scss"), Path::new("/p/css")),
            PathBuf::from("/p/css/sub/page.css")
        );
    }

    #[test]
    fn test_remove_source_maps() {
        let dir = TempDir::new().unwrap();
        touch(&dir.path().join("main.css"));
        touch(&dir.path().join("main.css.map"));
        touch(&dir.path().join("sub/page.css.map"));

        assert_eq!(remove_source_maps(dir.path()).unwrap(), 2);
        assert!(dir.path().join("main.css").exists());
        assert!(!dir.path().join("sub/page.css.map").exists());
        assert_eq!(remove_source_maps(&dir.path().join("none")).unwrap(), 0);
    }

    #[test]
    fn test_compile_without_entries_skips_sass() {
        let dir = TempDir::new().unwrap();
        let mut config = PipelineConfig::rooted(dir.path());
        config.sass.command = vec!["spritely-no-such-sass".into()];
        assert!(compile(&config).unwrap().is_empty());
        assert!(build(&config).unwrap().is_empty());
    }

    #[test]
    fn test_minify_in_place() {
        let dir = TempDir::new().unwrap();
        let config = PipelineConfig::rooted(dir.path());
        let css = config.paths.css_dest.join("main.css");
        fs::create_dir_all(&config.paths.css_dest).unwrap();
        fs::write(&css, ".a {\n  color: #ff0000;\n}\n").unwrap();

        assert_eq!(minify(&config).unwrap(), 1);
        assert_eq!(fs::read_to_string(&css).unwrap(), ".a{color:red}");
        assert_eq!(minify(&config).unwrap(), 0);
    }
}
