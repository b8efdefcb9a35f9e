//! Content-hashed sheet names for cache busting.
//!
//! Runs in three phases, each finished before the next begins:
//!
//! 1. delete every `sp_<group>_<hash8>.png` left by earlier runs
//! 2. copy each `sp_<group>.png` to `sp_<group>_<hash8>.png`
//! 3. point every fragment at the new names
//!
//! A failed deletion stops the run before anything is copied, so stylesheet
//! references never point at a half-updated set of files.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Result;
use regex::Regex;

use super::scan::scan_groups;
use super::{SpriteError, ident, sheet_file_name};
use crate::config::PipelineConfig;
use crate::utils::fs::write_if_changed;
use crate::utils::hash::compute_file_hash;
use crate::utils::plural::plural_count;
use crate::{debug, log};

/// Hex characters kept from the content digest.
pub const HASH_LEN: usize = 8;

/// One sheet copied to its hashed name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HashedSprite {
    pub group: String,
    pub source: PathBuf,
    pub hash: String,
    pub hashed: PathBuf,
}

impl HashedSprite {
    pub fn file_name(&self) -> String {
        hashed_file_name(&self.group, &self.hash)
    }
}

/// `sp_<group>_<hash>.png`
pub fn hashed_file_name(group: &str, hash: &str) -> String {
    format!("{}_{hash}.png", ident(group))
}

/// Matches a whole hashed file name of `group`.
fn stale_pattern(group: &str) -> Result<Regex, regex::Error> {
    Regex::new(&format!(
        r"^{}_[0-9a-f]{{{HASH_LEN}}}\.png$",
        regex::escape(&ident(group))
    ))
}

/// Matches a reference to `group`'s sheet, hashed or not.
fn reference_pattern(group: &str) -> Result<Regex, regex::Error> {
    Regex::new(&format!(
        r"\b{}(?:_[0-9a-f]{{{HASH_LEN}}})?\.png",
        regex::escape(&ident(group))
    ))
}

/// Delete hashed sheets of `groups` in `dest`. Stops at the first failure.
pub fn remove_stale(dest: &Path, groups: &[String]) -> Result<Vec<PathBuf>, SpriteError> {
    let Ok(entries) = fs::read_dir(dest) else {
        return Ok(Vec::new());
    };
    let names: Vec<String> = entries
        .filter_map(Result::ok)
        .filter_map(|e| e.file_name().to_str().map(str::to_string))
        .collect();

    let mut removed = Vec::new();
    for group in groups {
        let pattern = stale_pattern(group)?;
        for name in names.iter().filter(|n| pattern.is_match(n)) {
            let path = dest.join(name);
            fs::remove_file(&path).map_err(|source| SpriteError::StaleRemove {
                path: path.clone(),
                source,
            })?;
            removed.push(path);
        }
    }
    Ok(removed)
}

/// Copy each existing `sp_<group>.png` to its hashed name.
pub fn hash_sheets(
    dest: &Path,
    groups: &[String],
    remove_unhashed: bool,
) -> Result<Vec<HashedSprite>, SpriteError> {
    let mut records = Vec::new();
    for group in groups {
        let source = dest.join(sheet_file_name(group));
        if !source.is_file() {
            debug!("hash"; "no sheet for `{}`, skipped", group);
            continue;
        }

        let hash = compute_file_hash(&source)
            .map_err(|e| SpriteError::io(&source, e))?
            .short(HASH_LEN);
        let hashed = dest.join(hashed_file_name(group, &hash));
        fs::copy(&source, &hashed).map_err(|e| SpriteError::io(&hashed, e))?;
        if remove_unhashed {
            fs::remove_file(&source).map_err(|e| SpriteError::io(&source, e))?;
        }

        records.push(HashedSprite {
            group: group.clone(),
            source,
            hash,
            hashed,
        });
    }
    Ok(records)
}

/// Rewrite sheet references in every `.scss` file directly inside `dir`.
///
/// Returns the files whose content changed.
pub fn rewrite_references(
    dir: &Path,
    records: &[HashedSprite],
) -> Result<Vec<PathBuf>, SpriteError> {
    if records.is_empty() {
        return Ok(Vec::new());
    }
    let Ok(entries) = fs::read_dir(dir) else {
        return Ok(Vec::new());
    };

    let rules = records
        .iter()
        .map(|r| -> Result<_, SpriteError> { Ok((reference_pattern(&r.group)?, r.file_name())) })
        .collect::<Result<Vec<_>, _>>()?;

    let mut files: Vec<PathBuf> = entries
        .filter_map(Result::ok)
        .map(|e| e.path())
        .filter(|p| p.is_file() && p.extension().is_some_and(|e| e == "scss"))
        .collect();
    files.sort();

    let mut changed = Vec::new();
    for path in files {
        let text = fs::read_to_string(&path).map_err(|e| SpriteError::io(&path, e))?;
        let rewritten = rules.iter().fold(text, |acc, (re, name)| {
            re.replace_all(&acc, name.as_str()).into_owned()
        });
        if write_if_changed(&path, rewritten.as_bytes()).map_err(|e| SpriteError::io(&path, e))? {
            changed.push(path);
        }
    }
    Ok(changed)
}

/// The `md5-sprite` step. A no-op unless `build.hash` is set.
pub fn run(config: &PipelineConfig) -> Result<Vec<HashedSprite>> {
    if !config.build.hash {
        debug!("hash"; "disabled, skipped");
        return Ok(Vec::new());
    }

    let dest = &config.paths.sprite_dest;
    let groups = scan_groups(&config.paths.sprite_src);

    let removed = remove_stale(dest, &groups)?;
    if !removed.is_empty() {
        debug!("hash"; "removed {}", plural_count(removed.len(), "stale sheet"));
    }

    let records = hash_sheets(dest, &groups, config.sprite.remove_unhashed)?;
    let changed = rewrite_references(&config.paths.sprite_fragment_dir(), &records)?;

    for record in &records {
        debug!("hash"; "{} -> {}", sheet_file_name(&record.group), record.file_name());
    }
    log!("hash"; "hashed {}, updated {}",
        plural_count(records.len(), "sheet"), plural_count(changed.len(), "fragment"));
    Ok(records)
}
