//! `template:html`: run the template compiler over `html_src/*`.
//!
//! The command comes from `[template]`; `$HTML_SRC`, `$HTML_DEST` and
//! `$ROOT` in its arguments are expanded, and the input files are appended
//! last, relative to the project root.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use rustc_hash::FxHashMap;

use crate::config::PipelineConfig;
use crate::utils::exec::{Cmd, resolve_args};
use crate::utils::path::is_hidden;
use crate::utils::plural::plural_count;
use crate::{debug, log};

/// Compile every template directly inside `html_src`. Returns the count.
pub fn compile(config: &PipelineConfig) -> Result<usize> {
    let paths = &config.paths;
    let inputs = template_files(&paths.html_src);
    if inputs.is_empty() {
        debug!("template"; "no templates in {}", config.root_relative(&paths.html_src).display());
        return Ok(0);
    }

    fs::create_dir_all(&paths.html_dest)
        .with_context(|| format!("Failed to create {}", paths.html_dest.display()))?;

    let command = command_line(config, &inputs);
    Cmd::from_slice(&command).cwd(&config.root).run()?;

    log!("template"; "compiled {}", plural_count(inputs.len(), "template"));
    Ok(inputs.len())
}

/// Full argv: configured command with variables expanded, then inputs.
fn command_line(config: &PipelineConfig, inputs: &[PathBuf]) -> Vec<String> {
    let mut vars = FxHashMap::default();
    vars.insert("ROOT", config.root.display().to_string());
    vars.insert("HTML_SRC", config.paths.html_src.display().to_string());
    vars.insert("HTML_DEST", config.paths.html_dest.display().to_string());

    let mut command = resolve_args(&config.template.command, &vars);
    command.extend(
        inputs
            .iter()
            .map(|p| config.root_relative(p).display().to_string()),
    );
    command
}

fn template_files(dir: &Path) -> Vec<PathBuf> {
    let Ok(entries) = fs::read_dir(dir) else {
        return Vec::new();
    };
    let mut files: Vec<PathBuf> = entries
        .filter_map(Result::ok)
        .map(|e| e.path())
        .filter(|p| p.is_file() && !is_hidden(p))
        .collect();
    files.sort();
    files
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_command_line_expands_and_appends() {
        let config = PipelineConfig::rooted(Path::new("/project"));
        let inputs = vec![
            PathBuf::from("/project/src/templates/index.pug"),
            PathBuf::from("/project/src/templates/about.pug"),
        ];
        assert_eq!(
            command_line(&config, &inputs),
            vec![
                "pug",
                "--pretty",
                "--out",
                "/project/src",
                "src/templates/index.pug",
                "src/templates/about.pug",
            ]
        );
    }

    #[test]
    fn test_no_templates_is_noop() {
        let dir = TempDir::new().unwrap();
        let mut config = PipelineConfig::rooted(dir.path());
        config.template.command = vec!["spritely-no-such-pug".into()];
        assert_eq!(compile(&config).unwrap(), 0);
    }

    #[test]
    fn test_template_files_skip_dirs_and_hidden() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("index.pug"), "").unwrap();
        fs::write(dir.path().join(".draft.pug"), "").unwrap();
        fs::create_dir_all(dir.path().join("includes")).unwrap();
        assert_eq!(template_files(dir.path()), vec![dir.path().join("index.pug")]);
    }

    #[cfg(unix)]
    #[test]
    fn test_compile_runs_command() {
        let dir = TempDir::new().unwrap();
        let mut config = PipelineConfig::rooted(dir.path());
        fs::create_dir_all(&config.paths.html_src).unwrap();
        fs::write(config.paths.html_src.join("index.pug"), "p hi").unwrap();
        config.template.command = vec!["sh".into(), "-c".into(), "exit 0".into()];
        assert_eq!(compile(&config).unwrap(), 1);
    }
}
