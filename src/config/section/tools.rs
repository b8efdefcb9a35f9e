//! `[sass]` and `[template]` section configuration.
//!
//! Both compilers are external programs. `$VARS` in arguments are expanded
//! before running (see `utils::exec::resolve_args`).
//!
//! # Example
//!
//! ```toml
//! [sass]
//! command = ["sass"]
//! args = ["--quiet-deps"]
//!
//! [template]
//! command = ["pug", "--pretty", "--out", "$HTML_DEST"]
//! ```

use serde::{Deserialize, Serialize};

/// External SCSS compiler.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SassConfig {
    /// Program and leading arguments.
    pub command: Vec<String>,
    /// Extra arguments appended to every invocation.
    pub args: Vec<String>,
}

impl Default for SassConfig {
    fn default() -> Self {
        Self {
            command: vec!["sass".into()],
            args: Vec::new(),
        }
    }
}

/// External markup template compiler. Input files are appended last.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TemplateConfig {
    pub command: Vec<String>,
}

impl Default for TemplateConfig {
    fn default() -> Self {
        Self {
            command: vec![
                "pug".into(),
                "--pretty".into(),
                "--out".into(),
                "$HTML_DEST".into(),
            ],
        }
    }
}
