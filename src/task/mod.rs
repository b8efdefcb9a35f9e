//! Named pipeline steps and their dependency graph.
//!
//! ```text
//! default ─┬─ watch ─┬─ sass
//!          │         └─ sprite ─┬─ sprite:pack
//!          │                    └─ sprite:map ── sprite:pack
//!          └─ browserSync
//!
//! build ─┬─ sass-build ─┬─ sprite
//!        │              └─ md5-sprite ── sprite:pack
//!        ├─ sprite
//!        └─ md5-sprite
//! ```

mod graph;
mod runner;
mod session;

pub use graph::{GraphError, TaskGraph};
pub use runner::{Outcome, RunReport, run_graph};
pub use session::Session;

use std::fmt;
use std::str::FromStr;

/// Every step the pipeline knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Task {
    BrowserSync,
    TemplateHtml,
    Sass,
    SpritePack,
    SpriteMap,
    Sprite,
    HashSprite,
    SassBuild,
    Minify,
    Watch,
    Default,
    Dev,
    Build,
}

impl Task {
    /// Registration order; also the tie-break order for execution.
    pub const ALL: [Task; 13] = [
        Self::BrowserSync,
        Self::TemplateHtml,
        Self::Sass,
        Self::SpritePack,
        Self::SpriteMap,
        Self::Sprite,
        Self::HashSprite,
        Self::SassBuild,
        Self::Minify,
        Self::Watch,
        Self::Default,
        Self::Dev,
        Self::Build,
    ];

    pub const fn name(self) -> &'static str {
        match self {
            Self::BrowserSync => "browserSync",
            Self::TemplateHtml => "template:html",
            Self::Sass => "sass",
            Self::SpritePack => "sprite:pack",
            Self::SpriteMap => "sprite:map",
            Self::Sprite => "sprite",
            Self::HashSprite => "md5-sprite",
            Self::SassBuild => "sass-build",
            Self::Minify => "minify",
            Self::Watch => "watch",
            Self::Default => "default",
            Self::Dev => "dev",
            Self::Build => "build",
        }
    }

    pub const fn deps(self) -> &'static [Task] {
        match self {
            Self::BrowserSync
            | Self::TemplateHtml
            | Self::Sass
            | Self::SpritePack
            | Self::Minify => &[],
            Self::SpriteMap | Self::HashSprite => &[Self::SpritePack],
            Self::Sprite => &[Self::SpritePack, Self::SpriteMap],
            Self::SassBuild => &[Self::Sprite, Self::HashSprite],
            Self::Watch | Self::Dev => &[Self::Sass, Self::Sprite],
            Self::Default => &[Self::Watch, Self::BrowserSync],
            Self::Build => &[Self::SassBuild, Self::Sprite, Self::HashSprite],
        }
    }

    /// One-line description for `--list`.
    pub const fn describe(self) -> &'static str {
        match self {
            Self::BrowserSync => "preview server with live reload",
            Self::TemplateHtml => "compile templates to HTML",
            Self::Sass => "compile SCSS with source maps",
            Self::SpritePack => "pack sprite groups into sheets and fragments",
            Self::SpriteMap => "write the aggregate sprite map",
            Self::Sprite => "pack sprites and write the map",
            Self::HashSprite => "content-hash sprite sheet names",
            Self::SassBuild => "release CSS with vendor prefixes",
            Self::Minify => "minify compiled CSS",
            Self::Watch => "rebuild on source changes",
            Self::Default => "watch and serve",
            Self::Dev => "one-shot development build",
            Self::Build => "release build",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.name() == name)
    }

    /// The full registered graph.
    pub fn graph() -> TaskGraph<Task> {
        let mut graph = TaskGraph::new();
        for task in Self::ALL {
            // Names are unique by construction.
            let _ = graph.add(task, task.deps());
        }
        graph
    }
}

impl fmt::Display for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A task name that is not registered.
#[derive(Debug, thiserror::Error)]
#[error("unknown task `{name}` (known tasks: {})", known_names())]
pub struct UnknownTask {
    pub name: String,
}

fn known_names() -> String {
    Task::ALL.map(Task::name).join(", ")
}

impl FromStr for Task {
    type Err = UnknownTask;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_name(s).ok_or_else(|| UnknownTask { name: s.to_string() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_round_trip() {
        for task in Task::ALL {
            assert_eq!(task.name().parse::<Task>().unwrap(), task);
        }
    }

    #[test]
    fn test_unknown_task_lists_known() {
        let err = "styles".parse::<Task>().unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("`styles`"));
        assert!(msg.contains("md5-sprite"));
        assert!(msg.contains("template:html"));
    }

    #[test]
    fn test_registered_graph_is_valid() {
        Task::graph().validate().unwrap();
    }

    #[test]
    fn test_build_closure() {
        let graph = Task::graph();
        let closure = graph.closure(&[Task::Build]).unwrap();
        assert_eq!(
            closure,
            vec![
                Task::SpritePack,
                Task::SpriteMap,
                Task::Sprite,
                Task::HashSprite,
                Task::SassBuild,
                Task::Build,
            ]
        );
    }

    #[test]
    fn test_default_closure_excludes_release_steps() {
        let closure = Task::graph().closure(&[Task::Default]).unwrap();
        assert!(closure.contains(&Task::BrowserSync));
        assert!(closure.contains(&Task::Sass));
        assert!(!closure.contains(&Task::HashSprite));
        assert!(!closure.contains(&Task::SassBuild));
    }
}
