//! Changed path → affected tasks.
//!
//! | watched                  | scope     | action          |
//! |--------------------------|-----------|-----------------|
//! | `html_src`               | recursive | `template:html` |
//! | `css_src`                | recursive | `sass`          |
//! | `sprite_src`             | recursive | `sprite`        |
//! | `html_path/*.html`       | direct    | live reload     |

use std::path::{Path, PathBuf};

use notify::RecursiveMode;

use crate::config::PathsConfig;
use crate::task::Task;
use crate::utils::path::normalize_path;

/// What a change under a watched prefix triggers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Run(Task),
    Reload,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Scope {
    /// Anything below the prefix
    Recursive,
    /// Direct children with the given extension
    Direct(&'static str),
}

#[derive(Debug)]
struct Route {
    prefix: PathBuf,
    scope: Scope,
    action: Action,
}

impl Route {
    fn matches(&self, path: &Path) -> bool {
        match self.scope {
            Scope::Recursive => path.starts_with(&self.prefix) && path != self.prefix,
            Scope::Direct(ext) => {
                path.parent() == Some(self.prefix.as_path())
                    && path.extension().is_some_and(|e| e.eq_ignore_ascii_case(ext))
            }
        }
    }
}

/// Work derived from one debounced batch.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct Plan {
    /// Tasks to run, deduplicated, in routing-table order
    pub tasks: Vec<Task>,
    /// Changed pages that only need a browser reload
    pub reload: Vec<PathBuf>,
}

impl Plan {
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty() && self.reload.is_empty()
    }
}

/// Static routing table built from `[paths]`.
#[derive(Debug)]
pub struct Routes {
    routes: Vec<Route>,
}

impl Routes {
    pub fn new(paths: &PathsConfig) -> Self {
        let route = |dir: &Path, scope, action| Route {
            prefix: normalize_path(dir),
            scope,
            action,
        };

        Self {
            routes: vec![
                route(&paths.html_src, Scope::Recursive, Action::Run(Task::TemplateHtml)),
                route(&paths.css_src, Scope::Recursive, Action::Run(Task::Sass)),
                route(&paths.sprite_src, Scope::Recursive, Action::Run(Task::Sprite)),
                route(&paths.html_path, Scope::Direct("html"), Action::Reload),
            ],
        }
    }

    /// Only the live-reload route, for a preview server running without `watch`.
    pub fn reload_only(paths: &PathsConfig) -> Self {
        Self {
            routes: vec![Route {
                prefix: normalize_path(&paths.html_path),
                scope: Scope::Direct("html"),
                action: Action::Reload,
            }],
        }
    }

    /// Directories to hand to the watcher.
    pub fn watch_targets(&self) -> Vec<(&Path, RecursiveMode)> {
        self.routes
            .iter()
            .map(|r| {
                let mode = match r.scope {
                    Scope::Recursive => RecursiveMode::Recursive,
                    Scope::Direct(_) => RecursiveMode::NonRecursive,
                };
                (r.prefix.as_path(), mode)
            })
            .collect()
    }

    /// First matching route wins.
    pub fn route(&self, path: &Path) -> Option<Action> {
        self.routes
            .iter()
            .find(|r| r.matches(path))
            .map(|r| r.action)
    }

    pub fn plan<'a>(&self, paths: impl IntoIterator<Item = &'a PathBuf>) -> Plan {
        let mut hits: Vec<(usize, Action, &PathBuf)> = paths
            .into_iter()
            .filter_map(|path| {
                let index = self.routes.iter().position(|r| r.matches(path))?;
                Some((index, self.routes[index].action, path))
            })
            .collect();
        hits.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| a.2.cmp(b.2)));

        let mut plan = Plan::default();
        for (_, action, path) in hits {
            match action {
                Action::Run(task) if !plan.tasks.contains(&task) => plan.tasks.push(task),
                Action::Run(_) => {}
                Action::Reload => plan.reload.push(path.clone()),
            }
        }
        plan
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PipelineConfig;
    use tempfile::TempDir;

    fn routes() -> (TempDir, Routes, PathBuf) {
        let dir = TempDir::new().unwrap();
        let config = PipelineConfig::rooted(dir.path());
        let routes = Routes::new(&config.paths);
        let src = normalize_path(dir.path()).join("src");
        (dir, routes, src)
    }

    #[test]
    fn test_route_by_prefix() {
        let (_dir, routes, src) = routes();

        assert_eq!(
            routes.route(&src.join("templates/index.pug")),
            Some(Action::Run(Task::TemplateHtml))
        );
        assert_eq!(
            routes.route(&src.join("scss/common/_base.scss")),
            Some(Action::Run(Task::Sass))
        );
        assert_eq!(
            routes.route(&src.join("sprite/icons/star.png")),
            Some(Action::Run(Task::Sprite))
        );
        assert_eq!(routes.route(&src.join("index.html")), Some(Action::Reload));
    }

    #[test]
    fn test_unrouted_paths() {
        let (_dir, routes, src) = routes();

        // Build outputs and nested pages trigger nothing
        assert_eq!(routes.route(&src.join("css/app.css")), None);
        assert_eq!(routes.route(&src.join("img/sprite/sp_icons.png")), None);
        assert_eq!(routes.route(&src.join("pages/about.html")), None);
        assert_eq!(routes.route(&src.join("notes.txt")), None);
        assert_eq!(routes.route(&src.join("sprite")), None);
    }

    #[test]
    fn test_plan_is_minimal() {
        let (_dir, routes, src) = routes();
        let changed = vec![
            src.join("sprite/icons/b.png"),
            src.join("scss/app.scss"),
            src.join("sprite/icons/a.png"),
            src.join("scss/sprite/_sp_icons.scss"),
            src.join("about.html"),
            src.join("css/app.css"),
        ];

        let plan = routes.plan(&changed);
        assert_eq!(plan.tasks, vec![Task::Sass, Task::Sprite]);
        assert_eq!(plan.reload, vec![src.join("about.html")]);
    }

    #[test]
    fn test_empty_plan() {
        let (_dir, routes, src) = routes();
        let plan = routes.plan(&[src.join("img/sprite/sp_a.png")]);
        assert!(plan.is_empty());
    }

    #[test]
    fn test_reload_only_ignores_sources() {
        let dir = TempDir::new().unwrap();
        let config = PipelineConfig::rooted(dir.path());
        let routes = Routes::reload_only(&config.paths);
        let src = normalize_path(dir.path()).join("src");

        assert_eq!(routes.route(&src.join("scss/app.scss")), None);
        assert_eq!(routes.route(&src.join("sprite/icons/a.png")), None);
        assert_eq!(routes.route(&src.join("index.html")), Some(Action::Reload));
        assert_eq!(
            routes.watch_targets(),
            vec![(src.as_path(), RecursiveMode::NonRecursive)]
        );
    }

    #[test]
    fn test_watch_targets_modes() {
        let (_dir, routes, src) = routes();
        let targets = routes.watch_targets();
        assert_eq!(targets.len(), 4);
        assert_eq!(targets[3], (src.as_path(), RecursiveMode::NonRecursive));
    }
}
