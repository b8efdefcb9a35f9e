//! Command-line interface module.

mod args;

pub use args::Cli;

use owo_colors::OwoColorize;

use crate::task::Task;

/// `--list`: one line per task with its direct dependencies.
pub fn render_task_list() -> String {
    let width = Task::ALL.iter().map(|t| t.name().len()).max().unwrap_or(0);

    let mut out = String::new();
    for task in Task::ALL {
        let deps: Vec<_> = task.deps().iter().map(|d| d.name()).collect();
        let deps = if deps.is_empty() {
            String::new()
        } else {
            format!(" [{}]", deps.join(", "))
        };
        out.push_str(&format!(
            "{:<width$}  {}{}\n",
            task.name().bold(),
            task.describe(),
            deps.dimmed()
        ));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_list_mentions_every_task() {
        let list = render_task_list();
        assert_eq!(list.lines().count(), Task::ALL.len());
        assert!(list.contains("build"));
        assert!(list.contains("[sass-build, sprite, md5-sprite]"));
    }
}
