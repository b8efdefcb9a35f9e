//! Concurrent execution of a task closure.
//!
//! A task starts once every dependency has succeeded. Whatever is ready runs
//! at the same time on a `JoinSet`. A failure marks the failed task's
//! dependents as skipped; unrelated tasks keep going. No retries.

use std::future::Future;
use std::time::{Duration, Instant};

use anyhow::Result;
use rustc_hash::FxHashMap;
use tokio::task::JoinSet;

use super::graph::{GraphError, Node, TaskGraph};
use crate::{debug, log};

/// How a task ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Succeeded,
    /// Error chain, formatted
    Failed(String),
    /// Not run because the named dependency did not succeed
    Skipped(String),
}

/// Per-task outcomes of one graph run, in execution order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport<N> {
    entries: Vec<(N, Outcome)>,
}

impl<N: Node> RunReport<N> {
    pub fn entries(&self) -> &[(N, Outcome)] {
        &self.entries
    }

    pub fn outcome(&self, node: N) -> Option<&Outcome> {
        self.entries
            .iter()
            .find(|(n, _)| *n == node)
            .map(|(_, outcome)| outcome)
    }

    pub fn is_success(&self) -> bool {
        self.entries
            .iter()
            .all(|(_, outcome)| *outcome == Outcome::Succeeded)
    }

    pub fn failed(&self) -> impl Iterator<Item = N> + '_ {
        self.entries
            .iter()
            .filter(|(_, o)| matches!(o, Outcome::Failed(_)))
            .map(|(n, _)| *n)
    }

    pub fn skipped(&self) -> impl Iterator<Item = N> + '_ {
        self.entries
            .iter()
            .filter(|(_, o)| matches!(o, Outcome::Skipped(_)))
            .map(|(n, _)| *n)
    }
}

/// Run `targets` and their dependencies, calling `exec` once per task.
pub async fn run_graph<N, F, Fut>(
    graph: &TaskGraph<N>,
    targets: &[N],
    exec: F,
) -> Result<RunReport<N>, GraphError>
where
    N: Node,
    F: Fn(N) -> Fut,
    Fut: Future<Output = Result<()>> + Send + 'static,
{
    graph.validate()?;
    let order = graph.topo_order(&graph.closure(targets)?);

    let mut done: FxHashMap<N, Outcome> = FxHashMap::default();
    let mut running: FxHashMap<tokio::task::Id, N> = FxHashMap::default();
    let mut entries = Vec::with_capacity(order.len());
    let mut set = JoinSet::new();

    loop {
        // Topological order lets one pass cascade skips down a chain.
        for &node in &order {
            if done.contains_key(&node) || running.values().any(|n| *n == node) {
                continue;
            }

            let deps = graph.deps(node);
            if let Some(blocker) = deps
                .iter()
                .find(|d| matches!(done.get(*d), Some(Outcome::Failed(_) | Outcome::Skipped(_))))
            {
                debug!("task"; "`{}` skipped: `{}` did not succeed", node, blocker);
                let outcome = Outcome::Skipped(blocker.to_string());
                done.insert(node, outcome.clone());
                entries.push((node, outcome));
                continue;
            }

            if deps.iter().all(|d| done.get(d) == Some(&Outcome::Succeeded)) {
                debug!("task"; "starting `{}`", node);
                let fut = exec(node);
                let started = Instant::now();
                let handle = set.spawn(async move { (fut.await, started.elapsed()) });
                running.insert(handle.id(), node);
            }
        }

        let Some(joined) = set.join_next_with_id().await else {
            break;
        };

        let (node, outcome) = match joined {
            Ok((id, (result, elapsed))) => {
                let node = running.remove(&id);
                (node, finish(node, result, elapsed))
            }
            Err(err) => {
                let node = running.remove(&err.id());
                (node, Outcome::Failed(format!("task panicked: {err}")))
            }
        };
        // Every spawned id is tracked, so the lookup cannot miss.
        if let Some(node) = node {
            done.insert(node, outcome.clone());
            entries.push((node, outcome));
        }
    }

    Ok(RunReport { entries })
}

fn finish<N: Node>(node: Option<N>, result: Result<()>, elapsed: Duration) -> Outcome {
    let name = node.map(|n| n.to_string()).unwrap_or_default();
    match result {
        Ok(()) => {
            log!("task"; "finished `{}` after {}", name, format_elapsed(elapsed));
            Outcome::Succeeded
        }
        Err(err) => {
            log!("error"; "`{}` failed: {:#}", name, err);
            Outcome::Failed(format!("{err:#}"))
        }
    }
}

fn format_elapsed(elapsed: Duration) -> String {
    if elapsed.as_secs() >= 1 {
        format!("{:.2} s", elapsed.as_secs_f64())
    } else {
        format!("{} ms", elapsed.as_millis())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::bail;
    use parking_lot::Mutex;
    use std::sync::Arc;

    /// a ← b ← c, a ← d, e (independent)
    fn chain() -> TaskGraph<&'static str> {
        let mut graph = TaskGraph::new();
        graph.add("a", &[]).unwrap();
        graph.add("b", &["a"]).unwrap();
        graph.add("c", &["b"]).unwrap();
        graph.add("d", &["a"]).unwrap();
        graph.add("e", &[]).unwrap();
        graph.add("all", &["c", "d", "e"]).unwrap();
        graph
    }

    fn recording(
        fail: &'static [&'static str],
    ) -> (
        Arc<Mutex<Vec<&'static str>>>,
        impl Fn(&'static str) -> std::pin::Pin<Box<dyn Future<Output = Result<()>> + Send>>,
    ) {
        let log = Arc::new(Mutex::new(Vec::new()));
        let exec_log = Arc::clone(&log);
        let exec = move |node: &'static str| {
            let log = Arc::clone(&exec_log);
            Box::pin(async move {
                log.lock().push(node);
                if fail.contains(&node) {
                    bail!("{node} broke");
                }
                Ok(())
            }) as std::pin::Pin<Box<dyn Future<Output = Result<()>> + Send>>
        };
        (log, exec)
    }

    #[tokio::test]
    async fn test_all_succeed_in_dependency_order() {
        let graph = chain();
        let (log, exec) = recording(&[]);
        let report = run_graph(&graph, &["all"], exec).await.unwrap();

        assert!(report.is_success());
        assert_eq!(report.entries().len(), 6);
        let ran = log.lock().clone();
        let pos = |n| ran.iter().position(|x| *x == n).unwrap();
        assert!(pos("a") < pos("b"));
        assert!(pos("b") < pos("c"));
        assert!(pos("a") < pos("d"));
        assert_eq!(ran.last(), Some(&"all"));
    }

    #[tokio::test]
    async fn test_failure_skips_only_downstream() {
        let graph = chain();
        let (log, exec) = recording(&["b"]);
        let report = run_graph(&graph, &["all"], exec).await.unwrap();

        assert!(!report.is_success());
        assert_eq!(report.failed().collect::<Vec<_>>(), vec!["b"]);
        let mut skipped: Vec<_> = report.skipped().collect();
        skipped.sort();
        assert_eq!(skipped, vec!["all", "c"]);
        assert_eq!(report.outcome("c"), Some(&Outcome::Skipped("b".into())));
        assert_eq!(report.outcome("d"), Some(&Outcome::Succeeded));
        assert_eq!(report.outcome("e"), Some(&Outcome::Succeeded));

        let ran = log.lock().clone();
        assert!(!ran.contains(&"c"));
        assert!(!ran.contains(&"all"));
    }

    #[tokio::test]
    async fn test_failed_error_text_is_kept() {
        let graph = chain();
        let (_, exec) = recording(&["e"]);
        let report = run_graph(&graph, &["e"], exec).await.unwrap();
        assert_eq!(report.outcome("e"), Some(&Outcome::Failed("e broke".into())));
        assert_eq!(report.entries().len(), 1);
    }

    #[tokio::test]
    async fn test_panicking_task_fails() {
        let graph = chain();
        let exec = |node: &'static str| async move {
            if node == "a" {
                panic!("boom");
            }
            Ok(())
        };
        let report = run_graph(&graph, &["b"], exec).await.unwrap();
        assert!(matches!(report.outcome("a"), Some(Outcome::Failed(_))));
        assert_eq!(report.outcome("b"), Some(&Outcome::Skipped("a".into())));
    }

    #[tokio::test]
    async fn test_unknown_target() {
        let graph = chain();
        let (_, exec) = recording(&[]);
        let err = run_graph(&graph, &["zzz"], exec).await.unwrap_err();
        assert_eq!(err, GraphError::UnknownTask("zzz".into()));
    }

    #[test]
    fn test_format_elapsed() {
        assert_eq!(format_elapsed(Duration::from_millis(42)), "42 ms");
        assert_eq!(format_elapsed(Duration::from_millis(1500)), "1.50 s");
    }
}
