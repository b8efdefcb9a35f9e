//! Explicit task DAG.
//!
//! Keeps forward (task → dependencies) and reverse (task → dependents)
//! edges plus the registration order, which breaks ties wherever several
//! tasks are equally ready.

use std::fmt;
use std::hash::Hash;

use rustc_hash::{FxHashMap, FxHashSet};
use thiserror::Error;

/// Anything usable as a graph node.
pub trait Node: Copy + Eq + Hash + fmt::Display + Send + Sync + 'static {}

impl<T: Copy + Eq + Hash + fmt::Display + Send + Sync + 'static> Node for T {}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum GraphError {
    #[error("task `{0}` is registered twice")]
    Duplicate(String),

    #[error("task `{task}` depends on unknown task `{dep}`")]
    UnknownDependency { task: String, dep: String },

    #[error("dependency cycle: {}", .0.join(" -> "))]
    Cycle(Vec<String>),

    #[error("unknown task `{0}`")]
    UnknownTask(String),
}

#[derive(Debug, Clone)]
pub struct TaskGraph<N> {
    order: Vec<N>,
    deps: FxHashMap<N, Vec<N>>,
    dependents: FxHashMap<N, Vec<N>>,
}

impl<N: Node> Default for TaskGraph<N> {
    fn default() -> Self {
        Self {
            order: Vec::new(),
            deps: FxHashMap::default(),
            dependents: FxHashMap::default(),
        }
    }
}

impl<N: Node> TaskGraph<N> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `node`. Dependencies may be registered later; `validate`
    /// checks that they all exist.
    pub fn add(&mut self, node: N, deps: &[N]) -> Result<(), GraphError> {
        if self.deps.contains_key(&node) {
            return Err(GraphError::Duplicate(node.to_string()));
        }
        self.order.push(node);
        self.deps.insert(node, deps.to_vec());
        for &dep in deps {
            self.dependents.entry(dep).or_default().push(node);
        }
        Ok(())
    }

    /// Nodes in registration order.
    pub fn nodes(&self) -> &[N] {
        &self.order
    }

    pub fn contains(&self, node: N) -> bool {
        self.deps.contains_key(&node)
    }

    pub fn deps(&self, node: N) -> &[N] {
        self.deps.get(&node).map_or(&[], Vec::as_slice)
    }

    /// Reject unknown dependencies and cycles.
    pub fn validate(&self) -> Result<(), GraphError> {
        for &node in &self.order {
            if let Some(&dep) = self.deps(node).iter().find(|d| !self.contains(**d)) {
                return Err(GraphError::UnknownDependency {
                    task: node.to_string(),
                    dep: dep.to_string(),
                });
            }
        }

        let mut marks: FxHashMap<N, Mark> = FxHashMap::default();
        let mut stack = Vec::new();
        for &node in &self.order {
            self.visit(node, &mut marks, &mut stack)?;
        }
        Ok(())
    }

    fn visit(
        &self,
        node: N,
        marks: &mut FxHashMap<N, Mark>,
        stack: &mut Vec<N>,
    ) -> Result<(), GraphError> {
        match marks.get(&node) {
            Some(Mark::Done) => return Ok(()),
            Some(Mark::Active) => {
                let start = stack.iter().position(|n| *n == node).unwrap_or(0);
                let mut cycle: Vec<String> = stack[start..].iter().map(N::to_string).collect();
                cycle.push(node.to_string());
                return Err(GraphError::Cycle(cycle));
            }
            None => {}
        }

        marks.insert(node, Mark::Active);
        stack.push(node);
        for &dep in self.deps(node) {
            self.visit(dep, marks, stack)?;
        }
        stack.pop();
        marks.insert(node, Mark::Done);
        Ok(())
    }

    /// `targets` plus everything they transitively depend on, in
    /// registration order.
    pub fn closure(&self, targets: &[N]) -> Result<Vec<N>, GraphError> {
        let mut seen = FxHashSet::default();
        let mut pending: Vec<N> = Vec::new();
        for &target in targets {
            if !self.contains(target) {
                return Err(GraphError::UnknownTask(target.to_string()));
            }
            pending.push(target);
        }

        while let Some(node) = pending.pop() {
            if seen.insert(node) {
                pending.extend(self.deps(node).iter().copied());
            }
        }

        Ok(self
            .order
            .iter()
            .copied()
            .filter(|n| seen.contains(n))
            .collect())
    }

    /// Kahn order over `subset`; edges leaving the subset are ignored.
    ///
    /// Among ready nodes the earliest registered goes first. Nodes caught in
    /// a cycle are left out, so callers should `validate` first.
    pub fn topo_order(&self, subset: &[N]) -> Vec<N> {
        let members: FxHashSet<N> = subset.iter().copied().collect();
        let mut indegree: FxHashMap<N, usize> = self
            .order
            .iter()
            .filter(|n| members.contains(*n))
            .map(|&n| {
                let count = self.deps(n).iter().filter(|d| members.contains(*d)).count();
                (n, count)
            })
            .collect();

        let mut sorted = Vec::with_capacity(indegree.len());
        while let Some(&next) = self
            .order
            .iter()
            .find(|n| indegree.get(*n) == Some(&0))
        {
            indegree.remove(&next);
            sorted.push(next);
            for dependent in self.dependents(next) {
                if let Some(count) = indegree.get_mut(dependent) {
                    *count -= 1;
                }
            }
        }
        sorted
    }

    /// Every node that transitively depends on `node`, in registration order.
    pub fn downstream(&self, node: N) -> Vec<N> {
        let mut seen = FxHashSet::default();
        let mut pending: Vec<N> = self.dependents(node).to_vec();
        while let Some(next) = pending.pop() {
            if seen.insert(next) {
                pending.extend(self.dependents(next).iter().copied());
            }
        }
        self.order
            .iter()
            .copied()
            .filter(|n| seen.contains(n))
            .collect()
    }

    fn dependents(&self, node: N) -> &[N] {
        self.dependents.get(&node).map_or(&[], Vec::as_slice)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    Active,
    Done,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn diamond() -> TaskGraph<&'static str> {
        let mut graph = TaskGraph::new();
        graph.add("a", &[]).unwrap();
        graph.add("b", &["a"]).unwrap();
        graph.add("c", &["a"]).unwrap();
        graph.add("d", &["b", "c"]).unwrap();
        graph.add("e", &[]).unwrap();
        graph
    }

    #[test]
    fn test_duplicate_rejected() {
        let mut graph = diamond();
        assert_eq!(graph.add("a", &[]), Err(GraphError::Duplicate("a".into())));
    }

    #[test]
    fn test_validate_unknown_dependency() {
        let mut graph = diamond();
        graph.add("f", &["missing"]).unwrap();
        assert_eq!(
            graph.validate(),
            Err(GraphError::UnknownDependency {
                task: "f".into(),
                dep: "missing".into()
            })
        );
    }

    #[test]
    fn test_validate_cycle() {
        let mut graph = TaskGraph::new();
        graph.add("x", &["z"]).unwrap();
        graph.add("y", &["x"]).unwrap();
        graph.add("z", &["y"]).unwrap();
        let err = graph.validate().unwrap_err();
        assert_eq!(
            err,
            GraphError::Cycle(vec!["x".into(), "z".into(), "y".into(), "x".into()])
        );
        assert_eq!(err.to_string(), "dependency cycle: x -> z -> y -> x");
    }

    #[test]
    fn test_closure() {
        let graph = diamond();
        assert_eq!(graph.closure(&["d"]).unwrap(), vec!["a", "b", "c", "d"]);
        assert_eq!(graph.closure(&["c", "e"]).unwrap(), vec!["a", "c", "e"]);
        assert_eq!(
            graph.closure(&["nope"]),
            Err(GraphError::UnknownTask("nope".into()))
        );
    }

    #[test]
    fn test_topo_order_respects_edges() {
        let mut graph = TaskGraph::new();
        graph.add("late", &["early"]).unwrap();
        graph.add("early", &[]).unwrap();
        graph.add("solo", &[]).unwrap();

        let order = graph.topo_order(graph.nodes());
        assert_eq!(order, vec!["early", "late", "solo"]);
    }

    #[test]
    fn test_topo_order_subset() {
        let graph = diamond();
        assert_eq!(graph.topo_order(&["d", "c"]), vec!["c", "d"]);
    }

    #[test]
    fn test_downstream() {
        let graph = diamond();
        assert_eq!(graph.downstream("a"), vec!["b", "c", "d"]);
        assert_eq!(graph.downstream("c"), vec!["d"]);
        assert!(graph.downstream("e").is_empty());
    }
}
