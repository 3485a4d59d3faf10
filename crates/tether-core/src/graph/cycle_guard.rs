//! Cycle guard: decides whether a proposed edge keeps the graph acyclic.
//!
//! Adding `from -> to` closes a cycle iff `from` is already reachable from `to`.
//! The traversal is breadth-first with a visited set and no depth limit;
//! it terminates because the graph is finite.

use std::collections::{HashMap, HashSet, VecDeque};

use crate::domain::{DependencyEdge, DependencyError, TaskId};
use crate::ports::EdgeGraph;

/// Pure, query-only. Never mutates the store it reads.
#[derive(Debug, Clone, Copy, Default)]
pub struct CycleGuard;

impl CycleGuard {
    pub fn new() -> Self {
        Self
    }

    /// Validate `from -> to` against `graph`.
    ///
    /// Duplicate detection is the store's job and happens before this call.
    pub fn check<G>(&self, graph: &G, from: TaskId, to: TaskId) -> Result<(), DependencyError>
    where
        G: EdgeGraph + ?Sized,
    {
        if from == to {
            return Err(DependencyError::InvalidEdge { task: from });
        }
        match self.path_between(graph, to, from)? {
            Some(path) => Err(DependencyError::CircularDependency { from, to, path }),
            None => Ok(()),
        }
    }

    /// Shortest existing path `start -> ... -> goal`, following outgoing edges.
    pub fn path_between<G>(
        &self,
        graph: &G,
        start: TaskId,
        goal: TaskId,
    ) -> Result<Option<Vec<TaskId>>, DependencyError>
    where
        G: EdgeGraph + ?Sized,
    {
        let mut visited = HashSet::from([start]);
        let mut prev: HashMap<TaskId, TaskId> = HashMap::new();
        let mut queue = VecDeque::from([start]);

        while let Some(node) = queue.pop_front() {
            if node == goal {
                return Ok(Some(follow_back(goal, &prev)));
            }
            for dep in graph.outgoing(node)? {
                if visited.insert(dep) {
                    prev.insert(dep, node);
                    queue.push_back(dep);
                }
            }
        }
        Ok(None)
    }
}

fn follow_back(goal: TaskId, prev: &HashMap<TaskId, TaskId>) -> Vec<TaskId> {
    let mut path = vec![goal];
    let mut current = goal;
    while let Some(&p) = prev.get(&current) {
        path.push(p);
        current = p;
    }
    path.reverse();
    path
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Color {
    Gray,
    Black,
}

/// Whole-graph audit: returns one cycle if the edge set is not a DAG.
///
/// Used to verify persisted data that may have been written outside the guard.
/// Iterative three-color DFS, O(V + E).
pub fn find_cycle(edges: &[DependencyEdge]) -> Option<Vec<TaskId>> {
    let mut adjacency: HashMap<TaskId, Vec<TaskId>> = HashMap::new();
    for edge in edges {
        adjacency.entry(edge.from).or_default().push(edge.to);
    }
    let mut roots: Vec<TaskId> = adjacency.keys().copied().collect();
    roots.sort();

    let mut color: HashMap<TaskId, Color> = HashMap::new();
    for root in roots {
        if color.contains_key(&root) {
            continue;
        }
        // (node, index of next child to visit)
        let mut stack: Vec<(TaskId, usize)> = vec![(root, 0)];
        color.insert(root, Color::Gray);

        while let Some((node, next)) = stack.last().copied() {
            let children = adjacency.get(&node).map(Vec::as_slice).unwrap_or_default();
            if let Some(&child) = children.get(next) {
                if let Some(top) = stack.last_mut() {
                    top.1 += 1;
                }
                match color.get(&child) {
                    Some(Color::Gray) => {
                        let start = stack.iter().position(|(n, _)| *n == child)?;
                        let mut cycle: Vec<TaskId> = stack[start..].iter().map(|(n, _)| *n).collect();
                        cycle.push(child);
                        return Some(cycle);
                    }
                    Some(Color::Black) => {}
                    None => {
                        color.insert(child, Color::Gray);
                        stack.push((child, 0));
                    }
                }
            } else {
                color.insert(node, Color::Black);
                stack.pop();
            }
        }
    }
    None
}
