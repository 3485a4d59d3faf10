//! Adjacency index over dependency edges.
//!
//! Design:
//! - Forward edges: task -> tasks it depends on (prerequisites)
//! - Reverse edges: task -> tasks that depend on it (dependents)
//! - Invariant: `forward` and `reverse` are kept in sync; empty sets are removed

use std::collections::hash_map::Entry;
use std::collections::{BTreeSet, HashMap};

use crate::domain::{StoreError, TaskId};
use crate::ports::EdgeGraph;

#[derive(Debug, Clone, Default)]
pub struct Adjacency {
    forward: HashMap<TaskId, BTreeSet<TaskId>>,
    reverse: HashMap<TaskId, BTreeSet<TaskId>>,
}

impl Adjacency {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `task` depends on `depends_on`.
    ///
    /// Returns false if the pair was already present.
    pub fn insert(&mut self, task: TaskId, depends_on: TaskId) -> bool {
        let inserted = self.forward.entry(task).or_default().insert(depends_on);
        self.reverse.entry(depends_on).or_default().insert(task);
        inserted
    }

    pub fn remove(&mut self, task: TaskId, depends_on: TaskId) {
        remove_from(&mut self.forward, task, depends_on);
        remove_from(&mut self.reverse, depends_on, task);
    }

    #[cfg(test)]
    pub fn contains(&self, task: TaskId, depends_on: TaskId) -> bool {
        self.forward
            .get(&task)
            .is_some_and(|deps| deps.contains(&depends_on))
    }

    pub fn dependencies(&self, task: TaskId) -> BTreeSet<TaskId> {
        self.forward.get(&task).cloned().unwrap_or_default()
    }

    /// Tasks waiting for `task`. Includes dependents that still have other open prerequisites.
    pub fn dependents(&self, task: TaskId) -> BTreeSet<TaskId> {
        self.reverse.get(&task).cloned().unwrap_or_default()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.forward.is_empty()
    }
}

fn remove_from(map: &mut HashMap<TaskId, BTreeSet<TaskId>>, key: TaskId, value: TaskId) {
    if let Entry::Occupied(mut e) = map.entry(key) {
        e.get_mut().remove(&value);
        if e.get().is_empty() {
            e.remove_entry();
        }
    }
}

impl EdgeGraph for Adjacency {
    fn outgoing(&self, task: TaskId) -> Result<Vec<TaskId>, StoreError> {
        Ok(self
            .forward
            .get(&task)
            .map(|deps| deps.iter().copied().collect())
            .unwrap_or_default())
    }
}
