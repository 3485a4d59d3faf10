//! In-memory edge store.
//!
//! One mutex guards the whole edge set, so "cycle check + insert" is a single
//! critical section and readers never observe a half-applied mutation.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::domain::{DependencyEdge, DependencyError, EdgeId, StoreError, TaskId};
use crate::graph::{Adjacency, CycleGuard};
use crate::ports::EdgeStore;

#[derive(Default)]
struct EdgeState {
    /// All edge rows (single source of truth).
    edges: HashMap<EdgeId, DependencyEdge>,

    /// `(from, to)` -> edge id. Enforces one edge per pair.
    pairs: HashMap<(TaskId, TaskId), EdgeId>,

    /// Derived index for traversal; kept in sync with `edges`.
    adjacency: Adjacency,
}

impl EdgeState {
    fn remove(&mut self, id: EdgeId) -> Option<DependencyEdge> {
        let edge = self.edges.remove(&id)?;
        self.pairs.remove(&(edge.from, edge.to));
        self.adjacency.remove(edge.from, edge.to);
        Some(edge)
    }
}

#[derive(Clone, Default)]
pub struct InMemoryEdgeStore {
    state: Arc<Mutex<EdgeState>>,
}

impl InMemoryEdgeStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl EdgeStore for InMemoryEdgeStore {
    async fn create(
        &self,
        edge: DependencyEdge,
        guard: &CycleGuard,
    ) -> Result<DependencyEdge, DependencyError> {
        let mut state = self.state.lock().await;

        if edge.from == edge.to {
            return Err(DependencyError::InvalidEdge { task: edge.from });
        }
        if state.pairs.contains_key(&(edge.from, edge.to)) {
            return Err(DependencyError::DuplicateEdge {
                from: edge.from,
                to: edge.to,
            });
        }
        guard.check(&state.adjacency, edge.from, edge.to)?;

        state.pairs.insert((edge.from, edge.to), edge.id);
        state.adjacency.insert(edge.from, edge.to);
        state.edges.insert(edge.id, edge.clone());
        Ok(edge)
    }

    async fn delete(&self, edge: EdgeId) -> Result<usize, StoreError> {
        let mut state = self.state.lock().await;
        Ok(state.remove(edge).map_or(0, |_| 1))
    }

    async fn delete_all_for_task(&self, task: TaskId) -> Result<usize, StoreError> {
        let mut state = self.state.lock().await;
        let incident: Vec<EdgeId> = state
            .edges
            .values()
            .filter(|e| e.touches(task))
            .map(|e| e.id)
            .collect();
        for id in &incident {
            state.remove(*id);
        }
        Ok(incident.len())
    }

    async fn list_outgoing(&self, task: TaskId) -> Result<BTreeSet<TaskId>, StoreError> {
        Ok(self.state.lock().await.adjacency.dependencies(task))
    }

    async fn list_incoming(&self, task: TaskId) -> Result<BTreeSet<TaskId>, StoreError> {
        Ok(self.state.lock().await.adjacency.dependents(task))
    }

    async fn get(&self, edge: EdgeId) -> Result<Option<DependencyEdge>, StoreError> {
        Ok(self.state.lock().await.edges.get(&edge).cloned())
    }

    async fn find(&self, from: TaskId, to: TaskId) -> Result<Option<DependencyEdge>, StoreError> {
        let state = self.state.lock().await;
        Ok(state
            .pairs
            .get(&(from, to))
            .and_then(|id| state.edges.get(id))
            .cloned())
    }

    async fn all_edges(&self) -> Result<Vec<DependencyEdge>, StoreError> {
        let state = self.state.lock().await;
        let mut edges: Vec<DependencyEdge> = state.edges.values().cloned().collect();
        edges.sort_by_key(|e| (e.created_at, e.id));
        Ok(edges)
    }
}
