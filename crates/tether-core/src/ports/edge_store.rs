//! EdgeStore port - 依存辺の正本
//!
//! # 設計原則
//! - 「循環チェック + 挿入」は同一トランザクション内（stale snapshot による循環を防ぐ）
//! - `delete` は冪等（存在しない ID は 0 件削除として成功）
//! - 読み取りはロック不要。書き込み途中の半端な状態は見せない

use std::collections::BTreeSet;

use async_trait::async_trait;

use crate::domain::{DependencyEdge, DependencyError, EdgeId, StoreError, TaskId};
use crate::graph::CycleGuard;

/// Read-only adjacency view used by the cycle guard.
///
/// Implementations are handed out *inside* a store transaction, so every
/// traversal sees the same snapshot the subsequent insert is applied to.
pub trait EdgeGraph {
    /// Direct prerequisites of `task` (targets of its outgoing edges).
    fn outgoing(&self, task: TaskId) -> Result<Vec<TaskId>, StoreError>;
}

#[async_trait]
pub trait EdgeStore: Send + Sync {
    /// Persist `edge` atomically after validating it against the current edge set.
    ///
    /// Fails with `InvalidEdge` (self edge), `DuplicateEdge` (same `(from, to)` exists;
    /// checked before the cycle guard) or `CircularDependency`.
    /// Task existence is checked by the caller against the task store.
    async fn create(
        &self,
        edge: DependencyEdge,
        guard: &CycleGuard,
    ) -> Result<DependencyEdge, DependencyError>;

    /// Returns the number of edges removed (0 or 1).
    async fn delete(&self, edge: EdgeId) -> Result<usize, StoreError>;

    /// Remove every edge where `task` is either endpoint.
    async fn delete_all_for_task(&self, task: TaskId) -> Result<usize, StoreError>;

    /// What `task` depends on.
    async fn list_outgoing(&self, task: TaskId) -> Result<BTreeSet<TaskId>, StoreError>;

    /// What depends on `task`.
    async fn list_incoming(&self, task: TaskId) -> Result<BTreeSet<TaskId>, StoreError>;

    async fn get(&self, edge: EdgeId) -> Result<Option<DependencyEdge>, StoreError>;

    async fn find(&self, from: TaskId, to: TaskId) -> Result<Option<DependencyEdge>, StoreError>;

    /// Every edge, ordered by creation time.
    async fn all_edges(&self) -> Result<Vec<DependencyEdge>, StoreError>;
}
