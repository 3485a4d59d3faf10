//! DependencyEngine - 依存グラフの公開 API
//!
//! 辺の追加・削除は EdgeStore のトランザクションに委ね、エンジン自身は
//! グラフをメモリに保持しません。すべての問い合わせは現在の永続状態を読みます。
//!
//! `membership` は辺の追加とタスク削除の cascade を直列化します。追加は read 側で
//! 存在確認から insert までを保持し、cascade は write 側で辺とタスクの削除を保持します。

use std::collections::BTreeSet;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{debug, info, instrument, warn};

use super::status::{BlockedStatusView, Blocker};
use crate::domain::{DependencyEdge, DependencyError, EdgeId, TaskId, TaskStatus};
use crate::graph::{CycleGuard, find_cycle};
use crate::ports::{Clock, EdgeStore, IdGenerator, SystemClock, TaskStore, UlidGenerator};

pub struct DependencyEngine {
    tasks: Arc<dyn TaskStore>,
    edges: Arc<dyn EdgeStore>,
    ids: Arc<dyn IdGenerator>,
    clock: Arc<dyn Clock>,
    guard: CycleGuard,
    membership: RwLock<()>,
}

impl DependencyEngine {
    pub fn new(tasks: Arc<dyn TaskStore>, edges: Arc<dyn EdgeStore>) -> Self {
        Self::with_parts(
            tasks,
            edges,
            Arc::new(UlidGenerator::new(SystemClock)),
            Arc::new(SystemClock),
        )
    }

    pub fn with_parts(
        tasks: Arc<dyn TaskStore>,
        edges: Arc<dyn EdgeStore>,
        ids: Arc<dyn IdGenerator>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            tasks,
            edges,
            ids,
            clock,
            guard: CycleGuard::new(),
            membership: RwLock::new(()),
        }
    }

    /// Record that `from` depends on `to`.
    ///
    /// Errors: `InvalidEdge`, `UnknownTask`, `DuplicateEdge`, `CircularDependency`,
    /// or `Storage` (nothing is written in that case).
    #[instrument(skip_all, fields(from = %from, to = %to))]
    pub async fn add_dependency(
        &self,
        from: TaskId,
        to: TaskId,
    ) -> Result<DependencyEdge, DependencyError> {
        if from == to {
            return Err(DependencyError::InvalidEdge { task: from });
        }
        // held until the edge is written; a cascade cannot slip in between
        let _adding = self.membership.read().await;
        for task in [from, to] {
            if !self.tasks.task_exists(task).await? {
                return Err(DependencyError::UnknownTask { task });
            }
        }

        let edge = DependencyEdge::new(self.ids.generate_edge_id(), from, to, self.clock.now());
        match self.edges.create(edge, &self.guard).await {
            Ok(edge) => {
                info!(edge = %edge.id, "dependency added");
                Ok(edge)
            }
            Err(err) => {
                debug!(error = %err, "dependency rejected");
                Err(err)
            }
        }
    }

    /// Idempotent: returns how many edges were removed (0 or 1).
    #[instrument(skip_all, fields(edge = %edge))]
    pub async fn remove_dependency(&self, edge: EdgeId) -> Result<usize, DependencyError> {
        let removed = self.edges.delete(edge).await?;
        if removed > 0 {
            info!("dependency removed");
        }
        Ok(removed)
    }

    /// Direct prerequisites of `task`.
    pub async fn get_dependencies(&self, task: TaskId) -> Result<BTreeSet<TaskId>, DependencyError> {
        Ok(self.edges.list_outgoing(task).await?)
    }

    /// Direct dependents of `task`.
    pub async fn get_dependents(&self, task: TaskId) -> Result<BTreeSet<TaskId>, DependencyError> {
        Ok(self.edges.list_incoming(task).await?)
    }

    pub async fn get_edge(&self, edge: EdgeId) -> Result<Option<DependencyEdge>, DependencyError> {
        Ok(self.edges.get(edge).await?)
    }

    pub async fn find_edge(
        &self,
        from: TaskId,
        to: TaskId,
    ) -> Result<Option<DependencyEdge>, DependencyError> {
        Ok(self.edges.find(from, to).await?)
    }

    /// True if any *direct* prerequisite is not completed.
    ///
    /// A task with no dependencies is never blocked. A prerequisite the task
    /// store no longer knows counts as open.
    pub async fn is_blocked(&self, task: TaskId) -> Result<bool, DependencyError> {
        for dep in self.get_dependencies(task).await? {
            let status = self.tasks.get_status(dep).await?;
            if !status.is_some_and(TaskStatus::is_terminal) {
                debug!(task = %task, blocker = %dep, "task is blocked");
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Blocked flag plus the open prerequisites behind it.
    pub async fn status(&self, task: TaskId) -> Result<BlockedStatusView, DependencyError> {
        let dependencies = self.get_dependencies(task).await?;
        let mut blockers = Vec::new();
        for dep in &dependencies {
            let status = self.tasks.get_status(*dep).await?;
            if !status.is_some_and(TaskStatus::is_terminal) {
                blockers.push(Blocker { task: *dep, status });
            }
        }
        Ok(BlockedStatusView::new(task, dependencies.len(), blockers))
    }

    /// Cascade for a deleted task: removes every edge touching it.
    ///
    /// Waits for in-flight `add_dependency` calls, so an edge that passed the
    /// existence check before the task vanished is removed here too.
    #[instrument(skip_all, fields(task = %task))]
    pub async fn on_task_deleted(&self, task: TaskId) -> Result<usize, DependencyError> {
        let _cascade = self.membership.write().await;
        self.remove_incident(task).await
    }

    /// Two-phase delete under one cascade lock: incident edges, then the task record.
    ///
    /// If the second phase fails the task survives without edges, never the reverse.
    #[instrument(skip_all, fields(task = %task))]
    pub async fn delete_task(&self, task: TaskId) -> Result<bool, DependencyError> {
        let _cascade = self.membership.write().await;
        self.remove_incident(task).await?;
        let existed = self.tasks.delete_task(task).await?;
        info!(existed, "task deleted");
        Ok(existed)
    }

    async fn remove_incident(&self, task: TaskId) -> Result<usize, DependencyError> {
        let removed = self.edges.delete_all_for_task(task).await?;
        info!(removed, "incident dependencies removed");
        Ok(removed)
    }

    /// Scan the persisted edge set for a cycle.
    ///
    /// The guard keeps the set acyclic; this catches rows written around it.
    pub async fn audit(&self) -> Result<Option<Vec<TaskId>>, DependencyError> {
        let edges = self.edges.all_edges().await?;
        let cycle = find_cycle(&edges);
        if let Some(cycle) = &cycle {
            warn!(len = cycle.len(), "stored dependency graph contains a cycle");
        }
        Ok(cycle)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;
    use tokio::sync::Notify;

    use super::*;
    use crate::domain::{StoreError, UserId};
    use crate::impls::{InMemoryEdgeStore, InMemoryTaskStore};

    /// Parks the first existence check for `gate` until `release` fires.
    struct GatedTasks {
        inner: InMemoryTaskStore,
        gate: TaskId,
        armed: AtomicBool,
        parked: Notify,
        release: Notify,
    }

    #[async_trait]
    impl TaskStore for GatedTasks {
        async fn task_exists(&self, task: TaskId) -> Result<bool, StoreError> {
            let exists = self.inner.task_exists(task).await?;
            if task == self.gate && self.armed.swap(false, Ordering::SeqCst) {
                self.parked.notify_one();
                self.release.notified().await;
            }
            Ok(exists)
        }

        async fn get_status(&self, task: TaskId) -> Result<Option<TaskStatus>, StoreError> {
            self.inner.get_status(task).await
        }

        async fn get_assignee(&self, task: TaskId) -> Result<Option<UserId>, StoreError> {
            self.inner.get_assignee(task).await
        }

        async fn delete_task(&self, task: TaskId) -> Result<bool, StoreError> {
            self.inner.delete_task(task).await
        }
    }

    async fn setup(n: usize) -> (DependencyEngine, InMemoryTaskStore, Vec<TaskId>) {
        let tasks = InMemoryTaskStore::new();
        let mut ids = Vec::new();
        for _ in 0..n {
            let id = TaskId::random();
            tasks.insert(id, TaskStatus::Todo, None).await;
            ids.push(id);
        }
        let engine = DependencyEngine::new(
            Arc::new(tasks.clone()),
            Arc::new(InMemoryEdgeStore::new()),
        );
        (engine, tasks, ids)
    }

    #[tokio::test]
    async fn self_dependency_is_invalid() {
        let (engine, _, t) = setup(1).await;
        let err = engine.add_dependency(t[0], t[0]).await.unwrap_err();
        assert!(matches!(err, DependencyError::InvalidEdge { .. }));
    }

    #[tokio::test]
    async fn unknown_endpoint_is_rejected() {
        let (engine, _, t) = setup(1).await;
        let ghost = TaskId::random();

        let err = engine.add_dependency(t[0], ghost).await.unwrap_err();
        assert!(matches!(err, DependencyError::UnknownTask { task } if task == ghost));

        let err = engine.add_dependency(ghost, t[0]).await.unwrap_err();
        assert!(matches!(err, DependencyError::UnknownTask { task } if task == ghost));
    }

    #[tokio::test]
    async fn direct_and_transitive_cycles_are_rejected() {
        let (engine, _, t) = setup(3).await;
        let (a, b, c) = (t[0], t[1], t[2]);

        engine.add_dependency(a, b).await.unwrap();
        let err = engine.add_dependency(b, a).await.unwrap_err();
        assert!(matches!(err, DependencyError::CircularDependency { .. }));

        engine.add_dependency(b, c).await.unwrap();
        let err = engine.add_dependency(c, a).await.unwrap_err();
        assert!(matches!(err, DependencyError::CircularDependency { .. }));
        assert!(engine.audit().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn duplicate_is_reported_before_cycle_check() {
        let (engine, _, t) = setup(2).await;
        engine.add_dependency(t[0], t[1]).await.unwrap();

        let err = engine.add_dependency(t[0], t[1]).await.unwrap_err();
        assert!(matches!(err, DependencyError::DuplicateEdge { .. }));
    }

    #[tokio::test]
    async fn queries_follow_edge_direction() {
        let (engine, _, t) = setup(3).await;
        engine.add_dependency(t[0], t[1]).await.unwrap();
        engine.add_dependency(t[0], t[2]).await.unwrap();

        assert_eq!(
            engine.get_dependencies(t[0]).await.unwrap(),
            BTreeSet::from([t[1], t[2]])
        );
        assert_eq!(engine.get_dependents(t[1]).await.unwrap(), BTreeSet::from([t[0]]));
        assert!(engine.get_dependents(t[0]).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn remove_dependency_is_idempotent() {
        let (engine, _, t) = setup(2).await;
        let edge = engine.add_dependency(t[0], t[1]).await.unwrap();

        assert_eq!(engine.remove_dependency(edge.id).await.unwrap(), 1);
        assert_eq!(engine.remove_dependency(edge.id).await.unwrap(), 0);
        assert!(engine.get_edge(edge.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn blocked_only_by_open_direct_prerequisites() {
        let (engine, tasks, t) = setup(3).await;
        let (a, b, c) = (t[0], t[1], t[2]);

        assert!(!engine.is_blocked(a).await.unwrap());

        engine.add_dependency(a, b).await.unwrap();
        engine.add_dependency(b, c).await.unwrap();
        assert!(engine.is_blocked(a).await.unwrap());

        // A only looks at B, not at B's own prerequisite C.
        tasks.set_status(b, TaskStatus::Completed).await;
        assert!(!engine.is_blocked(a).await.unwrap());
        assert!(engine.is_blocked(b).await.unwrap());
    }

    #[tokio::test]
    async fn status_lists_open_blockers() {
        let (engine, tasks, t) = setup(3).await;
        engine.add_dependency(t[0], t[1]).await.unwrap();
        engine.add_dependency(t[0], t[2]).await.unwrap();
        tasks.set_status(t[1], TaskStatus::Completed).await;
        tasks.set_status(t[2], TaskStatus::InProgress).await;

        let view = engine.status(t[0]).await.unwrap();

        assert!(view.blocked);
        assert_eq!(view.dependencies, 2);
        assert_eq!(view.blockers.len(), 1);
        assert_eq!(view.blockers[0].task, t[2]);
        assert_eq!(view.blockers[0].status, Some(TaskStatus::InProgress));
    }

    #[tokio::test]
    async fn cascade_removes_every_incident_edge() {
        let (engine, _, t) = setup(3).await;
        engine.add_dependency(t[0], t[1]).await.unwrap();
        engine.add_dependency(t[1], t[2]).await.unwrap();

        assert_eq!(engine.on_task_deleted(t[1]).await.unwrap(), 2);

        for task in &t {
            assert!(!engine.get_dependencies(*task).await.unwrap().contains(&t[1]));
            assert!(!engine.get_dependents(*task).await.unwrap().contains(&t[1]));
        }
        assert!(engine.get_dependencies(t[1]).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn concurrent_opposite_adds_never_both_succeed() {
        for _ in 0..20 {
            let (engine, _, t) = setup(2).await;
            let engine = Arc::new(engine);
            let (a, b) = (t[0], t[1]);

            let e1 = Arc::clone(&engine);
            let e2 = Arc::clone(&engine);
            let h1 = tokio::spawn(async move { e1.add_dependency(a, b).await });
            let h2 = tokio::spawn(async move { e2.add_dependency(b, a).await });
            let r1 = h1.await.unwrap();
            let r2 = h2.await.unwrap();

            assert!(r1.is_ok() ^ r2.is_ok());
            assert!(engine.audit().await.unwrap().is_none());
        }
    }

    #[tokio::test]
    async fn delete_waits_for_in_flight_add_and_removes_its_edge() {
        let inner = InMemoryTaskStore::new();
        let a = TaskId::random();
        let b = TaskId::random();
        inner.insert(a, TaskStatus::Todo, None).await;
        inner.insert(b, TaskStatus::Todo, None).await;
        let gated = Arc::new(GatedTasks {
            inner: inner.clone(),
            gate: b,
            armed: AtomicBool::new(true),
            parked: Notify::new(),
            release: Notify::new(),
        });
        let engine = Arc::new(DependencyEngine::new(
            gated.clone(),
            Arc::new(InMemoryEdgeStore::new()),
        ));

        let adding = tokio::spawn({
            let engine = Arc::clone(&engine);
            async move { engine.add_dependency(a, b).await }
        });
        // B has been seen to exist; delete it before the edge is written.
        gated.parked.notified().await;
        let deleting = tokio::spawn({
            let engine = Arc::clone(&engine);
            async move { engine.delete_task(b).await }
        });
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!deleting.is_finished());

        gated.release.notify_one();
        adding.await.unwrap().unwrap();
        assert!(deleting.await.unwrap().unwrap());

        assert!(inner.get(b).await.is_none());
        assert!(engine.get_dependencies(a).await.unwrap().is_empty());
        assert!(!engine.is_blocked(a).await.unwrap());
    }
}
