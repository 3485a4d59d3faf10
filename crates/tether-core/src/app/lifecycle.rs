//! TaskLifecycle - タスク正本からのコールバックの受け口
//!
//! タスクの削除と状態遷移はこのクレートの外で起きます。正本側は削除・状態変更の
//! たびにここを呼ぶ必要があります（cascade と完了通知の契約）。

use std::sync::Arc;

use tracing::{debug, info, instrument};

use super::{CompletionPropagator, DependencyEngine, PropagationReport};
use crate::domain::{DependencyError, EdgeId, TaskId, TaskStatus};

#[derive(Clone)]
pub struct TaskLifecycle {
    engine: Arc<DependencyEngine>,
    propagator: Arc<CompletionPropagator>,
}

impl TaskLifecycle {
    pub fn new(engine: Arc<DependencyEngine>, propagator: Arc<CompletionPropagator>) -> Self {
        Self { engine, propagator }
    }

    /// Cascade hook: the task is gone (or about to be); drop its edges.
    pub async fn on_task_deleted(&self, task: TaskId) -> Result<usize, DependencyError> {
        let removed = self.engine.on_task_deleted(task).await?;
        self.propagator.forget_task(task);
        Ok(removed)
    }

    /// Completion hook.
    pub async fn on_task_completed(
        &self,
        task: TaskId,
    ) -> Result<PropagationReport, DependencyError> {
        self.propagator.on_task_completed(task).await
    }

    /// Delete the task through the engine's cascade, then forget its notifications.
    pub async fn delete_task(&self, task: TaskId) -> Result<bool, DependencyError> {
        let existed = self.engine.delete_task(task).await?;
        self.propagator.forget_task(task);
        Ok(existed)
    }

    /// Remove one edge and the delivery record tied to it.
    #[instrument(skip_all, fields(edge = %edge))]
    pub async fn remove_dependency(&self, edge: EdgeId) -> Result<usize, DependencyError> {
        let Some(found) = self.engine.get_edge(edge).await? else {
            return Ok(0);
        };
        let removed = self.engine.remove_dependency(edge).await?;
        if removed > 0 {
            self.propagator.forget_edge(found.from, found.to);
            info!(from = %found.from, to = %found.to, "dependency edge forgotten");
        }
        Ok(removed)
    }

    /// Route a status transition reported by the task store.
    ///
    /// Entering the terminal status propagates; leaving it re-arms notifications
    /// for the next completion. Other transitions are ignored.
    pub async fn task_status_changed(
        &self,
        task: TaskId,
        old: Option<TaskStatus>,
        new: TaskStatus,
    ) -> Result<Option<PropagationReport>, DependencyError> {
        let was_terminal = old.is_some_and(TaskStatus::is_terminal);
        match (was_terminal, new.is_terminal()) {
            (false, true) => self.on_task_completed(task).await.map(Some),
            (true, false) => {
                debug!(task = %task, status = %new, "task reopened");
                self.propagator.forget_completion(task);
                Ok(None)
            }
            _ => Ok(None),
        }
    }
}
