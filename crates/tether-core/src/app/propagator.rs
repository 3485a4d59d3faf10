//! CompletionPropagator - 完了イベントで依存先を再評価して通知する
//!
//! # フロー
//! 1. `get_dependents(completed)` で待っているタスクを取得
//! 2. 各タスクの blocked を毎回計算し直す（キャッシュしない）
//! 3. unblocked になったタスクの担当者に通知（失敗しても残りは続行）
//!
//! (prerequisite, dependent) は送信前に ledger へ予約するので、同じ完了イベントが
//! 並行して二度来ても通知は一度だけです。配送に失敗した組は予約を外し、次回に再送されます。

use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};

use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use super::DependencyEngine;
use crate::domain::{DependencyError, DependencyNotification, TaskId};
use crate::ports::{Clock, IdGenerator, NotificationSink, SystemClock, TaskStore, UlidGenerator};

/// Outcome of one completion event.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PropagationReport {
    /// Dependents with no remaining open prerequisites.
    pub unblocked: Vec<TaskId>,
    pub notified: usize,
    /// Unblocked, but a notification for this prerequisite was already delivered.
    pub already_notified: usize,
    pub skipped_no_assignee: usize,
    /// Status reads or deliveries that failed; retried on the next event.
    pub failed: usize,
}

pub struct CompletionPropagator {
    engine: Arc<DependencyEngine>,
    tasks: Arc<dyn TaskStore>,
    sink: Arc<dyn NotificationSink>,
    ids: Arc<dyn IdGenerator>,
    clock: Arc<dyn Clock>,
    notifications_enabled: bool,
    /// (completed prerequisite, unblocked dependent)
    delivered: Mutex<HashSet<(TaskId, TaskId)>>,
}

impl CompletionPropagator {
    pub fn new(
        engine: Arc<DependencyEngine>,
        tasks: Arc<dyn TaskStore>,
        sink: Arc<dyn NotificationSink>,
    ) -> Self {
        Self::with_parts(
            engine,
            tasks,
            sink,
            Arc::new(UlidGenerator::new(SystemClock)),
            Arc::new(SystemClock),
        )
    }

    pub fn with_parts(
        engine: Arc<DependencyEngine>,
        tasks: Arc<dyn TaskStore>,
        sink: Arc<dyn NotificationSink>,
        ids: Arc<dyn IdGenerator>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            engine,
            tasks,
            sink,
            ids,
            clock,
            notifications_enabled: true,
            delivered: Mutex::new(HashSet::new()),
        }
    }

    /// Compute unblocked dependents but never call the sink.
    pub fn without_notifications(mut self) -> Self {
        self.notifications_enabled = false;
        self
    }

    /// React to `completed` reaching the terminal status.
    ///
    /// Only the dependents lookup can fail the whole call; per-dependent
    /// failures are logged and counted in the report.
    #[instrument(skip_all, fields(completed = %completed))]
    pub async fn on_task_completed(
        &self,
        completed: TaskId,
    ) -> Result<PropagationReport, DependencyError> {
        let mut report = PropagationReport::default();

        for dependent in self.engine.get_dependents(completed).await? {
            match self.engine.is_blocked(dependent).await {
                Ok(true) => continue,
                Ok(false) => report.unblocked.push(dependent),
                Err(err) => {
                    warn!(dependent = %dependent, error = %err, "could not evaluate blocked status");
                    report.failed += 1;
                    continue;
                }
            }

            if !self.notifications_enabled {
                continue;
            }
            if !self.reserve(completed, dependent) {
                report.already_notified += 1;
                continue;
            }
            if !self.notify(completed, dependent, &mut report).await {
                self.release(completed, dependent);
            }
        }

        info!(
            unblocked = report.unblocked.len(),
            notified = report.notified,
            failed = report.failed,
            "completion propagated"
        );
        Ok(report)
    }

    /// Returns false when the pair should be retried on the next event.
    async fn notify(
        &self,
        completed: TaskId,
        dependent: TaskId,
        report: &mut PropagationReport,
    ) -> bool {
        let recipient = match self.tasks.get_assignee(dependent).await {
            Ok(Some(user)) => user,
            Ok(None) => {
                debug!(dependent = %dependent, "unblocked task has no assignee");
                report.skipped_no_assignee += 1;
                return true;
            }
            Err(err) => {
                warn!(dependent = %dependent, error = %err, "could not read assignee");
                report.failed += 1;
                return false;
            }
        };

        let notification = DependencyNotification::dependency_completed(
            self.ids.generate_notification_id(),
            recipient,
            dependent,
            completed,
            self.clock.now(),
        );
        match self.sink.send(notification).await {
            Ok(()) => {
                report.notified += 1;
                true
            }
            Err(err) => {
                warn!(
                    dependent = %dependent,
                    recipient = %recipient,
                    error = %err,
                    "dependency notification failed"
                );
                report.failed += 1;
                false
            }
        }
    }

    /// Drop ledger entries for a prerequisite that left the completed state,
    /// so completing it again notifies again.
    pub fn forget_completion(&self, prerequisite: TaskId) {
        self.ledger().retain(|(done, _)| *done != prerequisite);
    }

    /// Drop every ledger entry touching a deleted task.
    pub fn forget_task(&self, task: TaskId) {
        self.ledger()
            .retain(|(done, dependent)| *done != task && *dependent != task);
    }

    /// Drop the entry for a removed edge `dependent -> prerequisite`.
    pub fn forget_edge(&self, dependent: TaskId, prerequisite: TaskId) {
        self.ledger().remove(&(prerequisite, dependent));
    }

    /// Claim the pair for delivery; false if another event already holds it.
    fn reserve(&self, completed: TaskId, dependent: TaskId) -> bool {
        self.ledger().insert((completed, dependent))
    }

    fn release(&self, completed: TaskId, dependent: TaskId) {
        self.ledger().remove(&(completed, dependent));
    }

    fn ledger(&self) -> std::sync::MutexGuard<'_, HashSet<(TaskId, TaskId)>> {
        self.delivered.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
