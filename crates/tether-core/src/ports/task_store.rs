//! TaskStore port - タスクの正本（source of truth）
//!
//! 依存グラフはタスクを所有しません。存在確認・状態・担当者の読み取りだけを行い、
//! 削除は cascade（辺の削除 → タスクの削除）の二段階で `TaskLifecycle` から呼ばれます。

use async_trait::async_trait;

use crate::domain::{StoreError, TaskId, TaskStatus, UserId};

#[async_trait]
pub trait TaskStore: Send + Sync {
    async fn task_exists(&self, task: TaskId) -> Result<bool, StoreError>;

    /// `None` when the task is unknown.
    async fn get_status(&self, task: TaskId) -> Result<Option<TaskStatus>, StoreError>;

    /// Assignee used for notification routing.
    async fn get_assignee(&self, task: TaskId) -> Result<Option<UserId>, StoreError>;

    /// Remove the task record. Returns whether it existed.
    async fn delete_task(&self, task: TaskId) -> Result<bool, StoreError>;
}
