//! In-memory task reference store for development and tests.
//!
//! The real task store lives outside this crate (the project-management
//! service's relational store). This one only carries the fields the
//! dependency engine reads.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::{StoreError, TaskId, TaskStatus, UserId};
use crate::ports::TaskStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskRecord {
    pub status: TaskStatus,
    pub assignee: Option<UserId>,
}

#[derive(Clone, Default)]
pub struct InMemoryTaskStore {
    tasks: Arc<RwLock<HashMap<TaskId, TaskRecord>>>,
}

impl InMemoryTaskStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, task: TaskId, status: TaskStatus, assignee: Option<UserId>) {
        self.tasks
            .write()
            .await
            .insert(task, TaskRecord { status, assignee });
    }

    /// Update the status; returns the previous one, or `None` if the task is unknown.
    pub async fn set_status(&self, task: TaskId, status: TaskStatus) -> Option<TaskStatus> {
        let mut tasks = self.tasks.write().await;
        let record = tasks.get_mut(&task)?;
        Some(std::mem::replace(&mut record.status, status))
    }

    pub async fn get(&self, task: TaskId) -> Option<TaskRecord> {
        self.tasks.read().await.get(&task).copied()
    }
}

#[async_trait]
impl TaskStore for InMemoryTaskStore {
    async fn task_exists(&self, task: TaskId) -> Result<bool, StoreError> {
        Ok(self.tasks.read().await.contains_key(&task))
    }

    async fn get_status(&self, task: TaskId) -> Result<Option<TaskStatus>, StoreError> {
        Ok(self.tasks.read().await.get(&task).map(|r| r.status))
    }

    async fn get_assignee(&self, task: TaskId) -> Result<Option<UserId>, StoreError> {
        Ok(self.tasks.read().await.get(&task).and_then(|r| r.assignee))
    }

    async fn delete_task(&self, task: TaskId) -> Result<bool, StoreError> {
        Ok(self.tasks.write().await.remove(&task).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn set_status_returns_previous() {
        let store = InMemoryTaskStore::new();
        let task = TaskId::random();
        store.insert(task, TaskStatus::Todo, None).await;

        assert_eq!(
            store.set_status(task, TaskStatus::Completed).await,
            Some(TaskStatus::Todo)
        );
        assert_eq!(
            store.get_status(task).await.unwrap(),
            Some(TaskStatus::Completed)
        );
        assert_eq!(store.set_status(TaskId::random(), TaskStatus::Todo).await, None);
    }

    #[tokio::test]
    async fn delete_task_reports_existence() {
        let store = InMemoryTaskStore::new();
        let task = TaskId::random();
        store.insert(task, TaskStatus::Todo, Some(UserId::random())).await;

        assert!(store.delete_task(task).await.unwrap());
        assert!(!store.delete_task(task).await.unwrap());
        assert!(!store.task_exists(task).await.unwrap());
    }
}
