//! Notification sinks for development and tests.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::info;

use crate::domain::{DependencyNotification, NotifyError};
use crate::ports::NotificationSink;

/// Keeps every delivered notification in memory.
#[derive(Clone, Default)]
pub struct RecordingSink {
    sent: Arc<Mutex<Vec<DependencyNotification>>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn sent(&self) -> Vec<DependencyNotification> {
        self.sent.lock().await.clone()
    }

    pub async fn len(&self) -> usize {
        self.sent.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sent.lock().await.is_empty()
    }
}

#[async_trait]
impl NotificationSink for RecordingSink {
    async fn send(&self, notification: DependencyNotification) -> Result<(), NotifyError> {
        self.sent.lock().await.push(notification);
        Ok(())
    }
}

/// Writes notifications to the log and nowhere else.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

#[async_trait]
impl NotificationSink for TracingSink {
    async fn send(&self, notification: DependencyNotification) -> Result<(), NotifyError> {
        info!(
            recipient = %notification.recipient,
            task = %notification.task,
            completed_dependency = %notification.completed_dependency,
            kind = ?notification.kind,
            "{}",
            notification.message
        );
        Ok(())
    }
}
