//! NotificationSink port - 通知の送り先
//!
//! fire-and-forget。配送失敗はシンク側の責務で、依存グラフの正しさには影響しません。

use async_trait::async_trait;

use crate::domain::{DependencyNotification, NotifyError};

#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn send(&self, notification: DependencyNotification) -> Result<(), NotifyError>;
}
