//! EngineBuilder - 依存グラフエンジンの構築とワイヤリング
//!
//! # Fail-fast 設計
//! - TaskStore は外部の正本なので必ず注入が必要。無ければ build() が BuildError
//! - EdgeStore / NotificationSink は注入が無ければ EngineConfig から作る

use std::sync::Arc;

use tracing::info;

use super::config::{EngineConfig, SinkKind, StoreConfig};
use super::{CompletionPropagator, DependencyEngine, TaskLifecycle};
use crate::domain::StoreError;
use crate::impls::{InMemoryEdgeStore, RecordingSink, SqliteEdgeStore, TracingSink};
use crate::ports::{
    Clock, EdgeStore, IdGenerator, NotificationSink, SystemClock, TaskStore, UlidGenerator,
};

/// # 使用例
/// ```ignore
/// let app = EngineBuilder::new(config)
///     .task_store(Arc::new(tasks))
///     .build()?;
/// app.engine.add_dependency(a, b).await?;
/// ```
pub struct EngineBuilder {
    config: EngineConfig,
    tasks: Option<Arc<dyn TaskStore>>,
    edges: Option<Arc<dyn EdgeStore>>,
    sink: Option<Arc<dyn NotificationSink>>,
    clock: Option<Arc<dyn Clock>>,
}

#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("no task store configured; the dependency engine needs one to check task existence and status")]
    MissingTaskStore,

    #[error("opening edge store: {0}")]
    EdgeStore(#[from] StoreError),
}

impl EngineBuilder {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            tasks: None,
            edges: None,
            sink: None,
            clock: None,
        }
    }

    pub fn task_store(mut self, tasks: Arc<dyn TaskStore>) -> Self {
        self.tasks = Some(tasks);
        self
    }

    /// Overrides `config.store`.
    pub fn edge_store(mut self, edges: Arc<dyn EdgeStore>) -> Self {
        self.edges = Some(edges);
        self
    }

    /// Overrides `config.notifications.sink`.
    pub fn notification_sink(mut self, sink: Arc<dyn NotificationSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn build(self) -> Result<App, BuildError> {
        let tasks = self.tasks.ok_or(BuildError::MissingTaskStore)?;

        let edges: Arc<dyn EdgeStore> = match self.edges {
            Some(edges) => edges,
            None => match &self.config.store {
                StoreConfig::Memory => Arc::new(InMemoryEdgeStore::new()),
                StoreConfig::Sqlite { path, .. } => {
                    let timeout = self.config.store.busy_timeout().unwrap_or_default();
                    Arc::new(SqliteEdgeStore::open(path, timeout)?)
                }
            },
        };

        let mut recorded = None;
        let sink: Arc<dyn NotificationSink> = match self.sink {
            Some(sink) => sink,
            None => match self.config.notifications.sink {
                SinkKind::Tracing => Arc::new(TracingSink),
                SinkKind::Recording => {
                    let sink = RecordingSink::new();
                    recorded = Some(sink.clone());
                    Arc::new(sink)
                }
            },
        };

        let clock: Arc<dyn Clock> = self.clock.unwrap_or_else(|| Arc::new(SystemClock));
        let ids: Arc<dyn IdGenerator> = Arc::new(UlidGenerator::new(ClockRef(Arc::clone(&clock))));

        let engine = Arc::new(DependencyEngine::with_parts(
            Arc::clone(&tasks),
            edges,
            Arc::clone(&ids),
            Arc::clone(&clock),
        ));
        let mut propagator = CompletionPropagator::with_parts(
            Arc::clone(&engine),
            tasks,
            sink,
            ids,
            clock,
        );
        if !self.config.notifications.enabled {
            propagator = propagator.without_notifications();
        }
        let propagator = Arc::new(propagator);
        let lifecycle = TaskLifecycle::new(Arc::clone(&engine), Arc::clone(&propagator));

        info!(store = ?self.config.store, notifications = self.config.notifications.enabled, "dependency engine ready");
        Ok(App {
            engine,
            propagator,
            lifecycle,
            recorded,
        })
    }
}

/// Lets the id generator share the builder's clock.
struct ClockRef(Arc<dyn Clock>);

impl Clock for ClockRef {
    fn now(&self) -> chrono::DateTime<chrono::Utc> {
        self.0.now()
    }
}

/// The wired dependency subsystem.
pub struct App {
    pub engine: Arc<DependencyEngine>,
    pub propagator: Arc<CompletionPropagator>,
    pub lifecycle: TaskLifecycle,
    /// Present when notifications go to an in-memory `RecordingSink` built from config.
    pub recorded: Option<RecordingSink>,
}
