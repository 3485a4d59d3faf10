//! End-to-end walk through the dependency lifecycle with in-memory collaborators.

use std::sync::Arc;

use tether_core::app::{EngineBuilder, EngineConfig};
use tether_core::domain::{DependencyError, TaskId, TaskStatus, UserId};
use tether_core::impls::{InMemoryTaskStore, RecordingSink};

#[tokio::test]
async fn cycle_rejected_then_completion_unblocks_exactly_one_task() {
    let tasks = InMemoryTaskStore::new();
    let [a, b, c, d] = std::array::from_fn(|_| TaskId::random());
    let alice = UserId::random();
    tasks.insert(a, TaskStatus::Todo, Some(alice)).await;
    tasks.insert(b, TaskStatus::InProgress, Some(UserId::random())).await;
    tasks.insert(c, TaskStatus::Todo, None).await;
    tasks.insert(d, TaskStatus::Todo, Some(UserId::random())).await;

    let sink = RecordingSink::new();
    let app = EngineBuilder::new(EngineConfig::default())
        .task_store(Arc::new(tasks.clone()))
        .notification_sink(Arc::new(sink.clone()))
        .build()
        .unwrap();
    let engine = &app.engine;

    engine.add_dependency(a, b).await.unwrap();
    engine.add_dependency(b, c).await.unwrap();
    let err = engine.add_dependency(c, a).await.unwrap_err();
    assert!(matches!(err, DependencyError::CircularDependency { .. }));
    assert_eq!(err.kind().http_status(), 409);

    // D waits on C, which stays open.
    engine.add_dependency(d, c).await.unwrap();

    assert!(engine.is_blocked(a).await.unwrap());

    let old = tasks.set_status(b, TaskStatus::Completed).await;
    let report = app
        .lifecycle
        .task_status_changed(b, old, TaskStatus::Completed)
        .await
        .unwrap()
        .expect("completion propagated");

    assert!(!engine.is_blocked(a).await.unwrap());
    assert!(engine.is_blocked(d).await.unwrap());
    assert_eq!(report.unblocked, vec![a]);

    let sent = sink.sent().await;
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].recipient, alice);
    assert_eq!(sent[0].task, a);
    assert_eq!(sent[0].completed_dependency, b);

    // Same event again: nothing new.
    app.lifecycle.on_task_completed(b).await.unwrap();
    assert_eq!(sink.len().await, 1);
}

#[tokio::test]
async fn deleting_a_task_leaves_no_edge_behind() {
    let tasks = InMemoryTaskStore::new();
    let [a, b, c] = std::array::from_fn(|_| TaskId::random());
    for t in [a, b, c] {
        tasks.insert(t, TaskStatus::Todo, None).await;
    }
    let app = EngineBuilder::new(EngineConfig::default())
        .task_store(Arc::new(tasks.clone()))
        .build()
        .unwrap();
    app.engine.add_dependency(a, b).await.unwrap();
    app.engine.add_dependency(b, c).await.unwrap();
    app.engine.add_dependency(a, c).await.unwrap();

    app.lifecycle.delete_task(c).await.unwrap();

    for t in [a, b, c] {
        assert!(!app.engine.get_dependencies(t).await.unwrap().contains(&c));
        assert!(!app.engine.get_dependents(t).await.unwrap().contains(&c));
    }
    assert!(app.engine.get_dependents(c).await.unwrap().is_empty());
    let err = app.engine.add_dependency(a, c).await.unwrap_err();
    assert!(matches!(err, DependencyError::UnknownTask { task } if task == c));
}
