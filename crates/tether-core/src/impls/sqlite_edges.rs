//! SQLite edge store.
//!
//! - 書き込みは `BEGIN IMMEDIATE`：循環チェックの読み取り前に write lock を取る
//! - rusqlite は同期 API なので `spawn_blocking` で async context から呼ぶ
//! - ID は `<prefix><ULID>`、`created_at` は RFC 3339 文字列で保存

use std::collections::BTreeSet;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, TransactionBehavior, params};
use tracing::debug;

use crate::domain::ids::{Id, IdMarker};
use crate::domain::{DependencyEdge, DependencyError, EdgeId, ParseIdError, StoreError, TaskId};
use crate::graph::CycleGuard;
use crate::ports::{EdgeGraph, EdgeStore};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS task_dependencies (
    id          TEXT PRIMARY KEY,
    from_task   TEXT NOT NULL,
    to_task     TEXT NOT NULL,
    created_at  TEXT NOT NULL,
    UNIQUE (from_task, to_task),
    CHECK (from_task <> to_task)
);
CREATE INDEX IF NOT EXISTS idx_task_dependencies_from ON task_dependencies (from_task);
CREATE INDEX IF NOT EXISTS idx_task_dependencies_to ON task_dependencies (to_task);
";

const EDGE_COLUMNS: &str = "id, from_task, to_task, created_at";

#[derive(Clone)]
pub struct SqliteEdgeStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteEdgeStore {
    pub fn open(path: impl AsRef<Path>, busy_timeout: Duration) -> Result<Self, StoreError> {
        let conn = Connection::open(path.as_ref())?;
        conn.busy_timeout(busy_timeout)?;
        debug!(path = %path.as_ref().display(), "opened sqlite edge store");
        Self::from_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Run `f` against the connection on the blocking pool.
    async fn with_conn<T, E, F>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&mut Connection) -> Result<T, E> + Send + 'static,
        T: Send + 'static,
        E: From<StoreError> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let mut guard = conn.lock().map_err(|_| E::from(StoreError::Poisoned))?;
            f(&mut *guard)
        })
        .await
        .map_err(|e| E::from(StoreError::Join(e.to_string())))?
    }
}

/// Adjacency view over a connection (or an open transaction, via deref).
struct SqlGraph<'c>(&'c Connection);

impl EdgeGraph for SqlGraph<'_> {
    fn outgoing(&self, task: TaskId) -> Result<Vec<TaskId>, StoreError> {
        let mut stmt = self
            .0
            .prepare_cached("SELECT to_task FROM task_dependencies WHERE from_task = ?1")?;
        let rows = stmt.query_map(params![task.to_string()], |row| row.get::<_, String>(0))?;
        rows.map(|raw| parse_id(&raw?)).collect()
    }
}

fn parse_id<T: IdMarker>(raw: &str) -> Result<Id<T>, StoreError> {
    raw.parse()
        .map_err(|e: ParseIdError| StoreError::Corrupt(e.to_string()))
}

type RawEdge = (String, String, String, String);

fn raw_edge(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawEdge> {
    Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?))
}

fn to_edge((id, from, to, created_at): RawEdge) -> Result<DependencyEdge, StoreError> {
    let created_at = DateTime::parse_from_rfc3339(&created_at)
        .map_err(|e| StoreError::Corrupt(format!("created_at '{created_at}': {e}")))?
        .with_timezone(&Utc);
    Ok(DependencyEdge::new(
        parse_id(&id)?,
        parse_id(&from)?,
        parse_id(&to)?,
        created_at,
    ))
}

fn task_set(conn: &Connection, sql: &str, task: TaskId) -> Result<BTreeSet<TaskId>, StoreError> {
    let mut stmt = conn.prepare_cached(sql)?;
    let rows = stmt.query_map(params![task.to_string()], |row| row.get::<_, String>(0))?;
    rows.map(|raw| parse_id(&raw?)).collect()
}

#[async_trait]
impl EdgeStore for SqliteEdgeStore {
    async fn create(
        &self,
        edge: DependencyEdge,
        guard: &CycleGuard,
    ) -> Result<DependencyEdge, DependencyError> {
        let guard = *guard;
        self.with_conn(move |conn| {
            if edge.from == edge.to {
                return Err(DependencyError::InvalidEdge { task: edge.from });
            }
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            let exists: bool = tx.query_row(
                "SELECT EXISTS (SELECT 1 FROM task_dependencies WHERE from_task = ?1 AND to_task = ?2)",
                params![edge.from.to_string(), edge.to.to_string()],
                |row| row.get(0),
            )?;
            if exists {
                return Err(DependencyError::DuplicateEdge {
                    from: edge.from,
                    to: edge.to,
                });
            }
            guard.check(&SqlGraph(&tx), edge.from, edge.to)?;
            tx.execute(
                "INSERT INTO task_dependencies (id, from_task, to_task, created_at) VALUES (?1, ?2, ?3, ?4)",
                params![
                    edge.id.to_string(),
                    edge.from.to_string(),
                    edge.to.to_string(),
                    edge.created_at.to_rfc3339(),
                ],
            )?;
            tx.commit()?;
            Ok(edge)
        })
        .await
    }

    async fn delete(&self, edge: EdgeId) -> Result<usize, StoreError> {
        self.with_conn(move |conn| {
            let removed = conn.execute(
                "DELETE FROM task_dependencies WHERE id = ?1",
                params![edge.to_string()],
            )?;
            Ok(removed)
        })
        .await
    }

    async fn delete_all_for_task(&self, task: TaskId) -> Result<usize, StoreError> {
        self.with_conn(move |conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            let removed = tx.execute(
                "DELETE FROM task_dependencies WHERE from_task = ?1 OR to_task = ?1",
                params![task.to_string()],
            )?;
            tx.commit()?;
            Ok(removed)
        })
        .await
    }

    async fn list_outgoing(&self, task: TaskId) -> Result<BTreeSet<TaskId>, StoreError> {
        self.with_conn(move |conn| {
            task_set(
                conn,
                "SELECT to_task FROM task_dependencies WHERE from_task = ?1",
                task,
            )
        })
        .await
    }

    async fn list_incoming(&self, task: TaskId) -> Result<BTreeSet<TaskId>, StoreError> {
        self.with_conn(move |conn| {
            task_set(
                conn,
                "SELECT from_task FROM task_dependencies WHERE to_task = ?1",
                task,
            )
        })
        .await
    }

    async fn get(&self, edge: EdgeId) -> Result<Option<DependencyEdge>, StoreError> {
        self.with_conn(move |conn| {
            let raw = conn
                .query_row(
                    &format!("SELECT {EDGE_COLUMNS} FROM task_dependencies WHERE id = ?1"),
                    params![edge.to_string()],
                    raw_edge,
                )
                .optional()?;
            raw.map(to_edge).transpose()
        })
        .await
    }

    async fn find(&self, from: TaskId, to: TaskId) -> Result<Option<DependencyEdge>, StoreError> {
        self.with_conn(move |conn| {
            let raw = conn
                .query_row(
                    &format!(
                        "SELECT {EDGE_COLUMNS} FROM task_dependencies WHERE from_task = ?1 AND to_task = ?2"
                    ),
                    params![from.to_string(), to.to_string()],
                    raw_edge,
                )
                .optional()?;
            raw.map(to_edge).transpose()
        })
        .await
    }

    async fn all_edges(&self) -> Result<Vec<DependencyEdge>, StoreError> {
        self.with_conn(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {EDGE_COLUMNS} FROM task_dependencies ORDER BY created_at, id"
            ))?;
            let rows = stmt.query_map([], raw_edge)?;
            rows.map(|raw| to_edge(raw?)).collect()
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn edge(from: TaskId, to: TaskId) -> DependencyEdge {
        DependencyEdge::new(EdgeId::random(), from, to, Utc::now())
    }

    #[tokio::test]
    async fn create_and_query_round_trip() {
        let store = SqliteEdgeStore::open_in_memory().unwrap();
        let a = TaskId::random();
        let b = TaskId::random();

        let created = store.create(edge(a, b), &CycleGuard::new()).await.unwrap();

        let fetched = store.get(created.id).await.unwrap().expect("edge");
        assert_eq!(fetched.id, created.id);
        assert_eq!((fetched.from, fetched.to), (a, b));
        assert_eq!(store.list_outgoing(a).await.unwrap(), BTreeSet::from([b]));
        assert_eq!(store.list_incoming(b).await.unwrap(), BTreeSet::from([a]));
    }

    #[tokio::test]
    async fn transitive_cycle_is_rejected_and_nothing_is_written() {
        let store = SqliteEdgeStore::open_in_memory().unwrap();
        let [a, b, c] = std::array::from_fn(|_| TaskId::random());
        let guard = CycleGuard::new();
        store.create(edge(a, b), &guard).await.unwrap();
        store.create(edge(b, c), &guard).await.unwrap();

        let err = store.create(edge(c, a), &guard).await.unwrap_err();

        assert!(matches!(err, DependencyError::CircularDependency { .. }));
        assert_eq!(store.all_edges().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn duplicate_and_self_edges_are_rejected() {
        let store = SqliteEdgeStore::open_in_memory().unwrap();
        let a = TaskId::random();
        let b = TaskId::random();
        let guard = CycleGuard::new();
        store.create(edge(a, b), &guard).await.unwrap();

        let dup = store.create(edge(a, b), &guard).await.unwrap_err();
        let selfie = store.create(edge(a, a), &guard).await.unwrap_err();

        assert!(matches!(dup, DependencyError::DuplicateEdge { .. }));
        assert!(matches!(selfie, DependencyError::InvalidEdge { .. }));
    }

    #[tokio::test]
    async fn cascade_and_idempotent_delete() {
        let store = SqliteEdgeStore::open_in_memory().unwrap();
        let [a, b, c] = std::array::from_fn(|_| TaskId::random());
        let guard = CycleGuard::new();
        let ab = store.create(edge(a, b), &guard).await.unwrap();
        store.create(edge(c, b), &guard).await.unwrap();

        assert_eq!(store.delete(ab.id).await.unwrap(), 1);
        assert_eq!(store.delete(ab.id).await.unwrap(), 0);
        assert_eq!(store.delete_all_for_task(b).await.unwrap(), 1);
        assert!(store.all_edges().await.unwrap().is_empty());
    }

    #[test]
    fn both_endpoints_are_indexed() {
        let store = SqliteEdgeStore::open_in_memory().unwrap();
        let conn = store.conn.lock().unwrap();
        let mut stmt = conn
            .prepare("SELECT name FROM sqlite_master WHERE type = 'index' AND tbl_name = 'task_dependencies'")
            .unwrap();
        let names: Vec<String> = stmt
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();

        assert!(names.iter().any(|n| n == "idx_task_dependencies_from"));
        assert!(names.iter().any(|n| n == "idx_task_dependencies_to"));
    }

    #[tokio::test]
    async fn edges_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("deps.sqlite");
        let a = TaskId::random();
        let b = TaskId::random();
        {
            let store = SqliteEdgeStore::open(&path, Duration::from_secs(1)).unwrap();
            store.create(edge(a, b), &CycleGuard::new()).await.unwrap();
        }

        let reopened = SqliteEdgeStore::open(&path, Duration::from_secs(1)).unwrap();
        assert!(reopened.find(a, b).await.unwrap().is_some());
    }
}
