use std::future::Future;
use std::path::Path;

use chrono::Utc;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::error::Result;
use crate::graph::{NodeRecord, Roster};

/// External coordinate storage. One row per node; the engine only ever
/// upserts, never deletes.
pub trait CoordinateStore: Send + Sync + 'static {
    fn save(&self, node_id: &str, x: f32, y: f32) -> impl Future<Output = Result<()>> + Send;
    fn load_all(&self) -> impl Future<Output = Result<Vec<StoredCoordinate>>> + Send;
}

#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct StoredCoordinate {
    pub node_id: String,
    pub x: f32,
    pub y: f32,
}

/// Merge stored coordinates into a roster's node records before a refresh,
/// so restored pins land where the store says.
pub fn apply_stored_coordinates(roster: &mut Roster, stored: &[StoredCoordinate]) {
    for NodeRecord {
        id,
        persisted_x,
        persisted_y,
        ..
    } in &mut roster.nodes
    {
        if let Some(found) = stored.iter().find(|c| &c.node_id == id) {
            *persisted_x = Some(found.x);
            *persisted_y = Some(found.y);
        }
    }
}

#[derive(Debug, Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let options = SqliteConnectOptions::new()
            .filename(path.as_ref())
            .create_if_missing(true);
        let pool = SqlitePool::connect_with(options).await?;
        let store = Self { pool };
        store.run_migrations().await?;
        Ok(store)
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    async fn run_migrations(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS node_positions (
                node_id TEXT PRIMARY KEY NOT NULL,
                x REAL NOT NULL,
                y REAL NOT NULL,
                updated_at TEXT NOT NULL DEFAULT (datetime('now'))
            )
        "#,
        )
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

impl CoordinateStore for SqliteStore {
    async fn save(&self, node_id: &str, x: f32, y: f32) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO node_positions (node_id, x, y, updated_at)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(node_id) DO UPDATE SET
                x = excluded.x,
                y = excluded.y,
                updated_at = excluded.updated_at
        "#,
        )
        .bind(node_id)
        .bind(x)
        .bind(y)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn load_all(&self) -> Result<Vec<StoredCoordinate>> {
        let rows: Vec<StoredCoordinate> =
            sqlx::query_as("SELECT node_id, x, y FROM node_positions ORDER BY node_id")
                .fetch_all(&self.pool)
                .await?;
        Ok(rows)
    }
}

#[derive(Debug)]
struct SaveRequest {
    node_id: String,
    x: f32,
    y: f32,
}

/// Fire-and-forget coordinate writes. All requests drain through a single
/// worker task, so the store observes each node's saves in drag-completion
/// order; failures are logged and the in-memory pin stays authoritative.
#[derive(Debug, Clone)]
pub struct PersistenceGateway {
    tx: mpsc::UnboundedSender<SaveRequest>,
}

impl PersistenceGateway {
    /// Spawn the worker on the current tokio runtime. The handle resolves
    /// once every sender clone is dropped and the queue has drained.
    pub fn spawn<S: CoordinateStore>(store: S) -> (Self, JoinHandle<()>) {
        let (tx, mut rx) = mpsc::unbounded_channel::<SaveRequest>();
        let handle = tokio::spawn(async move {
            while let Some(request) = rx.recv().await {
                if let Err(error) = store.save(&request.node_id, request.x, request.y).await {
                    tracing::warn!(
                        node = %request.node_id,
                        %error,
                        "coordinate save failed; keeping the local pin"
                    );
                }
            }
        });
        (Self { tx }, handle)
    }

    /// Enqueue a save. Never blocks; a dead worker is logged, not an error.
    pub fn persist(&self, node_id: &str, x: f32, y: f32) {
        let request = SaveRequest {
            node_id: node_id.to_string(),
            x,
            y,
        };
        if self.tx.send(request).is_err() {
            tracing::warn!(node = %node_id, "coordinate store worker is gone; dropping save");
        }
    }
}
