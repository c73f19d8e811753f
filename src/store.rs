use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::baseline::RouteKey;
use crate::error::FareError;
use crate::model::PriceSnapshot;

/// Durable copy of recorded snapshots. Written after every recorded batch and
/// read only by the price-history path; the in-process tracker never reads it.
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    async fn append(&self, route_key: &RouteKey, items: &[PriceSnapshot]) -> Result<(), FareError>;

    /// Rows for `route_key` collected at or after `since`, oldest first.
    async fn history(
        &self,
        route_key: &RouteKey,
        since: DateTime<Utc>,
    ) -> Result<Vec<PriceSnapshot>, FareError>;
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredSnapshot {
    route_key: RouteKey,
    price: f64,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    collected_at: DateTime<Utc>,
}

/// Append-only JSON-lines file, one snapshot per line.
#[derive(Debug, Clone)]
pub struct JsonlSnapshotStore {
    path: PathBuf,
}

impl JsonlSnapshotStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

fn store_err(path: &std::path::Path, e: impl std::fmt::Display) -> FareError {
    FareError::Store(format!("{}: {e}", path.display()))
}

#[async_trait]
impl SnapshotStore for JsonlSnapshotStore {
    async fn append(&self, route_key: &RouteKey, items: &[PriceSnapshot]) -> Result<(), FareError> {
        if items.is_empty() {
            return Ok(());
        }

        let mut buf = String::new();
        for item in items {
            let row = StoredSnapshot {
                route_key: route_key.clone(),
                price: item.price,
                collected_at: item.collected_at,
            };
            buf.push_str(&serde_json::to_string(&row)?);
            buf.push('\n');
        }

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(|e| store_err(&self.path, e))?;
        file.write_all(buf.as_bytes())
            .await
            .map_err(|e| store_err(&self.path, e))?;
        file.flush().await.map_err(|e| store_err(&self.path, e))?;
        Ok(())
    }

    async fn history(
        &self,
        route_key: &RouteKey,
        since: DateTime<Utc>,
    ) -> Result<Vec<PriceSnapshot>, FareError> {
        let text = match tokio::fs::read_to_string(&self.path).await {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(store_err(&self.path, e)),
        };

        let mut rows: Vec<PriceSnapshot> = Vec::new();
        for (lineno, line) in text.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<StoredSnapshot>(line) {
                Ok(row) if &row.route_key == route_key && row.collected_at >= since => {
                    rows.push(PriceSnapshot {
                        price: row.price,
                        collected_at: row.collected_at,
                    });
                }
                Ok(_) => {}
                Err(e) => {
                    tracing::warn!(
                        path = %self.path.display(),
                        line = lineno + 1,
                        error = %e,
                        "skipping malformed snapshot row"
                    );
                }
            }
        }
        rows.sort_by_key(|s| s.collected_at);
        Ok(rows)
    }
}

type Batch = (RouteKey, Vec<PriceSnapshot>);

/// Non-blocking hand-off of recorded batches to a background task that
/// writes them to a [`SnapshotStore`]. Failed writes are logged and dropped.
#[derive(Debug)]
pub struct SnapshotWriter {
    tx: mpsc::UnboundedSender<Batch>,
    task: JoinHandle<()>,
}

impl SnapshotWriter {
    /// Must be called from within a tokio runtime.
    pub fn spawn(store: Arc<dyn SnapshotStore>) -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel::<Batch>();
        let task = tokio::spawn(async move {
            while let Some((route_key, items)) = rx.recv().await {
                if let Err(e) = store.append(&route_key, &items).await {
                    tracing::warn!(
                        route_key = %route_key,
                        count = items.len(),
                        error = %e,
                        "failed to persist price snapshots"
                    );
                }
            }
        });
        Self { tx, task }
    }

    pub fn dispatch(&self, route_key: RouteKey, items: Vec<PriceSnapshot>) {
        if items.is_empty() {
            return;
        }
        if self.tx.send((route_key, items)).is_err() {
            tracing::warn!("snapshot writer has stopped; dropping batch");
        }
    }

    /// Closes the queue and waits for queued batches to be written.
    pub async fn flush(self) {
        drop(self.tx);
        if let Err(e) = self.task.await {
            tracing::warn!(error = %e, "snapshot writer task failed");
        }
    }
}
