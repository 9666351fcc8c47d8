//! Best-effort durability for collected metrics.
//!
//! Accepted samples travel to a background writer over a bounded channel. The
//! writer keeps a capped tail per queue and flushes dirty tails through a
//! byte-oriented [`KvStore`]. Nothing here can block or fail an in-memory
//! append.

pub mod kv;
pub mod redis_kv;
pub mod sqlite;
pub mod types;
pub mod writer;

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

pub use kv::MemoryKv;
pub use redis_kv::RedisKv;
pub use sqlite::SqliteKv;
pub use types::StorageOp;

use super::MetricSample;
use crate::error::{MonitorError, MonitorResult};
use writer::{run_writer, WriterSettings};

/// Byte-oriented key-value capability used to persist series snapshots.
#[async_trait]
pub trait KvStore: Send + Sync {
    async fn get(&self, key: &str) -> MonitorResult<Option<Bytes>>;

    async fn set(&self, key: &str, value: Bytes) -> MonitorResult<()>;
}

#[derive(Debug, Clone)]
pub struct PersistenceConfig {
    pub key_prefix: String,
    pub flush_ms: u64,
    pub writer_channel_capacity: usize,
    pub writer_batch_size: usize,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            key_prefix: "bullscope:metrics".to_string(),
            flush_ms: 1000,
            writer_channel_capacity: 1024,
            writer_batch_size: 256,
        }
    }
}

pub fn series_key(prefix: &str, queue: &str) -> String {
    format!("{}:{}", prefix, queue)
}

pub fn encode_series(samples: &[MetricSample]) -> MonitorResult<Bytes> {
    Ok(Bytes::from(serde_json::to_vec(samples)?))
}

pub fn decode_series(raw: &[u8]) -> MonitorResult<Vec<MetricSample>> {
    Ok(serde_json::from_slice(raw)?)
}

pub struct MetricsPersistence {
    sender: mpsc::Sender<StorageOp>,
    kv: Arc<dyn KvStore>,
    key_prefix: String,
    writer: parking_lot::Mutex<Option<JoinHandle<()>>>,
}

impl MetricsPersistence {
    /// Spawns the writer task; must be called inside a tokio runtime.
    /// `max_samples` caps the tail the writer keeps per queue.
    pub fn new(kv: Arc<dyn KvStore>, config: PersistenceConfig, max_samples: usize) -> Self {
        let (tx, rx) = mpsc::channel(config.writer_channel_capacity.max(1));

        let writer = tokio::spawn(run_writer(
            rx,
            kv.clone(),
            WriterSettings {
                key_prefix: config.key_prefix.clone(),
                flush_ms: config.flush_ms,
                batch_size: config.writer_batch_size,
                max_samples,
            },
        ));

        Self {
            sender: tx,
            kv,
            key_prefix: config.key_prefix,
            writer: parking_lot::Mutex::new(Some(writer)),
        }
    }

    /// Queues one accepted sample for the next flush. Drops it with a
    /// warning when the writer is saturated or gone.
    pub fn record(&self, queue: &str, sample: MetricSample) {
        self.send_now(
            queue,
            StorageOp::Append {
                queue: queue.to_string(),
                sample,
            },
        );
    }

    /// Hands the restored series of `queue` to the writer so later flushes
    /// extend it instead of replacing it.
    pub fn seed(&self, queue: &str, samples: Vec<MetricSample>) {
        self.send_now(
            queue,
            StorageOp::Seed {
                queue: queue.to_string(),
                samples,
            },
        );
    }

    fn send_now(&self, queue: &str, op: StorageOp) {
        match self.sender.try_send(op) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(_)) => {
                tracing::warn!(queue, "metrics writer saturated; update dropped");
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                tracing::warn!(queue, "metrics writer closed; update dropped");
            }
        }
    }

    /// Reads back the persisted series for `queue`, empty when absent.
    pub async fn load(&self, queue: &str) -> MonitorResult<Vec<MetricSample>> {
        match self.kv.get(&series_key(&self.key_prefix, queue)).await? {
            Some(raw) => decode_series(&raw),
            None => Ok(Vec::new()),
        }
    }

    /// Forces dirty tails out and waits for the write to finish.
    pub async fn flush(&self) -> MonitorResult<()> {
        let (reply, rx) = oneshot::channel();
        self.sender
            .send(StorageOp::Flush { reply })
            .await
            .map_err(|_| MonitorError::Storage("metrics writer closed".to_string()))?;
        rx.await
            .map_err(|_| MonitorError::Storage("metrics writer dropped flush".to_string()))?
            .map_err(MonitorError::Storage)
    }

    /// Flushes and stops the writer. Later `record` calls are dropped.
    pub async fn shutdown(&self) {
        if let Err(e) = self.flush().await {
            tracing::warn!(error = %e, "final metrics flush failed");
        }
        let _ = self.sender.send(StorageOp::Stop).await;
        let handle = self.writer.lock().take();
        if let Some(handle) = handle {
            let _ = handle.await;
        }
    }
}
