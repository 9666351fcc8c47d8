//! Queue adapters: one read-only query surface over Bull and BullMQ queues.
//!
//! Callers hold an `Arc<dyn QueueAdapter>` and never learn which backend is in
//! use. Both backends read the same Redis keyspace family through the
//! [`QueueStore`] capability; they differ only in key layout and job hash
//! field names (see [`keyspace`]).

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{MonitorError, MonitorResult};

pub mod keyspace;
pub mod memory_store;
pub mod queue_adapter;
pub mod redis_store;
pub mod store;

pub use keyspace::{BullLayout, BullMqLayout, KeyLayout, Segment};
pub use memory_store::MemoryQueueStore;
pub use queue_adapter::{BullAdapter, BullMqAdapter, LayoutAdapter};
pub use redis_store::RedisQueueStore;
pub use store::QueueStore;

pub const DEFAULT_KEY_PREFIX: &str = "bull";

// ==========================================
// JOB STATE
// ==========================================

/// Mutually exclusive lifecycle stages a job can be observed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobState {
    Waiting,
    Active,
    Completed,
    Failed,
    Delayed,
}

impl JobState {
    pub const ALL: [JobState; 5] = [
        JobState::Waiting,
        JobState::Active,
        JobState::Completed,
        JobState::Failed,
        JobState::Delayed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            JobState::Waiting => "waiting",
            JobState::Active => "active",
            JobState::Completed => "completed",
            JobState::Failed => "failed",
            JobState::Delayed => "delayed",
        }
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobState {
    type Err = MonitorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "waiting" | "wait" => Ok(JobState::Waiting),
            "active" => Ok(JobState::Active),
            "completed" => Ok(JobState::Completed),
            "failed" => Ok(JobState::Failed),
            "delayed" => Ok(JobState::Delayed),
            other => Err(MonitorError::InvalidState(other.to_string())),
        }
    }
}

/// Per-state job counts. Every state is present, zero when empty.
pub type StateCounts = BTreeMap<JobState, u64>;

pub fn zeroed_counts() -> StateCounts {
    JobState::ALL.iter().map(|s| (*s, 0)).collect()
}

// ==========================================
// HANDLES & SUMMARIES
// ==========================================

/// Identifies one monitored queue inside the Redis keyspace.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct QueueHandle {
    pub name: String,
    pub prefix: String,
}

impl QueueHandle {
    pub fn new(name: impl Into<String>, prefix: Option<&str>) -> Self {
        Self {
            name: name.into(),
            prefix: prefix
                .map(str::trim)
                .filter(|p| !p.is_empty())
                .unwrap_or(DEFAULT_KEY_PREFIX)
                .to_string(),
        }
    }

    /// `<prefix>:<queue>:<suffix>`, e.g. `bull:emails:wait`.
    pub fn key(&self, suffix: &str) -> String {
        format!("{}:{}:{}", self.prefix, self.name, suffix)
    }

    /// Job hashes live next to the state keys, keyed by job id.
    pub fn job_key(&self, id: &str) -> String {
        self.key(id)
    }
}

/// Read-only projection of a job, fetched on demand.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobSummary {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub state: JobState,
    pub timestamp: u64,
    pub attempts: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    Bull,
    BullMq,
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendKind::Bull => f.write_str("bull"),
            BackendKind::BullMq => f.write_str("bullmq"),
        }
    }
}

// ==========================================
// ADAPTER TRAIT
// ==========================================

#[async_trait]
pub trait QueueAdapter: Send + Sync {
    fn kind(&self) -> BackendKind;

    /// Registered queues, in configuration order.
    fn list_queues(&self) -> Vec<QueueHandle>;

    fn handle(&self, name: &str) -> Option<QueueHandle> {
        self.list_queues().into_iter().find(|h| h.name == name)
    }

    /// Fails with `Connection` if the backing store is unreachable.
    async fn counts(&self, handle: &QueueHandle) -> MonitorResult<StateCounts>;

    /// Newest first. Fails with `InvalidRange` if `offset < 0` or `limit <= 0`.
    async fn fetch_jobs(
        &self,
        handle: &QueueHandle,
        state: JobState,
        offset: i64,
        limit: i64,
    ) -> MonitorResult<Vec<JobSummary>>;

    async fn fetch_job(&self, handle: &QueueHandle, id: &str) -> MonitorResult<Option<JobSummary>>;
}

/// Checks caller-supplied pagination and converts it to store indices.
pub fn validate_range(offset: i64, limit: i64) -> MonitorResult<(u64, u64)> {
    if offset < 0 {
        return Err(MonitorError::InvalidRange(format!(
            "offset must be >= 0, got {}",
            offset
        )));
    }
    if limit <= 0 {
        return Err(MonitorError::InvalidRange(format!(
            "limit must be > 0, got {}",
            limit
        )));
    }
    Ok((offset as u64, limit as u64))
}

/// Builds the adapter for the configured backend over the given store.
pub fn build_adapter(
    kind: BackendKind,
    store: Arc<dyn QueueStore>,
    queue_names: &[String],
    prefix: Option<&str>,
) -> Arc<dyn QueueAdapter> {
    let handles: Vec<QueueHandle> = queue_names
        .iter()
        .map(|name| QueueHandle::new(name.clone(), prefix))
        .collect();

    match kind {
        BackendKind::Bull => Arc::new(BullAdapter::new(store, handles)),
        BackendKind::BullMq => Arc::new(BullMqAdapter::new(store, handles)),
    }
}
