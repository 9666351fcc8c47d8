#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use bullscope::adapters::{
    build_adapter, zeroed_counts, BackendKind, BullAdapter, JobState, JobSummary,
    MemoryQueueStore, QueueAdapter, QueueHandle, StateCounts,
};
use bullscope::error::{MonitorError, MonitorResult};
use bullscope::metrics::{CollectorConfig, MetricSample};
use bullscope::MonitorEngine;

/// Engine over an in-memory keyspace. Collection is configured but not
/// started; tests drive ticks through `sample_once`.
pub fn setup_engine(queues: &[&str], max_samples: usize) -> (MonitorEngine, Arc<MemoryQueueStore>) {
    let store = Arc::new(MemoryQueueStore::new());
    let names: Vec<String> = queues.iter().map(|q| q.to_string()).collect();
    let adapter = build_adapter(BackendKind::Bull, store.clone(), &names, None);
    let engine = MonitorEngine::new(adapter, Some(CollectorConfig::new(60, max_samples)), None);
    (engine, store)
}

/// Pushes `count` waiting jobs onto a Bull queue, ids `1..=count`, the
/// highest id ending up at the head of the list.
pub fn seed_waiting(store: &MemoryQueueStore, queue: &str, count: usize) {
    let handle = QueueHandle::new(queue, None);
    for i in 1..=count {
        let id = i.to_string();
        let ts = (1_700_000_000_000 + i as u64 * 1000).to_string();
        store.list_push(&handle.key("wait"), &id);
        store.hash_set(
            &handle.job_key(&id),
            &[("name", "send"), ("timestamp", ts.as_str()), ("attemptsMade", "0")],
        );
    }
}

pub fn seed_failed(store: &MemoryQueueStore, queue: &str, id: &str, attempts: u32) {
    let handle = QueueHandle::new(queue, None);
    let attempts = attempts.to_string();
    store.sorted_set_add(&handle.key("failed"), 1_700_000_000_000.0, id);
    store.hash_set(
        &handle.job_key(id),
        &[("name", "send"), ("timestamp", "1700000000000"), ("attemptsMade", attempts.as_str())],
    );
}

pub fn sample(queue: &str, timestamp: u64, waiting: u64) -> MetricSample {
    let mut counts = zeroed_counts();
    counts.insert(JobState::Waiting, waiting);
    MetricSample::new(queue, timestamp, counts)
}

/// Adapter whose `counts` fails for the listed queues.
pub struct FlakyAdapter {
    inner: BullAdapter,
    broken: HashSet<String>,
}

impl FlakyAdapter {
    pub fn new(queues: &[&str], broken: &[&str]) -> Self {
        let store = Arc::new(MemoryQueueStore::new());
        let handles = queues.iter().map(|q| QueueHandle::new(*q, None)).collect();
        Self {
            inner: BullAdapter::new(store, handles),
            broken: broken.iter().map(|q| q.to_string()).collect(),
        }
    }
}

#[async_trait]
impl QueueAdapter for FlakyAdapter {
    fn kind(&self) -> BackendKind {
        self.inner.kind()
    }

    fn list_queues(&self) -> Vec<QueueHandle> {
        self.inner.list_queues()
    }

    async fn counts(&self, handle: &QueueHandle) -> MonitorResult<StateCounts> {
        if self.broken.contains(&handle.name) {
            return Err(MonitorError::Connection(format!("{} unreachable", handle.name)));
        }
        self.inner.counts(handle).await
    }

    async fn fetch_jobs(
        &self,
        handle: &QueueHandle,
        state: JobState,
        offset: i64,
        limit: i64,
    ) -> MonitorResult<Vec<JobSummary>> {
        self.inner.fetch_jobs(handle, state, offset, limit).await
    }

    async fn fetch_job(&self, handle: &QueueHandle, id: &str) -> MonitorResult<Option<JobSummary>> {
        self.inner.fetch_job(handle, id).await
    }
}

pub struct Benchmark {
    pub name: String,
    pub start: Instant,
    pub count: usize,
    pub samples: Vec<Duration>,
}

impl Benchmark {
    pub fn start(name: &str, count: usize) -> Self {
        Self {
            name: name.to_string(),
            start: Instant::now(),
            count,
            samples: Vec::with_capacity(count),
        }
    }

    pub fn record(&mut self, duration: Duration) {
        self.samples.push(duration);
    }

    pub fn stop(mut self) {
        let total_duration = self.start.elapsed();
        let ops_sec = self.count as f64 / total_duration.as_secs_f64();

        self.samples.sort();
        let len = self.samples.len();
        let pct = |p: usize| self.samples.get(len * p / 100).unwrap_or(&Duration::ZERO).as_micros();

        println!("\n{}", self.name);
        println!(" 🚀 Throughput:  {:.0} ops/sec", ops_sec);
        println!(" ⏱️  Total Time:  {:.2?}", total_duration);
        println!(" 📊 Latency (µs): p50: {} | p99: {}", pct(50), pct(99));
        println!(" 📦 Count:       {}\n", self.count);
    }
}
