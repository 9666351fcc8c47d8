//! Periodic sampler: `Idle -> Running -> Stopped`, restartable.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures_util::future::join_all;
use parking_lot::Mutex;
use serde::Serialize;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::{AggregationStore, MetricSample};
use crate::adapters::QueueAdapter;
use crate::utils::current_time_ms;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CollectorConfig {
    pub interval: Duration,
    pub max_samples: usize,
}

impl CollectorConfig {
    pub fn new(interval_seconds: u64, max_samples: usize) -> Self {
        Self {
            interval: Duration::from_secs(interval_seconds.max(1)),
            max_samples: max_samples.max(1),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CollectorStatus {
    Idle,
    Running,
    Stopped,
}

/// Outcome of one tick across all registered queues.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    pub sampled: usize,
    pub failed: usize,
}

enum CollectorState {
    Idle,
    Running {
        cancel: CancellationToken,
        task: JoinHandle<()>,
    },
    Stopped,
}

pub struct MetricsCollector {
    adapter: Arc<dyn QueueAdapter>,
    store: Arc<AggregationStore>,
    state: Mutex<CollectorState>,
    // Held for a whole tick: a restarted timer waits for a tick still
    // finishing on the previous one.
    tick_lock: tokio::sync::Mutex<()>,
    ticks: AtomicU64,
    failures: AtomicU64,
}

impl MetricsCollector {
    pub fn new(adapter: Arc<dyn QueueAdapter>, store: Arc<AggregationStore>) -> Self {
        Self {
            adapter,
            store,
            state: Mutex::new(CollectorState::Idle),
            tick_lock: tokio::sync::Mutex::new(()),
            ticks: AtomicU64::new(0),
            failures: AtomicU64::new(0),
        }
    }

    pub fn status(&self) -> CollectorStatus {
        match &*self.state.lock() {
            CollectorState::Idle => CollectorStatus::Idle,
            CollectorState::Running { .. } => CollectorStatus::Running,
            CollectorState::Stopped => CollectorStatus::Stopped,
        }
    }

    pub fn ticks(&self) -> u64 {
        self.ticks.load(Ordering::Relaxed)
    }

    pub fn failures(&self) -> u64 {
        self.failures.load(Ordering::Relaxed)
    }

    /// Starts the timer task. The first tick fires immediately; a tick that
    /// overruns the interval causes the missed ones to be skipped. Returns
    /// `false` if already running.
    pub fn start(self: &Arc<Self>, config: CollectorConfig) -> bool {
        let mut state = self.state.lock();
        if let CollectorState::Running { task, .. } = &*state {
            if !task.is_finished() {
                return false;
            }
        }

        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let collector = Arc::clone(self);
        let task = tokio::spawn(async move {
            let mut interval = tokio::time::interval(config.interval);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = interval.tick() => {
                        collector.sample_once().await;
                    }
                }
            }
            debug!("metrics collector timer exited");
        });

        info!(
            interval_secs = config.interval.as_secs(),
            max_samples = config.max_samples,
            queues = self.adapter.list_queues().len(),
            "📈 metrics collector started"
        );
        *state = CollectorState::Running { cancel, task };
        true
    }

    /// Cancels the timer. A tick already in progress finishes its appends.
    /// Safe to call repeatedly and before `start`.
    pub fn stop(&self) {
        let mut state = self.state.lock();
        if let CollectorState::Running { cancel, .. } = &*state {
            cancel.cancel();
            info!("metrics collector stopped");
        }
        *state = CollectorState::Stopped;
    }

    /// Samples every registered queue once. A failing queue is logged and
    /// skipped; the others still get their sample. Ticks never overlap.
    pub async fn sample_once(&self) -> TickReport {
        let _tick = self.tick_lock.lock().await;
        let handles = self.adapter.list_queues();
        let timestamp = current_time_ms();

        let results = join_all(handles.iter().map(|handle| self.adapter.counts(handle))).await;

        let mut report = TickReport::default();
        for (handle, result) in handles.iter().zip(results) {
            match result {
                Ok(counts) => {
                    let sample = MetricSample::new(handle.name.clone(), timestamp, counts);
                    if self.store.append(&handle.name, sample) {
                        report.sampled += 1;
                    }
                }
                Err(e) => {
                    report.failed += 1;
                    warn!(queue = %handle.name, error = %e, "metrics sample skipped");
                }
            }
        }

        self.ticks.fetch_add(1, Ordering::Relaxed);
        self.failures.fetch_add(report.failed as u64, Ordering::Relaxed);
        debug!(sampled = report.sampled, failed = report.failed, "metrics tick complete");
        report
    }
}
