//! Metric samples, the bounded per-queue history, and the timer that fills it.

pub mod collector;
pub mod persistence;
pub mod series;
pub mod store;

use serde::{Deserialize, Serialize};

use crate::adapters::StateCounts;

pub use collector::{CollectorConfig, CollectorStatus, MetricsCollector, TickReport};
pub use series::MetricSeries;
pub use store::AggregationStore;

/// One timestamped snapshot of per-state job counts for a queue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricSample {
    pub queue_name: String,
    /// Unix milliseconds.
    pub timestamp: u64,
    pub counts_by_state: StateCounts,
}

impl MetricSample {
    pub fn new(queue_name: impl Into<String>, timestamp: u64, counts_by_state: StateCounts) -> Self {
        Self {
            queue_name: queue_name.into(),
            timestamp,
            counts_by_state,
        }
    }
}
