use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::RwLock;

use super::persistence::MetricsPersistence;
use super::{MetricSample, MetricSeries};

/// Owner of every queue's [`MetricSeries`].
///
/// Each series sits behind its own `RwLock`: an append (evict + insert) is a
/// single write-locked step, so `range` never sees a torn series. Queues do
/// not contend with each other.
pub struct AggregationStore {
    series: DashMap<String, Arc<RwLock<MetricSeries>>>,
    max_samples: usize,
    persistence: Option<Arc<MetricsPersistence>>,
}

impl AggregationStore {
    pub fn new(max_samples: usize) -> Self {
        Self {
            series: DashMap::new(),
            max_samples: max_samples.max(1),
            persistence: None,
        }
    }

    pub fn with_persistence(max_samples: usize, persistence: Arc<MetricsPersistence>) -> Self {
        Self {
            persistence: Some(persistence),
            ..Self::new(max_samples)
        }
    }

    pub fn max_samples(&self) -> usize {
        self.max_samples
    }

    pub fn persistence(&self) -> Option<&Arc<MetricsPersistence>> {
        self.persistence.as_ref()
    }

    fn series_for(&self, queue: &str) -> Arc<RwLock<MetricSeries>> {
        if let Some(existing) = self.series.get(queue) {
            return existing.value().clone();
        }
        self.series
            .entry(queue.to_string())
            .or_insert_with(|| Arc::new(RwLock::new(MetricSeries::new(self.max_samples))))
            .value()
            .clone()
    }

    /// Appends to `queue`'s series, evicting the oldest sample beyond the cap.
    /// Returns `false` if the sample is older than the newest retained one.
    pub fn append(&self, queue: &str, sample: MetricSample) -> bool {
        let series = self.series_for(queue);
        let mut guard = series.write();
        let forwarded = self.persistence.as_ref().map(|_| sample.clone());
        if !guard.push(sample) {
            tracing::warn!(queue, "out-of-order metric sample rejected");
            return false;
        }
        // Forwarded under the lock so the writer sees appends in series order.
        if let (Some(persistence), Some(sample)) = (self.persistence.as_ref(), forwarded) {
            persistence.record(queue, sample);
        }
        true
    }

    /// Inclusive range, ascending. Empty for unknown queues or `from > to`.
    pub fn range(&self, queue: &str, from: u64, to: u64) -> Vec<MetricSample> {
        match self.series.get(queue) {
            Some(series) => series.value().read().range(from, to),
            None => Vec::new(),
        }
    }

    pub fn latest(&self, queue: &str) -> Option<MetricSample> {
        self.series
            .get(queue)
            .and_then(|series| series.value().read().latest().cloned())
    }

    pub fn len(&self, queue: &str) -> usize {
        self.series
            .get(queue)
            .map(|series| series.value().read().len())
            .unwrap_or(0)
    }

    pub fn queue_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.series.iter().map(|e| e.key().clone()).collect();
        names.sort();
        names
    }

    /// Reloads persisted series for `queues`. A queue that fails to load
    /// starts empty; the error is logged.
    pub async fn restore(&self, queues: &[String]) -> usize {
        let persistence = match self.persistence.as_ref() {
            Some(p) => p.clone(),
            None => return 0,
        };

        let mut restored = 0;
        for queue in queues {
            match persistence.load(queue).await {
                Ok(samples) => {
                    let series = self.series_for(queue);
                    let mut guard = series.write();
                    let skip = samples.len().saturating_sub(self.max_samples);
                    for sample in samples.into_iter().skip(skip) {
                        if guard.push(sample) {
                            restored += 1;
                        }
                    }
                    persistence.seed(queue, guard.to_vec());
                }
                Err(e) => {
                    tracing::error!(queue = %queue, error = %e, "failed to restore persisted metrics");
                }
            }
        }

        if restored > 0 {
            tracing::info!(samples = restored, "restored persisted metrics");
        }
        restored
    }
}
