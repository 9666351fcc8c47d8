//! Read-side composition of the adapter and the metrics store.

use std::sync::Arc;
use std::time::Duration;

use futures_util::future::join_all;

use super::models::metrics::{CollectorOverview, CurrentSnapshot};
use super::models::queues::{JobsPage, QueueOverview, QueuesOverview};
use crate::adapters::{JobState, JobSummary, QueueAdapter, QueueHandle};
use crate::error::{MonitorError, MonitorResult};
use crate::metrics::{AggregationStore, CollectorConfig, MetricSample, MetricsCollector};
use crate::utils::current_time_ms;

/// Stateless view builder; cheap to clone.
#[derive(Clone)]
pub struct DashboardQueryService {
    adapter: Arc<dyn QueueAdapter>,
    metrics: Arc<AggregationStore>,
    collector: Option<(Arc<MetricsCollector>, CollectorConfig)>,
}

impl DashboardQueryService {
    pub fn new(adapter: Arc<dyn QueueAdapter>, metrics: Arc<AggregationStore>) -> Self {
        Self {
            adapter,
            metrics,
            collector: None,
        }
    }

    pub fn with_collector(mut self, collector: Arc<MetricsCollector>, config: CollectorConfig) -> Self {
        self.collector = Some((collector, config));
        self
    }

    fn require(&self, queue: &str) -> MonitorResult<QueueHandle> {
        self.adapter
            .handle(queue)
            .ok_or_else(|| MonitorError::UnknownQueue(queue.to_string()))
    }

    /// Latest sample per requested queue, `None` where nothing was collected.
    pub fn current_snapshot(&self, queues: &[String]) -> CurrentSnapshot {
        queues
            .iter()
            .map(|name| (name.clone(), self.metrics.latest(name)))
            .collect()
    }

    /// Samples from `now - window` to `now`; the whole retained series when
    /// `window` is `None`.
    pub fn history(&self, queue: &str, window: Option<Duration>) -> MonitorResult<Vec<MetricSample>> {
        self.require(queue)?;
        let (from, to) = match window {
            Some(window) => {
                let now = current_time_ms();
                let span = u64::try_from(window.as_millis()).unwrap_or(u64::MAX);
                (now.saturating_sub(span), now)
            }
            None => (0, u64::MAX),
        };
        Ok(self.metrics.range(queue, from, to))
    }

    /// One page of jobs. Fetches a single extra item to learn whether a
    /// next page exists.
    pub async fn jobs_page(
        &self,
        queue: &str,
        state: JobState,
        page: i64,
        page_size: i64,
    ) -> MonitorResult<JobsPage> {
        let handle = self.require(queue)?;
        if page_size <= 0 {
            return Err(MonitorError::InvalidRange(format!(
                "pageSize must be > 0, got {}",
                page_size
            )));
        }
        let offset = page
            .checked_mul(page_size)
            .ok_or_else(|| MonitorError::InvalidRange("page out of range".to_string()))?;
        let limit = page_size
            .checked_add(1)
            .ok_or_else(|| MonitorError::InvalidRange("pageSize out of range".to_string()))?;

        let mut items = self.adapter.fetch_jobs(&handle, state, offset, limit).await?;
        let has_more = items.len() as i64 > page_size;
        items.truncate(page_size as usize);

        Ok(JobsPage { items, has_more })
    }

    pub async fn job(&self, queue: &str, id: &str) -> MonitorResult<Option<JobSummary>> {
        let handle = self.require(queue)?;
        self.adapter.fetch_job(&handle, id).await
    }

    /// Every registered queue with live counts. One unreachable queue does not
    /// fail the whole overview.
    pub async fn overview(&self) -> QueuesOverview {
        let handles = self.adapter.list_queues();
        let counts = join_all(handles.iter().map(|h| self.adapter.counts(h))).await;

        let queues = handles
            .into_iter()
            .zip(counts)
            .map(|(handle, counts)| {
                let (counts, error) = match counts {
                    Ok(c) => (Some(c), None),
                    Err(e) => {
                        tracing::warn!(queue = %handle.name, error = %e, "queue counts unavailable");
                        (None, Some(e.to_string()))
                    }
                };
                QueueOverview {
                    latest_sample: self.metrics.latest(&handle.name),
                    name: handle.name,
                    prefix: handle.prefix,
                    counts,
                    error,
                }
            })
            .collect();

        QueuesOverview {
            backend: self.adapter.kind(),
            metrics_enabled: self.collector.is_some(),
            queues,
        }
    }

    pub fn queue_names(&self) -> Vec<String> {
        self.adapter.list_queues().into_iter().map(|h| h.name).collect()
    }

    pub fn collector_status(&self) -> CollectorOverview {
        let persisted = self.metrics.persistence().is_some();
        match &self.collector {
            Some((collector, config)) => CollectorOverview {
                enabled: true,
                status: Some(collector.status()),
                interval_seconds: Some(config.interval.as_secs()),
                max_samples: Some(config.max_samples),
                ticks: collector.ticks(),
                failures: collector.failures(),
                persisted,
            },
            None => CollectorOverview {
                enabled: false,
                status: None,
                interval_seconds: None,
                max_samples: None,
                ticks: 0,
                failures: 0,
                persisted,
            },
        }
    }
}
