pub mod adapters;
pub mod config;
pub mod dashboard;
pub mod error;
pub mod metrics;
pub mod utils;

use std::sync::Arc;

use crate::adapters::redis_store::RedisConnection;
use crate::adapters::{build_adapter, QueueAdapter, QueueStore, RedisQueueStore};
use crate::config::{Config, MetricsStoreKind};
use crate::dashboard::DashboardQueryService;
use crate::error::MonitorResult;
use crate::metrics::persistence::{KvStore, MetricsPersistence, RedisKv, SqliteKv};
use crate::metrics::{AggregationStore, CollectorConfig, MetricsCollector};

// ========================================
// ENGINE (The Singleton)
// ========================================

/// Everything the HTTP layer needs: the adapter registry, the metrics store
/// and the collector that feeds it. Cheap to clone (all fields are Arcs).
#[derive(Clone)]
pub struct MonitorEngine {
    pub adapter: Arc<dyn QueueAdapter>,
    pub metrics: Arc<AggregationStore>,
    pub collector: Option<Arc<MetricsCollector>>,
    pub dashboard: DashboardQueryService,
    collector_config: CollectorConfig,
}

impl MonitorEngine {
    /// Wires an engine around an existing adapter. `collector_config` is
    /// `None` when metrics collection is disabled.
    pub fn new(
        adapter: Arc<dyn QueueAdapter>,
        collector_config: Option<CollectorConfig>,
        persistence: Option<Arc<MetricsPersistence>>,
    ) -> Self {
        let config = collector_config.unwrap_or_else(|| CollectorConfig::new(3600, 100));
        let metrics = Arc::new(match persistence {
            Some(p) => AggregationStore::with_persistence(config.max_samples, p),
            None => AggregationStore::new(config.max_samples),
        });

        let collector = collector_config
            .map(|_| Arc::new(MetricsCollector::new(adapter.clone(), metrics.clone())));

        let mut dashboard = DashboardQueryService::new(adapter.clone(), metrics.clone());
        if let (Some(collector), Some(cfg)) = (&collector, collector_config) {
            dashboard = dashboard.with_collector(collector.clone(), cfg);
        }

        Self {
            adapter,
            metrics,
            collector,
            dashboard,
            collector_config: config,
        }
    }

    /// Builds the Redis-backed engine described by `config`. An unreachable
    /// Redis is only logged: the dashboard reports it per queue.
    pub async fn connect(config: &Config) -> MonitorResult<Self> {
        let conn = RedisConnection::open(&config.queues.redis_uri)?;
        let store = Arc::new(RedisQueueStore::new(conn.clone()));
        if let Err(e) = store.ping().await {
            tracing::warn!(error = %e, "redis not reachable at startup");
        }
        let adapter = build_adapter(
            config.queues.backend,
            store,
            &config.queues.names,
            config.queues.prefix.as_deref(),
        );

        let metrics = &config.metrics;
        let persistence = match (metrics.enabled, metrics.store) {
            (true, Some(kind)) => {
                let kv: Arc<dyn KvStore> = match kind {
                    MetricsStoreKind::Redis => Arc::new(RedisKv::new(conn)),
                    MetricsStoreKind::Sqlite => Arc::new(SqliteKv::open(&metrics.db_path)?),
                };
                Some(Arc::new(MetricsPersistence::new(
                    kv,
                    metrics.persistence.clone(),
                    metrics.collector.max_samples,
                )))
            }
            (false, Some(_)) => {
                tracing::warn!("--persist-metrics ignored: metrics collection is disabled");
                None
            }
            _ => None,
        };

        tracing::info!(
            backend = %config.queues.backend,
            queues = ?config.queues.names,
            "📦 queue adapter initialized"
        );

        Ok(Self::new(
            adapter,
            metrics.enabled.then_some(metrics.collector),
            persistence,
        ))
    }

    /// Restores persisted metrics and starts the collector, if enabled.
    pub async fn init(&self) {
        let names: Vec<String> = self.adapter.list_queues().into_iter().map(|h| h.name).collect();
        self.metrics.restore(&names).await;

        if let Some(collector) = &self.collector {
            collector.start(self.collector_config);
        }
    }

    /// Stops sampling and flushes pending metric snapshots.
    pub async fn shutdown(&self) {
        if let Some(collector) = &self.collector {
            collector.stop();
        }
        if let Some(persistence) = self.metrics.persistence() {
            persistence.shutdown().await;
        }
    }
}
