use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use clap::{Parser, ValueEnum};

use crate::adapters::BackendKind;
use crate::metrics::persistence::PersistenceConfig;
use crate::metrics::CollectorConfig;

// --- CLI ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum MetricsStoreKind {
    /// Same Redis as the queues
    Redis,
    /// Local SQLite file (see --metrics-db)
    Sqlite,
}

/// Read-only HTTP dashboard for Bull and BullMQ queues.
#[derive(Debug, Clone, Parser)]
#[command(name = "bullscope", version, about)]
pub struct Cli {
    /// Redis URI
    #[arg(long, env = "REDIS_URI")]
    pub redis_uri: String,

    /// Queue names
    #[arg(short = 'q', long = "queue", env = "QUEUE_NAMES", num_args = 1.., value_delimiter = ',', required = true)]
    pub queues: Vec<String>,

    /// Use BullMQ instead of Bull
    #[arg(long, env = "BULLMQ")]
    pub bullmq: bool,

    /// Server's port
    #[arg(short, long, env = "PORT", default_value_t = 3000)]
    pub port: u16,

    /// Server's host
    #[arg(long, env = "HOST", default_value = "localhost")]
    pub host: String,

    /// Redis key prefix
    #[arg(long, env = "QUEUE_PREFIX")]
    pub prefix: Option<String>,

    /// Enable metrics collector
    #[arg(short, long, env = "METRICS")]
    pub metrics: bool,

    /// Max metrics samples kept per queue
    #[arg(long, env = "MAX_METRICS", default_value_t = 100, value_parser = clap::value_parser!(u64).range(1..))]
    pub max_metrics: u64,

    /// Metrics collection interval in seconds
    #[arg(long, env = "METRICS_INTERVAL", default_value_t = 3600, value_parser = clap::value_parser!(u64).range(1..))]
    pub metrics_interval: u64,

    /// Persist collected metrics across restarts
    #[arg(long, env = "PERSIST_METRICS", value_enum)]
    pub persist_metrics: Option<MetricsStoreKind>,

    /// SQLite file used by --persist-metrics sqlite
    #[arg(long, env = "METRICS_DB", default_value = "./data/metrics.db")]
    pub metrics_db: PathBuf,

    /// Log filter when RUST_LOG is unset
    #[arg(long, env = "BULLSCOPE_LOG", default_value = "info")]
    pub log_level: String,
}

// --- CONFIG AGGREGATOR ---

#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub queues: QueuesConfig,
    pub metrics: MetricsConfig,
}

impl Config {
    pub fn from_cli(cli: Cli) -> Self {
        Self {
            server: ServerConfig {
                host: cli.host,
                port: cli.port,
                log_level: cli.log_level,
            },
            queues: QueuesConfig {
                backend: if cli.bullmq { BackendKind::BullMq } else { BackendKind::Bull },
                redis_uri: cli.redis_uri,
                names: normalize_names(cli.queues),
                prefix: cli.prefix.filter(|p| !p.trim().is_empty()),
            },
            metrics: MetricsConfig {
                enabled: cli.metrics,
                collector: CollectorConfig::new(cli.metrics_interval, cli.max_metrics as usize),
                store: cli.persist_metrics,
                db_path: cli.metrics_db,
                persistence: PersistenceConfig::load(),
            },
        }
    }
}

/// Trims, drops empties and duplicates, keeps first-seen order.
fn normalize_names(raw: Vec<String>) -> Vec<String> {
    let mut names: Vec<String> = Vec::with_capacity(raw.len());
    for name in raw {
        let name = name.trim().to_string();
        if !name.is_empty() && !names.contains(&name) {
            names.push(name);
        }
    }
    names
}

// --- MODULES ---

// SERVER
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub log_level: String,
}

// QUEUES
#[derive(Debug, Clone)]
pub struct QueuesConfig {
    pub backend: BackendKind,
    pub redis_uri: String,
    pub names: Vec<String>,
    pub prefix: Option<String>,
}

// METRICS
#[derive(Debug, Clone)]
pub struct MetricsConfig {
    pub enabled: bool,
    pub collector: CollectorConfig,
    pub store: Option<MetricsStoreKind>,
    pub db_path: PathBuf,
    pub persistence: PersistenceConfig,
}

impl PersistenceConfig {
    fn load() -> Self {
        let defaults = PersistenceConfig::default();
        Self {
            key_prefix:              get_env("METRICS_KEY_PREFIX", defaults.key_prefix),
            flush_ms:                get_env("METRICS_FLUSH_MS", defaults.flush_ms),
            writer_channel_capacity: get_env("METRICS_WRITER_CHAN_CAP", defaults.writer_channel_capacity),
            writer_batch_size:       get_env("METRICS_WRITER_BATCH_SIZE", defaults.writer_batch_size),
        }
    }
}

// --- PRIVATE HELPER ---

fn get_env<T: FromStr>(key: &str, default: T) -> T {
    match env::var(key) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            tracing::warn!(env_var = key, value = %raw, "invalid config value; using default");
            default
        }),
        Err(_) => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Config {
        let mut argv = vec!["bullscope"];
        argv.extend_from_slice(args);
        Config::from_cli(Cli::try_parse_from(argv).unwrap())
    }

    #[test]
    fn defaults_match_launcher() {
        let config = parse(&["--redis-uri", "redis://localhost:6379", "-q", "mail"]);

        assert_eq!(config.server.port, 3000);
        assert_eq!(config.server.host, "localhost");
        assert_eq!(config.queues.backend, BackendKind::Bull);
        assert_eq!(config.queues.prefix, None);
        assert!(!config.metrics.enabled);
        assert_eq!(config.metrics.collector.max_samples, 100);
        assert_eq!(config.metrics.collector.interval.as_secs(), 3600);
        assert_eq!(config.metrics.store, None);
    }

    #[test]
    fn parses_queues_and_metrics_flags() {
        let config = parse(&[
            "--redis-uri", "redis://r:6379",
            "-q", "mail", "sms", "mail",
            "--bullmq",
            "--prefix", "{app}",
            "-m",
            "--max-metrics", "3",
            "--metrics-interval", "5",
            "--persist-metrics", "sqlite",
        ]);

        assert_eq!(config.queues.names, vec!["mail", "sms"]);
        assert_eq!(config.queues.backend, BackendKind::BullMq);
        assert_eq!(config.queues.prefix.as_deref(), Some("{app}"));
        assert!(config.metrics.enabled);
        assert_eq!(config.metrics.collector.max_samples, 3);
        assert_eq!(config.metrics.collector.interval.as_secs(), 5);
        assert_eq!(config.metrics.store, Some(MetricsStoreKind::Sqlite));
    }

    #[test]
    fn rejects_zero_interval_and_missing_queues() {
        assert!(Cli::try_parse_from(["bullscope", "--redis-uri", "redis://r", "-q", "a", "--metrics-interval", "0"]).is_err());
        assert!(Cli::try_parse_from(["bullscope", "--redis-uri", "redis://r"]).is_err());
    }
}
