//! Redis-backed queue store: the production path for both queue backends.

use std::sync::Arc;

use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::FromRedisValue;
use tokio::sync::Mutex;

use super::store::QueueStore;
use crate::error::{MonitorError, MonitorResult};

/// Lazily opened multiplexed connection shared by the queue store and the
/// Redis metrics backend. A failed command drops the connection and is
/// retried once on a fresh one.
#[derive(Clone)]
pub struct RedisConnection {
    client: redis::Client,
    connection: Arc<Mutex<Option<MultiplexedConnection>>>,
}

impl RedisConnection {
    pub fn open(uri: &str) -> MonitorResult<Self> {
        let client = redis::Client::open(uri)
            .map_err(|e| MonitorError::Connection(format!("invalid redis uri '{}': {}", uri, e)))?;
        Ok(Self {
            client,
            connection: Arc::new(Mutex::new(None)),
        })
    }

    async fn connection(&self) -> MonitorResult<MultiplexedConnection> {
        let mut guard = self.connection.lock().await;
        if let Some(conn) = guard.as_ref() {
            return Ok(conn.clone());
        }
        let conn = self.client.get_multiplexed_async_connection().await?;
        tracing::debug!("redis connection established");
        *guard = Some(conn.clone());
        Ok(conn)
    }

    async fn reset(&self) {
        *self.connection.lock().await = None;
    }

    pub async fn run<T, F>(&self, operation: &'static str, build: F) -> MonitorResult<T>
    where
        T: FromRedisValue + Send,
        F: Fn() -> redis::Cmd,
    {
        let mut last_err = None;
        for attempt in 0..2 {
            let mut conn = match self.connection().await {
                Ok(conn) => conn,
                Err(e) => {
                    last_err = Some(e);
                    continue;
                }
            };
            let result: redis::RedisResult<T> = build().query_async(&mut conn).await;
            match result {
                Ok(value) => return Ok(value),
                Err(err) if !is_connectivity_error(&err) => {
                    tracing::warn!(operation, error = %err, "redis command rejected");
                    return Err(MonitorError::from(err));
                }
                Err(err) => {
                    tracing::warn!(
                        operation,
                        attempt = attempt + 1,
                        error = %err,
                        "redis command failed; reconnecting"
                    );
                    self.reset().await;
                    last_err = Some(MonitorError::from(err));
                }
            }
        }
        Err(last_err.unwrap_or_else(|| {
            MonitorError::Connection(format!("redis {} failed for unknown reason", operation))
        }))
    }
}

/// Transport failures worth a reconnect. Server replies such as `WRONGTYPE`
/// are not.
pub fn is_connectivity_error(err: &redis::RedisError) -> bool {
    err.is_io_error() || err.is_connection_dropped() || err.is_connection_refusal() || err.is_timeout()
}

#[derive(Clone)]
pub struct RedisQueueStore {
    conn: RedisConnection,
}

impl RedisQueueStore {
    pub fn new(conn: RedisConnection) -> Self {
        Self { conn }
    }
}

#[async_trait]
impl QueueStore for RedisQueueStore {
    async fn ping(&self) -> MonitorResult<()> {
        let _: String = self.conn.run("PING", || redis::cmd("PING")).await?;
        Ok(())
    }

    async fn list_len(&self, key: &str) -> MonitorResult<u64> {
        self.conn
            .run("LLEN", || {
                let mut cmd = redis::cmd("LLEN");
                cmd.arg(key);
                cmd
            })
            .await
    }

    async fn sorted_set_len(&self, key: &str) -> MonitorResult<u64> {
        self.conn
            .run("ZCARD", || {
                let mut cmd = redis::cmd("ZCARD");
                cmd.arg(key);
                cmd
            })
            .await
    }

    async fn list_range(&self, key: &str, start: u64, stop: u64) -> MonitorResult<Vec<String>> {
        self.conn
            .run("LRANGE", || {
                let mut cmd = redis::cmd("LRANGE");
                cmd.arg(key).arg(start).arg(stop);
                cmd
            })
            .await
    }

    async fn sorted_set_range_rev(
        &self,
        key: &str,
        start: u64,
        stop: u64,
    ) -> MonitorResult<Vec<String>> {
        self.conn
            .run("ZREVRANGE", || {
                let mut cmd = redis::cmd("ZREVRANGE");
                cmd.arg(key).arg(start).arg(stop);
                cmd
            })
            .await
    }

    async fn list_position(&self, key: &str, member: &str) -> MonitorResult<Option<u64>> {
        self.conn
            .run("LPOS", || {
                let mut cmd = redis::cmd("LPOS");
                cmd.arg(key).arg(member);
                cmd
            })
            .await
    }

    async fn sorted_set_score(&self, key: &str, member: &str) -> MonitorResult<Option<f64>> {
        self.conn
            .run("ZSCORE", || {
                let mut cmd = redis::cmd("ZSCORE");
                cmd.arg(key).arg(member);
                cmd
            })
            .await
    }

    async fn hash_fields(&self, key: &str, fields: &[&str]) -> MonitorResult<Vec<Option<String>>> {
        if fields.is_empty() {
            return Ok(Vec::new());
        }
        self.conn
            .run("HMGET", || {
                let mut cmd = redis::cmd("HMGET");
                cmd.arg(key);
                for field in fields {
                    cmd.arg(*field);
                }
                cmd
            })
            .await
    }
}
