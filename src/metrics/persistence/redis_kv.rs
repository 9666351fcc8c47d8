use async_trait::async_trait;
use bytes::Bytes;

use super::KvStore;
use crate::adapters::redis_store::RedisConnection;
use crate::error::MonitorResult;

/// Stores series snapshots next to the queues, in the same Redis.
#[derive(Clone)]
pub struct RedisKv {
    conn: RedisConnection,
}

impl RedisKv {
    pub fn new(conn: RedisConnection) -> Self {
        Self { conn }
    }
}

#[async_trait]
impl KvStore for RedisKv {
    async fn get(&self, key: &str) -> MonitorResult<Option<Bytes>> {
        let raw: Option<Vec<u8>> = self
            .conn
            .run("GET", || {
                let mut cmd = redis::cmd("GET");
                cmd.arg(key);
                cmd
            })
            .await?;
        Ok(raw.map(Bytes::from))
    }

    async fn set(&self, key: &str, value: Bytes) -> MonitorResult<()> {
        let _: () = self
            .conn
            .run("SET", || {
                let mut cmd = redis::cmd("SET");
                cmd.arg(key).arg(value.as_ref());
                cmd
            })
            .await?;
        Ok(())
    }
}
