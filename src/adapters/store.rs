use async_trait::async_trait;

use crate::error::MonitorResult;

/// Read capability over the Redis data types the queue libraries use.
///
/// Index arguments are inclusive, mirroring `LRANGE`/`ZREVRANGE`. Any
/// transport failure is reported as `MonitorError::Connection`.
#[async_trait]
pub trait QueueStore: Send + Sync {
    async fn ping(&self) -> MonitorResult<()>;

    async fn list_len(&self, key: &str) -> MonitorResult<u64>;

    async fn sorted_set_len(&self, key: &str) -> MonitorResult<u64>;

    /// Head first.
    async fn list_range(&self, key: &str, start: u64, stop: u64) -> MonitorResult<Vec<String>>;

    /// Highest score first.
    async fn sorted_set_range_rev(
        &self,
        key: &str,
        start: u64,
        stop: u64,
    ) -> MonitorResult<Vec<String>>;

    async fn list_position(&self, key: &str, member: &str) -> MonitorResult<Option<u64>>;

    async fn sorted_set_score(&self, key: &str, member: &str) -> MonitorResult<Option<f64>>;

    /// One slot per requested field, `None` when the field (or hash) is missing.
    async fn hash_fields(&self, key: &str, fields: &[&str]) -> MonitorResult<Vec<Option<String>>>;
}
