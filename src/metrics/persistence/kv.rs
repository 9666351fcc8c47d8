use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use dashmap::DashMap;

use super::KvStore;
use crate::error::{MonitorError, MonitorResult};

/// Process-local KV backend. Survives nothing; handy for tests and embedding.
#[derive(Clone, Default)]
pub struct MemoryKv {
    inner: Arc<DashMap<String, Bytes>>,
    failing: Arc<AtomicBool>,
}

impl MemoryKv {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every write fail, as a full disk or lost connection would.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

#[async_trait]
impl KvStore for MemoryKv {
    async fn get(&self, key: &str) -> MonitorResult<Option<Bytes>> {
        Ok(self.inner.get(key).map(|v| v.value().clone()))
    }

    async fn set(&self, key: &str, value: Bytes) -> MonitorResult<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(MonitorError::Storage("write rejected".to_string()));
        }
        self.inner.insert(key.to_string(), value);
        Ok(())
    }
}
