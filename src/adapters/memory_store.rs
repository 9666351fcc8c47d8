//! In-process queue store with Redis list/zset/hash semantics.
//!
//! Used by the test-suite and when embedding the monitor without a Redis
//! server. `set_unreachable(true)` makes every read fail like a dropped
//! connection.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use dashmap::DashMap;

use super::store::QueueStore;
use crate::error::{MonitorError, MonitorResult};

#[derive(Debug, Clone)]
enum Entry {
    List(Vec<String>),
    SortedSet(Vec<(f64, String)>),
    Hash(HashMap<String, String>),
}

#[derive(Default)]
pub struct MemoryQueueStore {
    keys: DashMap<String, Entry>,
    unreachable: AtomicBool,
}

impl MemoryQueueStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_unreachable(&self, unreachable: bool) {
        self.unreachable.store(unreachable, Ordering::SeqCst);
    }

    /// `LPUSH`: the newest member becomes the head.
    pub fn list_push(&self, key: &str, member: &str) {
        let mut entry = self
            .keys
            .entry(key.to_string())
            .or_insert_with(|| Entry::List(Vec::new()));
        if let Entry::List(items) = entry.value_mut() {
            items.insert(0, member.to_string());
        }
    }

    /// `ZADD`: replaces the score of an existing member.
    pub fn sorted_set_add(&self, key: &str, score: f64, member: &str) {
        let mut entry = self
            .keys
            .entry(key.to_string())
            .or_insert_with(|| Entry::SortedSet(Vec::new()));
        if let Entry::SortedSet(items) = entry.value_mut() {
            items.retain(|(_, m)| m != member);
            items.push((score, member.to_string()));
        }
    }

    /// `HSET` with several fields.
    pub fn hash_set(&self, key: &str, fields: &[(&str, &str)]) {
        let mut entry = self
            .keys
            .entry(key.to_string())
            .or_insert_with(|| Entry::Hash(HashMap::new()));
        if let Entry::Hash(map) = entry.value_mut() {
            for (field, value) in fields {
                map.insert(field.to_string(), value.to_string());
            }
        }
    }

    pub fn delete(&self, key: &str) -> bool {
        self.keys.remove(key).is_some()
    }

    fn check(&self) -> MonitorResult<()> {
        if self.unreachable.load(Ordering::SeqCst) {
            return Err(MonitorError::Connection("connection refused".to_string()));
        }
        Ok(())
    }

    fn sorted_desc(items: &[(f64, String)]) -> Vec<String> {
        let mut sorted = items.to_vec();
        sorted.sort_by(|(sa, ma), (sb, mb)| sb.total_cmp(sa).then_with(|| mb.cmp(ma)));
        sorted.into_iter().map(|(_, m)| m).collect()
    }
}

fn slice_inclusive(items: Vec<String>, start: u64, stop: u64) -> Vec<String> {
    if start > stop {
        return Vec::new();
    }
    items
        .into_iter()
        .skip(start as usize)
        .take((stop - start + 1) as usize)
        .collect()
}

#[async_trait]
impl QueueStore for MemoryQueueStore {
    async fn ping(&self) -> MonitorResult<()> {
        self.check()
    }

    async fn list_len(&self, key: &str) -> MonitorResult<u64> {
        self.check()?;
        Ok(match self.keys.get(key).as_deref() {
            Some(Entry::List(items)) => items.len() as u64,
            _ => 0,
        })
    }

    async fn sorted_set_len(&self, key: &str) -> MonitorResult<u64> {
        self.check()?;
        Ok(match self.keys.get(key).as_deref() {
            Some(Entry::SortedSet(items)) => items.len() as u64,
            _ => 0,
        })
    }

    async fn list_range(&self, key: &str, start: u64, stop: u64) -> MonitorResult<Vec<String>> {
        self.check()?;
        let items = match self.keys.get(key).as_deref() {
            Some(Entry::List(items)) => items.clone(),
            _ => return Ok(Vec::new()),
        };
        Ok(slice_inclusive(items, start, stop))
    }

    async fn sorted_set_range_rev(
        &self,
        key: &str,
        start: u64,
        stop: u64,
    ) -> MonitorResult<Vec<String>> {
        self.check()?;
        let items = match self.keys.get(key).as_deref() {
            Some(Entry::SortedSet(items)) => Self::sorted_desc(items),
            _ => return Ok(Vec::new()),
        };
        Ok(slice_inclusive(items, start, stop))
    }

    async fn list_position(&self, key: &str, member: &str) -> MonitorResult<Option<u64>> {
        self.check()?;
        Ok(match self.keys.get(key).as_deref() {
            Some(Entry::List(items)) => items.iter().position(|m| m == member).map(|p| p as u64),
            _ => None,
        })
    }

    async fn sorted_set_score(&self, key: &str, member: &str) -> MonitorResult<Option<f64>> {
        self.check()?;
        Ok(match self.keys.get(key).as_deref() {
            Some(Entry::SortedSet(items)) => {
                items.iter().find(|(_, m)| m == member).map(|(score, _)| *score)
            }
            _ => None,
        })
    }

    async fn hash_fields(&self, key: &str, fields: &[&str]) -> MonitorResult<Vec<Option<String>>> {
        self.check()?;
        Ok(match self.keys.get(key).as_deref() {
            Some(Entry::Hash(map)) => fields.iter().map(|f| map.get(*f).cloned()).collect(),
            _ => vec![None; fields.len()],
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn list_push_puts_newest_at_head() {
        let store = MemoryQueueStore::new();
        store.list_push("l", "1");
        store.list_push("l", "2");
        store.list_push("l", "3");

        assert_eq!(store.list_len("l").await.unwrap(), 3);
        assert_eq!(store.list_range("l", 0, 1).await.unwrap(), vec!["3", "2"]);
        assert_eq!(store.list_range("l", 2, 10).await.unwrap(), vec!["1"]);
        assert_eq!(store.list_position("l", "1").await.unwrap(), Some(2));
    }

    #[tokio::test]
    async fn sorted_set_reads_highest_score_first() {
        let store = MemoryQueueStore::new();
        store.sorted_set_add("z", 10.0, "a");
        store.sorted_set_add("z", 30.0, "c");
        store.sorted_set_add("z", 20.0, "b");
        store.sorted_set_add("z", 5.0, "a");

        assert_eq!(store.sorted_set_len("z").await.unwrap(), 3);
        assert_eq!(
            store.sorted_set_range_rev("z", 0, 10).await.unwrap(),
            vec!["c", "b", "a"]
        );
        assert_eq!(store.sorted_set_score("z", "a").await.unwrap(), Some(5.0));
    }

    #[tokio::test]
    async fn unreachable_store_fails_every_read() {
        let store = MemoryQueueStore::new();
        store.list_push("l", "1");
        store.set_unreachable(true);

        assert!(matches!(store.list_len("l").await, Err(MonitorError::Connection(_))));
        assert!(store.ping().await.is_err());

        store.set_unreachable(false);
        assert_eq!(store.list_len("l").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn missing_hash_yields_empty_slots() {
        let store = MemoryQueueStore::new();
        let fields = store.hash_fields("nope", &["a", "b"]).await.unwrap();
        assert_eq!(fields, vec![None, None]);
    }
}
