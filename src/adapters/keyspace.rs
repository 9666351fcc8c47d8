//! Key layouts of the two queue libraries.
//!
//! A state may span several keys (Bull's waiting = `wait` + `paused`); each
//! key is a [`Segment`] and listings paginate across the concatenation.

use super::store::QueueStore;
use super::{BackendKind, JobState, QueueHandle};
use crate::error::MonitorResult;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    /// Redis list, newest job at the head.
    List(String),
    /// Redis sorted set, newest (highest score) first.
    SortedSet(String),
}

impl Segment {
    pub async fn len(&self, store: &dyn QueueStore) -> MonitorResult<u64> {
        match self {
            Segment::List(key) => store.list_len(key).await,
            Segment::SortedSet(key) => store.sorted_set_len(key).await,
        }
    }

    pub async fn read(&self, store: &dyn QueueStore, start: u64, stop: u64) -> MonitorResult<Vec<String>> {
        match self {
            Segment::List(key) => store.list_range(key, start, stop).await,
            Segment::SortedSet(key) => store.sorted_set_range_rev(key, start, stop).await,
        }
    }

    pub async fn contains(&self, store: &dyn QueueStore, id: &str) -> MonitorResult<bool> {
        match self {
            Segment::List(key) => Ok(store.list_position(key, id).await?.is_some()),
            Segment::SortedSet(key) => Ok(store.sorted_set_score(key, id).await?.is_some()),
        }
    }
}

pub trait KeyLayout: Send + Sync + 'static {
    const KIND: BackendKind;

    /// Job hash fields holding the attempt count, in lookup order.
    const ATTEMPT_FIELDS: &'static [&'static str];

    fn segments(handle: &QueueHandle, state: JobState) -> Vec<Segment>;
}

/// Legacy Bull: no prioritized set, attempts in `attemptsMade`.
pub struct BullLayout;

impl KeyLayout for BullLayout {
    const KIND: BackendKind = BackendKind::Bull;
    const ATTEMPT_FIELDS: &'static [&'static str] = &["attemptsMade"];

    fn segments(handle: &QueueHandle, state: JobState) -> Vec<Segment> {
        match state {
            JobState::Waiting => vec![
                Segment::List(handle.key("wait")),
                Segment::List(handle.key("paused")),
            ],
            JobState::Active => vec![Segment::List(handle.key("active"))],
            JobState::Completed => vec![Segment::SortedSet(handle.key("completed"))],
            JobState::Failed => vec![Segment::SortedSet(handle.key("failed"))],
            JobState::Delayed => vec![Segment::SortedSet(handle.key("delayed"))],
        }
    }
}

/// BullMQ: prioritized jobs wait in their own sorted set; recent versions
/// store attempts as `atm`.
pub struct BullMqLayout;

impl KeyLayout for BullMqLayout {
    const KIND: BackendKind = BackendKind::BullMq;
    const ATTEMPT_FIELDS: &'static [&'static str] = &["atm", "attemptsMade"];

    fn segments(handle: &QueueHandle, state: JobState) -> Vec<Segment> {
        match state {
            JobState::Waiting => vec![
                Segment::List(handle.key("wait")),
                Segment::List(handle.key("paused")),
                Segment::SortedSet(handle.key("prioritized")),
            ],
            other => BullLayout::segments(handle, other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bullmq_waiting_includes_prioritized() {
        let handle = QueueHandle::new("mail", None);
        let legacy = BullLayout::segments(&handle, JobState::Waiting);
        let next = BullMqLayout::segments(&handle, JobState::Waiting);

        assert_eq!(legacy.len(), 2);
        assert_eq!(next.len(), 3);
        assert_eq!(next[2], Segment::SortedSet("bull:mail:prioritized".to_string()));
        assert_eq!(
            BullMqLayout::segments(&handle, JobState::Failed),
            vec![Segment::SortedSet("bull:mail:failed".to_string())]
        );
    }
}
