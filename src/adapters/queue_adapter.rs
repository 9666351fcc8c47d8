use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;

use super::keyspace::{BullLayout, BullMqLayout, KeyLayout, Segment};
use super::store::QueueStore;
use super::{validate_range, zeroed_counts, BackendKind, JobState, JobSummary, QueueAdapter, QueueHandle, StateCounts};
use crate::error::MonitorResult;

pub type BullAdapter = LayoutAdapter<BullLayout>;
pub type BullMqAdapter = LayoutAdapter<BullMqLayout>;

/// Order in which a job id is searched for when its state is unknown.
const LOOKUP_ORDER: [JobState; 5] = [
    JobState::Completed,
    JobState::Failed,
    JobState::Delayed,
    JobState::Active,
    JobState::Waiting,
];

/// Queue adapter for one key layout. Owns the handle registry; performs no
/// caching.
pub struct LayoutAdapter<L: KeyLayout> {
    store: Arc<dyn QueueStore>,
    handles: Vec<QueueHandle>,
    _layout: PhantomData<L>,
}

impl<L: KeyLayout> LayoutAdapter<L> {
    pub fn new(store: Arc<dyn QueueStore>, handles: Vec<QueueHandle>) -> Self {
        Self {
            store,
            handles,
            _layout: PhantomData,
        }
    }

    /// Job ids for `offset..offset+limit` across the concatenated segments.
    async fn page_ids(&self, segments: &[Segment], offset: u64, limit: u64) -> MonitorResult<Vec<String>> {
        let store = self.store.as_ref();
        let mut ids = Vec::new();
        let mut skip = offset;
        let mut remaining = limit;

        for segment in segments {
            if remaining == 0 {
                break;
            }
            let len = segment.len(store).await?;
            if skip >= len {
                skip -= len;
                continue;
            }
            let stop = skip.saturating_add(remaining - 1).min(len - 1);
            let chunk = segment.read(store, skip, stop).await?;
            remaining = remaining.saturating_sub(chunk.len() as u64);
            ids.extend(chunk);
            skip = 0;
        }
        Ok(ids)
    }

    /// Reads the job hash. `None` when the job vanished after the range read.
    async fn hydrate(&self, handle: &QueueHandle, id: &str, state: JobState) -> MonitorResult<Option<JobSummary>> {
        let mut fields = vec!["name", "timestamp"];
        fields.extend_from_slice(L::ATTEMPT_FIELDS);

        let values = self.store.hash_fields(&handle.job_key(id), &fields).await?;
        if values.iter().all(Option::is_none) {
            return Ok(None);
        }

        let name = values.first().cloned().flatten();
        let timestamp = values
            .get(1)
            .and_then(|v| v.as_deref())
            .and_then(parse_number)
            .unwrap_or(0);
        let attempts = values
            .iter()
            .skip(2)
            .flatten()
            .find_map(|v| parse_number(v))
            .map(|n| u32::try_from(n).unwrap_or(u32::MAX))
            .unwrap_or(0);

        Ok(Some(JobSummary {
            id: id.to_string(),
            name,
            state,
            timestamp,
            attempts,
        }))
    }
}

/// Bull writes numbers as decimal strings; older clients occasionally wrote floats.
fn parse_number(raw: &str) -> Option<u64> {
    raw.parse::<u64>()
        .ok()
        .or_else(|| raw.parse::<f64>().ok().filter(|f| *f >= 0.0).map(|f| f as u64))
}

#[async_trait]
impl<L: KeyLayout> QueueAdapter for LayoutAdapter<L> {
    fn kind(&self) -> BackendKind {
        L::KIND
    }

    fn list_queues(&self) -> Vec<QueueHandle> {
        self.handles.clone()
    }

    fn handle(&self, name: &str) -> Option<QueueHandle> {
        self.handles.iter().find(|h| h.name == name).cloned()
    }

    async fn counts(&self, handle: &QueueHandle) -> MonitorResult<StateCounts> {
        let store = self.store.as_ref();
        let mut counts = zeroed_counts();
        for state in JobState::ALL {
            let mut total = 0;
            for segment in L::segments(handle, state) {
                total += segment.len(store).await?;
            }
            counts.insert(state, total);
        }
        Ok(counts)
    }

    async fn fetch_jobs(
        &self,
        handle: &QueueHandle,
        state: JobState,
        offset: i64,
        limit: i64,
    ) -> MonitorResult<Vec<JobSummary>> {
        let (offset, limit) = validate_range(offset, limit)?;
        let segments = L::segments(handle, state);
        let ids = self.page_ids(&segments, offset, limit).await?;

        let mut jobs = Vec::with_capacity(ids.len());
        for id in ids {
            match self.hydrate(handle, &id, state).await? {
                Some(job) => jobs.push(job),
                None => tracing::debug!(queue = %handle.name, job = %id, "job removed during listing"),
            }
        }
        Ok(jobs)
    }

    async fn fetch_job(&self, handle: &QueueHandle, id: &str) -> MonitorResult<Option<JobSummary>> {
        let store = self.store.as_ref();
        for state in LOOKUP_ORDER {
            for segment in L::segments(handle, state) {
                if segment.contains(store, id).await? {
                    return self.hydrate(handle, id, state).await;
                }
            }
        }
        Ok(None)
    }
}
