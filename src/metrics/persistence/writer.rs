use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{debug, error, info};

use super::types::StorageOp;
use super::{encode_series, series_key, KvStore};
use crate::metrics::MetricSample;

pub struct WriterSettings {
    pub key_prefix: String,
    pub flush_ms: u64,
    pub batch_size: usize,
    pub max_samples: usize,
}

/// Per-queue tails mirroring the in-memory series, plus the queues changed
/// since the last successful write.
struct Tails {
    series: HashMap<String, VecDeque<MetricSample>>,
    dirty: HashSet<String>,
    max_samples: usize,
}

impl Tails {
    fn seed(&mut self, queue: String, samples: Vec<MetricSample>) {
        let skip = samples.len().saturating_sub(self.max_samples);
        self.series.insert(queue, samples.into_iter().skip(skip).collect());
    }

    fn append(&mut self, queue: String, sample: MetricSample) {
        let tail = self
            .series
            .entry(queue.clone())
            .or_insert_with(|| VecDeque::with_capacity(self.max_samples));
        if tail.len() == self.max_samples {
            tail.pop_front();
        }
        tail.push_back(sample);
        self.dirty.insert(queue);
    }
}

pub async fn run_writer(mut rx: mpsc::Receiver<StorageOp>, kv: Arc<dyn KvStore>, settings: WriterSettings) {
    info!(key_prefix = %settings.key_prefix, "metrics persistence writer started");

    let mut flush_timer = tokio::time::interval(Duration::from_millis(settings.flush_ms.max(1)));
    flush_timer.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    let mut tails = Tails {
        series: HashMap::new(),
        dirty: HashSet::new(),
        max_samples: settings.max_samples.max(1),
    };
    let batch_size = settings.batch_size.max(1);
    let key_prefix = settings.key_prefix;

    loop {
        tokio::select! {
            maybe_op = rx.recv() => {
                match maybe_op {
                    Some(StorageOp::Seed { queue, samples }) => tails.seed(queue, samples),
                    Some(StorageOp::Append { queue, sample }) => {
                        tails.append(queue, sample);
                        if tails.dirty.len() >= batch_size {
                            let _ = flush_dirty(kv.as_ref(), &key_prefix, &mut tails).await;
                        }
                    }
                    Some(StorageOp::Flush { reply }) => {
                        let result = flush_dirty(kv.as_ref(), &key_prefix, &mut tails).await;
                        let _ = reply.send(result);
                    }
                    Some(StorageOp::Stop) | None => {
                        let _ = flush_dirty(kv.as_ref(), &key_prefix, &mut tails).await;
                        break;
                    }
                }
            }

            _ = flush_timer.tick() => {
                if !tails.dirty.is_empty() {
                    let _ = flush_dirty(kv.as_ref(), &key_prefix, &mut tails).await;
                }
            }
        }
    }

    info!("metrics persistence writer stopped");
}

/// Writes the tail of every dirty queue. A queue whose write fails stays
/// dirty and is retried on the next flush.
async fn flush_dirty(kv: &dyn KvStore, key_prefix: &str, tails: &mut Tails) -> Result<(), String> {
    let mut last_err = None;

    for queue in std::mem::take(&mut tails.dirty) {
        let Some(tail) = tails.series.get_mut(&queue) else {
            continue;
        };
        let key = series_key(key_prefix, &queue);
        let result = match encode_series(tail.make_contiguous()) {
            Ok(bytes) => kv.set(&key, bytes).await,
            Err(e) => Err(e),
        };
        match result {
            Ok(()) => debug!(queue = %queue, samples = tail.len(), "metrics tail persisted"),
            Err(e) => {
                error!(queue = %queue, error = %e, "failed to persist metrics tail");
                last_err = Some(e.to_string());
                tails.dirty.insert(queue);
            }
        }
    }

    match last_err {
        Some(e) => Err(e),
        None => Ok(()),
    }
}
