use tokio::sync::oneshot;

use crate::metrics::MetricSample;

/// Operations accepted by the metrics writer.
#[derive(Debug)]
pub enum StorageOp {
    /// Series restored at startup; becomes the writer's tail for `queue`.
    Seed {
        queue: String,
        samples: Vec<MetricSample>,
    },
    /// One accepted sample, in append order for its queue.
    Append {
        queue: String,
        sample: MetricSample,
    },
    /// Flush every dirty queue, then reply.
    Flush {
        reply: oneshot::Sender<Result<(), String>>,
    },
    /// Exit after the pending batch has been written.
    Stop,
}
