use serde::Serialize;

use crate::adapters::{BackendKind, JobSummary, StateCounts};
use crate::metrics::MetricSample;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueuesOverview {
    pub backend: BackendKind,
    pub metrics_enabled: bool,
    pub queues: Vec<QueueOverview>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueOverview {
    pub name: String,
    pub prefix: String,
    /// Live counts; absent when the store could not be read for this queue.
    pub counts: Option<StateCounts>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub latest_sample: Option<MetricSample>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobsPage {
    pub items: Vec<JobSummary>,
    pub has_more: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobDetail {
    #[serde(flatten)]
    pub job: JobSummary,
    pub queue: String,
    pub created_at: String,
}
