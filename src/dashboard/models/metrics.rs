use std::collections::BTreeMap;

use serde::Serialize;

use crate::metrics::{CollectorStatus, MetricSample};

pub type CurrentSnapshot = BTreeMap<String, Option<MetricSample>>;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectorOverview {
    pub enabled: bool,
    pub status: Option<CollectorStatus>,
    pub interval_seconds: Option<u64>,
    pub max_samples: Option<usize>,
    pub ticks: u64,
    pub failures: u64,
    pub persisted: bool,
}
