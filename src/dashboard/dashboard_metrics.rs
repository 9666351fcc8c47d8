use std::time::Duration;

use axum::extract::rejection::QueryRejection;
use axum::extract::{Path, Query, State};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;

use crate::error::MonitorError;
use crate::MonitorEngine;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryQuery {
    pub window_seconds: Option<u64>,
}

pub async fn get_queue_history(
    State(engine): State<MonitorEngine>,
    Path(name): Path<String>,
    query: Result<Query<HistoryQuery>, QueryRejection>,
) -> Result<Response, MonitorError> {
    let Query(query) = query?;
    let window = query.window_seconds.map(Duration::from_secs);
    let samples = engine.dashboard.history(&name, window)?;
    Ok(Json(samples).into_response())
}

pub async fn get_latest_metrics(State(engine): State<MonitorEngine>) -> impl IntoResponse {
    let names = engine.dashboard.queue_names();
    Json(engine.dashboard.current_snapshot(&names))
}

pub async fn get_collector_status(State(engine): State<MonitorEngine>) -> impl IntoResponse {
    Json(engine.dashboard.collector_status())
}
