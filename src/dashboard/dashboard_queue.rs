use axum::extract::rejection::QueryRejection;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use serde_json::json;

use crate::adapters::JobState;
use crate::dashboard::models::queues::JobDetail;
use crate::error::MonitorError;
use crate::utils::format_timestamp_ms;
use crate::MonitorEngine;

const DEFAULT_PAGE_SIZE: i64 = 20;
const MAX_PAGE_SIZE: i64 = 1000;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobsQuery {
    pub state: Option<String>,
    pub page: Option<i64>,
    pub page_size: Option<i64>,
}

pub async fn get_queues(State(engine): State<MonitorEngine>) -> impl IntoResponse {
    Json(engine.dashboard.overview().await)
}

pub async fn get_queue_jobs(
    State(engine): State<MonitorEngine>,
    Path(name): Path<String>,
    query: Result<Query<JobsQuery>, QueryRejection>,
) -> Result<Response, MonitorError> {
    let Query(query) = query?;
    let state = match query.state.as_deref() {
        Some(raw) => raw.parse::<JobState>()?,
        None => JobState::Waiting,
    };
    let page = query.page.unwrap_or(0);
    let page_size = query.page_size.unwrap_or(DEFAULT_PAGE_SIZE).min(MAX_PAGE_SIZE);

    let jobs = engine.dashboard.jobs_page(&name, state, page, page_size).await?;
    Ok(Json(jobs).into_response())
}

pub async fn get_queue_job(
    State(engine): State<MonitorEngine>,
    Path((name, id)): Path<(String, String)>,
) -> Result<Response, MonitorError> {
    match engine.dashboard.job(&name, &id).await? {
        Some(job) => Ok(Json(JobDetail {
            created_at: format_timestamp_ms(job.timestamp),
            queue: name,
            job,
        })
        .into_response()),
        None => Ok((
            StatusCode::NOT_FOUND,
            Json(json!({ "error": "JobNotFoundError", "queue": name, "id": id })),
        )
            .into_response()),
    }
}
