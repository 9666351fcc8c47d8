use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use bullscope::adapters::JobState;
use bullscope::dashboard::build_router;
use bullscope::error::MonitorError;
use bullscope::utils::current_time_ms;
use bullscope::MonitorEngine;
use serde_json::Value;
use tower::ServiceExt;

mod helpers;
use helpers::{sample, seed_failed, seed_waiting, setup_engine};

async fn get(engine: &MonitorEngine, uri: &str) -> (StatusCode, Value) {
    let response = build_router(engine.clone())
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

#[cfg(test)]
mod dashboard_tests {
    use super::*;

    // =========================================================================================
    // 1. QUERY SERVICE
    // =========================================================================================

    mod query_service {
        use super::*;

        #[tokio::test]
        async fn test_jobs_page_reports_has_more() {
            let (engine, store) = setup_engine(&["mail"], 10);
            seed_waiting(&store, "mail", 6);

            let first = engine.dashboard.jobs_page("mail", JobState::Waiting, 0, 5).await.unwrap();
            assert_eq!(first.items.len(), 5);
            assert!(first.has_more);
            assert_eq!(first.items[0].id, "6", "newest first");

            let second = engine.dashboard.jobs_page("mail", JobState::Waiting, 1, 5).await.unwrap();
            assert_eq!(second.items.len(), 1);
            assert!(!second.has_more);
            assert_eq!(second.items[0].id, "1");
        }

        #[tokio::test]
        async fn test_unknown_queue_is_rejected_everywhere() {
            let (engine, _) = setup_engine(&["mail"], 10);

            assert!(matches!(
                engine.dashboard.history("nope", None),
                Err(MonitorError::UnknownQueue(q)) if q == "nope"
            ));
            assert!(matches!(
                engine.dashboard.jobs_page("nope", JobState::Waiting, 0, 5).await,
                Err(MonitorError::UnknownQueue(_))
            ));
            assert!(matches!(
                engine.dashboard.job("nope", "1").await,
                Err(MonitorError::UnknownQueue(_))
            ));
        }

        #[tokio::test]
        async fn test_history_window_filters_old_samples() {
            let (engine, _) = setup_engine(&["mail"], 10);
            let now = current_time_ms();
            engine.metrics.append("mail", sample("mail", now - 120_000, 1));
            engine.metrics.append("mail", sample("mail", now - 1_000, 2));

            let recent = engine.dashboard.history("mail", Some(Duration::from_secs(60))).unwrap();
            assert_eq!(recent.len(), 1);
            assert_eq!(recent[0].counts_by_state[&JobState::Waiting], 2);

            let all = engine.dashboard.history("mail", None).unwrap();
            assert_eq!(all.len(), 2);
        }

        #[tokio::test]
        async fn test_current_snapshot_marks_missing_queues() {
            let (engine, _) = setup_engine(&["mail", "sms"], 10);
            engine.metrics.append("mail", sample("mail", 5, 3));

            let snapshot = engine.dashboard.current_snapshot(&["mail".to_string(), "sms".to_string()]);
            assert_eq!(snapshot["mail"].as_ref().unwrap().timestamp, 5);
            assert!(snapshot["sms"].is_none());
        }

        #[tokio::test]
        async fn test_job_lookup_reports_state() {
            let (engine, store) = setup_engine(&["mail"], 10);
            seed_failed(&store, "mail", "42", 3);

            let job = engine.dashboard.job("mail", "42").await.unwrap().unwrap();
            assert_eq!(job.state, JobState::Failed);
            assert_eq!(job.attempts, 3);
            assert!(engine.dashboard.job("mail", "43").await.unwrap().is_none());
        }
    }

    // =========================================================================================
    // 2. HTTP ROUTES
    // =========================================================================================

    mod routes {
        use super::*;

        #[tokio::test]
        async fn test_queues_overview() {
            let (engine, store) = setup_engine(&["mail", "sms"], 10);
            seed_waiting(&store, "mail", 2);

            let (status, body) = get(&engine, "/queues").await;
            assert_eq!(status, StatusCode::OK);
            assert_eq!(body["backend"], "bull");
            assert_eq!(body["metricsEnabled"], true);
            assert_eq!(body["queues"][0]["name"], "mail");
            assert_eq!(body["queues"][0]["counts"]["waiting"], 2);
            assert_eq!(body["queues"][1]["counts"]["waiting"], 0);
        }

        #[tokio::test]
        async fn test_unknown_queue_is_404() {
            let (engine, _) = setup_engine(&["mail"], 10);

            let (status, body) = get(&engine, "/queues/nope/history").await;
            assert_eq!(status, StatusCode::NOT_FOUND);
            assert_eq!(body["error"], "UnknownQueueError");
            assert_eq!(body["queue"], "nope");

            let (status, _) = get(&engine, "/queues/nope/jobs?state=failed").await;
            assert_eq!(status, StatusCode::NOT_FOUND);
        }

        #[tokio::test]
        async fn test_jobs_route_paginates() {
            let (engine, store) = setup_engine(&["mail"], 10);
            seed_waiting(&store, "mail", 6);

            let (status, body) = get(&engine, "/queues/mail/jobs?state=waiting&page=0&pageSize=5").await;
            assert_eq!(status, StatusCode::OK);
            assert_eq!(body["items"].as_array().unwrap().len(), 5);
            assert_eq!(body["hasMore"], true);
            assert_eq!(body["items"][0]["state"], "waiting");
            assert_eq!(body["items"][0]["name"], "send");
        }

        #[tokio::test]
        async fn test_bad_query_parameters_are_400() {
            let (engine, _) = setup_engine(&["mail"], 10);

            let (status, body) = get(&engine, "/queues/mail/jobs?state=sleeping").await;
            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert_eq!(body["error"], "InvalidStateError");

            let (status, body) = get(&engine, "/queues/mail/jobs?pageSize=0").await;
            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert_eq!(body["error"], "InvalidRangeError");

            let (status, _) = get(&engine, "/queues/mail/jobs?page=-1").await;
            assert_eq!(status, StatusCode::BAD_REQUEST);

            let (status, body) = get(&engine, "/queues/mail/jobs?page=abc").await;
            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert_eq!(body["error"], "InvalidRangeError");
            assert!(body["message"].is_string());

            let (status, body) = get(&engine, "/queues/mail/history?windowSeconds=-5").await;
            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert_eq!(body["error"], "InvalidRangeError");
        }

        #[tokio::test]
        async fn test_unreachable_store_is_503() {
            let (engine, store) = setup_engine(&["mail"], 10);
            store.set_unreachable(true);

            let (status, body) = get(&engine, "/queues/mail/jobs").await;
            assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
            assert_eq!(body["error"], "ConnectionError");

            let (status, body) = get(&engine, "/queues").await;
            assert_eq!(status, StatusCode::OK, "overview degrades per queue");
            assert!(body["queues"][0]["counts"].is_null());
            assert!(body["queues"][0]["error"].is_string());
        }

        #[tokio::test]
        async fn test_job_detail_route() {
            let (engine, store) = setup_engine(&["mail"], 10);
            seed_failed(&store, "mail", "42", 2);

            let (status, body) = get(&engine, "/queues/mail/jobs/42").await;
            assert_eq!(status, StatusCode::OK);
            assert_eq!(body["id"], "42");
            assert_eq!(body["queue"], "mail");
            assert_eq!(body["state"], "failed");
            assert!(body["createdAt"].as_str().unwrap().starts_with("2023-11-14"));

            let (status, body) = get(&engine, "/queues/mail/jobs/missing").await;
            assert_eq!(status, StatusCode::NOT_FOUND);
            assert_eq!(body["error"], "JobNotFoundError");
        }

        #[tokio::test]
        async fn test_history_and_latest_metrics() {
            let (engine, store) = setup_engine(&["mail"], 10);
            seed_waiting(&store, "mail", 3);
            engine.collector.as_ref().unwrap().sample_once().await;

            let (status, body) = get(&engine, "/queues/mail/history").await;
            assert_eq!(status, StatusCode::OK);
            assert_eq!(body.as_array().unwrap().len(), 1);
            assert_eq!(body[0]["queueName"], "mail");
            assert_eq!(body[0]["countsByState"]["waiting"], 3);

            let (status, body) = get(&engine, "/metrics/latest").await;
            assert_eq!(status, StatusCode::OK);
            assert_eq!(body["mail"]["countsByState"]["waiting"], 3);

            let (status, body) = get(&engine, "/metrics/status").await;
            assert_eq!(status, StatusCode::OK);
            assert_eq!(body["enabled"], true);
            assert_eq!(body["status"], "idle");
            assert_eq!(body["ticks"], 1);
        }

        #[tokio::test]
        async fn test_unmatched_paths_serve_dashboard_page() {
            let (engine, _) = setup_engine(&["mail"], 10);

            let response = build_router(engine)
                .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::OK);
            assert!(response.headers()["content-type"].to_str().unwrap().starts_with("text/html"));
        }
    }
}
