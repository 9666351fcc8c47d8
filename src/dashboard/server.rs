use std::future::Future;

use axum::{
    body::Body,
    http::{header, StatusCode, Uri},
    response::IntoResponse,
    routing::get,
    Router,
};
use rust_embed::RustEmbed;
use tower_http::compression::CompressionLayer;

use crate::dashboard::dashboard_metrics::{get_collector_status, get_latest_metrics, get_queue_history};
use crate::dashboard::dashboard_queue::{get_queue_job, get_queue_jobs, get_queues};
use crate::MonitorEngine;

// Embedded dashboard page
#[derive(RustEmbed)]
#[folder = "dashboard/"]
struct Assets;

pub fn build_router(engine: MonitorEngine) -> Router {
    Router::new()
        .route("/queues", get(get_queues))
        .route("/queues/{name}/jobs", get(get_queue_jobs))
        .route("/queues/{name}/jobs/{id}", get(get_queue_job))
        .route("/queues/{name}/history", get(get_queue_history))
        .route("/metrics/latest", get(get_latest_metrics))
        .route("/metrics/status", get(get_collector_status))
        .fallback(static_handler)
        .layer(CompressionLayer::new())
        .with_state(engine)
}

pub async fn start_dashboard_server(
    engine: MonitorEngine,
    host: &str,
    port: u16,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> std::io::Result<()> {
    let app = build_router(engine);

    let addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("🌐 Ready on http://{}/", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
}

// Handler for serving the embedded page (SPA support)
async fn static_handler(uri: Uri) -> impl IntoResponse {
    let mut path = uri.path().trim_start_matches('/').to_string();

    if path.is_empty() {
        path = "index.html".to_string();
    }

    match Assets::get(&path) {
        Some(content) => {
            let mime = mime_guess::from_path(&path).first_or_octet_stream();
            ([(header::CONTENT_TYPE, mime.as_ref())], Body::from(content.data)).into_response()
        }
        None => {
            // SPA Fallback: unknown paths get index.html
            match Assets::get("index.html") {
                Some(content) => {
                    let mime = mime_guess::from_path("index.html").first_or_octet_stream();
                    ([(header::CONTENT_TYPE, mime.as_ref())], Body::from(content.data)).into_response()
                }
                None => (StatusCode::NOT_FOUND, "Dashboard not found (index.html missing)").into_response(),
            }
        }
    }
}
