use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use bullscope::config::{Cli, Config};
use bullscope::dashboard::start_dashboard_server;
use bullscope::MonitorEngine;

// ========================================
// MAIN ENTRY POINT
// ========================================

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    let config = Config::from_cli(Cli::parse());

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.server.log_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    tracing::info!("🚀 Bullscope v{} starting...", env!("CARGO_PKG_VERSION"));

    let engine = MonitorEngine::connect(&config)
        .await
        .context("failed to initialize queue adapter")?;
    engine.init().await;

    start_dashboard_server(
        engine.clone(),
        &config.server.host,
        config.server.port,
        shutdown_signal(),
    )
    .await
    .with_context(|| format!("dashboard server failed on {}:{}", config.server.host, config.server.port))?;

    tracing::info!("dashboard stopped, flushing metrics");
    engine.shutdown().await;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for CTRL+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("received shutdown signal");
}
