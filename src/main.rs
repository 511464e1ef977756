use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::EnvFilter;

use coursehub_api::app::{build_router, AppState, Storage};
use coursehub_api::config::AppConfig;
use coursehub_api::render::HeadlessBrowserRenderer;
use coursehub_api::services::CertificateService;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so cargo run picks up DATABASE_URL, BASE_URL, etc.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = AppConfig::from_env();
    tracing::info!("Starting CourseHub API in {:?} mode", config.environment);

    let storage = Storage::open(&config.database)
        .await
        .context("failed to open storage")?;

    let renderer = Arc::new(HeadlessBrowserRenderer::from_config(&config.certificates));
    let certificates =
        CertificateService::from_config(storage.certificates.clone(), renderer, &config);

    let port = config.server.port;
    let state = AppState::new(config, storage.partitions, certificates);
    let app = build_router(state);

    let bind_addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;

    tracing::info!("CourseHub API listening on http://{}", bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    if let Some(manager) = &storage.manager {
        manager.close_all().await;
    }
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
