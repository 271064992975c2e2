use std::net::SocketAddr;

use anyhow::{Context, Result};
use envizion_api::{build_app, ApiConfig};
use envizion_observability::init_tracing;

const PAGES: &[&str] = &["/", "/chatbot", "/gallery", "/donation", "/presentation"];

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    init_tracing("envizion_api");

    let config = ApiConfig::from_env();
    let bind = config.bind.clone();
    let static_dir = config.static_dir.display().to_string();

    let app = build_app(config).await?;

    let listener = tokio::net::TcpListener::bind(&bind)
        .await
        .with_context(|| format!("failed to bind {bind}"))?;
    tracing::info!(bind = %bind, static_dir = %static_dir, pages = ?PAGES, "envizion web interface started");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    tracing::info!("envizion web interface stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        tracing::warn!(%error, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
