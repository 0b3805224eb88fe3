use std::sync::Arc;

use anyhow::Context;

use tingo_api::app::{build_app, services::build_services};
use tingo_api::config::AppConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // `.env` is optional; real environment variables win.
    dotenvy::dotenv().ok();
    tingo_observability::init();

    let config = AppConfig::from_env().context("invalid configuration")?;
    tracing::info!(config = ?config, "starting tingo-api");

    let services = build_services(&config)
        .await
        .context("failed to initialise backend")?;
    let app = build_app(Arc::new(services), &config.cors_origins);

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;

    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}
