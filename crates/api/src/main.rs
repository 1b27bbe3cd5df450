use std::sync::Arc;

use anyhow::Context;
use tracing::info;

use fleetrent_api::app::{self, services};
use fleetrent_infra::AppConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env file is fine; real deployments set the variables directly.
    let _ = dotenvy::dotenv();
    fleetrent_observability::init();

    let config = AppConfig::from_env().context("invalid configuration")?;
    let services = services::build_services(&config)
        .await
        .context("failed to initialize the record store")?;
    let app = app::build_app(Arc::new(services));

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;

    info!(
        addr = %listener.local_addr()?,
        store_timeout_ms = config.store_timeout.as_millis() as u64,
        "listening"
    );

    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}
