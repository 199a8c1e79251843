use std::sync::Arc;

use anyhow::Context;

use weeb_api::app::{build_app, services::AppServices};
use weeb_api::config::ApiConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    weeb_observability::init();

    let config = ApiConfig::from_env()?;
    let services = Arc::new(AppServices::from_config(&config).await?);
    let app = build_app(services);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;

    tracing::info!(addr = %listener.local_addr()?, environment = %config.environment, "listening");

    axum::serve(listener, app).await?;
    Ok(())
}
