use anyhow::Context;

use sportshub_api::config::ApiConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    sportshub_observability::init();

    let config = ApiConfig::from_env()?;
    let (app, services) = sportshub_api::app::build_app(&config).await?;

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;

    tracing::info!(
        addr = %listener.local_addr()?,
        low_stock_threshold = config.shop.low_stock_threshold,
        max_commit_attempts = config.shop.retry.max_attempts,
        "listening"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("shutdown requested");
        })
        .await
        .context("server error")?;

    services.shutdown();
    Ok(())
}
