use std::net::SocketAddr;

use anyhow::Context;

use pantry_infra::config::{InfraConfig, parse_var};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    pantry_observability::init().context("invalid PANTRY_LOG_FORMAT")?;

    let config = InfraConfig::from_env().context("invalid store configuration")?;
    let bind_addr: SocketAddr = parse_var(&|var: &str| std::env::var(var).ok(), "PANTRY_BIND_ADDR")?
        .unwrap_or_else(|| SocketAddr::from(([0, 0, 0, 0], 8080)));

    let app = pantry_api::app::build_app_from_config(&config)
        .await
        .context("failed to connect to the backing store")?;

    let listener = tokio::net::TcpListener::bind(bind_addr)
        .await
        .with_context(|| format!("failed to bind {bind_addr}"))?;

    tracing::info!(
        addr = %listener.local_addr()?,
        collection = %config.store.collection,
        "listening"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
