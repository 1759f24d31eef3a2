use anyhow::Context as _;
use clap::Parser as _;
use mockapi_mcp_gateway::{
    app,
    backend::BackendClient,
    config::{Args, GatewayConfig},
    tools::CollectionService,
};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_tracing(&args.log_level);

    let config = GatewayConfig::from_args(args)?;
    let backend = BackendClient::new(config.base_url.clone())?;
    let service = CollectionService::new(backend);

    let ct = CancellationToken::new();
    let router = app::build_router(&config, service, ct.clone());

    let addr = format!("{}:{}", config.bind, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("bind {addr}"))?;

    tracing::info!(
        addr = %addr,
        transport = ?config.transport,
        upstream = %config.base_url,
        api_key_gate = config.api_key.is_some(),
        rebind_protection = config.rebind_protection,
        "gateway listening"
    );

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal(ct))
        .await
        .context("serve")?;

    Ok(())
}

async fn shutdown_signal(ct: CancellationToken) {
    let _ = tokio::signal::ctrl_c().await;
    tracing::info!("shutdown signal received");
    ct.cancel();
}

fn init_tracing(default_level: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}
