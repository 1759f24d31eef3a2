use mockapi_mcp_gateway::{
    app,
    backend::BackendClient,
    config::{GatewayConfig, TransportMode},
    tools::CollectionService,
};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use url::Url;

pub use mockapi_gateway_test_support::MockUpstream;

/// A gateway instance served in-process on an ephemeral localhost port.
pub struct TestGateway {
    pub base_url: String,
    ct: CancellationToken,
}

impl Drop for TestGateway {
    fn drop(&mut self) {
        self.ct.cancel();
    }
}

/// Config pointing at `upstream_url`, with production defaults otherwise
/// (rebind protection on, no API key, streamable HTTP transport).
pub fn test_config(upstream_url: &str) -> GatewayConfig {
    GatewayConfig {
        base_url: Url::parse(upstream_url).expect("upstream url"),
        api_key: None,
        public_hostname: None,
        bind: "127.0.0.1".to_string(),
        port: 0,
        transport: TransportMode::StreamableHttp,
        allowed_hosts: Vec::new(),
        allowed_origins: Vec::new(),
        rebind_protection: true,
    }
}

pub async fn spawn_gateway(config: &GatewayConfig) -> anyhow::Result<TestGateway> {
    let backend = BackendClient::new(config.base_url.clone())?;
    let service = CollectionService::new(backend);

    let ct = CancellationToken::new();
    let router = app::build_router(config, service, ct.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;

    let shutdown = ct.clone();
    tokio::spawn(async move {
        let _ = axum::serve(listener, router)
            .with_graceful_shutdown(async move { shutdown.cancelled().await })
            .await;
    });

    let base_url = format!("http://{addr}");
    mockapi_gateway_test_support::wait_http_ok(&format!("{base_url}/health"), Duration::from_secs(5))
        .await?;

    Ok(TestGateway { base_url, ct })
}
