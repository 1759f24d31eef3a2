//! Route composition.
//!
//! One process-wide router: plain discovery/health routes plus the mounted MCP
//! transport, with the security policy layered around the whole table (so unmatched
//! paths are gated too).

use crate::config::{GatewayConfig, TransportMode};
use crate::security::{self, SecurityContext};
use crate::tools::{CollectionService, SERVICE_NAME};
use axum::{Json, Router, middleware, routing::get};
use rmcp::transport::sse_server::{SseServer, SseServerConfig};
use serde_json::{Value, json};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Build the gateway router for the configured transport.
///
/// `ct` cancels the SSE transport's session tasks on shutdown; it is unused in
/// streamable HTTP mode.
pub fn build_router(
    config: &GatewayConfig,
    service: CollectionService,
    ct: CancellationToken,
) -> Router {
    let security = Arc::new(SecurityContext::from_config(config));

    let router = match config.transport {
        TransportMode::StreamableHttp => {
            Router::new().nest_service("/mcp", service.streamable_http_service())
        }
        TransportMode::Sse => sse_router(&service, ct),
    };

    let meta = root_metadata(config);
    router
        .route(
            "/",
            get(move || {
                let meta = meta.clone();
                async move { Json(meta) }
            }),
        )
        .route("/health", get(health))
        .layer(middleware::from_fn_with_state(security, security::enforce))
}

fn sse_router(service: &CollectionService, ct: CancellationToken) -> Router {
    let (sse_server, router) = SseServer::new(SseServerConfig {
        // The bind address is unused: the transport is mounted into our router and
        // served by the process-wide listener.
        bind: SocketAddr::from(([0, 0, 0, 0], 0)),
        sse_path: "/sse".to_string(),
        post_path: "/message".to_string(),
        ct,
        sse_keep_alive: None,
    });

    let service = service.clone();
    sse_server.with_service(move || service.clone());
    router
}

fn root_metadata(config: &GatewayConfig) -> Value {
    let (endpoint, transport) = match config.transport {
        TransportMode::StreamableHttp => ("/mcp", "streamable-http"),
        TransportMode::Sse => ("/sse", "sse"),
    };
    json!({
        "ok": true,
        "service": SERVICE_NAME,
        "transport": transport,
        "mcp_endpoint": endpoint,
        "note": "Use an MCP client for the MCP endpoint; browsers will not work.",
    })
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
