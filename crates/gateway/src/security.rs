//! Layered request security.
//!
//! One wrapping middleware applies two independent checks, in order, before any route
//! logic runs:
//!
//! 1. Transport allowlist: the `Host` header (and `Origin`, when present) must match
//!    the configured allowlist. This blocks DNS-rebinding requests, where a browser
//!    script is pointed at the gateway's private address under an attacker hostname.
//!    Rejections are protocol-level (421/403 plain text), not JSON bodies.
//! 2. Shared-secret gate: with a secret configured, non-exempt paths must present it
//!    in `x-api-key` or get `401 {"error":"unauthorized"}`. Root, health, and the
//!    transport mount stay reachable without a secret: protocol clients performing
//!    initial discovery cannot supply one yet. That weakening is deliberate; keep it.

use crate::config::{GatewayConfig, TransportMode};
use axum::{
    Json,
    extract::{Request, State},
    http::{HeaderMap, StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde_json::json;
use std::sync::Arc;

/// Header carrying the shared secret.
pub const API_KEY_HEADER: &str = "x-api-key";

/// Immutable security configuration, built once at startup and shared read-only
/// across all connections.
#[derive(Debug, Clone)]
pub struct SecurityContext {
    allowed_hosts: Vec<String>,
    allowed_origins: Vec<String>,
    api_key: Option<String>,
    exempt_exact: Vec<String>,
    exempt_prefixes: Vec<String>,
    rebind_protection: bool,
}

impl SecurityContext {
    #[must_use]
    pub fn from_config(config: &GatewayConfig) -> Self {
        let mut allowed_hosts = vec!["localhost".to_string(), "127.0.0.1".to_string()];
        if let Some(hostname) = &config.public_hostname {
            allowed_hosts.push(hostname.clone());
        }
        allowed_hosts.extend(config.allowed_hosts.iter().cloned());

        let exempt_prefixes = match config.transport {
            TransportMode::StreamableHttp => vec!["/mcp".to_string()],
            TransportMode::Sse => vec!["/sse".to_string(), "/message".to_string()],
        };

        Self {
            allowed_hosts,
            allowed_origins: config.allowed_origins.clone(),
            api_key: config.api_key.clone(),
            exempt_exact: vec!["/".to_string(), "/health".to_string()],
            exempt_prefixes,
            rebind_protection: config.rebind_protection,
        }
    }

    /// Whether `path` bypasses the shared-secret gate.
    ///
    /// Prefixes match whole path segments only: `/mcp` exempts `/mcp` and
    /// `/mcp/...` but not `/mcpadmin`.
    #[must_use]
    pub fn is_exempt(&self, path: &str) -> bool {
        self.exempt_exact.iter().any(|p| p == path)
            || self.exempt_prefixes.iter().any(|p| {
                path.strip_prefix(p.as_str())
                    .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'))
            })
    }

    fn host_allowed(&self, host: &str) -> bool {
        self.allowed_hosts.iter().any(|p| host_matches(p, host))
    }

    fn origin_allowed(&self, origin: &str) -> bool {
        if self
            .allowed_origins
            .iter()
            .any(|o| o.eq_ignore_ascii_case(origin))
        {
            return true;
        }
        // Fall back to the host allowlist: an origin whose host we would accept as a
        // Host header is not a rebinding vector.
        let Ok(parsed) = url::Url::parse(origin) else {
            return false;
        };
        let Some(host) = parsed.host_str() else {
            return false;
        };
        let host_port = match parsed.port() {
            Some(port) => format!("{host}:{port}"),
            None => host.to_string(),
        };
        self.host_allowed(&host_port)
    }

    fn check_transport(&self, headers: &HeaderMap) -> Result<(), Response> {
        if !self.rebind_protection {
            return Ok(());
        }

        let host = headers.get(header::HOST).and_then(|h| h.to_str().ok());
        match host {
            Some(host) if self.host_allowed(host) => {}
            other => {
                tracing::warn!(
                    host = other.unwrap_or("<missing>"),
                    "rejected request: Host header not in allowlist"
                );
                return Err((
                    StatusCode::MISDIRECTED_REQUEST,
                    "Misdirected: Host header is not allowed",
                )
                    .into_response());
            }
        }

        if let Some(origin) = headers.get(header::ORIGIN).and_then(|h| h.to_str().ok())
            && !self.origin_allowed(origin)
        {
            tracing::warn!(origin, "rejected request: Origin not in allowlist");
            return Err((StatusCode::FORBIDDEN, "Forbidden: Origin is not allowed").into_response());
        }

        Ok(())
    }

    // Exact comparison; the configured secret is normalized once at startup.
    fn api_key_ok(&self, headers: &HeaderMap) -> bool {
        let Some(expected) = &self.api_key else {
            return true;
        };
        headers
            .get(API_KEY_HEADER)
            .and_then(|h| h.to_str().ok())
            .is_some_and(|presented| presented == expected)
    }
}

/// Match a `Host` header value against one allowlist pattern.
///
/// A pattern without a port matches any port of that hostname; `*` matches everything.
fn host_matches(pattern: &str, host: &str) -> bool {
    if pattern == "*" {
        return true;
    }
    if pattern.eq_ignore_ascii_case(host) {
        return true;
    }
    if !pattern.contains(':')
        && let Some((name, _port)) = host.rsplit_once(':')
    {
        return pattern.eq_ignore_ascii_case(name);
    }
    false
}

/// The single security layer wrapped around the whole route table.
pub async fn enforce(
    State(ctx): State<Arc<SecurityContext>>,
    request: Request,
    next: Next,
) -> Response {
    if let Err(rejection) = ctx.check_transport(request.headers()) {
        return rejection;
    }

    // Exemption is checked before the secret, never after.
    if !ctx.is_exempt(request.uri().path()) && !ctx.api_key_ok(request.headers()) {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "error": "unauthorized" })),
        )
            .into_response();
    }

    next.run(request).await
}
