//! Process configuration.
//!
//! All settings come from flags or environment variables and are validated once at
//! startup into an immutable [`GatewayConfig`] that is passed explicitly to every
//! component. Nothing reads the environment after startup.

use crate::error::{GatewayError, Result};
use clap::Parser;
use url::Url;

/// Command-line / environment configuration for the gateway process.
#[derive(Debug, Parser)]
#[command(
    name = "mockapi-mcp-gateway",
    version,
    about = "MCP gateway for a MockAPI collection endpoint"
)]
pub struct Args {
    /// Upstream collection URL (GET endpoint returning a JSON collection).
    #[arg(long, env = "MOCKAPI_BASE_URL")]
    pub mockapi_base_url: String,

    /// Shared secret required in the `x-api-key` header on non-exempt paths.
    #[arg(long, env = "MCP_API_KEY")]
    pub api_key: Option<String>,

    /// Public hostname added to the Host/Origin allowlist.
    #[arg(long, env = "PUBLIC_HOSTNAME")]
    pub public_hostname: Option<String>,

    /// Address to bind.
    #[arg(long, default_value = "0.0.0.0")]
    pub bind: String,

    /// Listen port.
    #[arg(long, env = "PORT", default_value_t = 8080)]
    pub port: u16,

    /// MCP transport to mount.
    #[arg(long, env = "MCP_TRANSPORT", value_enum, default_value = "streamable-http")]
    pub transport: TransportMode,

    /// Extra allowed `Host` header values (comma-separated). An entry without a port
    /// matches any port of that hostname.
    #[arg(long, env = "MCP_ALLOWED_HOSTS", value_delimiter = ',')]
    pub allowed_hosts: Vec<String>,

    /// Extra allowed `Origin` header values (comma-separated).
    #[arg(long, env = "MCP_ALLOWED_ORIGINS", value_delimiter = ',')]
    pub allowed_origins: Vec<String>,

    /// Disable Host/Origin allowlisting (DNS-rebinding protection).
    ///
    /// Only for deployments whose listener is not reachable through untrusted DNS.
    #[arg(long, env = "MCP_DISABLE_REBIND_PROTECTION")]
    pub disable_rebind_protection: bool,

    /// Default log level when `RUST_LOG` is not set.
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,
}

/// Which MCP transport the gateway mounts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum TransportMode {
    /// Streamable HTTP at `/mcp`.
    StreamableHttp,
    /// SSE stream at `/sse` with message submission at `/message`.
    Sse,
}

/// Validated, immutable process configuration.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Upstream collection URL.
    pub base_url: Url,
    /// Optional shared secret for the `x-api-key` gate.
    pub api_key: Option<String>,
    /// Optional public hostname for the transport allowlist.
    pub public_hostname: Option<String>,
    /// Bind address.
    pub bind: String,
    /// Listen port.
    pub port: u16,
    /// Mounted MCP transport.
    pub transport: TransportMode,
    /// Extra allowed `Host` values.
    pub allowed_hosts: Vec<String>,
    /// Extra allowed `Origin` values.
    pub allowed_origins: Vec<String>,
    /// Whether Host/Origin allowlisting is enforced.
    pub rebind_protection: bool,
}

impl GatewayConfig {
    /// Validate parsed arguments into a config.
    ///
    /// # Errors
    ///
    /// Returns `GatewayError::Config` if the upstream URL does not parse or is not HTTP(S).
    pub fn from_args(args: Args) -> Result<Self> {
        let base_url = Url::parse(args.mockapi_base_url.trim())
            .map_err(|e| GatewayError::Config(format!("invalid MOCKAPI_BASE_URL: {e}")))?;
        if !matches!(base_url.scheme(), "http" | "https") {
            return Err(GatewayError::Config(format!(
                "invalid MOCKAPI_BASE_URL: unsupported scheme '{}'",
                base_url.scheme()
            )));
        }

        // An empty secret would make the gate unsatisfiable; treat it as absent.
        let api_key = args
            .api_key
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty());

        Ok(Self {
            base_url,
            api_key,
            public_hostname: args.public_hostname.filter(|h| !h.trim().is_empty()),
            bind: args.bind,
            port: args.port,
            transport: args.transport,
            allowed_hosts: args.allowed_hosts,
            allowed_origins: args.allowed_origins,
            rebind_protection: !args.disable_rebind_protection,
        })
    }
}
