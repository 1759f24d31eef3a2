//! MCP gateway for a single MockAPI collection endpoint.
//!
//! Advertises `search`/`fetch`/`get_items` tools over the MCP streamable HTTP or SSE
//! transport, multiplexed with root/health routes on one listener, behind a layered
//! security policy (Host/Origin allowlisting plus an optional shared-secret gate).

pub mod app;
pub mod backend;
pub mod config;
pub mod error;
pub mod security;
pub mod tools;

pub use error::{GatewayError, Result};
