//! Error types for the gateway.

use thiserror::Error;

/// Main error type for the gateway.
#[derive(Error, Debug)]
pub enum GatewayError {
    /// Configuration errors (missing or invalid settings). Fatal at startup.
    #[error("configuration error: {0}")]
    Config(String),

    /// The upstream endpoint answered with a non-success status.
    #[error("upstream returned HTTP {0}")]
    UpstreamStatus(u16),

    /// The upstream endpoint could not be reached (connect failure or timeout).
    #[error("upstream unavailable: {0}")]
    UpstreamUnavailable(String),

    /// JSON (de)serialization errors.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for gateway operations.
pub type Result<T> = std::result::Result<T, GatewayError>;
