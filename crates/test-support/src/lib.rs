use anyhow::Context as _;
use axum::{Json, Router, http::StatusCode, routing::get};
use std::net::TcpListener;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

/// Pick an unused TCP port on localhost.
///
/// Note: this does not reserve the port; it's still possible for another process to bind it
/// before you do.
///
/// # Errors
///
/// Returns an error if binding an ephemeral localhost port fails or if the bound socket's
/// local address cannot be read.
pub fn pick_unused_port() -> anyhow::Result<u16> {
    let listener = TcpListener::bind("127.0.0.1:0").context("bind ephemeral port")?;
    Ok(listener.local_addr()?.port())
}

/// Poll an HTTP URL until it answers with a 2xx, or give up after `timeout_dur`.
///
/// Used as a readiness gate for servers spawned in-process: the listener is bound
/// before the spawn, but polling proves the serve task is actually accepting.
///
/// # Errors
///
/// Returns an error if the timeout elapses before the endpoint answers with a 2xx.
pub async fn wait_http_ok(url: &str, timeout_dur: Duration) -> anyhow::Result<()> {
    let client = reqwest::Client::new();
    let deadline = Instant::now() + timeout_dur;
    while Instant::now() < deadline {
        if let Ok(resp) = client.get(url).send().await
            && resp.status().is_success()
        {
            return Ok(());
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    anyhow::bail!("timed out after {timeout_dur:?} waiting for {url}")
}

/// In-process stand-in for the MockAPI collection endpoint.
///
/// Serves a fixed status/body at `/items` and counts requests, so tests can assert
/// whether (and how often) the gateway actually called the upstream.
pub struct MockUpstream {
    url: String,
    hits: Arc<AtomicUsize>,
    ct: CancellationToken,
}

impl MockUpstream {
    /// Start the mock upstream on an ephemeral localhost port.
    ///
    /// # Errors
    ///
    /// Returns an error if the status code is invalid or the listener cannot be bound.
    pub async fn start(status: u16, body: serde_json::Value) -> anyhow::Result<Self> {
        let status = StatusCode::from_u16(status).context("invalid upstream status")?;
        let hits = Arc::new(AtomicUsize::new(0));

        let handler_hits = Arc::clone(&hits);
        let app = Router::new().route(
            "/items",
            get(move || {
                let hits = Arc::clone(&handler_hits);
                let body = body.clone();
                async move {
                    hits.fetch_add(1, Ordering::SeqCst);
                    (status, Json(body))
                }
            }),
        );

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .context("bind mock upstream")?;
        let addr = listener.local_addr()?;

        let ct = CancellationToken::new();
        let shutdown = ct.clone();
        tokio::spawn(async move {
            let _ = axum::serve(listener, app)
                .with_graceful_shutdown(async move { shutdown.cancelled().await })
                .await;
        });

        Ok(Self {
            url: format!("http://{addr}/items"),
            hits,
            ct,
        })
    }

    /// Collection URL to hand to the gateway as `MOCKAPI_BASE_URL`.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Number of requests the upstream has served so far.
    #[must_use]
    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }
}

impl Drop for MockUpstream {
    fn drop(&mut self) {
        self.ct.cancel();
    }
}
