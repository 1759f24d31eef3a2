use anyhow::Context as _;
use futures::StreamExt as _;
use serde_json::json;
use std::time::Duration;

/// Minimal MCP client for the gateway's streamable HTTP endpoint (`/mcp`).
///
/// Speaks raw HTTP + SSE on purpose so tests exercise the wire contract rather than
/// re-using server-side protocol code.
pub struct McpSession {
    client: reqwest::Client,
    base_url: String,
    session_id: String,
}

impl McpSession {
    pub async fn connect(base_url: &str) -> anyhow::Result<Self> {
        let client = reqwest::Client::new();
        let base_url = base_url.trim_end_matches('/').to_string();

        let init_resp = post_mcp(
            &client,
            &base_url,
            None,
            json!({
                "jsonrpc": "2.0",
                "id": 0,
                "method": "initialize",
                "params": {
                    "protocolVersion": "2024-11-05",
                    "capabilities": {},
                    "clientInfo": { "name": "mockapi-mcp-gateway-integration-tests", "version": "0" }
                }
            }),
        )
        .await?;
        anyhow::ensure!(
            init_resp.status().is_success(),
            "POST /mcp initialize returned {}",
            init_resp.status()
        );

        let session_id = init_resp
            .headers()
            .get("Mcp-Session-Id")
            .and_then(|h| h.to_str().ok())
            .context("missing Mcp-Session-Id header")?
            .to_string();

        let init_msg = read_first_json_message(init_resp).await?;
        anyhow::ensure!(init_msg.get("id") == Some(&json!(0)), "unexpected init id");

        let initialized_resp = post_mcp(
            &client,
            &base_url,
            Some(&session_id),
            json!({ "jsonrpc": "2.0", "method": "notifications/initialized" }),
        )
        .await?;
        anyhow::ensure!(
            initialized_resp.status().as_u16() == 202,
            "POST /mcp notifications/initialized returned {}",
            initialized_resp.status()
        );

        Ok(Self {
            client,
            base_url,
            session_id,
        })
    }

    pub async fn request(
        &self,
        id: u64,
        method: &str,
        params: serde_json::Value,
        timeout_dur: Duration,
    ) -> anyhow::Result<serde_json::Value> {
        let resp = post_mcp(
            &self.client,
            &self.base_url,
            Some(&self.session_id),
            json!({
                "jsonrpc": "2.0",
                "id": id,
                "method": method,
                "params": params,
            }),
        )
        .await?;
        anyhow::ensure!(
            resp.status().is_success(),
            "POST /mcp {method} returned {}",
            resp.status()
        );

        tokio::time::timeout(timeout_dur, read_first_json_message(resp))
            .await
            .context("timeout waiting for response")?
    }
}

/// Parse a tool call response's single text content part as JSON.
#[allow(dead_code)]
pub fn tool_text_json(msg: &serde_json::Value) -> anyhow::Result<serde_json::Value> {
    let content = msg
        .get("result")
        .and_then(|r| r.get("content"))
        .and_then(serde_json::Value::as_array)
        .context("tools/call missing result.content")?;
    anyhow::ensure!(content.len() == 1, "expected exactly one content part");

    let text = content[0]
        .get("text")
        .and_then(serde_json::Value::as_str)
        .context("tools/call missing result.content[0].text")?;
    serde_json::from_str(text).context("tools/call text is not JSON")
}

/// Whether the message is a tool-execution error result.
#[allow(dead_code)]
pub fn tool_is_error(msg: &serde_json::Value) -> bool {
    msg.get("result")
        .and_then(|r| r.get("isError"))
        .and_then(serde_json::Value::as_bool)
        .unwrap_or(false)
}

async fn post_mcp(
    client: &reqwest::Client,
    base_url: &str,
    session_id: Option<&str>,
    body: serde_json::Value,
) -> anyhow::Result<reqwest::Response> {
    let mut req = client
        .post(format!("{base_url}/mcp"))
        .header("Accept", "application/json, text/event-stream")
        .header("Content-Type", "application/json")
        .json(&body);

    if let Some(session_id) = session_id {
        req = req.header("Mcp-Session-Id", session_id);
    }

    req.send().await.context("POST /mcp")
}

/// Read the first JSON-RPC message from a response that may be plain JSON or an
/// event stream.
async fn read_first_json_message(resp: reqwest::Response) -> anyhow::Result<serde_json::Value> {
    let content_type = resp
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|h| h.to_str().ok())
        .map(|s| s.split(';').next().unwrap_or(s).trim().to_ascii_lowercase())
        .unwrap_or_default();

    if content_type == "application/json" {
        return resp.json().await.context("parse JSON response");
    }

    let mut stream = sse_stream::SseStream::from_byte_stream(resp.bytes_stream());
    while let Some(evt) = stream.next().await {
        let evt = evt.context("read SSE event")?;
        let payload = evt.data.unwrap_or_default();
        if payload.trim().is_empty() {
            continue;
        }
        return serde_json::from_str(&payload).context("parse SSE data as JSON");
    }
    anyhow::bail!("event-stream ended without a JSON message")
}
