//! MCP tool surface for the collection backend.
//!
//! Three tools are registered once at startup and looked up by name per invocation:
//! `search` (synthetic, no backend call), `fetch` (resolves the one known collection
//! identifier against the backend), and `get_items` (raw collection passthrough).
//!
//! Wire contract: every tool result is exactly one `text` content part whose text is
//! itself a JSON-encoded payload (a `{"results": [...]}` list for search, a Document
//! object for fetch). Clients depend on this double encoding; do not flatten it into
//! structured content.

use crate::backend::BackendClient;
use crate::error::GatewayError;
use rmcp::{
    ErrorData, RoleServer,
    handler::server::ServerHandler,
    model::{
        CallToolRequestParam, CallToolResult, Content, Implementation, JsonObject,
        ListToolsResult, PaginatedRequestParam, ServerCapabilities, ServerInfo, Tool,
    },
    service::RequestContext,
    transport::streamable_http_server::{
        StreamableHttpServerConfig, StreamableHttpService, session::local::LocalSessionManager,
    },
};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::json;
use std::{borrow::Cow, collections::BTreeMap, sync::Arc};

/// Service name advertised during the MCP handshake and on the root route.
pub const SERVICE_NAME: &str = "MockAPI MCP";

/// The single resolvable collection identifier. `search` always returns it and
/// `fetch` only resolves it.
pub const COLLECTION_ID: &str = "mockapi-items";

const TOOL_SEARCH: &str = "search";
const TOOL_FETCH: &str = "fetch";
const TOOL_GET_ITEMS: &str = "get_items";

/// One search hit referencing the collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResult {
    pub id: String,
    pub title: String,
    pub url: String,
}

/// A fetched document.
///
/// Two variants share this shape: a not-found marker (`metadata.error == "not_found"`)
/// and a resolved collection snapshot (`metadata.source == "mockapi"`, `text` holding
/// the backend JSON pretty-printed).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub title: String,
    pub text: String,
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<BTreeMap<String, String>>,
}

impl Document {
    fn not_found(id: &str, url: &url::Url) -> Self {
        Self {
            id: id.to_string(),
            title: format!("No document found for id '{id}'"),
            text: String::new(),
            url: url.to_string(),
            metadata: Some(BTreeMap::from([(
                "error".to_string(),
                "not_found".to_string(),
            )])),
        }
    }

    fn resolved(url: &url::Url, collection: &serde_json::Value) -> Result<Self, GatewayError> {
        Ok(Self {
            id: COLLECTION_ID.to_string(),
            title: "MockAPI items".to_string(),
            text: serde_json::to_string_pretty(collection)?,
            url: url.to_string(),
            metadata: Some(BTreeMap::from([(
                "source".to_string(),
                "mockapi".to_string(),
            )])),
        })
    }
}

/// MCP service exposing the collection tools.
///
/// Read-only after construction; cloned per session without locking.
#[derive(Clone)]
pub struct CollectionService {
    backend: BackendClient,
}

impl CollectionService {
    #[must_use]
    pub fn new(backend: BackendClient) -> Self {
        Self { backend }
    }

    /// Builds the rmcp streamable HTTP service for mounting at `/mcp`.
    #[must_use]
    pub fn streamable_http_service(&self) -> StreamableHttpService<Self, LocalSessionManager> {
        let service = self.clone();
        StreamableHttpService::new(
            move || Ok(service.clone()),
            Default::default(),
            StreamableHttpServerConfig::default(),
        )
    }

    /// Whether `id` names a known collection. Exact, case-sensitive comparison; the
    /// reference deployment knows exactly one identifier.
    fn resolves(id: &str) -> bool {
        id == COLLECTION_ID
    }

    /// Synthetic search: one result referencing the collection, query interpolated
    /// into the title for traceability. Never contacts the backend.
    fn search(&self, query: &str) -> Vec<SearchResult> {
        vec![SearchResult {
            id: COLLECTION_ID.to_string(),
            title: format!("MockAPI items matching '{query}'"),
            url: self.backend.base_url().to_string(),
        }]
    }

    async fn fetch(&self, id: &str) -> Result<Document, GatewayError> {
        if !Self::resolves(id) {
            // A normal tool result, not an error: the client asked for an id we
            // don't have, which is an answerable question.
            return Ok(Document::not_found(id, self.backend.base_url()));
        }
        let collection = self.backend.fetch_collection().await?;
        Document::resolved(self.backend.base_url(), &collection)
    }
}

impl ServerHandler for CollectionService {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: SERVICE_NAME.to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
                ..Default::default()
            },
            instructions: Some(
                "Search and fetch items from a single MockAPI collection endpoint.".to_string(),
            ),
            ..Default::default()
        }
    }

    fn list_tools(
        &self,
        _request: Option<PaginatedRequestParam>,
        _context: RequestContext<RoleServer>,
    ) -> impl std::future::Future<Output = Result<ListToolsResult, ErrorData>> + Send + '_ {
        async move {
            Ok(ListToolsResult {
                tools: tool_descriptors(),
                ..Default::default()
            })
        }
    }

    fn call_tool(
        &self,
        request: CallToolRequestParam,
        _context: RequestContext<RoleServer>,
    ) -> impl std::future::Future<Output = Result<CallToolResult, ErrorData>> + Send + '_ {
        let service = self.clone();
        async move {
            tracing::debug!(tool = %request.name, "tools/call");
            match request.name.as_ref() {
                TOOL_SEARCH => {
                    let args: SearchArgs = parse_args(request.arguments)?;
                    text_envelope(&json!({ "results": service.search(&args.query) }))
                }
                TOOL_FETCH => {
                    let args: FetchArgs = parse_args(request.arguments)?;
                    match service.fetch(&args.id).await {
                        Ok(doc) => text_envelope(&doc),
                        Err(e) => Ok(tool_failure(TOOL_FETCH, &e)),
                    }
                }
                TOOL_GET_ITEMS => {
                    let _args: GetItemsArgs = parse_args(request.arguments)?;
                    match service.backend.fetch_collection().await {
                        Ok(collection) => text_envelope(&collection),
                        Err(e) => Ok(tool_failure(TOOL_GET_ITEMS, &e)),
                    }
                }
                other => Err(ErrorData::invalid_params(
                    format!("unknown tool: {other}"),
                    None,
                )),
            }
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct SearchArgs {
    query: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct FetchArgs {
    id: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct GetItemsArgs {}

fn parse_args<T: DeserializeOwned>(args: Option<JsonObject>) -> Result<T, ErrorData> {
    let value = serde_json::Value::Object(args.unwrap_or_default());
    serde_json::from_value(value)
        .map_err(|e| ErrorData::invalid_params(format!("invalid arguments: {e}"), None))
}

/// Wrap a payload in the required envelope: one text part holding the JSON encoding.
fn text_envelope<T: Serialize>(payload: &T) -> Result<CallToolResult, ErrorData> {
    let text = serde_json::to_string(payload)
        .map_err(|e| ErrorData::internal_error(format!("encode tool result: {e}"), None))?;
    Ok(CallToolResult::success(vec![Content::text(text)]))
}

/// Tool-execution failure framing for upstream errors. Kept distinct from the
/// not-found Document, which is a valid result.
fn tool_failure(tool: &str, err: &GatewayError) -> CallToolResult {
    tracing::warn!(tool, error = %err, "tool call failed");
    CallToolResult::error(vec![Content::text(err.to_string())])
}

fn tool_descriptors() -> Vec<Tool> {
    vec![search_tool(), fetch_tool(), get_items_tool()]
}

fn search_tool() -> Tool {
    Tool {
        name: Cow::Borrowed(TOOL_SEARCH),
        title: Some("Search the collection".to_string()),
        description: Some(Cow::Borrowed(
            "Search the MockAPI collection. Returns result references whose ids can be passed to fetch.",
        )),
        input_schema: Arc::new(object_schema(json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "Free-text search query."
                }
            },
            "required": ["query"],
            "additionalProperties": false
        }))),
        output_schema: None,
        annotations: None,
        icons: None,
        meta: None,
    }
}

fn fetch_tool() -> Tool {
    Tool {
        name: Cow::Borrowed(TOOL_FETCH),
        title: Some("Fetch a document".to_string()),
        description: Some(Cow::Borrowed(
            "Fetch the document for an id returned by search. Unknown ids yield a not-found document.",
        )),
        input_schema: Arc::new(object_schema(json!({
            "type": "object",
            "properties": {
                "id": {
                    "type": "string",
                    "description": "Document id, as returned by search."
                }
            },
            "required": ["id"],
            "additionalProperties": false
        }))),
        output_schema: None,
        annotations: None,
        icons: None,
        meta: None,
    }
}

fn get_items_tool() -> Tool {
    Tool {
        name: Cow::Borrowed(TOOL_GET_ITEMS),
        title: Some("Get raw items".to_string()),
        description: Some(Cow::Borrowed(
            "Fetch items from MockAPI (GET collection endpoint) and return the JSON as-is.",
        )),
        input_schema: Arc::new(object_schema(json!({
            "type": "object",
            "properties": {},
            "additionalProperties": false
        }))),
        output_schema: None,
        annotations: None,
        icons: None,
        meta: None,
    }
}

fn object_schema(value: serde_json::Value) -> JsonObject {
    match value {
        serde_json::Value::Object(map) => map,
        _ => JsonObject::default(),
    }
}
