//! MCP (Model Context Protocol) server implementation

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use axum::routing::post;
use axum::Json;
use axum::Router;
use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;
use tracing::info;

use super::handlers::AppState;
use super::types::JokeIdParam;
use super::types::JokeResponse;
use super::types::SearchResponse;
use crate::models::parse_joke_id;
use crate::models::NewJoke;
use crate::retrieval::SearchRequest;

/// MCP protocol version
const MCP_VERSION: &str = "1.0";

const RESOURCE_SCHEME: &str = "jokes://";

/// Default result count for `get_jokes`
const DEFAULT_TOOL_LIMIT: usize = 5;

/// MCP server information
#[derive(Debug, Serialize, Deserialize)]
pub struct McpServerInfo {
    pub name: String,
    pub version: String,
    pub protocol_version: String,
    pub capabilities: McpCapabilities,
}

/// MCP capabilities
#[derive(Debug, Serialize, Deserialize)]
pub struct McpCapabilities {
    pub resources: bool,
    pub tools: bool,
    pub prompts: bool,
}

/// MCP resource
#[derive(Debug, Serialize, Deserialize)]
pub struct McpResource {
    pub uri: String,
    pub name: String,
    pub description: String,
    pub mime_type: String,
}

/// MCP tool definition
#[derive(Debug, Serialize, Deserialize)]
pub struct McpTool {
    pub name: String,
    pub description: String,
    pub input_schema: Value,
}

/// MCP tool call request
#[derive(Debug, Deserialize)]
pub struct McpToolCallRequest {
    pub name: String,
    #[serde(default)]
    pub arguments: Value,
}

/// MCP resource read request
#[derive(Debug, Deserialize)]
pub struct McpResourceReadRequest {
    pub uri: String,
}

/// MCP tool call response
#[derive(Debug, Serialize, Deserialize)]
pub struct McpToolCallResponse {
    pub content: Vec<McpContent>,
    pub is_error: bool,
}

/// MCP content
#[derive(Debug, Serialize, Deserialize)]
pub struct McpContent {
    pub r#type: String,
    pub text: String,
}

impl McpToolCallResponse {
    fn text(text: String, is_error: bool) -> Self {
        Self {
            content: vec![McpContent {
                r#type: "text".to_string(),
                text,
            }],
            is_error,
        }
    }

    /// Render a service result as pretty JSON or an error message
    fn from_result<T: Serialize>(result: crate::Result<T>) -> Self {
        match result {
            Ok(value) => Self::text(
                serde_json::to_string_pretty(&value).unwrap_or_else(|_| "{}".to_string()),
                false,
            ),
            Err(e) => Self::text(format!("Error: {e}"), true),
        }
    }
}

/// Get MCP server information
async fn get_server_info() -> Json<McpServerInfo> {
    Json(McpServerInfo {
        name: "Joke Retrieval MCP Server".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        protocol_version: MCP_VERSION.to_string(),
        capabilities: McpCapabilities {
            resources: true,
            tools: true,
            prompts: false,
        },
    })
}

/// List available resources
async fn list_resources() -> Json<Vec<McpResource>> {
    Json(vec![
        McpResource {
            uri: "jokes://{id}".to_string(),
            name: "Joke by id".to_string(),
            description: "A single joke with its tags and feedback counters".to_string(),
            mime_type: "application/json".to_string(),
        },
        McpResource {
            uri: "jokes://random".to_string(),
            name: "Random joke".to_string(),
            description: "A joke picked uniformly at random".to_string(),
            mime_type: "application/json".to_string(),
        },
    ])
}

/// List available tools
async fn list_tools() -> Json<Vec<McpTool>> {
    Json(vec![
        McpTool {
            name: "get_joke".to_string(),
            description: "Get the single best joke for a query".to_string(),
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {
                    "query": {
                        "type": "string",
                        "description": "What the joke should be about"
                    },
                    "context": {
                        "type": "string",
                        "description": "Optional context used to match tags and categories"
                    }
                },
                "required": ["query"]
            }),
        },
        McpTool {
            name: "get_jokes".to_string(),
            description: "Get several jokes for a query, best first".to_string(),
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {
                    "query": {
                        "type": "string",
                        "description": "What the jokes should be about"
                    },
                    "limit": {
                        "type": "integer",
                        "description": "Maximum number of jokes",
                        "default": DEFAULT_TOOL_LIMIT
                    },
                    "context": {
                        "type": "string",
                        "description": "Optional context used to match tags and categories"
                    }
                },
                "required": ["query"]
            }),
        },
        McpTool {
            name: "record_feedback".to_string(),
            description: "Record whether the user liked a joke".to_string(),
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {
                    "joke_id": {
                        "type": "string",
                        "description": "Joke id"
                    },
                    "liked": {
                        "type": "boolean",
                        "description": "true for like, false for dislike"
                    },
                    "comment": {
                        "type": "string",
                        "description": "Optional free-text comment"
                    }
                },
                "required": ["joke_id", "liked"]
            }),
        },
        McpTool {
            name: "add_joke".to_string(),
            description: "Add a joke to the corpus".to_string(),
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {
                    "text": { "type": "string" },
                    "category": { "type": "string", "default": "general" },
                    "tags": { "type": "array", "items": { "type": "string" } },
                    "source": { "type": "string" }
                },
                "required": ["text"]
            }),
        },
    ])
}

fn str_arg<'a>(args: &'a Value, name: &str) -> Option<&'a str> {
    args.get(name).and_then(Value::as_str)
}

/// Call a tool
async fn call_tool(
    State(state): State<AppState>,
    Json(req): Json<McpToolCallRequest>,
) -> Result<Json<McpToolCallResponse>, StatusCode> {
    info!("MCP tool call: {}", req.name);
    let args = &req.arguments;

    let response = match req.name.as_str() {
        "get_joke" | "get_jokes" => {
            let query = str_arg(args, "query").ok_or(StatusCode::BAD_REQUEST)?;
            let limit = if req.name == "get_joke" {
                1
            } else {
                args.get("limit")
                    .and_then(Value::as_u64)
                    .map_or(DEFAULT_TOOL_LIMIT, |l| l as usize)
            };

            let mut request = SearchRequest::new(query).with_max_results(limit);
            if let Some(context) = str_arg(args, "context") {
                request = request.with_context(context);
            }

            let result = state.service.search(&request).await.map(SearchResponse::from);
            McpToolCallResponse::from_result(result)
        }
        "record_feedback" => {
            let joke_id: JokeIdParam = args
                .get("joke_id")
                .cloned()
                .and_then(|v| serde_json::from_value(v).ok())
                .ok_or(StatusCode::BAD_REQUEST)?;
            let liked = args
                .get("liked")
                .and_then(Value::as_bool)
                .ok_or(StatusCode::BAD_REQUEST)?;
            let comment = str_arg(args, "comment").map(str::to_string);

            let result = match joke_id.resolve() {
                Ok(id) => state.service.submit_feedback(id, liked, comment).await,
                Err(e) => Err(e),
            };
            McpToolCallResponse::from_result(result)
        }
        "add_joke" => {
            let text = str_arg(args, "text").ok_or(StatusCode::BAD_REQUEST)?;
            let tags: Vec<String> = args
                .get("tags")
                .and_then(Value::as_array)
                .map(|tags| {
                    tags.iter()
                        .filter_map(Value::as_str)
                        .map(str::to_string)
                        .collect()
                })
                .unwrap_or_default();

            let joke = NewJoke {
                id: None,
                text: text.to_string(),
                category: str_arg(args, "category").map(str::to_string),
                tags,
                source: str_arg(args, "source").map(str::to_string),
            };
            let result = state.service.add_joke(joke).await.map(JokeResponse::from);
            McpToolCallResponse::from_result(result)
        }
        _ => return Err(StatusCode::NOT_FOUND),
    };

    Ok(Json(response))
}

/// Read a `jokes://` resource
async fn read_resource(
    State(state): State<AppState>,
    Json(req): Json<McpResourceReadRequest>,
) -> Result<Json<McpToolCallResponse>, StatusCode> {
    info!("MCP resource read: {}", req.uri);

    let target = req
        .uri
        .strip_prefix(RESOURCE_SCHEME)
        .ok_or(StatusCode::BAD_REQUEST)?;

    let response = if target == "random" {
        match state.service.random_joke().await {
            Ok(Some(joke)) => McpToolCallResponse::from_result(Ok(JokeResponse::from(joke))),
            Ok(None) => McpToolCallResponse::text("The corpus is empty".to_string(), true),
            Err(e) => McpToolCallResponse::from_result::<JokeResponse>(Err(e)),
        }
    } else {
        let id = parse_joke_id(target).map_err(|_| StatusCode::BAD_REQUEST)?;
        McpToolCallResponse::from_result(state.service.get_joke(id).await.map(JokeResponse::from))
    };

    Ok(Json(response))
}

/// Create MCP router
pub fn mcp_routes(state: AppState) -> Router {
    Router::new()
        .route("/", get(get_server_info))
        .route("/resources", get(list_resources))
        .route("/resources/read", post(read_resource))
        .route("/tools", get(list_tools))
        .route("/tools/call", post(call_tool))
        .with_state(state)
}
