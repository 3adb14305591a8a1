//! MCP Server Implementation
//!
//! Handles MCP protocol requests and routes them to the graph store.

use super::protocol::*;
use super::resources::{get_all_resources, read_resource};
use super::tools::get_all_tools;
use super::transport::{AsyncStdioTransport, Incoming};
use crate::error::ToolResult;
use crate::handlers;
use kg_store::GraphStore;
use serde_json::Value;
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncWrite};

pub const PROTOCOL_VERSION: &str = "2024-11-05";
const SERVER_NAME: &str = "kg";
const SERVER_VERSION: &str = env!("CARGO_PKG_VERSION");

const INSTRUCTIONS: &str = "Knowledge graph of concepts and relations. Call kg_boot first, \
kg_get or kg_traverse to explore, kg_search to find nodes, kg_bulk for multi-step edits.";

/// MCP Server - handles protocol messages
#[derive(Clone)]
pub struct McpServer {
    store: Arc<GraphStore>,
}

impl McpServer {
    pub fn new(store: Arc<GraphStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<GraphStore> {
        &self.store
    }

    /// Serve newline-delimited JSON-RPC on stdin/stdout until EOF
    pub async fn run(&self) -> std::io::Result<()> {
        tracing::info!("MCP server starting on stdio");
        self.serve(AsyncStdioTransport::stdio()).await
    }

    /// Serve any line transport until EOF
    pub async fn serve<R, W>(&self, mut transport: AsyncStdioTransport<R, W>) -> std::io::Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        loop {
            let response = match transport.read_message().await? {
                Some(Incoming::Request(request)) => self.handle_request(request).await,
                Some(Incoming::Invalid(error)) => Some(JsonRpcResponse::error(None, error)),
                Some(Incoming::Empty) => continue,
                None => {
                    tracing::info!("Client disconnected");
                    break;
                }
            };
            if let Some(response) = response {
                transport.write_response(&response).await?;
            }
        }

        Ok(())
    }

    /// Handle a JSON-RPC request; notifications yield `None`
    pub async fn handle_request(&self, request: JsonRpcRequest) -> Option<JsonRpcResponse> {
        tracing::debug!("Handling request: {}", request.method);

        let notification = request.is_notification();
        let id = request.id;
        let response = match request.method.as_str() {
            "initialize" => self.handle_initialize(id, request.params),
            "notifications/initialized" | "initialized" => {
                tracing::debug!("Client initialized");
                JsonRpcResponse::success(id, Value::Null)
            }
            "notifications/cancelled" => JsonRpcResponse::success(id, Value::Null),
            "ping" => to_response(id, &PingResult {}),
            "tools/list" => to_response(
                id,
                &ToolsListResult {
                    tools: get_all_tools(),
                },
            ),
            "tools/call" => self.handle_tools_call(id, request.params).await,
            "resources/list" => to_response(
                id,
                &ResourcesListResult {
                    resources: get_all_resources(),
                },
            ),
            "resources/read" => self.handle_resources_read(id, request.params).await,
            _ => JsonRpcResponse::error(id, JsonRpcError::method_not_found(&request.method)),
        };

        if notification {
            None
        } else {
            Some(response)
        }
    }

    fn handle_initialize(&self, id: Option<Value>, params: Option<Value>) -> JsonRpcResponse {
        let params: InitializeParams = params
            .and_then(|p| serde_json::from_value(p).ok())
            .unwrap_or_default();

        if let Some(client) = &params.client_info {
            tracing::info!(
                "Client connected: {} {}",
                client.name,
                client.version.as_deref().unwrap_or("")
            );
        }

        let result = InitializeResult {
            protocol_version: PROTOCOL_VERSION.to_string(),
            capabilities: ServerCapabilities {
                resources: Some(ResourcesCapability {
                    subscribe: Some(false),
                    list_changed: Some(false),
                }),
                tools: Some(ToolsCapability {
                    list_changed: Some(false),
                }),
            },
            server_info: ServerInfo {
                name: SERVER_NAME.to_string(),
                version: Some(SERVER_VERSION.to_string()),
            },
            instructions: Some(INSTRUCTIONS.to_string()),
        };

        to_response(id, &result)
    }

    async fn handle_tools_call(&self, id: Option<Value>, params: Option<Value>) -> JsonRpcResponse {
        let params: ToolCallParams = match parse_params(params) {
            Ok(p) => p,
            Err(e) => return JsonRpcResponse::error(id, e),
        };

        match self
            .execute_tool(params.name.clone(), params.arguments.unwrap_or(Value::Null))
            .await
        {
            Ok(result) => to_response(id, &ToolCallResult::text(result.to_string())),
            Err(e) => {
                if let Some(rpc_error) = e.as_rpc_error() {
                    return JsonRpcResponse::error(id, rpc_error);
                }
                tracing::warn!("Tool {} failed: {}", params.name, e);
                to_response(id, &ToolCallResult::error(e.to_body().to_string()))
            }
        }
    }

    async fn handle_resources_read(
        &self,
        id: Option<Value>,
        params: Option<Value>,
    ) -> JsonRpcResponse {
        let params: ResourceReadParams = match parse_params(params) {
            Ok(p) => p,
            Err(e) => return JsonRpcResponse::error(id, e),
        };

        let store = Arc::clone(&self.store);
        let uri = params.uri.clone();
        let result =
            match tokio::task::spawn_blocking(move || read_resource(&uri, &store)).await {
                Ok(result) => result,
                Err(e) => Err(e.into()),
            };

        match result {
            Ok(Some(result)) => to_response(id, &result),
            Ok(None) => JsonRpcResponse::error(
                id,
                JsonRpcError::invalid_params(format!("Resource not found: {}", params.uri)),
            ),
            Err(e) => JsonRpcResponse::error(id, JsonRpcError::internal_error(e.to_string())),
        }
    }

    /// Run a tool on the blocking pool; store transactions never span an await
    async fn execute_tool(&self, name: String, args: Value) -> ToolResult<Value> {
        let store = Arc::clone(&self.store);
        tokio::task::spawn_blocking(move || handlers::call_tool(&store, &name, args)).await?
    }
}

fn parse_params<T: serde::de::DeserializeOwned>(params: Option<Value>) -> Result<T, JsonRpcError> {
    let params = params.ok_or_else(|| JsonRpcError::invalid_params("Missing params"))?;
    serde_json::from_value(params)
        .map_err(|e| JsonRpcError::invalid_params(format!("Invalid params: {}", e)))
}

fn to_response<T: serde::Serialize>(id: Option<Value>, result: &T) -> JsonRpcResponse {
    match serde_json::to_value(result) {
        Ok(value) => JsonRpcResponse::success(id, value),
        Err(e) => JsonRpcResponse::error(id, JsonRpcError::internal_error(e.to_string())),
    }
}
