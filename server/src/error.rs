//! Error types for the KG MCP server.

use kg_store::GraphError;
use serde_json::{json, Value};
use thiserror::Error;

use crate::mcp::protocol::JsonRpcError;

/// Errors raised while executing a tool call.
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error("Invalid arguments for {tool}: {reason}")]
    InvalidArguments { tool: &'static str, reason: String },

    #[error(transparent)]
    Graph(#[from] GraphError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Tool task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl ToolError {
    pub fn invalid(tool: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidArguments {
            tool,
            reason: reason.into(),
        }
    }

    /// Protocol-level errors become JSON-RPC errors instead of tool results
    pub fn as_rpc_error(&self) -> Option<JsonRpcError> {
        match self {
            ToolError::UnknownTool(_) | ToolError::InvalidArguments { .. } => {
                Some(JsonRpcError::invalid_params(self.to_string()))
            }
            _ => None,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            ToolError::Graph(e) => e.code(),
            ToolError::UnknownTool(_) | ToolError::InvalidArguments { .. } => "validation",
            ToolError::Serialization(_) | ToolError::Task(_) => "internal",
        }
    }

    /// Compact body carried by an `isError` tool result
    pub fn to_body(&self) -> Value {
        json!({ "error": self.code(), "msg": self.to_string() })
    }
}

/// Result type alias for tool handlers.
pub type ToolResult<T> = Result<T, ToolError>;

#[cfg(test)]
mod tests {
    use super::*;
    use kg_store::EdgeKey;

    #[test]
    fn test_tool_error_display_unknown_tool() {
        let err = ToolError::UnknownTool("kg_nope".to_string());
        assert_eq!(err.to_string(), "Unknown tool: kg_nope");
    }

    #[test]
    fn test_tool_error_display_invalid_arguments() {
        let err = ToolError::invalid("kg_get", "missing field `id`");
        assert_eq!(err.to_string(), "Invalid arguments for kg_get: missing field `id`");
    }

    #[test]
    fn test_graph_error_is_transparent() {
        let err: ToolError = GraphError::node_not_found("get_node", "ghost").into();
        assert_eq!(err.to_string(), "get_node: node 'ghost' not found");
        assert_eq!(err.code(), "not_found");
    }

    #[test]
    fn test_rpc_error_conversion_invalid_arguments() {
        let err = ToolError::invalid("kg_search", "missing field `q`");
        let rpc = err.as_rpc_error().unwrap();
        assert_eq!(rpc.code, JsonRpcError::INVALID_PARAMS);
        assert!(rpc.message.contains("kg_search"));
    }

    #[test]
    fn test_rpc_error_conversion_unknown_tool() {
        let rpc = ToolError::UnknownTool("x".to_string()).as_rpc_error().unwrap();
        assert_eq!(rpc.code, JsonRpcError::INVALID_PARAMS);
    }

    #[test]
    fn test_graph_errors_stay_tool_results() {
        let err: ToolError = GraphError::edge_not_found("delete_edge", EdgeKey::new("a", "r", "b")).into();
        assert!(err.as_rpc_error().is_none());
    }

    #[test]
    fn test_body_shape() {
        let err: ToolError = GraphError::validation("put_node", "node id cannot be empty").into();
        let body = err.to_body();
        assert_eq!(body["error"], "validation");
        assert_eq!(body["msg"], "put_node: node id cannot be empty");
    }
}
