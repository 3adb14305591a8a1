//! Stateless HTTP transport: one JSON-RPC message per `POST /mcp`.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use tower_http::trace::TraceLayer;

use super::protocol::{JsonRpcError, JsonRpcRequest, JsonRpcResponse};
use super::server::McpServer;

/// Create the application router.
pub fn create_router(server: McpServer) -> Router {
    Router::new()
        .route("/mcp", post(handle_mcp))
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
        .with_state(server)
}

/// Run the HTTP server until the listener fails.
pub async fn run_server(server: McpServer, host: &str, port: u16) -> std::io::Result<()> {
    let app = create_router(server);

    let listener = tokio::net::TcpListener::bind((host, port)).await?;
    tracing::info!("MCP HTTP server listening on http://{}:{}/mcp", host, port);

    axum::serve(listener, app).await
}

async fn health(State(server): State<McpServer>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "db_path": server.store().path().display().to_string(),
    }))
}

/// The body is taken as raw JSON so malformed requests still get a
/// JSON-RPC error instead of an axum rejection
async fn handle_mcp(State(server): State<McpServer>, body: String) -> Response {
    let value: Value = match serde_json::from_str(&body) {
        Ok(value) => value,
        Err(e) => {
            return rpc_error(JsonRpcError::parse_error(format!("Parse error: {}", e)));
        }
    };

    let request: JsonRpcRequest = match serde_json::from_value(value) {
        Ok(request) => request,
        Err(e) => {
            return rpc_error(JsonRpcError::invalid_request(format!("Invalid request: {}", e)));
        }
    };

    match server.handle_request(request).await {
        Some(response) => Json(response).into_response(),
        None => StatusCode::ACCEPTED.into_response(),
    }
}

fn rpc_error(error: JsonRpcError) -> Response {
    (StatusCode::BAD_REQUEST, Json(JsonRpcResponse::error(None, error))).into_response()
}
