//! End-to-end tests driving the MCP server through JSON-RPC messages.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use kg_mcp::mcp::http::create_router;
use kg_mcp::mcp::transport::AsyncStdioTransport;
use kg_mcp::mcp::{JsonRpcRequest, JsonRpcResponse, McpServer};
use kg_store::GraphStore;
use serde_json::{json, Value};
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;

fn server() -> (TempDir, McpServer) {
    let dir = TempDir::new().unwrap();
    let store = GraphStore::open_default(dir.path().join("kg")).unwrap();
    (dir, McpServer::new(Arc::new(store)))
}

fn request(id: u64, method: &str, params: Value) -> JsonRpcRequest {
    serde_json::from_value(json!({
        "jsonrpc": "2.0",
        "id": id,
        "method": method,
        "params": params,
    }))
    .unwrap()
}

async fn call(server: &McpServer, method: &str, params: Value) -> JsonRpcResponse {
    server
        .handle_request(request(1, method, params))
        .await
        .expect("requests with an id get a response")
}

/// Call a tool and return (is_error, decoded text payload)
async fn tool(server: &McpServer, name: &str, arguments: Value) -> (bool, Value) {
    let response = call(server, "tools/call", json!({"name": name, "arguments": arguments})).await;
    assert!(response.error.is_none(), "unexpected rpc error: {:?}", response.error);
    let result = response.result.unwrap();
    let is_error = result.get("isError").and_then(Value::as_bool).unwrap_or(false);
    let text = result["content"][0]["text"].as_str().unwrap();
    assert!(!text.contains('\n'), "tool output should be compact JSON");
    (is_error, serde_json::from_str(text).unwrap())
}

async fn ok(server: &McpServer, name: &str, arguments: Value) -> Value {
    let (is_error, body) = tool(server, name, arguments).await;
    assert!(!is_error, "{} failed: {}", name, body);
    body
}

#[tokio::test]
async fn test_initialize_and_list() {
    let (_dir, server) = server();

    let init = call(&server, "initialize", json!({"protocolVersion": "2024-11-05", "clientInfo": {"name": "test"}})).await;
    let result = init.result.unwrap();
    assert_eq!(result["protocolVersion"], "2024-11-05");
    assert_eq!(result["serverInfo"]["name"], "kg");
    assert!(result["capabilities"]["tools"].is_object());

    let tools = call(&server, "tools/list", Value::Null).await.result.unwrap();
    let names: Vec<&str> = tools["tools"]
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["name"].as_str().unwrap())
        .collect();
    assert!(names.contains(&"kg_boot"));
    assert!(names.contains(&"kg_traverse"));
    assert!(names.contains(&"kg_unload_domain"));
    assert_eq!(names.len(), 19);

    let resources = call(&server, "resources/list", Value::Null).await.result.unwrap();
    assert_eq!(resources["resources"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_notifications_get_no_response() {
    let (_dir, server) = server();
    let notification: JsonRpcRequest = serde_json::from_value(json!({
        "jsonrpc": "2.0",
        "method": "notifications/initialized",
    }))
    .unwrap();
    assert!(server.handle_request(notification).await.is_none());
}

#[tokio::test]
async fn test_unknown_method() {
    let (_dir, server) = server();
    let response = call(&server, "nope/nothing", Value::Null).await;
    assert_eq!(response.error.unwrap().code, -32601);
}

#[tokio::test]
async fn test_malformed_arguments_are_invalid_params() {
    let (_dir, server) = server();
    let response = call(
        &server,
        "tools/call",
        json!({"name": "kg_get", "arguments": {"hops": 1}}),
    )
    .await;
    assert_eq!(response.error.unwrap().code, -32602);

    let response = call(&server, "tools/call", json!({"name": "kg_unknown", "arguments": {}})).await;
    assert_eq!(response.error.unwrap().code, -32602);
}

#[tokio::test]
async fn test_graph_session() {
    let (_dir, server) = server();

    let node = ok(&server, "kg_put_node", json!({"id": "mirror", "t": "principle", "s": "mirror principle", "d": "holo"})).await;
    assert_eq!(node["id"], "mirror");
    ok(&server, "kg_put_node", json!({"id": "self", "summary": "the self"})).await;
    let edge = ok(&server, "kg_put_edge", json!({"src": "mirror", "rel": "reflects", "tgt": "self", "w": 0.8})).await;
    assert_eq!(edge["w"], 0.8);

    let view = ok(&server, "kg_get", json!({"id": "mirror"})).await;
    assert_eq!(view["node"]["t"], "principle");
    assert_eq!(view["edges"].as_array().unwrap().len(), 1);
    assert!(view["neighbors"]["self"].is_object());

    let hits = ok(&server, "kg_search", json!({"q": "mirr"})).await;
    assert_eq!(hits["count"], 1);
    assert_eq!(hits["hits"][0]["id"], "mirror");

    let state = ok(&server, "kg_state", json!({"text": "exploring mirrors"})).await;
    assert_eq!(state["op"], "state_set");

    let boot = ok(&server, "kg_boot", json!({})).await;
    assert_eq!(boot["status"]["text"], "exploring mirrors");
    assert_eq!(boot["index"].as_array().unwrap().len(), 2);
    assert_eq!(boot["index"][0], json!({"id": "mirror", "t": "principle", "st": "seed", "d": "holo"}));

    let deleted = ok(&server, "kg_delete_node", json!({"id": "self"})).await;
    assert_eq!(deleted, json!({"op": "deleted", "id": "self", "edges": 1}));

    let view = ok(&server, "kg_get", json!({"id": "mirror", "hops": 0})).await;
    assert!(view["edges"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_domain_errors_are_tool_errors() {
    let (_dir, server) = server();

    let (is_error, body) = tool(&server, "kg_get", json!({"id": "ghost"})).await;
    assert!(is_error);
    assert_eq!(body["error"], "not_found");
    assert!(body["msg"].as_str().unwrap().contains("ghost"));

    ok(&server, "kg_put_node", json!({"id": "a"})).await;
    let (is_error, body) = tool(&server, "kg_put_edge", json!({"src": "a", "rel": "r", "tgt": "missing"})).await;
    assert!(is_error);
    assert_eq!(body["error"], "referential_integrity");
}

#[tokio::test]
async fn test_bulk_is_atomic() {
    let (_dir, server) = server();

    let ops = json!({"ops": [
        {"op": "put_node", "payload": {"id": "a"}},
        {"op": "put_node", "payload": {"id": "b"}},
        {"op": "put_edge", "payload": {"src": "a", "rel": "r", "tgt": "b"}},
        {"op": "put_edge", "payload": {"src": "a", "rel": "r", "tgt": "nowhere"}},
    ]});
    let (is_error, body) = tool(&server, "kg_bulk", ops).await;
    assert!(is_error);
    assert_eq!(body["error"], "transaction_abort");
    assert!(body["msg"].as_str().unwrap().contains("operation 3"));

    let boot = ok(&server, "kg_boot", json!({})).await;
    assert!(boot["index"].as_array().unwrap().is_empty());

    let ops = json!({"nodes": [{"id": "a"}, {"id": "b"}], "edges": [{"src": "a", "rel": "r", "tgt": "b"}]});
    let body = ok(&server, "kg_bulk", ops).await;
    let ops: Vec<&str> = body["results"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["op"].as_str().unwrap())
        .collect();
    assert_eq!(ops, vec!["node_created", "node_created", "edge_set"]);
}

#[tokio::test]
async fn test_traverse_and_domains() {
    let (_dir, server) = server();
    ok(&server, "kg_bulk", json!({
        "nodes": [
            {"id": "a", "d": "holo"},
            {"id": "b", "d": "holo.baende"},
            {"id": "c", "d": "infra"}
        ],
        "edges": [
            {"src": "a", "rel": "contains", "tgt": "b"},
            {"src": "b", "rel": "grounds", "tgt": "c"}
        ]
    }))
    .await;

    let one = ok(&server, "kg_traverse", json!({"id": "a", "hops": 1})).await;
    assert_eq!(one["nodes"].as_array().unwrap().len(), 2);
    let two = ok(&server, "kg_traverse", json!({"start_id": "a"})).await;
    assert_eq!(two["nodes"].as_array().unwrap().len(), 3);
    assert_eq!(two["edges"].as_array().unwrap().len(), 2);

    let domains = ok(&server, "kg_list_domains", json!({})).await;
    let names: Vec<&str> = domains["domains"]
        .as_array()
        .unwrap()
        .iter()
        .map(|d| d["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["holo", "infra"]);

    let holo = ok(&server, "kg_load_domain", json!({"name": "holo"})).await;
    assert_eq!(holo["nodes"].as_array().unwrap().len(), 2);
    assert_eq!(holo["edges"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_documents() {
    let (_dir, server) = server();
    let doc = ok(&server, "kg_doc_create", json!({"title": "Session 1", "session": 1, "content": "notes"})).await;
    let id = doc["id"].as_str().unwrap().to_string();

    ok(&server, "kg_doc_append", json!({"id": id, "content": "more"})).await;
    let read = ok(&server, "kg_doc_read", json!({"id": id})).await;
    assert_eq!(read["content"], "notes\nmore");

    let found = ok(&server, "kg_doc_search", json!({"q": "MORE"})).await;
    assert_eq!(found["count"], 1);

    let deleted = ok(&server, "kg_doc_delete", json!({"id": id})).await;
    assert_eq!(deleted["title"], "Session 1");

    let (is_error, body) = tool(&server, "kg_doc_read", json!({"id": id})).await;
    assert!(is_error);
    assert_eq!(body["error"], "not_found");
}

#[tokio::test]
async fn test_read_resources() {
    let (_dir, server) = server();
    let schema = call(&server, "resources/read", json!({"uri": "kg://schema"})).await;
    assert!(schema.result.is_some());

    let missing = call(&server, "resources/read", json!({"uri": "kg://missing"})).await;
    assert_eq!(missing.error.unwrap().code, -32602);
}

#[tokio::test]
async fn test_stdio_loop() {
    let (_dir, server) = server();
    let input = concat!(
        "{\"jsonrpc\":\"2.0\",\"id\":1,\"method\":\"ping\"}\n",
        "{\"jsonrpc\":\"2.0\",\"method\":\"notifications/initialized\"}\n",
        "\n",
        "not json\n",
        "{\"jsonrpc\":\"2.0\",\"id\":2,\"method\":\"tools/call\",\"params\":{\"name\":\"kg_boot\"}}\n",
    );
    let mut output = Vec::new();
    server
        .serve(AsyncStdioTransport::new(input.as_bytes(), &mut output))
        .await
        .unwrap();

    let lines: Vec<Value> = String::from_utf8(output)
        .unwrap()
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();
    assert_eq!(lines.len(), 3);
    assert_eq!(lines[0]["id"], 1);
    assert_eq!(lines[1]["error"]["code"], -32700);
    assert_eq!(lines[2]["id"], 2);
}

#[tokio::test]
async fn test_http_transport() {
    let (_dir, server) = server();
    let app = create_router(server);

    let response = app
        .clone()
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let ping = json!({"jsonrpc": "2.0", "id": 5, "method": "ping"}).to_string();
    let response = app
        .clone()
        .oneshot(
            Request::post("/mcp")
                .header("content-type", "application/json")
                .body(Body::from(ping))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["id"], 5);

    let notification = json!({"jsonrpc": "2.0", "method": "notifications/initialized"}).to_string();
    let response = app
        .clone()
        .oneshot(Request::post("/mcp").body(Body::from(notification)).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::ACCEPTED);

    let response = app
        .oneshot(Request::post("/mcp").body(Body::from("{oops")).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
