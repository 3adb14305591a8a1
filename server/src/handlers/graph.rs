//! Graph tool handlers: nodes, edges, traversal, search, bulk and domains.

use kg_store::{
    BulkRequest, DomainDepth, Edge, EdgeKey, GraphStore, Node, SearchConfig, SearchHit,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::{parse_args, to_json};
use crate::error::{ToolError, ToolResult};
use crate::mcp::tools;

/// Hop cap for `kg_get`; deeper neighborhoods go through `kg_traverse`
pub const MAX_GET_HOPS: u32 = 3;

/// Node list/object fields that may arrive JSON-encoded
const NODE_EMBEDDED: &[&str] = &["b", "body", "bands", "m", "meta"];

#[derive(Debug, Deserialize)]
pub struct GetParams {
    pub id: String,
    #[serde(default = "default_get_hops")]
    pub hops: u32,
}

fn default_get_hops() -> u32 {
    1
}

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    #[serde(alias = "query")]
    pub q: String,
    #[serde(default)]
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub q: String,
    pub count: usize,
    pub hits: Vec<SearchHit>,
}

#[derive(Debug, Deserialize)]
pub struct IdParams {
    pub id: String,
}

#[derive(Debug, Deserialize)]
pub struct StateParams {
    #[serde(alias = "value")]
    pub text: String,
}

#[derive(Debug, Deserialize)]
pub struct TraverseParams {
    #[serde(alias = "start_id")]
    pub id: String,
    #[serde(alias = "max_hops", default = "default_traverse_hops")]
    pub hops: u32,
    #[serde(alias = "relation_filter", default)]
    pub rel: Option<String>,
}

fn default_traverse_hops() -> u32 {
    2
}

#[derive(Debug, Deserialize)]
pub struct LoadDomainParams {
    pub name: String,
    #[serde(default)]
    pub depth: String,
}

#[derive(Debug, Deserialize)]
pub struct UnloadDomainParams {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct SetDomainParams {
    pub domain: String,
    pub node_ids: Vec<String>,
}

pub fn boot(store: &GraphStore) -> ToolResult<Value> {
    to_json(&store.boot()?)
}

pub fn get(store: &GraphStore, args: Value) -> ToolResult<Value> {
    let params: GetParams = parse_args(tools::KG_GET, args, &[])?;
    let view = store.get_node(&params.id, params.hops.min(MAX_GET_HOPS))?;
    to_json(&view)
}

pub fn search(store: &GraphStore, args: Value) -> ToolResult<Value> {
    let params: SearchParams = parse_args(tools::KG_SEARCH, args, &[])?;
    let config = match params.limit {
        Some(limit) => SearchConfig::with_limit(limit),
        None => SearchConfig::default(),
    };
    let hits: Vec<SearchHit> = store
        .search(&params.q, &config)?
        .into_iter()
        .map(|result| result.hit)
        .collect();
    to_json(&SearchResponse {
        q: params.q,
        count: hits.len(),
        hits,
    })
}

pub fn put_node(store: &GraphStore, args: Value) -> ToolResult<Value> {
    let node: Node = parse_args(tools::KG_PUT_NODE, args, NODE_EMBEDDED)?;
    to_json(&store.put_node(node)?)
}

pub fn put_edge(store: &GraphStore, args: Value) -> ToolResult<Value> {
    let edge: Edge = parse_args(tools::KG_PUT_EDGE, args, &[])?;
    to_json(&store.put_edge(edge)?)
}

pub fn delete_node(store: &GraphStore, args: Value) -> ToolResult<Value> {
    let params: IdParams = parse_args(tools::KG_DELETE_NODE, args, &[])?;
    let edges = store.delete_node(&params.id)?;
    Ok(json!({ "op": "deleted", "id": params.id, "edges": edges }))
}

pub fn delete_edge(store: &GraphStore, args: Value) -> ToolResult<Value> {
    let key: EdgeKey = parse_args(tools::KG_DELETE_EDGE, args, &[])?;
    let edge = store.delete_edge(&key)?;
    Ok(json!({ "op": "edge_deleted", "src": edge.src, "rel": edge.rel, "tgt": edge.tgt }))
}

pub fn state(store: &GraphStore, args: Value) -> ToolResult<Value> {
    let params: StateParams = parse_args(tools::KG_STATE, args, &[])?;
    let status = store.set_status(params.text)?;
    Ok(json!({ "op": "state_set", "updated": status.updated_at }))
}

/// Accepts `{ops: [...]}`, `{nodes, edges}` or the same JSON encoded as a
/// string under `operations`
pub fn bulk(store: &GraphStore, args: Value) -> ToolResult<Value> {
    let mut args: serde_json::Map<String, Value> =
        parse_args(tools::KG_BULK, args, &["ops", "nodes", "edges", "operations"])?;
    let request = match args.remove("operations") {
        Some(operations) => operations,
        None => Value::Object(args),
    };
    let request: BulkRequest = serde_json::from_value(request).map_err(|e| {
        ToolError::invalid(
            tools::KG_BULK,
            format!("expected {{ops: [...]}} or {{nodes, edges}}: {}", e),
        )
    })?;
    let results = store.bulk(request.into_ops())?;
    Ok(json!({ "op": "bulk", "results": results }))
}

pub fn traverse(store: &GraphStore, args: Value) -> ToolResult<Value> {
    let params: TraverseParams = parse_args(tools::KG_TRAVERSE, args, &[])?;
    let rel = params.rel.as_deref().filter(|rel| !rel.is_empty());
    to_json(&store.traverse(&params.id, params.hops, rel)?)
}

pub fn list_domains(store: &GraphStore) -> ToolResult<Value> {
    Ok(json!({ "domains": store.list_domains()? }))
}

pub fn load_domain(store: &GraphStore, args: Value) -> ToolResult<Value> {
    let params: LoadDomainParams = parse_args(tools::KG_LOAD_DOMAIN, args, &[])?;
    let depth: DomainDepth = params.depth.parse()?;
    to_json(&store.load_domain(&params.name, depth)?)
}

/// Acknowledge that a domain left the client's context; the store is untouched
pub fn unload_domain(args: Value) -> ToolResult<Value> {
    let params: UnloadDomainParams = parse_args(tools::KG_UNLOAD_DOMAIN, args, &[])?;
    Ok(json!({
        "op": "unloaded",
        "domain": params.name,
        "note": "Domain removed from active context. Use kg_load_domain to reload.",
    }))
}

pub fn bulk_set_domain(store: &GraphStore, args: Value) -> ToolResult<Value> {
    let params: SetDomainParams = parse_args(tools::KG_BULK_SET_DOMAIN, args, &["node_ids"])?;
    let count = store.set_domain(&params.domain, &params.node_ids)?;
    Ok(json!({ "op": "bulk_domain_set", "domain": params.domain, "count": count }))
}
