//! MCP Resource Definitions
//!
//! Defines resources available through the MCP protocol.

use super::protocol::{Resource, ResourceContent, ResourceReadResult};
use crate::error::ToolResult;
use kg_store::GraphStore;

pub const SCHEMA_URI: &str = "kg://schema";
pub const STATS_URI: &str = "kg://stats";

/// Get all available resources
pub fn get_all_resources() -> Vec<Resource> {
    vec![
        Resource {
            uri: SCHEMA_URI.to_string(),
            name: "Record Format".to_string(),
            description: Some(
                "Short field names of nodes, edges, index entries and documents".to_string(),
            ),
            mime_type: Some("application/json".to_string()),
        },
        Resource {
            uri: STATS_URI.to_string(),
            name: "Store Statistics".to_string(),
            description: Some(
                "Node, edge, document and full-text index counts plus the schema version"
                    .to_string(),
            ),
            mime_type: Some("application/json".to_string()),
        },
    ]
}

/// Read a resource by URI; `Ok(None)` for unknown URIs
pub fn read_resource(uri: &str, store: &GraphStore) -> ToolResult<Option<ResourceReadResult>> {
    let body = match uri {
        SCHEMA_URI => schema(),
        STATS_URI => serde_json::to_value(store.stats()?)?,
        _ => return Ok(None),
    };
    Ok(Some(ResourceReadResult {
        contents: vec![ResourceContent {
            uri: uri.to_string(),
            mime_type: Some("application/json".to_string()),
            text: Some(serde_json::to_string_pretty(&body)?),
        }],
    }))
}

fn schema() -> serde_json::Value {
    serde_json::json!({
        "node": {
            "id": "slug", "t": "type", "s": "summary", "b": "body refs [int|str]",
            "d": "domain", "st": "status", "k": "notes", "m": "meta {}"
        },
        "edge": {"src": "source id", "rel": "relation", "tgt": "target id", "w": "weight", "n": "note"},
        "index": {"id": "slug", "t": "type", "st": "status", "d": "domain (when set)"},
        "doc": {
            "id": "8 hex chars", "title": "str", "content": "str",
            "session": "int", "node_ids": "[node id, ...]"
        },
        "bulk": {"op": "put_node|put_edge|delete_node|delete_edge", "payload": "node, edge, {id} or {src,rel,tgt}"},
        "types": "concept|metaphor|principle|model|person|band|insight|pattern|question",
        "statuses": "seed|explored|deep|verified|archived",
        "domains": "dot-notation for hierarchy, e.g. holofeeling.baende",
        "rels": "contains|contrasts|becomes|mirrors|requires|extends|instantiates|refines|grounds|maps_to|emerges_from|dissolves_into|polarizes"
    })
}
