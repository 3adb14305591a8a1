//! Tool handlers: argument parsing and the calls into the graph store.
//!
//! Handlers are synchronous; the MCP server runs them on the blocking pool.

pub mod documents;
pub mod graph;

use kg_store::GraphStore;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::error::{ToolError, ToolResult};
use crate::mcp::tools;

/// Run the named tool against the store
pub fn call_tool(store: &GraphStore, name: &str, args: Value) -> ToolResult<Value> {
    match name {
        tools::KG_BOOT => graph::boot(store),
        tools::KG_GET => graph::get(store, args),
        tools::KG_SEARCH => graph::search(store, args),
        tools::KG_PUT_NODE => graph::put_node(store, args),
        tools::KG_PUT_EDGE => graph::put_edge(store, args),
        tools::KG_DELETE_NODE => graph::delete_node(store, args),
        tools::KG_DELETE_EDGE => graph::delete_edge(store, args),
        tools::KG_STATE => graph::state(store, args),
        tools::KG_BULK => graph::bulk(store, args),
        tools::KG_TRAVERSE => graph::traverse(store, args),
        tools::KG_LIST_DOMAINS => graph::list_domains(store),
        tools::KG_LOAD_DOMAIN => graph::load_domain(store, args),
        tools::KG_UNLOAD_DOMAIN => graph::unload_domain(args),
        tools::KG_BULK_SET_DOMAIN => graph::bulk_set_domain(store, args),
        tools::KG_DOC_CREATE => documents::create(store, args),
        tools::KG_DOC_APPEND => documents::append(store, args),
        tools::KG_DOC_READ => documents::read(store, args),
        tools::KG_DOC_SEARCH => documents::search(store, args),
        tools::KG_DOC_DELETE => documents::delete(store, args),
        other => Err(ToolError::UnknownTool(other.to_string())),
    }
}

/// Deserialize tool arguments into `T`.
///
/// Clients often pass list and object arguments as JSON-encoded strings
/// (`"b": "[1,3]"`). Fields named in `embedded` are decoded first; a blank
/// string is treated as absent.
pub(crate) fn parse_args<T: DeserializeOwned>(
    tool: &'static str,
    args: Value,
    embedded: &[&str],
) -> ToolResult<T> {
    let mut map = match args {
        Value::Object(map) => map,
        Value::Null => Map::new(),
        other => {
            return Err(ToolError::invalid(
                tool,
                format!("arguments must be an object, got {}", other),
            ))
        }
    };

    for field in embedded {
        let Some(Value::String(raw)) = map.get(*field) else {
            continue;
        };
        if raw.trim().is_empty() {
            map.remove(*field);
            continue;
        }
        let decoded: Value = serde_json::from_str(raw)
            .map_err(|e| ToolError::invalid(tool, format!("field `{}` is not valid JSON: {}", field, e)))?;
        map.insert(field.to_string(), decoded);
    }

    serde_json::from_value(Value::Object(map)).map_err(|e| ToolError::invalid(tool, e.to_string()))
}

pub(crate) fn to_json<T: serde::Serialize>(value: &T) -> ToolResult<Value> {
    Ok(serde_json::to_value(value)?)
}
