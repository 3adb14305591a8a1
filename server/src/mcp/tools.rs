//! MCP Tool Definitions
//!
//! Defines the knowledge-graph tools exposed over MCP.

use super::protocol::{PropertySchema, Tool, ToolInputSchema};
use std::collections::HashMap;

pub const KG_BOOT: &str = "kg_boot";
pub const KG_GET: &str = "kg_get";
pub const KG_SEARCH: &str = "kg_search";
pub const KG_PUT_NODE: &str = "kg_put_node";
pub const KG_PUT_EDGE: &str = "kg_put_edge";
pub const KG_DELETE_NODE: &str = "kg_delete_node";
pub const KG_DELETE_EDGE: &str = "kg_delete_edge";
pub const KG_STATE: &str = "kg_state";
pub const KG_BULK: &str = "kg_bulk";
pub const KG_TRAVERSE: &str = "kg_traverse";
pub const KG_LIST_DOMAINS: &str = "kg_list_domains";
pub const KG_LOAD_DOMAIN: &str = "kg_load_domain";
pub const KG_UNLOAD_DOMAIN: &str = "kg_unload_domain";
pub const KG_BULK_SET_DOMAIN: &str = "kg_bulk_set_domain";
pub const KG_DOC_CREATE: &str = "kg_doc_create";
pub const KG_DOC_APPEND: &str = "kg_doc_append";
pub const KG_DOC_READ: &str = "kg_doc_read";
pub const KG_DOC_SEARCH: &str = "kg_doc_search";
pub const KG_DOC_DELETE: &str = "kg_doc_delete";

/// Get all available tools
pub fn get_all_tools() -> Vec<Tool> {
    vec![
        // Session (2)
        boot_tool(),
        state_tool(),
        // Graph reads (3)
        get_tool(),
        search_tool(),
        traverse_tool(),
        // Graph writes (5)
        put_node_tool(),
        put_edge_tool(),
        delete_node_tool(),
        delete_edge_tool(),
        bulk_tool(),
        // Domains (4)
        list_domains_tool(),
        load_domain_tool(),
        unload_domain_tool(),
        bulk_set_domain_tool(),
        // Documents (5)
        doc_create_tool(),
        doc_append_tool(),
        doc_read_tool(),
        doc_search_tool(),
        doc_delete_tool(),
    ]
}

fn base_prop(property_type: &str, description: Option<&str>) -> PropertySchema {
    PropertySchema {
        property_type: property_type.to_string(),
        description: description.map(str::to_string),
        default: None,
        enum_values: None,
        items: None,
        minimum: None,
        maximum: None,
    }
}

// Helper to create property schema
fn string_prop(description: &str) -> PropertySchema {
    base_prop("string", Some(description))
}

fn number_prop(description: &str, default: Option<f64>) -> PropertySchema {
    PropertySchema {
        default: default.map(|v| serde_json::json!(v)),
        ..base_prop("number", Some(description))
    }
}

fn integer_prop(description: &str, default: i64, minimum: f64, maximum: Option<f64>) -> PropertySchema {
    PropertySchema {
        default: Some(serde_json::json!(default)),
        minimum: Some(minimum),
        maximum,
        ..base_prop("integer", Some(description))
    }
}

fn enum_prop(description: &str, values: Vec<&str>, default: Option<&str>) -> PropertySchema {
    PropertySchema {
        default: default.map(|v| serde_json::json!(v)),
        enum_values: Some(values.into_iter().map(|s| s.to_string()).collect()),
        ..base_prop("string", Some(description))
    }
}

fn array_prop(description: &str, item_type: Option<&str>) -> PropertySchema {
    PropertySchema {
        items: item_type.map(|t| Box::new(base_prop(t, None))),
        ..base_prop("array", Some(description))
    }
}

fn object_prop(description: &str) -> PropertySchema {
    base_prop("object", Some(description))
}

fn tool(
    name: &str,
    description: &str,
    properties: HashMap<String, PropertySchema>,
    required: &[&str],
) -> Tool {
    Tool {
        name: name.to_string(),
        description: Some(description.to_string()),
        input_schema: ToolInputSchema {
            schema_type: "object".to_string(),
            properties: Some(properties),
            required: if required.is_empty() {
                None
            } else {
                Some(required.iter().map(|s| s.to_string()).collect())
            },
        },
    }
}

fn edge_key_properties() -> HashMap<String, PropertySchema> {
    let mut properties = HashMap::new();
    properties.insert("src".to_string(), string_prop("Source node id"));
    properties.insert("rel".to_string(), string_prop("Relation type, e.g. mirrors, contains, requires"));
    properties.insert("tgt".to_string(), string_prop("Target node id"));
    properties
}

// === Session Tools ===

fn boot_tool() -> Tool {
    tool(
        KG_BOOT,
        "Session start. Returns {status, index:[{id,t,st,d?}]}: the process status and every node's index entry. Call first.",
        HashMap::new(),
        &[],
    )
}

fn state_tool() -> Tool {
    let mut properties = HashMap::new();
    properties.insert(
        "text".to_string(),
        string_prop("Free-form status text; replaces the previous status"),
    );
    tool(
        KG_STATE,
        "Overwrite the process status. Returns {op:\"state_set\", updated}.",
        properties,
        &["text"],
    )
}

// === Graph Read Tools ===

fn get_tool() -> Tool {
    let mut properties = HashMap::new();
    properties.insert("id".to_string(), string_prop("Node id"));
    properties.insert(
        "hops".to_string(),
        integer_prop("Neighborhood depth (0-3)", 1, 0.0, Some(3.0)),
    );
    tool(
        KG_GET,
        "Node plus its N-hop neighborhood. Returns {node, edges, neighbors?}.",
        properties,
        &["id"],
    )
}

fn search_tool() -> Tool {
    let mut properties = HashMap::new();
    properties.insert(
        "q".to_string(),
        string_prop("Search text; each word also matches as a prefix"),
    );
    properties.insert(
        "limit".to_string(),
        integer_prop("Maximum hits (1-100)", 20, 1.0, Some(100.0)),
    );
    tool(
        KG_SEARCH,
        "Ranked full-text search over node id, type, summary, notes, domain, meta and edge relation/note. Returns {q, count, hits:[{id,t,st} or {src,rel,tgt}]}.",
        properties,
        &["q"],
    )
}

fn traverse_tool() -> Tool {
    let mut properties = HashMap::new();
    properties.insert("id".to_string(), string_prop("Start node id"));
    properties.insert(
        "hops".to_string(),
        integer_prop("Breadth-first depth, clamped to the server maximum", 2, 0.0, None),
    );
    properties.insert(
        "rel".to_string(),
        string_prop("Only follow edges of this relation type (empty = all)"),
    );
    tool(
        KG_TRAVERSE,
        "Breadth-first subgraph around a node, ignoring edge direction. Returns {start, hops, nodes, edges, truncated}.",
        properties,
        &["id"],
    )
}

// === Graph Write Tools ===

fn put_node_tool() -> Tool {
    let mut properties = HashMap::new();
    properties.insert("id".to_string(), string_prop("Node id (slug), unique"));
    properties.insert(
        "t".to_string(),
        string_prop("Type: concept|metaphor|principle|model|person|band|insight|pattern|question (default concept)"),
    );
    properties.insert("s".to_string(), string_prop("Short summary"));
    properties.insert(
        "b".to_string(),
        array_prop("Body references (integers or strings)", None),
    );
    properties.insert(
        "d".to_string(),
        string_prop("Domain in dot-notation, e.g. infra or holofeeling.baende"),
    );
    properties.insert(
        "st".to_string(),
        string_prop("Status: seed|explored|deep|verified|archived (default seed)"),
    );
    properties.insert("k".to_string(), string_prop("Free-form notes"));
    properties.insert("m".to_string(), object_prop("Open metadata object"));
    tool(
        KG_PUT_NODE,
        "Create or fully replace a node. Long-form names (type, summary, bands, domain, status, notes, meta) are accepted too. Returns the stored node.",
        properties,
        &["id"],
    )
}

fn put_edge_tool() -> Tool {
    let mut properties = edge_key_properties();
    properties.insert("w".to_string(), number_prop("Weight", Some(1.0)));
    properties.insert("n".to_string(), string_prop("Note"));
    tool(
        KG_PUT_EDGE,
        "Create or replace the edge identified by (src, rel, tgt). Both nodes must exist. Returns the stored edge.",
        properties,
        &["src", "rel", "tgt"],
    )
}

fn delete_node_tool() -> Tool {
    let mut properties = HashMap::new();
    properties.insert("id".to_string(), string_prop("Node id"));
    tool(
        KG_DELETE_NODE,
        "Delete a node and every edge touching it. Destructive. Returns {op:\"deleted\", id, edges}.",
        properties,
        &["id"],
    )
}

fn delete_edge_tool() -> Tool {
    tool(
        KG_DELETE_EDGE,
        "Delete one edge. Returns {op:\"edge_deleted\", src, rel, tgt}.",
        edge_key_properties(),
        &["src", "rel", "tgt"],
    )
}

fn bulk_tool() -> Tool {
    let mut properties = HashMap::new();
    properties.insert(
        "ops".to_string(),
        array_prop(
            "Ordered operations {op: put_node|put_edge|delete_node|delete_edge, payload}",
            Some("object"),
        ),
    );
    properties.insert(
        "nodes".to_string(),
        array_prop("Alternative form: nodes to put (applied before edges)", Some("object")),
    );
    properties.insert(
        "edges".to_string(),
        array_prop("Alternative form: edges to put", Some("object")),
    );
    tool(
        KG_BULK,
        "Apply up to 1000 operations atomically: all succeed or none do. Returns {op:\"bulk\", results:[...]}.",
        properties,
        &[],
    )
}

// === Domain Tools ===

fn list_domains_tool() -> Tool {
    tool(
        KG_LIST_DOMAINS,
        "Domain tree with node counts and last activity. Returns {domains:[{name,count,last_updated,sub_domains}]}.",
        HashMap::new(),
        &[],
    )
}

fn load_domain_tool() -> Tool {
    let mut properties = HashMap::new();
    properties.insert(
        "name".to_string(),
        string_prop("Domain name; 'holofeeling' includes 'holofeeling.baende'"),
    );
    properties.insert(
        "depth".to_string(),
        enum_prop(
            "full: nodes and edges between them; index: index entries only",
            vec!["full", "index"],
            Some("full"),
        ),
    );
    tool(
        KG_LOAD_DOMAIN,
        "Load every node of a domain and its sub-domains. Returns {domain, nodes, edges, sub_domains}.",
        properties,
        &["name"],
    )
}

fn unload_domain_tool() -> Tool {
    let mut properties = HashMap::new();
    properties.insert(
        "name".to_string(),
        string_prop("Domain previously loaded with kg_load_domain"),
    );
    tool(
        KG_UNLOAD_DOMAIN,
        "Mark a domain as no longer needed in context. Does not touch the store. Returns {op:\"unloaded\", domain, note}.",
        properties,
        &["name"],
    )
}

fn bulk_set_domain_tool() -> Tool {
    let mut properties = HashMap::new();
    properties.insert("domain".to_string(), string_prop("Target domain"));
    properties.insert(
        "node_ids".to_string(),
        array_prop("Node ids to move; unknown ids are skipped", Some("string")),
    );
    tool(
        KG_BULK_SET_DOMAIN,
        "Move several nodes into one domain atomically. Returns {op:\"bulk_domain_set\", domain, count}.",
        properties,
        &["domain", "node_ids"],
    )
}

// === Document Tools ===

fn doc_create_tool() -> Tool {
    let mut properties = HashMap::new();
    properties.insert("title".to_string(), string_prop("Document title"));
    properties.insert(
        "session".to_string(),
        integer_prop("Session number", 0, 0.0, None),
    );
    properties.insert("content".to_string(), string_prop("Initial content"));
    properties.insert(
        "node_ids".to_string(),
        array_prop("Related graph node ids", Some("string")),
    );
    tool(
        KG_DOC_CREATE,
        "Create a session document. Returns the document.",
        properties,
        &["title"],
    )
}

fn doc_append_tool() -> Tool {
    let mut properties = HashMap::new();
    properties.insert("id".to_string(), string_prop("Document id"));
    properties.insert("content".to_string(), string_prop("Text appended on a new line"));
    properties.insert(
        "node_ids".to_string(),
        array_prop("Node ids merged into the document's links", Some("string")),
    );
    tool(
        KG_DOC_APPEND,
        "Append to a document and merge node links. Returns the document.",
        properties,
        &["id", "content"],
    )
}

fn doc_read_tool() -> Tool {
    let mut properties = HashMap::new();
    properties.insert("id".to_string(), string_prop("Document id"));
    tool(
        KG_DOC_READ,
        "Read a full document.",
        properties,
        &["id"],
    )
}

fn doc_search_tool() -> Tool {
    let mut properties = HashMap::new();
    properties.insert(
        "q".to_string(),
        string_prop("Case-insensitive text in title or content (empty = all)"),
    );
    properties.insert(
        "session".to_string(),
        integer_prop("Only this session when > 0", 0, 0.0, None),
    );
    properties.insert(
        "limit".to_string(),
        integer_prop("Maximum results (1-100)", 10, 1.0, Some(100.0)),
    );
    tool(
        KG_DOC_SEARCH,
        "Search documents by text or session. Returns {q, count, docs:[{id,title,session,len,updated_at}]}.",
        properties,
        &[],
    )
}

fn doc_delete_tool() -> Tool {
    let mut properties = HashMap::new();
    properties.insert("id".to_string(), string_prop("Document id"));
    tool(
        KG_DOC_DELETE,
        "Delete a document. Destructive. Returns {op:\"doc_deleted\", id, title}.",
        properties,
        &["id"],
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_all_tools_count() {
        let tools = get_all_tools();
        // Session: 2, Reads: 3, Writes: 5, Domains: 4, Documents: 5 = 19 tools
        assert_eq!(tools.len(), 19, "Expected 19 tools, got {}", tools.len());
    }

    #[test]
    fn test_tools_have_required_fields() {
        for tool in get_all_tools() {
            assert!(!tool.name.is_empty(), "Tool name should not be empty");
            assert!(
                tool.description.is_some(),
                "Tool {} should have description",
                tool.name
            );
            assert_eq!(tool.input_schema.schema_type, "object");
        }
    }

    #[test]
    fn test_tool_names_are_unique() {
        let tools = get_all_tools();
        let names: Vec<_> = tools.iter().map(|t| &t.name).collect();
        let unique_names: std::collections::HashSet<_> = names.iter().collect();
        assert_eq!(
            names.len(),
            unique_names.len(),
            "Tool names should be unique"
        );
    }

    #[test]
    fn test_required_fields_are_declared_properties() {
        for tool in get_all_tools() {
            let properties = tool.input_schema.properties.unwrap_or_default();
            for field in tool.input_schema.required.unwrap_or_default() {
                assert!(
                    properties.contains_key(&field),
                    "Tool {} requires undeclared field {}",
                    tool.name,
                    field
                );
            }
        }
    }

    #[test]
    fn test_every_tool_is_dispatched() {
        let dir = tempfile::TempDir::new().unwrap();
        let store = kg_store::GraphStore::open_default(dir.path().join("kg")).unwrap();
        for tool in get_all_tools() {
            let result = crate::handlers::call_tool(&store, &tool.name, serde_json::Value::Null);
            assert!(
                !matches!(result, Err(crate::error::ToolError::UnknownTool(_))),
                "Tool {} has no handler",
                tool.name
            );
        }
    }

    #[test]
    fn test_schema_serializes_camel_case() {
        let json = serde_json::to_value(get_tool()).unwrap();
        assert!(json.get("inputSchema").is_some());
        assert_eq!(json["inputSchema"]["properties"]["hops"]["maximum"], 3.0);
    }
}
