//! Session document tool handlers.

use kg_store::{DocumentQuery, DocumentSummary, GraphStore};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::{parse_args, to_json};
use crate::error::ToolResult;
use crate::mcp::tools;

#[derive(Debug, Deserialize)]
pub struct CreateParams {
    pub title: String,
    #[serde(alias = "session_number", default)]
    pub session: i64,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub node_ids: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct AppendParams {
    pub id: String,
    pub content: String,
    #[serde(default)]
    pub node_ids: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct IdParams {
    pub id: String,
}

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    pub q: String,
    #[serde(default)]
    pub session: i64,
    #[serde(default)]
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub q: String,
    pub count: usize,
    pub docs: Vec<DocumentSummary>,
}

pub fn create(store: &GraphStore, args: Value) -> ToolResult<Value> {
    let params: CreateParams = parse_args(tools::KG_DOC_CREATE, args, &["node_ids"])?;
    let doc = store.create_document(&params.title, params.session, &params.content, params.node_ids)?;
    to_json(&doc)
}

pub fn append(store: &GraphStore, args: Value) -> ToolResult<Value> {
    let params: AppendParams = parse_args(tools::KG_DOC_APPEND, args, &["node_ids"])?;
    let doc = store.append_document(&params.id, &params.content, params.node_ids)?;
    to_json(&doc)
}

pub fn read(store: &GraphStore, args: Value) -> ToolResult<Value> {
    let params: IdParams = parse_args(tools::KG_DOC_READ, args, &[])?;
    to_json(&store.document(&params.id)?)
}

pub fn search(store: &GraphStore, args: Value) -> ToolResult<Value> {
    let params: SearchParams = parse_args(tools::KG_DOC_SEARCH, args, &[])?;
    let mut query = DocumentQuery {
        q: params.q,
        session: params.session,
        ..DocumentQuery::default()
    };
    if let Some(limit) = params.limit {
        query.limit = limit;
    }
    let docs = store.search_documents(&query)?;
    let label = if query.session > 0 {
        format!("session:{}", query.session)
    } else {
        query.q
    };
    to_json(&SearchResponse {
        q: label,
        count: docs.len(),
        docs,
    })
}

pub fn delete(store: &GraphStore, args: Value) -> ToolResult<Value> {
    let params: IdParams = parse_args(tools::KG_DOC_DELETE, args, &[])?;
    let doc = store.delete_document(&params.id)?;
    Ok(json!({ "op": "doc_deleted", "id": doc.id, "title": doc.title }))
}
