//! Graph record types and builders
//!
//! Core value types stored by the graph: nodes, edges, index entries and the
//! process status singleton. Field names on the wire are the compact short
//! codes (`t`, `s`, `st`, ...); the long names are accepted as aliases.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{GraphError, Result};

pub const DEFAULT_NODE_TYPE: &str = "concept";
pub const DEFAULT_STATUS: &str = "seed";
pub const DEFAULT_WEIGHT: f64 = 1.0;

const MAX_ID_LENGTH: usize = 256;
const PREVIEW_CHARS: usize = 32;

fn default_node_type() -> String {
    DEFAULT_NODE_TYPE.to_string()
}

fn default_status() -> String {
    DEFAULT_STATUS.to_string()
}

fn default_weight() -> f64 {
    DEFAULT_WEIGHT
}

/// Open attribute value stored in a node's `meta` bag
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetaValue {
    Null,
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
    Text(String),
    List(Vec<MetaValue>),
    Map(BTreeMap<String, MetaValue>),
}

impl MetaValue {
    /// Append the scalar leaves of this value to `out`, space separated
    pub fn flatten_into(&self, out: &mut String) {
        match self {
            MetaValue::Null => {}
            MetaValue::Bool(b) => push_word(out, if *b { "true" } else { "false" }),
            MetaValue::Int(i) => push_word(out, &i.to_string()),
            MetaValue::UInt(u) => push_word(out, &u.to_string()),
            MetaValue::Float(f) => push_word(out, &f.to_string()),
            MetaValue::Text(s) => push_word(out, s),
            MetaValue::List(items) => items.iter().for_each(|v| v.flatten_into(out)),
            MetaValue::Map(map) => map.values().for_each(|v| v.flatten_into(out)),
        }
    }
}

impl From<serde_json::Value> for MetaValue {
    fn from(value: serde_json::Value) -> Self {
        use serde_json::Value;
        match value {
            Value::Null => MetaValue::Null,
            Value::Bool(b) => MetaValue::Bool(b),
            Value::Number(n) => match (n.as_i64(), n.as_u64()) {
                (Some(i), _) => MetaValue::Int(i),
                (None, Some(u)) => MetaValue::UInt(u),
                (None, None) => MetaValue::Float(n.as_f64().unwrap_or(0.0)),
            },
            Value::String(s) => MetaValue::Text(s),
            Value::Array(items) => MetaValue::List(items.into_iter().map(Into::into).collect()),
            Value::Object(map) => {
                MetaValue::Map(map.into_iter().map(|(k, v)| (k, v.into())).collect())
            }
        }
    }
}

impl From<&str> for MetaValue {
    fn from(s: &str) -> Self {
        MetaValue::Text(s.to_string())
    }
}

impl From<i64> for MetaValue {
    fn from(i: i64) -> Self {
        MetaValue::Int(i)
    }
}

impl From<bool> for MetaValue {
    fn from(b: bool) -> Self {
        MetaValue::Bool(b)
    }
}

/// Reference from a node body to external content
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BodyRef {
    Int(i64),
    Text(String),
}

/// A graph vertex
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: String,
    #[serde(rename = "t", alias = "type", default = "default_node_type")]
    pub node_type: String,
    #[serde(rename = "s", alias = "summary", default)]
    pub summary: String,
    #[serde(rename = "b", alias = "body", alias = "bands", default)]
    pub body: Vec<BodyRef>,
    #[serde(rename = "d", alias = "domain", default)]
    pub domain: String,
    #[serde(rename = "st", alias = "status", default = "default_status")]
    pub status: String,
    #[serde(rename = "k", alias = "notes", alias = "kai_note", default)]
    pub notes: String,
    #[serde(rename = "m", alias = "meta", default)]
    pub meta: BTreeMap<String, MetaValue>,
}

impl Node {
    /// Node with default type and status and empty attributes
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            node_type: default_node_type(),
            summary: String::new(),
            body: Vec::new(),
            domain: String::new(),
            status: default_status(),
            notes: String::new(),
            meta: BTreeMap::new(),
        }
    }

    pub fn builder(id: impl Into<String>) -> NodeBuilder {
        NodeBuilder { node: Node::new(id) }
    }

    /// Text fed to the full-text index
    pub fn searchable_text(&self) -> String {
        let mut text = String::new();
        for field in [&self.id, &self.node_type, &self.summary, &self.notes, &self.domain] {
            push_word(&mut text, field);
        }
        for value in self.meta.values() {
            value.flatten_into(&mut text);
        }
        text
    }

    pub fn index_entry(&self) -> IndexEntry {
        IndexEntry {
            id: self.id.clone(),
            node_type: self.node_type.clone(),
            status: self.status.clone(),
            domain: self.domain.clone(),
        }
    }

    pub(crate) fn validate(&self, op: &'static str) -> Result<()> {
        let subject = format!("node '{}'", preview(&self.id));
        validate_key_part(op, &subject, "id", &self.id)
    }
}

/// Fluent builder for [`Node`]
#[derive(Debug)]
pub struct NodeBuilder {
    node: Node,
}

impl NodeBuilder {
    pub fn node_type(mut self, node_type: impl Into<String>) -> Self {
        self.node.node_type = node_type.into();
        self
    }

    pub fn summary(mut self, summary: impl Into<String>) -> Self {
        self.node.summary = summary.into();
        self
    }

    pub fn body_ref(mut self, body_ref: BodyRef) -> Self {
        self.node.body.push(body_ref);
        self
    }

    pub fn domain(mut self, domain: impl Into<String>) -> Self {
        self.node.domain = domain.into();
        self
    }

    pub fn status(mut self, status: impl Into<String>) -> Self {
        self.node.status = status.into();
        self
    }

    pub fn notes(mut self, notes: impl Into<String>) -> Self {
        self.node.notes = notes.into();
        self
    }

    pub fn meta(mut self, key: impl Into<String>, value: impl Into<MetaValue>) -> Self {
        self.node.meta.insert(key.into(), value.into());
        self
    }

    pub fn build(self) -> Node {
        self.node
    }
}

/// Identity of an edge: the `(src, rel, tgt)` triple
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EdgeKey {
    #[serde(alias = "source_id")]
    pub src: String,
    #[serde(alias = "relation")]
    pub rel: String,
    #[serde(alias = "target_id")]
    pub tgt: String,
}

impl EdgeKey {
    pub fn new(src: impl Into<String>, rel: impl Into<String>, tgt: impl Into<String>) -> Self {
        Self {
            src: src.into(),
            rel: rel.into(),
            tgt: tgt.into(),
        }
    }

    /// `edge src-rel->tgt` with each part escaped and shortened, for messages
    pub(crate) fn label(&self) -> String {
        format!(
            "edge {}-{}->{}",
            preview(&self.src),
            preview(&self.rel),
            preview(&self.tgt)
        )
    }

    pub(crate) fn validate(&self, op: &'static str) -> Result<()> {
        let subject = self.label();
        validate_key_part(op, &subject, "src", &self.src)?;
        validate_key_part(op, &subject, "rel", &self.rel)?;
        validate_key_part(op, &subject, "tgt", &self.tgt)
    }
}

impl fmt::Display for EdgeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}->{}", self.src, self.rel, self.tgt)
    }
}

/// A directed, weighted, typed relation between two nodes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    #[serde(alias = "source_id")]
    pub src: String,
    #[serde(alias = "relation")]
    pub rel: String,
    #[serde(alias = "target_id")]
    pub tgt: String,
    #[serde(rename = "w", alias = "weight", default = "default_weight")]
    pub weight: f64,
    #[serde(rename = "n", alias = "note", default)]
    pub note: String,
}

impl Edge {
    pub fn new(src: impl Into<String>, rel: impl Into<String>, tgt: impl Into<String>) -> Self {
        Self {
            src: src.into(),
            rel: rel.into(),
            tgt: tgt.into(),
            weight: DEFAULT_WEIGHT,
            note: String::new(),
        }
    }

    pub fn with_weight(mut self, weight: f64) -> Self {
        self.weight = weight;
        self
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = note.into();
        self
    }

    pub fn key(&self) -> EdgeKey {
        EdgeKey::new(&self.src, &self.rel, &self.tgt)
    }

    pub fn searchable_text(&self) -> String {
        let mut text = String::new();
        push_word(&mut text, &self.rel);
        push_word(&mut text, &self.note);
        text
    }

    pub(crate) fn validate(&self, op: &'static str) -> Result<()> {
        let key = self.key();
        key.validate(op)?;
        if !self.weight.is_finite() {
            return Err(GraphError::validation(
                op,
                format!("{}: weight must be finite, got {}", key.label(), self.weight),
            ));
        }
        Ok(())
    }
}

/// Lightweight projection of a node used for listings and search hits
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexEntry {
    pub id: String,
    #[serde(rename = "t")]
    pub node_type: String,
    #[serde(rename = "st")]
    pub status: String,
    #[serde(rename = "d", default, skip_serializing_if = "String::is_empty")]
    pub domain: String,
}

/// Process-wide status singleton
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessStatus {
    pub text: String,
    pub updated_at: DateTime<Utc>,
}

/// Reject empty ids, oversized ids and ids with control characters.
///
/// Control characters are reserved as key separators in the store.
/// `subject` names the entity being checked, e.g. `node 'a'`.
pub(crate) fn validate_key_part(
    op: &'static str,
    subject: &str,
    field: &str,
    value: &str,
) -> Result<()> {
    if value.is_empty() {
        return Err(GraphError::validation(
            op,
            format!("{}: {} cannot be empty", subject, field),
        ));
    }
    if value.len() > MAX_ID_LENGTH {
        return Err(GraphError::validation(
            op,
            format!(
                "{}: {} too long ({} bytes, max {})",
                subject,
                field,
                value.len(),
                MAX_ID_LENGTH
            ),
        ));
    }
    if value.chars().any(char::is_control) {
        return Err(GraphError::validation(
            op,
            format!("{}: {} contains control characters", subject, field),
        ));
    }
    Ok(())
}

/// Escaped prefix of `value` safe to embed in an error message
fn preview(value: &str) -> String {
    let escaped: String = value.escape_debug().collect();
    if escaped.chars().count() <= PREVIEW_CHARS {
        return escaped;
    }
    let mut short: String = escaped.chars().take(PREVIEW_CHARS).collect();
    short.push_str("...");
    short
}

fn push_word(out: &mut String, word: &str) {
    if word.is_empty() {
        return;
    }
    if !out.is_empty() {
        out.push(' ');
    }
    out.push_str(word);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_defaults_from_minimal_json() {
        let node: Node = serde_json::from_str(r#"{"id":"x"}"#).unwrap();
        assert_eq!(node, Node::new("x"));
        assert_eq!(node.node_type, "concept");
        assert_eq!(node.status, "seed");
    }

    #[test]
    fn test_node_short_codes_and_aliases() {
        let short: Node = serde_json::from_str(
            r#"{"id":"a","t":"principle","s":"sum","b":[1,"x"],"st":"open","k":"n","m":{"w":2}}"#,
        )
        .unwrap();
        let long: Node = serde_json::from_str(
            r#"{"id":"a","type":"principle","summary":"sum","bands":[1,"x"],"status":"open","kai_note":"n","meta":{"w":2}}"#,
        )
        .unwrap();
        assert_eq!(short, long);
        assert_eq!(short.body, vec![BodyRef::Int(1), BodyRef::Text("x".into())]);
        assert_eq!(short.meta.get("w"), Some(&MetaValue::Int(2)));
    }

    #[test]
    fn test_node_serializes_short_codes() {
        let node = Node::builder("a").summary("hello").build();
        let json = serde_json::to_value(&node).unwrap();
        assert_eq!(json["t"], "concept");
        assert_eq!(json["s"], "hello");
        assert_eq!(json["st"], "seed");
        assert!(json.get("summary").is_none());
    }

    #[test]
    fn test_meta_value_nested_json() {
        let json = serde_json::json!({"a": [1, 2.5, "three", null, true], "b": {"c": "d"}});
        let meta: BTreeMap<String, MetaValue> = serde_json::from_value(json.clone()).unwrap();
        assert_eq!(
            meta["a"],
            MetaValue::List(vec![
                MetaValue::Int(1),
                MetaValue::Float(2.5),
                MetaValue::Text("three".into()),
                MetaValue::Null,
                MetaValue::Bool(true),
            ])
        );
        assert_eq!(serde_json::to_value(&meta).unwrap(), json);
    }

    #[test]
    fn test_meta_value_messagepack_roundtrip() {
        let node = Node::builder("m")
            .meta("list", MetaValue::List(vec![MetaValue::Int(1), "two".into()]))
            .meta("flag", true)
            .meta("ratio", MetaValue::Float(0.25))
            .build();
        let bytes = rmp_serde::to_vec_named(&node).unwrap();
        let back: Node = rmp_serde::from_slice(&bytes).unwrap();
        assert_eq!(back, node);
    }

    #[test]
    fn test_searchable_text_includes_meta_leaves() {
        let node = Node::builder("holo")
            .summary("mirror principle")
            .notes("seen twice")
            .meta("source", "band three")
            .meta("page", 42i64)
            .build();
        let text = node.searchable_text();
        assert!(text.contains("holo"));
        assert!(text.contains("mirror principle"));
        assert!(text.contains("band three"));
        assert!(text.contains("42"));
    }

    #[test]
    fn test_edge_defaults_and_aliases() {
        let edge: Edge =
            serde_json::from_str(r#"{"source_id":"a","relation":"mirrors","target_id":"b"}"#)
                .unwrap();
        assert_eq!(edge.weight, 1.0);
        assert_eq!(edge.key().to_string(), "a-mirrors->b");
    }

    #[test]
    fn test_validate_key_part() {
        assert!(validate_key_part("op", "node 'ok-id'", "id", "ok-id").is_ok());
        assert!(validate_key_part("op", "node ''", "id", "").is_err());
        assert!(validate_key_part("op", "node 'bad'", "id", "bad\0id").is_err());
        assert!(validate_key_part("op", "node 'x'", "id", &"x".repeat(300)).is_err());
    }

    #[test]
    fn test_edge_rejects_non_finite_weight() {
        let edge = Edge::new("a", "r", "b").with_weight(f64::NAN);
        let err = edge.validate("put_edge").unwrap_err();
        assert!(matches!(err, GraphError::Validation { .. }));
        assert_eq!(err.to_string(), "put_edge: edge a-r->b: weight must be finite, got NaN");
    }

    #[test]
    fn test_edge_errors_name_the_triple() {
        let err = Edge::new("src1", "", "tgt1").validate("put_edge").unwrap_err();
        assert!(err.to_string().contains("edge src1-->tgt1"));
        assert!(err.to_string().contains("rel cannot be empty"));
    }

    #[test]
    fn test_node_errors_name_the_id() {
        let long_id = format!("mynode{}", "x".repeat(300));
        let err = Node::new(long_id).validate("put_node").unwrap_err().to_string();
        assert!(err.contains("node 'mynode"));
        assert!(err.contains("too long (306 bytes, max 256)"));

        let err = Node::new("my\nnode").validate("put_node").unwrap_err().to_string();
        assert!(err.contains("node 'my\\nnode'"));
        assert!(err.contains("control characters"));
    }

    #[test]
    fn test_preview_escapes_and_truncates() {
        assert_eq!(preview("a\tb"), "a\\tb");
        let long = preview(&"y".repeat(100));
        assert_eq!(long, format!("{}...", "y".repeat(PREVIEW_CHARS)));
    }

    #[test]
    fn test_meta_value_keeps_unsigned_above_i64() {
        let json = serde_json::json!({"big": 18446744073709551615u64, "small": -3});
        let node: Node = serde_json::from_value(serde_json::json!({"id": "n", "m": json})).unwrap();
        assert_eq!(node.meta["big"], MetaValue::UInt(u64::MAX));
        assert_eq!(node.meta["small"], MetaValue::Int(-3));

        let bytes = rmp_serde::to_vec_named(&node).unwrap();
        let back: Node = rmp_serde::from_slice(&bytes).unwrap();
        assert_eq!(back, node);
        assert_eq!(serde_json::to_value(&back.meta).unwrap(), json);

        let converted = MetaValue::from(serde_json::json!(18446744073709551615u64));
        assert_eq!(converted, MetaValue::UInt(u64::MAX));
        let mut text = String::new();
        converted.flatten_into(&mut text);
        assert_eq!(text, "18446744073709551615");
    }

    #[test]
    fn test_index_entry_omits_empty_domain() {
        let entry = Node::new("x").index_entry();
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json, serde_json::json!({"id": "x", "t": "concept", "st": "seed"}));
    }
}
