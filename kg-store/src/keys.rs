//! Keyspace layout
//!
//! Every record type lives under its own ASCII prefix in a single RocksDB
//! keyspace. Composite keys join their parts with `\0`, which validated ids
//! can never contain.

use crate::node::EdgeKey;

pub const NODE: &[u8] = b"n:";
pub const INDEX: &[u8] = b"i:";
pub const EDGE: &[u8] = b"e:";
pub const REVERSE: &[u8] = b"r:";
pub const POSTING: &[u8] = b"f:";
pub const DOCUMENT: &[u8] = b"d:";
pub const STATUS: &[u8] = b"s:status";
pub const VERSION: &[u8] = b"m:version";
pub const FTS_STATS: &[u8] = b"m:fts";

const SEP: u8 = 0;

fn join(prefix: &[u8], parts: &[&str]) -> Vec<u8> {
    let len = prefix.len() + parts.iter().map(|p| p.len() + 1).sum::<usize>();
    let mut key = Vec::with_capacity(len);
    key.extend_from_slice(prefix);
    for (i, part) in parts.iter().enumerate() {
        if i > 0 {
            key.push(SEP);
        }
        key.extend_from_slice(part.as_bytes());
    }
    key
}

fn split(rest: &[u8]) -> Vec<String> {
    rest.split(|b| *b == SEP)
        .map(|part| String::from_utf8_lossy(part).into_owned())
        .collect()
}

pub fn node(id: &str) -> Vec<u8> {
    join(NODE, &[id])
}

pub fn index(id: &str) -> Vec<u8> {
    join(INDEX, &[id])
}

pub fn document(id: &str) -> Vec<u8> {
    join(DOCUMENT, &[id])
}

pub fn edge(key: &EdgeKey) -> Vec<u8> {
    join(EDGE, &[&key.src, &key.rel, &key.tgt])
}

pub fn reverse(key: &EdgeKey) -> Vec<u8> {
    join(REVERSE, &[&key.tgt, &key.rel, &key.src])
}

/// Prefix of all outgoing edges of `src`, optionally of one relation
pub fn outgoing_prefix(src: &str, rel: Option<&str>) -> Vec<u8> {
    adjacency_prefix(EDGE, src, rel)
}

/// Prefix of all incoming edges of `tgt`, optionally of one relation
pub fn incoming_prefix(tgt: &str, rel: Option<&str>) -> Vec<u8> {
    adjacency_prefix(REVERSE, tgt, rel)
}

fn adjacency_prefix(prefix: &[u8], id: &str, rel: Option<&str>) -> Vec<u8> {
    let mut key = match rel {
        Some(rel) => join(prefix, &[id, rel]),
        None => join(prefix, &[id]),
    };
    key.push(SEP);
    key
}

/// Decode an `e:` key back into its triple
pub fn parse_edge(key: &[u8]) -> Option<EdgeKey> {
    let parts = split(key.strip_prefix(EDGE)?);
    match parts.as_slice() {
        [src, rel, tgt] => Some(EdgeKey::new(src, rel, tgt)),
        _ => None,
    }
}

/// Decode an `r:` key back into the triple it mirrors
pub fn parse_reverse(key: &[u8]) -> Option<EdgeKey> {
    let parts = split(key.strip_prefix(REVERSE)?);
    match parts.as_slice() {
        [tgt, rel, src] => Some(EdgeKey::new(src, rel, tgt)),
        _ => None,
    }
}

/// Strip a single-part prefix such as `i:` and return the id
pub fn parse_id(prefix: &[u8], key: &[u8]) -> Option<String> {
    key.strip_prefix(prefix)
        .map(|rest| String::from_utf8_lossy(rest).into_owned())
}

/// Full-text document identifiers
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DocKey {
    Node(String),
    Edge(EdgeKey),
}

impl DocKey {
    pub fn encode(&self) -> Vec<u8> {
        match self {
            DocKey::Node(id) => join(b"n", &["", id]),
            DocKey::Edge(key) => join(b"e", &["", &key.src, &key.rel, &key.tgt]),
        }
    }

    pub fn decode(bytes: &[u8]) -> Option<Self> {
        let parts = split(bytes);
        match parts.as_slice() {
            [kind, id] if kind == "n" => Some(DocKey::Node(id.clone())),
            [kind, src, rel, tgt] if kind == "e" => Some(DocKey::Edge(EdgeKey::new(src, rel, tgt))),
            _ => None,
        }
    }
}

pub fn posting(term: &str, doc: &DocKey) -> Vec<u8> {
    let mut key = join(POSTING, &[term]);
    key.push(SEP);
    key.extend_from_slice(&doc.encode());
    key
}

/// Prefix of every posting whose term starts with `term`
pub fn posting_prefix(term: &str) -> Vec<u8> {
    join(POSTING, &[term])
}

/// Split an `f:` key into its term and document
pub fn parse_posting(key: &[u8]) -> Option<(String, DocKey)> {
    let rest = key.strip_prefix(POSTING)?;
    let sep = rest.iter().position(|b| *b == SEP)?;
    let term = String::from_utf8_lossy(&rest[..sep]).into_owned();
    let doc = DocKey::decode(&rest[sep + 1..])?;
    Some((term, doc))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_edge_key_roundtrip() {
        let key = EdgeKey::new("a", "mirrors", "b");
        assert_eq!(parse_edge(&edge(&key)), Some(key.clone()));
        assert_eq!(parse_reverse(&reverse(&key)), Some(key));
    }

    #[test]
    fn test_outgoing_prefix_does_not_match_longer_ids() {
        let key = EdgeKey::new("ab", "r", "c");
        assert!(!edge(&key).starts_with(&outgoing_prefix("a", None)));
        assert!(edge(&key).starts_with(&outgoing_prefix("ab", None)));
        assert!(edge(&key).starts_with(&outgoing_prefix("ab", Some("r"))));
        assert!(!edge(&key).starts_with(&outgoing_prefix("ab", Some("rx"))));
    }

    #[test]
    fn test_posting_roundtrip() {
        let doc = DocKey::Edge(EdgeKey::new("a", "r", "b"));
        let key = posting("mirror", &doc);
        assert_eq!(parse_posting(&key), Some(("mirror".to_string(), doc)));
        assert!(key.starts_with(&posting_prefix("mir")));

        let node_doc = DocKey::Node("x".into());
        assert_eq!(DocKey::decode(&node_doc.encode()), Some(node_doc));
    }
}
