//! Graph access layer
//!
//! Node and edge CRUD with referential integrity and upsert semantics. The
//! mutating operations are implemented on [`WriteTx`] so that single calls and
//! bulk batches run the same code; [`GraphStore`] wraps each in its own
//! transaction.

use std::collections::{BTreeMap, BTreeSet, HashSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{GraphError, Result};
use crate::index;
use crate::keys;
use crate::node::{Edge, EdgeKey, Node};
use crate::storage::{GraphStore, KvRead, WriteTx};
use crate::temporal::Timestamps;

/// Node record as persisted under `n:{id}`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct StoredNode {
    pub node: Node,
    pub times: Timestamps,
}

/// Edge payload as persisted under `e:{src}\0{rel}\0{tgt}`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct StoredEdge {
    #[serde(rename = "w")]
    pub weight: f64,
    #[serde(rename = "n", default)]
    pub note: String,
    pub created_at: DateTime<Utc>,
}

impl StoredEdge {
    pub(crate) fn into_edge(self, key: EdgeKey) -> Edge {
        Edge {
            src: key.src,
            rel: key.rel,
            tgt: key.tgt,
            weight: self.weight,
            note: self.note,
        }
    }
}

/// A node together with its immediate or expanded neighborhood
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeView {
    pub node: Node,
    pub edges: Vec<Edge>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub neighbors: Option<BTreeMap<String, Node>>,
}

pub(crate) fn load_node<R: KvRead>(reader: &R, id: &str) -> Result<Option<StoredNode>> {
    reader.get_record(&keys::node(id))
}

pub(crate) fn load_edge<R: KvRead>(reader: &R, key: &EdgeKey) -> Result<Option<Edge>> {
    Ok(reader
        .get_record::<StoredEdge>(&keys::edge(key))?
        .map(|stored| stored.into_edge(key.clone())))
}

/// Every edge touching `id`, outgoing first, each triple once.
///
/// Outgoing edges come from the `e:` range, incoming ones from the `r:`
/// reverse markers.
pub(crate) fn incident_edges<R: KvRead>(
    reader: &R,
    id: &str,
    rel: Option<&str>,
) -> Result<Vec<Edge>> {
    let mut seen = HashSet::new();
    let mut edges = Vec::new();

    for (raw_key, value) in reader.scan_prefix(&keys::outgoing_prefix(id, rel))? {
        let Some(key) = keys::parse_edge(&raw_key) else {
            log::warn!("Skipping malformed edge key: {:?}", raw_key);
            continue;
        };
        let stored: StoredEdge = crate::storage::decode(&value)?;
        seen.insert(key.clone());
        edges.push(stored.into_edge(key));
    }

    for (raw_key, _) in reader.scan_prefix(&keys::incoming_prefix(id, rel))? {
        let Some(key) = keys::parse_reverse(&raw_key) else {
            log::warn!("Skipping malformed reverse key: {:?}", raw_key);
            continue;
        };
        if seen.contains(&key) {
            continue;
        }
        match load_edge(reader, &key)? {
            Some(edge) => {
                seen.insert(key);
                edges.push(edge);
            }
            None => log::warn!("Reverse marker without edge record: {}", key),
        }
    }

    Ok(edges)
}

impl WriteTx<'_> {
    /// Insert or fully replace a node. Returns the node and whether it was new.
    pub(crate) fn upsert_node(&self, node: Node) -> Result<(Node, bool)> {
        const OP: &str = "put_node";
        node.validate(OP)?;

        let key = keys::node(&node.id);
        let previous: Option<StoredNode> = self.get_record_for_update(&key)?;
        let now = Utc::now();

        let times = match &previous {
            Some(prev) => {
                index::unindex_node(self, &prev.node)?;
                prev.times.touched(now)
            }
            None => Timestamps::new_at(now),
        };

        index::index_node(self, &node, times.updated_at)?;
        let created = previous.is_none();
        let stored = StoredNode { node, times };
        self.put_record(&key, &stored)?;
        Ok((stored.node, created))
    }

    /// Insert or fully replace a node
    pub fn put_node(&self, node: Node) -> Result<Node> {
        self.upsert_node(node).map(|(node, _)| node)
    }

    /// Insert or replace an edge by its `(src, rel, tgt)` triple.
    ///
    /// Both endpoints are locked for the rest of the transaction, so they
    /// cannot be deleted concurrently.
    pub fn put_edge(&self, edge: Edge) -> Result<Edge> {
        const OP: &str = "put_edge";
        edge.validate(OP)?;

        for endpoint in [&edge.src, &edge.tgt] {
            if self.get_for_update(&keys::node(endpoint))?.is_none() {
                return Err(GraphError::ReferentialIntegrity {
                    op: OP,
                    edge: edge.key(),
                    missing: endpoint.clone(),
                });
            }
        }

        let key = edge.key();
        let record_key = keys::edge(&key);
        let previous: Option<StoredEdge> = self.get_record_for_update(&record_key)?;

        let created_at = match previous {
            Some(prev) => {
                let created_at = prev.created_at;
                index::unindex_edge(self, &prev.into_edge(key.clone()))?;
                created_at
            }
            None => Utc::now(),
        };

        index::index_edge(self, &edge)?;
        self.put_record(
            &record_key,
            &StoredEdge {
                weight: edge.weight,
                note: edge.note.clone(),
                created_at,
            },
        )?;
        self.put_raw(&keys::reverse(&key), &[])?;
        Ok(edge)
    }

    /// Remove an edge if present, with its reverse marker and postings
    fn remove_edge(&self, key: &EdgeKey) -> Result<Option<Edge>> {
        let record_key = keys::edge(key);
        let Some(stored) = self.get_record_for_update::<StoredEdge>(&record_key)? else {
            return Ok(None);
        };
        let edge = stored.into_edge(key.clone());
        index::unindex_edge(self, &edge)?;
        self.delete(&record_key)?;
        self.delete(&keys::reverse(key))?;
        Ok(Some(edge))
    }

    /// Delete a node and every edge touching it. Returns the edge count.
    pub fn delete_node(&self, id: &str) -> Result<usize> {
        const OP: &str = "delete_node";
        let key = keys::node(id);
        let Some(stored) = self.get_record_for_update::<StoredNode>(&key)? else {
            return Err(GraphError::node_not_found(OP, id));
        };

        let mut incident = BTreeSet::new();
        for (raw_key, _) in self.scan_prefix(&keys::outgoing_prefix(id, None))? {
            incident.extend(keys::parse_edge(&raw_key));
        }
        for (raw_key, _) in self.scan_prefix(&keys::incoming_prefix(id, None))? {
            incident.extend(keys::parse_reverse(&raw_key));
        }

        let mut removed = 0;
        for edge_key in &incident {
            if self.remove_edge(edge_key)?.is_some() {
                removed += 1;
            }
        }

        index::unindex_node(self, &stored.node)?;
        self.delete(&key)?;
        Ok(removed)
    }

    /// Delete one edge by its triple
    pub fn delete_edge(&self, key: &EdgeKey) -> Result<Edge> {
        const OP: &str = "delete_edge";
        key.validate(OP)?;
        self.remove_edge(key)?
            .ok_or_else(|| GraphError::edge_not_found(OP, key.clone()))
    }
}

impl GraphStore {
    /// Insert or fully replace a node
    pub fn put_node(&self, node: Node) -> Result<Node> {
        self.write(|tx| tx.put_node(node))
    }

    /// Insert or replace an edge; both endpoints must exist
    pub fn put_edge(&self, edge: Edge) -> Result<Edge> {
        self.write(|tx| tx.put_edge(edge))
    }

    /// Delete a node with cascade. Returns how many edges went with it.
    pub fn delete_node(&self, id: &str) -> Result<usize> {
        let removed = self.write(|tx| tx.delete_node(id))?;
        log::debug!("Deleted node {} with {} edges", id, removed);
        Ok(removed)
    }

    pub fn delete_edge(&self, key: &EdgeKey) -> Result<Edge> {
        self.write(|tx| tx.delete_edge(key))
    }

    /// Fetch a single node
    pub fn node(&self, id: &str) -> Result<Node> {
        load_node(&self.read(), id)?
            .map(|stored| stored.node)
            .ok_or_else(|| GraphError::node_not_found("get_node", id))
    }

    /// Fetch a node's record timestamps
    pub fn node_timestamps(&self, id: &str) -> Result<Timestamps> {
        load_node(&self.read(), id)?
            .map(|stored| stored.times)
            .ok_or_else(|| GraphError::node_not_found("get_node", id))
    }

    /// Fetch a single edge
    pub fn edge(&self, key: &EdgeKey) -> Result<Edge> {
        load_edge(&self.read(), key)?
            .ok_or_else(|| GraphError::edge_not_found("get_edge", key.clone()))
    }

    /// Fetch a node with its neighborhood.
    ///
    /// With `hops == 0` the view holds the node and every edge touching it.
    /// With `hops >= 1` the view holds the traversal's edges and a
    /// `neighbors` map of every other visited node.
    pub fn get_node(&self, id: &str, hops: u32) -> Result<NodeView> {
        const OP: &str = "get_node";
        let reader = self.read();

        if hops == 0 {
            let node = load_node(&reader, id)?
                .ok_or_else(|| GraphError::node_not_found(OP, id))?
                .node;
            let edges = incident_edges(&reader, id, None)?;
            return Ok(NodeView {
                node,
                edges,
                neighbors: None,
            });
        }

        let subgraph =
            crate::traversal::expand(&reader, OP, id, hops, None, &self.config().limits)?;
        let mut nodes = subgraph.nodes.into_iter();
        let node = nodes
            .next()
            .ok_or_else(|| GraphError::node_not_found(OP, id))?;
        let neighbors = nodes.map(|n| (n.id.clone(), n)).collect();
        Ok(NodeView {
            node,
            edges: subgraph.edges,
            neighbors: Some(neighbors),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn open() -> (TempDir, GraphStore) {
        let dir = TempDir::new().unwrap();
        let store = GraphStore::open_default(dir.path().join("kg")).unwrap();
        (dir, store)
    }

    #[test]
    fn test_upsert_reports_created_then_updated() {
        let (_dir, store) = open();
        let created = store.write(|tx| tx.upsert_node(Node::new("a"))).unwrap();
        assert!(created.1);
        let updated = store.write(|tx| tx.upsert_node(Node::new("a"))).unwrap();
        assert!(!updated.1);
    }

    #[test]
    fn test_overwrite_keeps_created_at() {
        let (_dir, store) = open();
        store.put_node(Node::new("a")).unwrap();
        let first = store.node_timestamps("a").unwrap();
        store
            .put_node(Node::builder("a").summary("changed").build())
            .unwrap();
        let second = store.node_timestamps("a").unwrap();
        assert_eq!(first.created_at, second.created_at);
        assert!(second.updated_at >= first.updated_at);
    }

    #[test]
    fn test_put_node_keeps_empty_type() {
        let (_dir, store) = open();
        let node = Node::builder("a").node_type("").build();
        store.put_node(node.clone()).unwrap();
        assert_eq!(store.get_node("a", 0).unwrap().node, node);
    }

    #[test]
    fn test_put_edge_error_names_triple() {
        let (_dir, store) = open();
        store.put_node(Node::new("mynode")).unwrap();
        let err = store
            .put_edge(Edge::new("mynode", "r", "other").with_weight(f64::INFINITY))
            .unwrap_err();
        assert!(err.to_string().contains("edge mynode-r->other"));

        let err = store.put_node(Node::new("")).unwrap_err();
        assert_eq!(err.to_string(), "put_node: node '': id cannot be empty");
    }

    #[test]
    fn test_self_loop_listed_once_and_deleted_once() {
        let (_dir, store) = open();
        store.put_node(Node::new("a")).unwrap();
        store.put_edge(Edge::new("a", "self", "a")).unwrap();

        let view = store.get_node("a", 0).unwrap();
        assert_eq!(view.edges.len(), 1);
        assert_eq!(store.delete_node("a").unwrap(), 1);
    }

    #[test]
    fn test_incident_edges_filters_by_relation() {
        let (_dir, store) = open();
        for id in ["a", "b", "c"] {
            store.put_node(Node::new(id)).unwrap();
        }
        store.put_edge(Edge::new("a", "likes", "b")).unwrap();
        store.put_edge(Edge::new("c", "likes", "a")).unwrap();
        store.put_edge(Edge::new("a", "hates", "c")).unwrap();

        let reader = store.read();
        let likes = incident_edges(&reader, "a", Some("likes")).unwrap();
        let keys: Vec<_> = likes.iter().map(|e| e.key().to_string()).collect();
        assert_eq!(keys, vec!["a-likes->b", "c-likes->a"]);
        assert_eq!(incident_edges(&reader, "a", None).unwrap().len(), 3);
    }

    #[test]
    fn test_edge_overwrite_replaces_weight_and_note() {
        let (_dir, store) = open();
        store.put_node(Node::new("a")).unwrap();
        store.put_node(Node::new("b")).unwrap();
        store
            .put_edge(Edge::new("a", "r", "b").with_weight(0.5).with_note("first"))
            .unwrap();
        store
            .put_edge(Edge::new("a", "r", "b").with_weight(2.0))
            .unwrap();

        let edge = store.edge(&EdgeKey::new("a", "r", "b")).unwrap();
        assert_eq!(edge.weight, 2.0);
        assert_eq!(edge.note, "");
        assert_eq!(store.get_node("a", 0).unwrap().edges.len(), 1);
    }

    #[test]
    fn test_delete_edge_leaves_nodes() {
        let (_dir, store) = open();
        store.put_node(Node::new("a")).unwrap();
        store.put_node(Node::new("b")).unwrap();
        store.put_edge(Edge::new("a", "r", "b")).unwrap();

        let removed = store.delete_edge(&EdgeKey::new("a", "r", "b")).unwrap();
        assert_eq!(removed.key(), EdgeKey::new("a", "r", "b"));
        assert!(store.get_node("a", 0).unwrap().edges.is_empty());
        assert!(store.get_node("b", 0).unwrap().edges.is_empty());
    }
}
