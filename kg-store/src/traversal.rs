//! Bounded breadth-first traversal
//!
//! Expands an induced subgraph around a start node. Edges are followed in both
//! directions for reachability, but returned with their stored direction.
//! Frontiers are processed in sorted id order and adjacency ranges are read in
//! key order, so results are deterministic for a given store state.

use std::collections::{BTreeSet, HashSet};

use serde::Serialize;

use crate::error::{GraphError, Result};
use crate::graph::{incident_edges, load_node};
use crate::node::{Edge, Node};
use crate::storage::{GraphStore, KvRead};

/// Cost bounds applied to every traversal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TraversalLimits {
    /// Requested hop counts above this are clamped
    pub max_hops: u32,
    /// Expansion stops once this many nodes have been visited
    pub max_nodes: usize,
}

impl Default for TraversalLimits {
    fn default() -> Self {
        Self {
            max_hops: 5,
            max_nodes: 500,
        }
    }
}

/// Result of a traversal
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Subgraph {
    pub start: String,
    /// Hop count actually used after clamping
    pub hops: u32,
    /// Visited nodes in BFS order, start first
    pub nodes: Vec<Node>,
    /// Touched edges in first-seen order
    pub edges: Vec<Edge>,
    /// True when the node bound cut the expansion short
    pub truncated: bool,
}

impl Subgraph {
    pub fn node_ids(&self) -> Vec<&str> {
        self.nodes.iter().map(|n| n.id.as_str()).collect()
    }
}

pub(crate) fn expand<R: KvRead>(
    reader: &R,
    op: &'static str,
    start: &str,
    hops: u32,
    rel: Option<&str>,
    limits: &TraversalLimits,
) -> Result<Subgraph> {
    let start_node = load_node(reader, start)?
        .ok_or_else(|| GraphError::node_not_found(op, start))?
        .node;

    let hops = hops.min(limits.max_hops);
    let max_nodes = limits.max_nodes.max(1);

    let mut visited: HashSet<String> = HashSet::from([start.to_string()]);
    let mut nodes = vec![start_node];
    let mut seen_edges = HashSet::new();
    let mut edges = Vec::new();
    let mut frontier = BTreeSet::from([start.to_string()]);
    let mut truncated = false;

    for _ in 0..hops {
        if frontier.is_empty() {
            break;
        }
        let mut discovered = Vec::new();
        let mut next = BTreeSet::new();

        for id in &frontier {
            for edge in incident_edges(reader, id, rel)? {
                let other = if edge.src == *id { &edge.tgt } else { &edge.src };
                if !visited.contains(other) {
                    if visited.len() >= max_nodes {
                        truncated = true;
                        continue;
                    }
                    visited.insert(other.clone());
                    discovered.push(other.clone());
                    next.insert(other.clone());
                }
                if seen_edges.insert(edge.key()) {
                    edges.push(edge);
                }
            }
        }

        for id in discovered {
            match load_node(reader, &id)? {
                Some(stored) => nodes.push(stored.node),
                None => log::warn!("{}: edge endpoint '{}' has no node record", op, id),
            }
        }
        frontier = next;
    }

    Ok(Subgraph {
        start: start.to_string(),
        hops,
        nodes,
        edges,
        truncated,
    })
}

impl GraphStore {
    /// Expand up to `hops` rounds from `start`, optionally following only
    /// edges of relation `rel`.
    pub fn traverse(&self, start: &str, hops: u32, rel: Option<&str>) -> Result<Subgraph> {
        let limits = self.config().limits;
        expand(&self.read(), "traverse", start, hops, rel, &limits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::StoreConfig;
    use tempfile::TempDir;

    fn chain_store(limits: TraversalLimits) -> (TempDir, GraphStore) {
        let dir = TempDir::new().unwrap();
        let store = GraphStore::open(
            dir.path().join("kg"),
            StoreConfig {
                limits,
                ..StoreConfig::default()
            },
        )
        .unwrap();
        for id in ["a", "b", "c", "d"] {
            store.put_node(Node::new(id)).unwrap();
        }
        store.put_edge(Edge::new("a", "next", "b")).unwrap();
        store.put_edge(Edge::new("b", "next", "c")).unwrap();
        store.put_edge(Edge::new("c", "next", "d")).unwrap();
        (dir, store)
    }

    #[test]
    fn test_hops_are_clamped() {
        let (_dir, store) = chain_store(TraversalLimits {
            max_hops: 2,
            max_nodes: 500,
        });
        let graph = store.traverse("a", 10, None).unwrap();
        assert_eq!(graph.hops, 2);
        assert_eq!(graph.node_ids(), vec!["a", "b", "c"]);
        assert!(!graph.truncated);
    }

    #[test]
    fn test_node_bound_truncates() {
        let (_dir, store) = chain_store(TraversalLimits {
            max_hops: 5,
            max_nodes: 2,
        });
        let graph = store.traverse("a", 3, None).unwrap();
        assert_eq!(graph.node_ids(), vec!["a", "b"]);
        assert_eq!(graph.edges.len(), 1);
        assert!(graph.truncated);
    }

    #[test]
    fn test_incoming_edges_are_followed() {
        let (_dir, store) = chain_store(TraversalLimits::default());
        let graph = store.traverse("d", 1, None).unwrap();
        assert_eq!(graph.node_ids(), vec!["d", "c"]);
        assert_eq!(graph.edges[0].src, "c");
        assert_eq!(graph.edges[0].tgt, "d");
    }

    #[test]
    fn test_relation_filter() {
        let (_dir, store) = chain_store(TraversalLimits::default());
        store.put_edge(Edge::new("a", "jump", "d")).unwrap();
        let graph = store.traverse("a", 1, Some("jump")).unwrap();
        assert_eq!(graph.node_ids(), vec!["a", "d"]);
        assert_eq!(graph.edges.len(), 1);
    }

    #[test]
    fn test_early_stop_on_empty_frontier() {
        let (_dir, store) = chain_store(TraversalLimits::default());
        store.put_node(Node::new("lonely")).unwrap();
        let graph = store.traverse("lonely", 4, None).unwrap();
        assert_eq!(graph.node_ids(), vec!["lonely"]);
        assert!(graph.edges.is_empty());
        assert_eq!(graph.hops, 4);
    }
}
