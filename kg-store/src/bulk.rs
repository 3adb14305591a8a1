//! All-or-nothing batches of graph mutations

use serde::{Deserialize, Serialize};

use crate::error::{GraphError, Result};
use crate::node::{Edge, EdgeKey, Node};
use crate::storage::{GraphStore, WriteTx};

/// Largest batch accepted in one call
pub const MAX_BULK_OPS: usize = 1000;

/// One step of a bulk batch, tagged as `{"op": ..., "payload": ...}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", content = "payload", rename_all = "snake_case")]
pub enum BulkOp {
    PutNode(Node),
    PutEdge(Edge),
    DeleteNode { id: String },
    DeleteEdge(EdgeKey),
}

impl BulkOp {
    pub fn name(&self) -> &'static str {
        match self {
            BulkOp::PutNode(_) => "put_node",
            BulkOp::PutEdge(_) => "put_edge",
            BulkOp::DeleteNode { .. } => "delete_node",
            BulkOp::DeleteEdge(_) => "delete_edge",
        }
    }
}

/// Accepted batch shapes
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum BulkRequest {
    /// Bare list of tagged operations
    Ops(Vec<BulkOp>),
    /// `{"ops": [...]}`
    Wrapped { ops: Vec<BulkOp> },
    /// `{"nodes": [...], "edges": [...]}`
    Grouped(GroupedOps),
}

/// All node puts, then all edge puts
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GroupedOps {
    #[serde(default)]
    pub nodes: Vec<Node>,
    #[serde(default)]
    pub edges: Vec<Edge>,
}

impl BulkRequest {
    pub fn into_ops(self) -> Vec<BulkOp> {
        match self {
            BulkRequest::Ops(ops) | BulkRequest::Wrapped { ops } => ops,
            BulkRequest::Grouped(GroupedOps { nodes, edges }) => nodes
                .into_iter()
                .map(BulkOp::PutNode)
                .chain(edges.into_iter().map(BulkOp::PutEdge))
                .collect(),
        }
    }
}

/// Per-operation acknowledgement
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum BulkAck {
    NodeCreated { id: String },
    NodeUpdated { id: String },
    EdgeSet { src: String, rel: String, tgt: String },
    NodeDeleted { id: String, edges: usize },
    EdgeDeleted { src: String, rel: String, tgt: String },
}

impl WriteTx<'_> {
    /// Apply one bulk step through the regular graph operations
    pub fn apply(&self, op: BulkOp) -> Result<BulkAck> {
        Ok(match op {
            BulkOp::PutNode(node) => {
                let (node, created) = self.upsert_node(node)?;
                if created {
                    BulkAck::NodeCreated { id: node.id }
                } else {
                    BulkAck::NodeUpdated { id: node.id }
                }
            }
            BulkOp::PutEdge(edge) => {
                let edge = self.put_edge(edge)?;
                BulkAck::EdgeSet {
                    src: edge.src,
                    rel: edge.rel,
                    tgt: edge.tgt,
                }
            }
            BulkOp::DeleteNode { id } => {
                let edges = self.delete_node(&id)?;
                BulkAck::NodeDeleted { id, edges }
            }
            BulkOp::DeleteEdge(key) => {
                let edge = self.delete_edge(&key)?;
                BulkAck::EdgeDeleted {
                    src: edge.src,
                    rel: edge.rel,
                    tgt: edge.tgt,
                }
            }
        })
    }
}

impl GraphStore {
    /// Apply `ops` in order inside one transaction.
    ///
    /// Later steps see the effects of earlier ones. If any step fails the
    /// whole batch is rolled back and the error names the failing index.
    pub fn bulk(&self, ops: Vec<BulkOp>) -> Result<Vec<BulkAck>> {
        if ops.len() > MAX_BULK_OPS {
            return Err(GraphError::validation(
                "bulk",
                format!("batch of {} operations exceeds limit of {}", ops.len(), MAX_BULK_OPS),
            ));
        }
        if ops.is_empty() {
            return Ok(Vec::new());
        }

        let count = ops.len();
        let result = self.write(|tx| {
            let mut acks = Vec::with_capacity(ops.len());
            for (index, op) in ops.into_iter().enumerate() {
                let name = op.name();
                let ack = tx.apply(op).map_err(|e| GraphError::TransactionAbort {
                    index,
                    op: name,
                    source: Box::new(e),
                })?;
                acks.push(ack);
            }
            Ok(acks)
        });

        match &result {
            Ok(_) => log::debug!("Bulk batch of {} operations committed", count),
            Err(e) => log::warn!("Bulk batch of {} operations rolled back: {}", count, e),
        }
        result
    }
}
