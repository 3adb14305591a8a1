//! KG Store
//!
//! Transactional knowledge-graph storage engine: typed nodes, weighted
//! directed edges, a full-text index, bounded traversal and atomic bulk
//! batches, persisted in RocksDB.
//!
//! ## Features
//!
//! - **Referential integrity** - edges are rejected unless both endpoints exist
//! - **Atomic batches** - bulk operations commit together or not at all
//! - **Bounded traversal** - breadth-first expansion with hop and node limits
//! - **BM25 search** - ranked full-text search over node and edge fields
//! - **Domains and documents** - dot-notation grouping and session notes
//!
//! ## Example
//!
//! ```ignore
//! use kg_store::{Edge, GraphStore, Node, SearchConfig};
//!
//! let store = GraphStore::open_default("./data/kg")?;
//!
//! store.put_node(Node::builder("mirror").summary("the mirror principle").build())?;
//! store.put_node(Node::new("self"))?;
//! store.put_edge(Edge::new("mirror", "reflects", "self").with_weight(0.8))?;
//!
//! let view = store.get_node("mirror", 1)?;
//! let hits = store.search("mirr", &SearchConfig::default())?;
//! ```

pub mod bulk;
pub mod documents;
pub mod domain;
pub mod error;
pub mod graph;
pub mod index;
mod keys;
pub mod migration;
pub mod node;
pub mod search;
pub mod session;
pub mod storage;
pub mod temporal;
pub mod traversal;

// Re-exports for convenience
pub use bulk::{BulkAck, BulkOp, BulkRequest, MAX_BULK_OPS};
pub use documents::{Document, DocumentQuery, DocumentSummary};
pub use domain::{DomainCount, DomainDepth, DomainLoad, DomainNodes, DomainSummary, DomainTree};
pub use error::{GraphError, Result, Target};
pub use graph::NodeView;
pub use migration::{RebuildReport, StoreStats};
pub use node::{BodyRef, Edge, EdgeKey, IndexEntry, MetaValue, Node, NodeBuilder, ProcessStatus};
pub use search::{SearchConfig, SearchHit, SearchResult};
pub use session::Boot;
pub use storage::{GraphStore, StoreConfig, WriteTx};
pub use temporal::Timestamps;
pub use traversal::{Subgraph, TraversalLimits};
