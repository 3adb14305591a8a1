//! Error types for kg-store

use std::fmt;

use thiserror::Error;

use crate::node::EdgeKey;

/// The entity an error refers to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    Node(String),
    Edge(EdgeKey),
    Document(String),
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::Node(id) => write!(f, "node '{}'", id),
            Target::Edge(key) => write!(f, "edge {}", key),
            Target::Document(id) => write!(f, "document '{}'", id),
        }
    }
}

/// Errors that can occur in the graph store
#[derive(Debug, Error)]
pub enum GraphError {
    /// Node, edge or document does not exist
    #[error("{op}: {target} not found")]
    NotFound { op: &'static str, target: Target },

    /// Edge endpoint does not exist
    #[error("{op}: edge {edge} references missing node '{missing}'")]
    ReferentialIntegrity {
        op: &'static str,
        edge: EdgeKey,
        missing: String,
    },

    /// Malformed input
    #[error("{op}: {reason}")]
    Validation { op: &'static str, reason: String },

    /// Reserved for unique-constraint violations
    #[error("{op}: {target} already exists")]
    Conflict { op: &'static str, target: Target },

    /// Bulk batch rolled back because one step failed
    #[error("bulk aborted at operation {index} ({op}): {source}")]
    TransactionAbort {
        index: usize,
        op: &'static str,
        #[source]
        source: Box<GraphError>,
    },

    /// RocksDB error
    #[error("Storage error: {0}")]
    Storage(#[from] rocksdb::Error),

    /// Record encoding error (MessagePack)
    #[error("Encode error: {0}")]
    Encode(#[from] rmp_serde::encode::Error),

    /// Record decoding error (MessagePack)
    #[error("Decode error: {0}")]
    Decode(#[from] rmp_serde::decode::Error),

    /// Index payload error (bincode)
    #[error("Serialization error: {0}")]
    Bincode(#[from] bincode::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl GraphError {
    pub fn node_not_found(op: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            op,
            target: Target::Node(id.into()),
        }
    }

    pub fn edge_not_found(op: &'static str, key: EdgeKey) -> Self {
        Self::NotFound {
            op,
            target: Target::Edge(key),
        }
    }

    pub fn document_not_found(op: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            op,
            target: Target::Document(id.into()),
        }
    }

    pub fn validation(op: &'static str, reason: impl Into<String>) -> Self {
        Self::Validation {
            op,
            reason: reason.into(),
        }
    }

    /// Short machine-readable code for the error class
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "not_found",
            Self::ReferentialIntegrity { .. } => "referential_integrity",
            Self::Validation { .. } => "validation",
            Self::Conflict { .. } => "conflict",
            Self::TransactionAbort { .. } => "transaction_abort",
            _ => "internal",
        }
    }

    /// True for errors caused by the caller rather than the store
    pub fn is_client_error(&self) -> bool {
        !matches!(self.code(), "internal")
    }
}

/// Result type for graph store operations
pub type Result<T> = std::result::Result<T, GraphError>;
