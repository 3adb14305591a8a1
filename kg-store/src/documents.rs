//! Session documents
//!
//! Free-form episodic notes linked to graph nodes. Documents live beside the
//! graph but are not part of it: their node ids are advisory and are not
//! checked for existence.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{GraphError, Result};
use crate::keys;
use crate::storage::{decode, GraphStore, KvRead, WriteTx};

pub const DEFAULT_DOCUMENT_LIMIT: usize = 10;

const ID_LENGTH: usize = 8;
const ID_ATTEMPTS: usize = 8;

/// A stored session document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub title: String,
    pub content: String,
    pub session: i64,
    pub node_ids: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Document {
    pub fn summary(&self) -> DocumentSummary {
        DocumentSummary {
            id: self.id.clone(),
            title: self.title.clone(),
            session: self.session,
            len: self.content.chars().count(),
            updated_at: self.updated_at,
        }
    }

    /// Append ids not already linked, keeping first-seen order
    fn link(&mut self, node_ids: Vec<String>) {
        for id in node_ids {
            if !self.node_ids.contains(&id) {
                self.node_ids.push(id);
            }
        }
    }
}

/// Listing projection of a document
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DocumentSummary {
    pub id: String,
    pub title: String,
    pub session: i64,
    pub len: usize,
    pub updated_at: DateTime<Utc>,
}

/// Filters for [`GraphStore::search_documents`]
#[derive(Debug, Clone)]
pub struct DocumentQuery {
    /// Case-insensitive substring of title or content; empty lists all
    pub q: String,
    /// When positive, only documents of this session (overrides `q`)
    pub session: i64,
    pub limit: usize,
}

impl Default for DocumentQuery {
    fn default() -> Self {
        Self {
            q: String::new(),
            session: 0,
            limit: DEFAULT_DOCUMENT_LIMIT,
        }
    }
}

fn new_id(tx: &WriteTx<'_>) -> Result<String> {
    for _ in 0..ID_ATTEMPTS {
        let mut id = Uuid::new_v4().simple().to_string();
        id.truncate(ID_LENGTH);
        if tx.get_for_update(&keys::document(&id))?.is_none() {
            return Ok(id);
        }
    }
    Err(GraphError::Conflict {
        op: "create_document",
        target: crate::error::Target::Document("generated id".to_string()),
    })
}

fn load_for_update(tx: &WriteTx<'_>, op: &'static str, id: &str) -> Result<Document> {
    tx.get_record_for_update(&keys::document(id))?
        .ok_or_else(|| GraphError::document_not_found(op, id))
}

impl GraphStore {
    /// Create a document with a fresh 8-character id
    pub fn create_document(
        &self,
        title: &str,
        session: i64,
        content: &str,
        node_ids: Vec<String>,
    ) -> Result<Document> {
        let title = title.trim();
        if title.is_empty() {
            return Err(GraphError::validation(
                "create_document",
                "document title cannot be empty",
            ));
        }
        self.write(|tx| {
            let now = Utc::now();
            let mut doc = Document {
                id: new_id(tx)?,
                title: title.to_string(),
                content: content.to_string(),
                session,
                node_ids: Vec::new(),
                created_at: now,
                updated_at: now,
            };
            doc.link(node_ids);
            tx.put_record(&keys::document(&doc.id), &doc)?;
            Ok(doc)
        })
    }

    /// Append content on a new line and merge node ids
    pub fn append_document(
        &self,
        id: &str,
        content: &str,
        node_ids: Vec<String>,
    ) -> Result<Document> {
        self.write(|tx| {
            let mut doc = load_for_update(tx, "append_document", id)?;
            if doc.content.is_empty() {
                doc.content = content.to_string();
            } else {
                doc.content.push('\n');
                doc.content.push_str(content);
            }
            doc.link(node_ids);
            doc.updated_at = Utc::now().max(doc.updated_at);
            tx.put_record(&keys::document(id), &doc)?;
            Ok(doc)
        })
    }

    pub fn document(&self, id: &str) -> Result<Document> {
        self.read()
            .get_record(&keys::document(id))?
            .ok_or_else(|| GraphError::document_not_found("read_document", id))
    }

    /// Delete a document, returning it
    pub fn delete_document(&self, id: &str) -> Result<Document> {
        self.write(|tx| {
            let doc = load_for_update(tx, "delete_document", id)?;
            tx.delete(&keys::document(id))?;
            Ok(doc)
        })
    }

    /// List documents, newest first.
    ///
    /// With neither a session nor a query, documents are ordered by session
    /// number descending and then by last update.
    pub fn search_documents(&self, query: &DocumentQuery) -> Result<Vec<DocumentSummary>> {
        let mut docs = Vec::new();
        for (_, value) in self.read().scan_prefix(keys::DOCUMENT)? {
            docs.push(decode::<Document>(&value)?);
        }

        let needle = query.q.trim().to_lowercase();
        if query.session > 0 {
            docs.retain(|d| d.session == query.session);
        } else if !needle.is_empty() {
            docs.retain(|d| {
                d.title.to_lowercase().contains(&needle)
                    || d.content.to_lowercase().contains(&needle)
            });
        }

        let by_session = query.session <= 0 && needle.is_empty();
        docs.sort_by(|a, b| {
            let session = if by_session {
                b.session.cmp(&a.session)
            } else {
                std::cmp::Ordering::Equal
            };
            session
                .then_with(|| b.updated_at.cmp(&a.updated_at))
                .then_with(|| a.id.cmp(&b.id))
        });

        Ok(docs
            .iter()
            .take(query.limit.clamp(1, 100))
            .map(Document::summary)
            .collect())
    }
}
