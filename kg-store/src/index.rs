//! Secondary index maintenance
//!
//! Two derived structures are kept in step with the primary records, always
//! inside the writer's transaction:
//!
//! - `i:{id}` index records, the lightweight projection used by listings
//! - `f:{term}\0{doc}` postings plus the `m:fts` corpus statistics used for
//!   BM25 ranking
//!
//! Postings are removed by re-tokenizing the previous record text, so the
//! tokenizer must stay deterministic.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::keys::{self, DocKey};
use crate::node::{Edge, IndexEntry, Node};
use crate::storage::{KvRead, WriteTx};

/// Terms longer than this are not indexed
pub const MAX_TERM_LENGTH: usize = 64;

/// Stored projection under `i:{id}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct IndexRecord {
    #[serde(rename = "t")]
    pub node_type: String,
    #[serde(rename = "st")]
    pub status: String,
    #[serde(rename = "d", default)]
    pub domain: String,
    pub updated_at: DateTime<Utc>,
}

impl IndexRecord {
    fn from_node(node: &Node, updated_at: DateTime<Utc>) -> Self {
        Self {
            node_type: node.node_type.clone(),
            status: node.status.clone(),
            domain: node.domain.clone(),
            updated_at,
        }
    }

    pub fn entry(&self, id: String) -> IndexEntry {
        IndexEntry {
            id,
            node_type: self.node_type.clone(),
            status: self.status.clone(),
            domain: self.domain.clone(),
        }
    }
}

/// Per-(term, document) payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct Posting {
    pub tf: u32,
    pub doc_len: u32,
}

/// Corpus statistics for BM25 length normalization
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct FtsStats {
    pub docs: u64,
    pub total_len: u64,
}

impl FtsStats {
    pub fn avg_len(&self) -> f32 {
        if self.docs == 0 {
            0.0
        } else {
            self.total_len as f32 / self.docs as f32
        }
    }
}

/// Tokenize text into terms
pub fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|s| !s.is_empty() && s.len() <= MAX_TERM_LENGTH)
        .map(String::from)
        .collect()
}

pub(crate) fn load_stats<R: KvRead>(reader: &R) -> Result<FtsStats> {
    match reader.get_raw(keys::FTS_STATS)? {
        Some(bytes) => Ok(bincode::deserialize(&bytes)?),
        None => Ok(FtsStats::default()),
    }
}

fn lock_stats(tx: &WriteTx<'_>) -> Result<FtsStats> {
    match tx.get_for_update(keys::FTS_STATS)? {
        Some(bytes) => Ok(bincode::deserialize(&bytes)?),
        None => Ok(FtsStats::default()),
    }
}

fn store_stats(tx: &WriteTx<'_>, stats: &FtsStats) -> Result<()> {
    tx.put_raw(keys::FTS_STATS, &bincode::serialize(stats)?)
}

/// Take the corpus statistics lock. Every writer holds it until commit.
pub(crate) fn lock_writers(tx: &WriteTx<'_>) -> Result<()> {
    tx.get_for_update(keys::FTS_STATS).map(|_| ())
}

fn term_frequencies(tokens: &[String]) -> HashMap<&str, u32> {
    let mut freqs: HashMap<&str, u32> = HashMap::new();
    for token in tokens {
        *freqs.entry(token.as_str()).or_insert(0) += 1;
    }
    freqs
}

fn add_document(tx: &WriteTx<'_>, doc: &DocKey, text: &str) -> Result<()> {
    let tokens = tokenize(text);
    if tokens.is_empty() {
        return Ok(());
    }
    let doc_len = tokens.len() as u32;
    for (term, tf) in term_frequencies(&tokens) {
        let posting = Posting { tf, doc_len };
        tx.put_raw(&keys::posting(term, doc), &bincode::serialize(&posting)?)?;
    }

    let mut stats = lock_stats(tx)?;
    stats.docs += 1;
    stats.total_len += u64::from(doc_len);
    store_stats(tx, &stats)
}

fn remove_document(tx: &WriteTx<'_>, doc: &DocKey, text: &str) -> Result<()> {
    let tokens = tokenize(text);
    if tokens.is_empty() {
        return Ok(());
    }
    for term in term_frequencies(&tokens).keys() {
        tx.delete(&keys::posting(term, doc))?;
    }

    let mut stats = lock_stats(tx)?;
    stats.docs = stats.docs.saturating_sub(1);
    stats.total_len = stats.total_len.saturating_sub(tokens.len() as u64);
    store_stats(tx, &stats)
}

pub(crate) fn index_node(tx: &WriteTx<'_>, node: &Node, updated_at: DateTime<Utc>) -> Result<()> {
    tx.put_record(
        &keys::index(&node.id),
        &IndexRecord::from_node(node, updated_at),
    )?;
    add_document(tx, &DocKey::Node(node.id.clone()), &node.searchable_text())
}

pub(crate) fn unindex_node(tx: &WriteTx<'_>, node: &Node) -> Result<()> {
    tx.delete(&keys::index(&node.id))?;
    remove_document(tx, &DocKey::Node(node.id.clone()), &node.searchable_text())
}

pub(crate) fn index_edge(tx: &WriteTx<'_>, edge: &Edge) -> Result<()> {
    add_document(tx, &DocKey::Edge(edge.key()), &edge.searchable_text())
}

pub(crate) fn unindex_edge(tx: &WriteTx<'_>, edge: &Edge) -> Result<()> {
    remove_document(tx, &DocKey::Edge(edge.key()), &edge.searchable_text())
}

/// Every index record in id order
pub(crate) fn records<R: KvRead>(reader: &R) -> Result<Vec<(String, IndexRecord)>> {
    let mut out = Vec::new();
    for (key, value) in reader.scan_prefix(keys::INDEX)? {
        let Some(id) = keys::parse_id(keys::INDEX, &key) else {
            log::warn!("Skipping malformed index key: {:?}", key);
            continue;
        };
        out.push((id, crate::storage::decode(&value)?));
    }
    Ok(out)
}

pub(crate) fn entries<R: KvRead>(reader: &R) -> Result<Vec<IndexEntry>> {
    Ok(records(reader)?
        .into_iter()
        .map(|(id, record)| record.entry(id))
        .collect())
}

pub(crate) fn entry<R: KvRead>(reader: &R, id: &str) -> Result<Option<IndexEntry>> {
    Ok(reader
        .get_record::<IndexRecord>(&keys::index(id))?
        .map(|record| record.entry(id.to_string())))
}
