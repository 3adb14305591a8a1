//! Full-text search over nodes and edges
//!
//! BM25 ranking over the persisted inverted index. Each query token matches
//! every indexed term it is a prefix of; exact matches count fully, strict
//! prefix matches at half weight. Ties are broken by document key so results
//! are deterministic.

use std::collections::{BTreeMap, HashMap};

use serde::Serialize;

use crate::error::Result;
use crate::index::{self, FtsStats, Posting};
use crate::keys::{self, DocKey};
use crate::node::{EdgeKey, IndexEntry};
use crate::storage::{GraphStore, KvRead};

pub const DEFAULT_LIMIT: usize = 20;
pub const MAX_LIMIT: usize = 100;

const PREFIX_MATCH_WEIGHT: f32 = 0.5;

/// Search configuration
#[derive(Debug, Clone)]
pub struct SearchConfig {
    /// Maximum results to return, clamped to `1..=MAX_LIMIT`
    pub limit: usize,
    /// BM25 k1 parameter
    pub k1: f32,
    /// BM25 b parameter
    pub b: f32,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            limit: DEFAULT_LIMIT,
            k1: 1.2,
            b: 0.75,
        }
    }
}

impl SearchConfig {
    pub fn with_limit(limit: usize) -> Self {
        Self {
            limit,
            ..Self::default()
        }
    }

    fn effective_limit(&self) -> usize {
        self.limit.clamp(1, MAX_LIMIT)
    }
}

/// A ranked summary: node index entry or edge triple
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum SearchHit {
    Node(IndexEntry),
    Edge(EdgeKey),
}

/// Search result with score
#[derive(Debug, Clone, Serialize)]
pub struct SearchResult {
    pub hit: SearchHit,
    pub score: f32,
}

struct Bm25 {
    stats: FtsStats,
    avg_doc_length: f32,
    k1: f32,
    b: f32,
}

impl Bm25 {
    fn idf(&self, doc_freq: usize) -> f32 {
        let n = self.stats.docs as f32;
        let df = doc_freq as f32;
        ((n - df + 0.5) / (df + 0.5) + 1.0).ln()
    }

    fn score(&self, posting: Posting, idf: f32) -> f32 {
        let tf = posting.tf as f32;
        let doc_length = posting.doc_len as f32;
        let numerator = tf * (self.k1 + 1.0);
        let denominator =
            tf + self.k1 * (1.0 - self.b + self.b * doc_length / self.avg_doc_length);
        idf * numerator / denominator
    }
}

pub(crate) fn search<R: KvRead>(
    reader: &R,
    query: &str,
    config: &SearchConfig,
) -> Result<Vec<SearchResult>> {
    let mut query_terms = index::tokenize(query);
    query_terms.sort();
    query_terms.dedup();
    if query_terms.is_empty() {
        return Ok(Vec::new());
    }

    let stats = index::load_stats(reader)?;
    if stats.docs == 0 {
        return Ok(Vec::new());
    }
    let bm25 = Bm25 {
        stats,
        avg_doc_length: stats.avg_len().max(1.0),
        k1: config.k1,
        b: config.b,
    };

    let mut scores: HashMap<DocKey, f32> = HashMap::new();
    for query_term in &query_terms {
        let mut by_term: BTreeMap<String, Vec<(DocKey, Posting)>> = BTreeMap::new();
        for (key, value) in reader.scan_prefix(&keys::posting_prefix(query_term))? {
            let Some((term, doc)) = keys::parse_posting(&key) else {
                continue;
            };
            let posting: Posting = bincode::deserialize(&value)?;
            by_term.entry(term).or_default().push((doc, posting));
        }

        for (term, postings) in by_term {
            let weight = if term == *query_term {
                1.0
            } else {
                PREFIX_MATCH_WEIGHT
            };
            let idf = bm25.idf(postings.len());
            for (doc, posting) in postings {
                *scores.entry(doc).or_insert(0.0) += weight * bm25.score(posting, idf);
            }
        }
    }

    let mut ranked: Vec<(DocKey, f32)> = scores.into_iter().collect();
    ranked.sort_by(|a, b| {
        b.1.partial_cmp(&a.1)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.0.cmp(&b.0))
    });

    let mut results = Vec::new();
    for (doc, score) in ranked {
        if results.len() >= config.effective_limit() {
            break;
        }
        let hit = match doc {
            DocKey::Node(id) => match index::entry(reader, &id)? {
                Some(entry) => SearchHit::Node(entry),
                None => {
                    log::warn!("Posting for node '{}' without index record", id);
                    continue;
                }
            },
            DocKey::Edge(key) => SearchHit::Edge(key),
        };
        results.push(SearchResult { hit, score });
    }
    Ok(results)
}

impl GraphStore {
    /// Ranked full-text search over node and edge fields
    pub fn search(&self, query: &str, config: &SearchConfig) -> Result<Vec<SearchResult>> {
        search(&self.read(), query, config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_config_default() {
        let config = SearchConfig::default();
        assert_eq!(config.limit, 20);
        assert_eq!(config.k1, 1.2);
        assert_eq!(config.b, 0.75);
    }

    #[test]
    fn test_limit_is_clamped() {
        assert_eq!(SearchConfig::with_limit(0).effective_limit(), 1);
        assert_eq!(SearchConfig::with_limit(5000).effective_limit(), MAX_LIMIT);
        assert_eq!(SearchConfig::with_limit(7).effective_limit(), 7);
    }

    #[test]
    fn test_idf_decreases_with_document_frequency() {
        let bm25 = Bm25 {
            stats: FtsStats {
                docs: 10,
                total_len: 50,
            },
            avg_doc_length: 5.0,
            k1: 1.2,
            b: 0.75,
        };
        assert!(bm25.idf(1) > bm25.idf(5));
        assert!(bm25.idf(10) > 0.0);
    }

    #[test]
    fn test_hit_serializes_as_summary() {
        let node = SearchHit::Node(IndexEntry {
            id: "a".into(),
            node_type: "concept".into(),
            status: "seed".into(),
            domain: String::new(),
        });
        assert_eq!(
            serde_json::to_value(&node).unwrap(),
            serde_json::json!({"id": "a", "t": "concept", "st": "seed"})
        );
        let edge = SearchHit::Edge(EdgeKey::new("a", "r", "b"));
        assert_eq!(
            serde_json::to_value(&edge).unwrap(),
            serde_json::json!({"src": "a", "rel": "r", "tgt": "b"})
        );
    }
}
