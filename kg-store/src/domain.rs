//! Dot-notation domains
//!
//! A node's `d` field groups it into a domain such as `holofeeling.baende`.
//! Domains are derived entirely from the index records; there is no separate
//! domain table.

use std::collections::{BTreeMap, HashSet};
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{GraphError, Result};
use crate::graph::{incident_edges, load_node, StoredNode};
use crate::index::{self, IndexRecord};
use crate::keys;
use crate::node::{Edge, IndexEntry, Node};
use crate::storage::GraphStore;

/// Label used for nodes without a domain
pub const UNASSIGNED: &str = "(unassigned)";

/// A domain with its node count and latest activity
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DomainSummary {
    pub name: String,
    pub count: usize,
    pub last_updated: DateTime<Utc>,
}

/// A root domain and the deeper domains below it
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DomainTree {
    pub name: String,
    pub count: usize,
    pub last_updated: DateTime<Utc>,
    pub sub_domains: Vec<DomainSummary>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DomainCount {
    pub name: String,
    pub count: usize,
}

/// How much of each node `load_domain` returns
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DomainDepth {
    /// Full node records plus the edges among them
    #[default]
    Full,
    /// Index entries only, no edges
    Index,
}

impl FromStr for DomainDepth {
    type Err = GraphError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "full" | "" => Ok(DomainDepth::Full),
            "index" => Ok(DomainDepth::Index),
            other => Err(GraphError::validation(
                "load_domain",
                format!("unknown depth '{}', expected 'full' or 'index'", other),
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum DomainNodes {
    Full(Vec<Node>),
    Index(Vec<IndexEntry>),
}

impl DomainNodes {
    pub fn len(&self) -> usize {
        match self {
            DomainNodes::Full(nodes) => nodes.len(),
            DomainNodes::Index(entries) => entries.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A loaded domain subgraph
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DomainLoad {
    pub domain: String,
    pub nodes: DomainNodes,
    pub edges: Vec<Edge>,
    pub sub_domains: Vec<DomainCount>,
}

/// True when `domain` is `name` itself or nested below it
fn in_domain(domain: &str, name: &str) -> bool {
    domain == name
        || domain
            .strip_prefix(name)
            .is_some_and(|rest| rest.starts_with('.'))
}

impl GraphStore {
    /// Domain tree grouped by the first dot-segment
    pub fn list_domains(&self) -> Result<Vec<DomainTree>> {
        let mut per_domain: BTreeMap<String, (usize, DateTime<Utc>)> = BTreeMap::new();
        for (_, record) in index::records(&self.read())? {
            let slot = per_domain
                .entry(record.domain)
                .or_insert((0, record.updated_at));
            slot.0 += 1;
            slot.1 = slot.1.max(record.updated_at);
        }

        let mut tree: Vec<DomainTree> = Vec::new();
        for (domain, (count, last_updated)) in per_domain {
            let label = if domain.is_empty() {
                UNASSIGNED.to_string()
            } else {
                domain
            };
            let root = label.split('.').next().unwrap_or(&label).to_string();

            let position = match tree.iter().position(|t| t.name == root) {
                Some(position) => position,
                None => {
                    tree.push(DomainTree {
                        name: root.clone(),
                        count: 0,
                        last_updated,
                        sub_domains: Vec::new(),
                    });
                    tree.len() - 1
                }
            };
            let entry = &mut tree[position];
            entry.count += count;
            entry.last_updated = entry.last_updated.max(last_updated);
            if label != root {
                entry.sub_domains.push(DomainSummary {
                    name: label,
                    count,
                    last_updated,
                });
            }
        }
        Ok(tree)
    }

    /// Nodes of a domain and all domains nested below it
    pub fn load_domain(&self, name: &str, depth: DomainDepth) -> Result<DomainLoad> {
        const OP: &str = "load_domain";
        let name = name.trim();
        if name.is_empty() {
            return Err(GraphError::validation(OP, "domain name cannot be empty"));
        }
        let wanted = if name == UNASSIGNED { "" } else { name };
        let reader = self.read();

        let mut matched: Vec<(String, IndexRecord)> = index::records(&reader)?
            .into_iter()
            .filter(|(_, record)| {
                if wanted.is_empty() {
                    record.domain.is_empty()
                } else {
                    in_domain(&record.domain, wanted)
                }
            })
            .collect();
        matched.sort_by(|(a_id, a), (b_id, b)| {
            a.domain
                .cmp(&b.domain)
                .then_with(|| b.updated_at.cmp(&a.updated_at))
                .then_with(|| a_id.cmp(b_id))
        });

        let mut sub_counts: BTreeMap<&str, usize> = BTreeMap::new();
        for (_, record) in &matched {
            if record.domain != wanted {
                *sub_counts.entry(record.domain.as_str()).or_insert(0) += 1;
            }
        }
        let sub_domains = sub_counts
            .into_iter()
            .map(|(name, count)| DomainCount {
                name: name.to_string(),
                count,
            })
            .collect();

        let (nodes, edges) = match depth {
            DomainDepth::Index => {
                let entries = matched
                    .iter()
                    .map(|(id, record)| record.entry(id.clone()))
                    .collect();
                (DomainNodes::Index(entries), Vec::new())
            }
            DomainDepth::Full => {
                let ids: HashSet<&str> = matched.iter().map(|(id, _)| id.as_str()).collect();
                let mut nodes = Vec::with_capacity(matched.len());
                let mut edges = Vec::new();
                for (id, _) in &matched {
                    if let Some(stored) = load_node(&reader, id)? {
                        nodes.push(stored.node);
                    }
                    edges.extend(
                        incident_edges(&reader, id, None)?
                            .into_iter()
                            .filter(|e| e.src == *id && ids.contains(e.tgt.as_str())),
                    );
                }
                (DomainNodes::Full(nodes), edges)
            }
        };

        Ok(DomainLoad {
            domain: name.to_string(),
            nodes,
            edges,
            sub_domains,
        })
    }

    /// Move the given nodes into `domain`. Unknown ids are skipped.
    ///
    /// Returns how many nodes were updated.
    pub fn set_domain(&self, domain: &str, ids: &[String]) -> Result<usize> {
        self.write(|tx| {
            let mut updated = 0;
            for id in ids {
                let Some(stored) = tx.get_record_for_update::<StoredNode>(&keys::node(id))? else {
                    log::debug!("set_domain: skipping unknown node '{}'", id);
                    continue;
                };
                let mut node = stored.node;
                node.domain = domain.to_string();
                tx.upsert_node(node)?;
                updated += 1;
            }
            Ok(updated)
        })
    }
}
