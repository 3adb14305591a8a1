//! Schema versioning and index maintenance
//!
//! The schema version lives under `m:version` as a little-endian u32. Index
//! records and postings are fully derived from node and edge records, so a
//! migration is a rebuild of the derived keys.

use serde::Serialize;

use crate::error::{GraphError, Result};
use crate::graph::{StoredEdge, StoredNode};
use crate::index;
use crate::keys;
use crate::storage::{decode, GraphStore, KvRead, WriteTx};

pub const CURRENT_VERSION: u32 = 1;

/// Counts from an index rebuild
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RebuildReport {
    pub nodes: usize,
    pub edges: usize,
}

/// Store-wide counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StoreStats {
    pub schema_version: u32,
    pub nodes: usize,
    pub edges: usize,
    pub documents: usize,
    pub indexed_docs: u64,
    pub postings: usize,
    pub status_set: bool,
}

fn read_version<R: KvRead>(reader: &R) -> Result<Option<u32>> {
    let Some(bytes) = reader.get_raw(keys::VERSION)? else {
        return Ok(None);
    };
    let version_bytes: [u8; 4] = bytes
        .as_slice()
        .try_into()
        .map_err(|_| GraphError::validation("open", "invalid schema version record"))?;
    Ok(Some(u32::from_le_bytes(version_bytes)))
}

fn write_version(tx: &WriteTx<'_>) -> Result<()> {
    tx.put_raw(keys::VERSION, &CURRENT_VERSION.to_le_bytes())
}

/// Drop and recompute every index record, posting and the corpus statistics
pub(crate) fn rebuild_indexes(tx: &WriteTx<'_>) -> Result<RebuildReport> {
    let dropped = tx.delete_prefix(keys::INDEX)? + tx.delete_prefix(keys::POSTING)?;
    tx.delete(keys::FTS_STATS)?;
    log::debug!("Dropped {} derived index keys", dropped);

    let mut report = RebuildReport::default();
    for (_, value) in tx.scan_prefix(keys::NODE)? {
        let stored: StoredNode = decode(&value)?;
        index::index_node(tx, &stored.node, stored.times.updated_at)?;
        report.nodes += 1;
    }
    for (raw_key, value) in tx.scan_prefix(keys::EDGE)? {
        let Some(key) = keys::parse_edge(&raw_key) else {
            log::warn!("Skipping malformed edge key during rebuild: {:?}", raw_key);
            continue;
        };
        let stored: StoredEdge = decode(&value)?;
        index::index_edge(tx, &stored.into_edge(key))?;
        report.edges += 1;
    }
    Ok(report)
}

/// Bring a freshly opened store to the current schema version
pub(crate) fn migrate_if_needed(store: &GraphStore) -> Result<()> {
    let (version, has_nodes) = {
        let reader = store.read();
        (read_version(&reader)?, reader.count_prefix(keys::NODE)? > 0)
    };

    match version {
        Some(v) if v == CURRENT_VERSION => {
            log::debug!("Store schema version: {}", v);
            Ok(())
        }
        Some(v) if v > CURRENT_VERSION => Err(GraphError::validation(
            "open",
            format!(
                "store schema v{} is newer than supported v{}",
                v, CURRENT_VERSION
            ),
        )),
        None if !has_nodes => {
            store.write(write_version)?;
            log::info!("Initialized store schema v{}", CURRENT_VERSION);
            Ok(())
        }
        from => {
            log::warn!(
                "Store needs migration from {:?} to v{}",
                from,
                CURRENT_VERSION
            );
            let report = store.write(|tx| {
                let report = rebuild_indexes(tx)?;
                write_version(tx)?;
                Ok(report)
            })?;
            log::info!(
                "Migration completed successfully ({} nodes, {} edges reindexed)",
                report.nodes,
                report.edges
            );
            Ok(())
        }
    }
}

impl GraphStore {
    /// Recompute all derived index data from node and edge records
    pub fn rebuild_indexes(&self) -> Result<RebuildReport> {
        let report = self.write(rebuild_indexes)?;
        log::info!(
            "Rebuilt indexes for {} nodes and {} edges",
            report.nodes,
            report.edges
        );
        Ok(report)
    }

    pub fn stats(&self) -> Result<StoreStats> {
        let reader = self.read();
        Ok(StoreStats {
            schema_version: read_version(&reader)?.unwrap_or(0),
            nodes: reader.count_prefix(keys::NODE)?,
            edges: reader.count_prefix(keys::EDGE)?,
            documents: reader.count_prefix(keys::DOCUMENT)?,
            indexed_docs: index::load_stats(&reader)?.docs,
            postings: reader.count_prefix(keys::POSTING)?,
            status_set: reader.contains(keys::STATUS)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::{Edge, Node};
    use crate::search::SearchConfig;
    use tempfile::TempDir;

    #[test]
    fn test_fresh_store_gets_current_version() {
        let dir = TempDir::new().unwrap();
        let store = GraphStore::open_default(dir.path().join("kg")).unwrap();
        assert_eq!(store.stats().unwrap().schema_version, CURRENT_VERSION);
    }

    #[test]
    fn test_newer_version_is_refused() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("kg");
        {
            let store = GraphStore::open_default(&path).unwrap();
            store
                .write(|tx| tx.put_raw(keys::VERSION, &(CURRENT_VERSION + 1).to_le_bytes()))
                .unwrap();
        }
        let err = GraphStore::open_default(&path).err().unwrap();
        assert_eq!(err.code(), "validation");
    }

    #[test]
    fn test_unversioned_store_is_reindexed() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("kg");
        {
            let store = GraphStore::open_default(&path).unwrap();
            store
                .put_node(Node::builder("a").summary("mirror").build())
                .unwrap();
            store
                .write(|tx| {
                    tx.delete(keys::VERSION)?;
                    tx.delete_prefix(keys::INDEX)?;
                    tx.delete_prefix(keys::POSTING)?;
                    tx.delete(keys::FTS_STATS)
                })
                .unwrap();
        }
        let store = GraphStore::open_default(&path).unwrap();
        let stats = store.stats().unwrap();
        assert_eq!(stats.schema_version, CURRENT_VERSION);
        assert_eq!(stats.indexed_docs, 1);
        assert_eq!(store.boot().unwrap().index.len(), 1);
        assert_eq!(
            store.search("mirror", &SearchConfig::default()).unwrap().len(),
            1
        );
    }

    #[test]
    fn test_rebuild_is_stable() {
        let dir = TempDir::new().unwrap();
        let store = GraphStore::open_default(dir.path().join("kg")).unwrap();
        store.put_node(Node::new("a")).unwrap();
        store.put_node(Node::new("b")).unwrap();
        store
            .put_edge(Edge::new("a", "r", "b").with_note("linked"))
            .unwrap();
        let before = store.stats().unwrap();

        let report = store.rebuild_indexes().unwrap();
        assert_eq!(report, RebuildReport { nodes: 2, edges: 1 });
        assert_eq!(store.stats().unwrap(), before);
    }
}
