//! Session bootstrap and the process status singleton

use chrono::Utc;
use serde::Serialize;

use crate::error::{GraphError, Result};
use crate::index;
use crate::keys;
use crate::node::{IndexEntry, ProcessStatus};
use crate::storage::{GraphStore, KvRead};

/// Everything an agent needs at the start of a session
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Boot {
    pub status: Option<ProcessStatus>,
    pub index: Vec<IndexEntry>,
}

impl GraphStore {
    /// Process status and the full node index, read from one snapshot
    pub fn boot(&self) -> Result<Boot> {
        let reader = self.read();
        Ok(Boot {
            status: reader.get_record(keys::STATUS)?,
            index: index::entries(&reader)?,
        })
    }

    pub fn status(&self) -> Result<Option<ProcessStatus>> {
        self.read().get_record(keys::STATUS)
    }

    /// Overwrite the status singleton
    pub fn set_status(&self, text: impl Into<String>) -> Result<ProcessStatus> {
        let status = ProcessStatus {
            text: text.into(),
            updated_at: Utc::now(),
        };
        if status.text.trim().is_empty() {
            return Err(GraphError::validation("set_status", "status text cannot be empty"));
        }
        self.write(|tx| tx.put_record(keys::STATUS, &status))?;
        Ok(status)
    }
}
