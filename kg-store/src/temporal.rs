//! Record timestamps
//!
//! Store-side bookkeeping kept next to node and document records. Timestamps
//! are not part of the user-facing values, so a put followed by a get
//! returns exactly what was written.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Creation and last-modification times of a stored record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Timestamps {
    /// When the record was first written
    pub created_at: DateTime<Utc>,
    /// When the record was last overwritten
    pub updated_at: DateTime<Utc>,
}

impl Timestamps {
    /// Timestamps for a record created at `now`
    pub fn new_at(now: DateTime<Utc>) -> Self {
        Self {
            created_at: now,
            updated_at: now,
        }
    }

    pub fn new_current() -> Self {
        Self::new_at(Utc::now())
    }

    /// Keep `created_at`, move `updated_at` forward to `now`
    pub fn touched(&self, now: DateTime<Utc>) -> Self {
        Self {
            created_at: self.created_at,
            updated_at: now.max(self.updated_at),
        }
    }
}

impl Default for Timestamps {
    fn default() -> Self {
        Self::new_current()
    }
}
