//! Incremental catalog sync types.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::record::RecordId;

/// Watermark for incremental catalog pulls.
///
/// The catalog returns records with an id greater than `last_id` or a stamp
/// newer than `last_stamp`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncCursor {
    pub last_id: RecordId,
    pub last_stamp: DateTime<Utc>,
}

impl SyncCursor {
    /// Cursor for a full pull from an empty store (id 0, `0001-01-01T00:00:00Z`).
    pub fn initial() -> Self {
        let epoch = NaiveDate::from_ymd_opt(1, 1, 1)
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .map(|naive| naive.and_utc())
            .unwrap_or(DateTime::<Utc>::MIN_UTC);
        Self {
            last_id: RecordId::ZERO,
            last_stamp: epoch,
        }
    }

    /// Advance the watermark past the given record.
    pub fn advance(&mut self, id: RecordId, stamp: DateTime<Utc>) {
        self.last_id = self.last_id.max(id);
        self.last_stamp = self.last_stamp.max(stamp);
    }
}

impl Default for SyncCursor {
    fn default() -> Self {
        Self::initial()
    }
}

/// Summary of one catalog pull.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncReport {
    pub fetched: usize,
    pub inserted: usize,
    /// Records skipped because their id already exists locally.
    pub duplicates: Vec<RecordId>,
    /// Cursor to use for the next pull.
    pub cursor: SyncCursor,
}
