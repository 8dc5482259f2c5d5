//! Incremental catalog ingestion.

use std::sync::Arc;

use libris_types::error::{StorageError, SyncError};
use libris_types::sync::{SyncCursor, SyncReport};

use crate::catalog::CatalogSource;
use crate::repository::record::RecordRepository;

/// Pulls new records from a [`CatalogSource`] into the record store.
pub struct SyncService<R, C> {
    records: Arc<R>,
    catalog: Arc<C>,
}

impl<R: RecordRepository, C: CatalogSource> SyncService<R, C> {
    pub fn new(records: Arc<R>, catalog: Arc<C>) -> Self {
        Self { records, catalog }
    }

    /// Fetch everything after `cursor` and insert it.
    ///
    /// Without a cursor the watermark is derived from the record store.
    /// Records whose id already exists are listed in `duplicates`; any other
    /// storage failure aborts the sync. A fetch failure aborts before any
    /// write.
    pub async fn sync(&self, cursor: Option<SyncCursor>) -> Result<SyncReport, SyncError> {
        let cursor = match cursor {
            Some(cursor) => cursor,
            None => self
                .records
                .latest_cursor()
                .await?
                .unwrap_or_else(SyncCursor::initial),
        };

        tracing::info!(
            last_id = %cursor.last_id,
            last_stamp = %cursor.last_stamp,
            "fetching catalog records"
        );

        let fetched = self.catalog.fetch_since(&cursor).await?;

        let mut next = cursor;
        let mut inserted = 0usize;
        let mut duplicates = Vec::new();

        for record in &fetched {
            match self.records.insert(record).await {
                Ok(()) => inserted += 1,
                Err(StorageError::DuplicateKey(id)) => {
                    tracing::debug!(record_id = %id, "record already stored, skipping");
                    duplicates.push(id);
                }
                Err(e) => {
                    tracing::error!(record_id = %record.id, error = %e, "sync aborted");
                    return Err(e.into());
                }
            }
            next.advance(record.id, record.stamp);
        }

        tracing::info!(
            fetched = fetched.len(),
            inserted,
            duplicates = duplicates.len(),
            "catalog sync finished"
        );

        Ok(SyncReport {
            fetched: fetched.len(),
            inserted,
            duplicates,
            cursor: next,
        })
    }
}
