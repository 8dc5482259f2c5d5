//! Vector store trait.
//!
//! Maps record ids to any number of embedding vectors. Vectors are appended,
//! never overwritten, and only removed by an explicit bulk purge.

use std::collections::HashSet;

use libris_types::embedding::{EmbeddingBatch, ScanCursor, StoredEmbedding};
use libris_types::error::StorageError;
use libris_types::record::RecordId;

/// Default page size used by [`VectorRepository::get_all`].
pub const DEFAULT_SCAN_BATCH: usize = 1024;

/// Trait for durable embedding storage.
///
/// `put` is called concurrently from pipeline workers; each call must be its
/// own single-insert transaction. The store does not check that vectors share
/// a length -- the search engine does.
///
/// Implementations live in libris-infra.
pub trait VectorRepository: Send + Sync {
    /// Append an embedding row for `record_id`.
    ///
    /// Fails with `StorageError::UnknownRecord` when the record does not
    /// exist and foreign keys are enforced.
    fn put(
        &self,
        record_id: RecordId,
        vector: &[f64],
    ) -> impl std::future::Future<Output = Result<(), StorageError>> + Send;

    /// Read up to `limit` rows strictly after `after`, in insertion order.
    ///
    /// Scans are restartable: passing `ScanCursor::START` begins again from
    /// the first row.
    fn scan_batch(
        &self,
        after: ScanCursor,
        limit: usize,
    ) -> impl std::future::Future<Output = Result<EmbeddingBatch, StorageError>> + Send;

    /// Delete every embedding row atomically. Returns the number deleted.
    ///
    /// On failure nothing is deleted.
    fn purge_all(&self) -> impl std::future::Future<Output = Result<u64, StorageError>> + Send;

    /// Count embedding rows.
    fn count(&self) -> impl std::future::Future<Output = Result<u64, StorageError>> + Send;

    /// Ids of records that own at least one embedding.
    fn embedded_record_ids(
        &self,
    ) -> impl std::future::Future<Output = Result<HashSet<RecordId>, StorageError>> + Send;

    /// Count embedding rows for one record.
    fn count_for(
        &self,
        record_id: RecordId,
    ) -> impl std::future::Future<Output = Result<u64, StorageError>> + Send;

    /// Every stored (record, vector) pair, in insertion order.
    ///
    /// Reads page by page through [`VectorRepository::scan_batch`].
    fn get_all(
        &self,
    ) -> impl std::future::Future<Output = Result<Vec<StoredEmbedding>, StorageError>> + Send {
        async move {
            let mut all = Vec::new();
            let mut cursor = ScanCursor::START;
            loop {
                let batch = self.scan_batch(cursor, DEFAULT_SCAN_BATCH).await?;
                all.extend(batch.rows);
                match batch.next {
                    Some(next) => cursor = next,
                    None => break,
                }
            }
            Ok(all)
        }
    }
}
