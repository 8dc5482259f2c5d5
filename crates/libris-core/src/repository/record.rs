//! RecordRepository trait definition.

use libris_types::error::StorageError;
use libris_types::record::{Record, RecordId};
use libris_types::sync::SyncCursor;

/// Repository trait for bibliographic record persistence.
///
/// Records are append-only from the ingestion side: there is no update or
/// delete. Reads never carry embeddings; joining them is the caller's job.
///
/// Implementations live in libris-infra (e.g., `SqliteRecordRepository`).
/// Uses native async fn in traits (RPITIT, Rust 2024 edition).
pub trait RecordRepository: Send + Sync {
    /// Insert a new record. Fails with `StorageError::DuplicateKey` if the id exists.
    fn insert(
        &self,
        record: &Record,
    ) -> impl std::future::Future<Output = Result<(), StorageError>> + Send;

    /// Get a record by id.
    fn get_by_id(
        &self,
        id: RecordId,
    ) -> impl std::future::Future<Output = Result<Option<Record>, StorageError>> + Send;

    /// Get every record, ordered by id.
    fn get_all(
        &self,
    ) -> impl std::future::Future<Output = Result<Vec<Record>, StorageError>> + Send;

    /// Count stored records.
    fn count(&self) -> impl std::future::Future<Output = Result<u64, StorageError>> + Send;

    /// Highest id and newest stamp in the store, or `None` when empty.
    ///
    /// Used as the watermark for incremental catalog pulls.
    fn latest_cursor(
        &self,
    ) -> impl std::future::Future<Output = Result<Option<SyncCursor>, StorageError>> + Send;
}
