//! Upstream catalog port.

use libris_types::error::FetchError;
use libris_types::record::Record;
use libris_types::sync::SyncCursor;

/// Source of bibliographic records (the upstream catalog API).
///
/// Implementations live in libris-infra.
pub trait CatalogSource: Send + Sync {
    /// Fetch every record changed after the given watermark.
    ///
    /// A non-success response is a `FetchError`; nothing is written by the
    /// caller in that case.
    fn fetch_since(
        &self,
        cursor: &SyncCursor,
    ) -> impl std::future::Future<Output = Result<Vec<Record>, FetchError>> + Send;
}
