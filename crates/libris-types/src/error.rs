use thiserror::Error;

use crate::record::RecordId;

/// Errors from durable storage (record store and vector store).
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("record {0} already exists")]
    DuplicateKey(RecordId),

    #[error("record {0} does not exist")]
    UnknownRecord(RecordId),

    #[error("query error: {0}")]
    Query(String),

    #[error("transaction failed: {0}")]
    Transaction(String),

    #[error("corrupt embedding payload: {0}")]
    CorruptPayload(String),
}

/// Errors from the embedding provider boundary.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("embedding request failed: {0}")]
    Request(String),

    #[error("embedding request timed out")]
    Timeout,

    #[error("embedding provider returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("malformed embedding response: {0}")]
    MalformedResponse(String),

    #[error("embedding has {actual} components, expected {expected}")]
    Dimension { expected: usize, actual: usize },
}

/// Errors from the upstream catalog.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("catalog request failed: {0}")]
    Request(String),

    #[error("catalog returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("could not decode catalog response: {0}")]
    Decode(String),
}

/// Errors from similarity search.
#[derive(Debug, Error)]
pub enum SearchError {
    #[error(
        "embedding for record {record_id} has {stored} components but the query has {query}"
    )]
    DimensionMismatch {
        record_id: RecordId,
        query: usize,
        stored: usize,
    },

    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Fatal errors of a batch embedding run. Per-record failures are not errors;
/// they are reported in the batch report.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("failed to load working set: {0}")]
    Storage(#[from] StorageError),
}

/// Errors that abort a catalog sync.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors from a free-text query.
#[derive(Debug, Error)]
pub enum QueryError {
    #[error("query text is empty")]
    EmptyQuery,

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error(transparent)]
    Search(#[from] SearchError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}
