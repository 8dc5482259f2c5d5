//! Embedding and search result types.

use serde::{Deserialize, Serialize};

use std::fmt;
use std::str::FromStr;

use crate::record::{Record, RecordId};

/// Task tag prefixed to embedding inputs.
///
/// Task-aware embedding models (e.g. `nomic-embed-text`) produce different
/// vectors for the same text depending on this prefix, which lets one model
/// serve both indexing and querying.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum EmbeddingTask {
    #[default]
    Classification,
    SearchQuery,
    SearchDocument,
    Clustering,
}

impl EmbeddingTask {
    /// Prefix the given text with this task's tag.
    pub fn apply(&self, text: &str) -> String {
        format!("{self}: {text}")
    }
}

impl fmt::Display for EmbeddingTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EmbeddingTask::Classification => write!(f, "classification"),
            EmbeddingTask::SearchQuery => write!(f, "search_query"),
            EmbeddingTask::SearchDocument => write!(f, "search_document"),
            EmbeddingTask::Clustering => write!(f, "clustering"),
        }
    }
}

impl FromStr for EmbeddingTask {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "classification" => Ok(EmbeddingTask::Classification),
            "search_query" => Ok(EmbeddingTask::SearchQuery),
            "search_document" => Ok(EmbeddingTask::SearchDocument),
            "clustering" => Ok(EmbeddingTask::Clustering),
            other => Err(format!("invalid embedding task: '{other}'")),
        }
    }
}

/// One embedding row as persisted in the vector store.
///
/// A record may own any number of these; re-embedding appends rather than
/// replaces.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredEmbedding {
    pub record_id: RecordId,
    pub vector: Vec<f64>,
}

/// Position in a vector store scan. Scans resume strictly after this point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct ScanCursor(pub i64);

impl ScanCursor {
    /// Cursor positioned before the first row.
    pub const START: ScanCursor = ScanCursor(0);
}

/// One page of a vector store scan.
#[derive(Debug, Clone, Default)]
pub struct EmbeddingBatch {
    pub rows: Vec<StoredEmbedding>,
    /// Cursor to pass to the next `scan_batch` call; `None` once exhausted.
    pub next: Option<ScanCursor>,
}

/// A record identifier with its similarity score.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoredRecord {
    pub record_id: RecordId,
    /// Raw inner product between the query and stored vector (not normalised).
    pub score: f64,
}

/// A search result joined with its record metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchHit {
    pub record: Record,
    pub score: f64,
}

/// Result of a free-text query.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QueryOutcome {
    /// Ranked hits, best first, one per record.
    pub hits: Vec<SearchHit>,
    /// Ranked ids whose record row could not be found.
    pub missing: Vec<RecordId>,
}
