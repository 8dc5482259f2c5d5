//! Batch embedding run types: modes, per-item outcomes and the final report.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use std::fmt;
use std::str::FromStr;

use crate::record::RecordId;

/// Which records a pipeline run works on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum EmbeddingMode {
    /// Every record, regardless of existing embeddings.
    All,
    /// Only records that have no embedding row yet.
    #[default]
    MissingOnly,
}

impl fmt::Display for EmbeddingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EmbeddingMode::All => write!(f, "all"),
            EmbeddingMode::MissingOnly => write!(f, "missing"),
        }
    }
}

impl FromStr for EmbeddingMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "all" => Ok(EmbeddingMode::All),
            "missing" | "missing_only" => Ok(EmbeddingMode::MissingOnly),
            other => Err(format!("invalid embedding mode: '{other}'")),
        }
    }
}

/// The step at which a unit of work failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureStage {
    Provider,
    Storage,
    Worker,
}

impl fmt::Display for FailureStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureStage::Provider => write!(f, "provider"),
            FailureStage::Storage => write!(f, "storage"),
            FailureStage::Worker => write!(f, "worker"),
        }
    }
}

/// A record whose embedding could not be produced or persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemFailure {
    pub record_id: RecordId,
    pub title: String,
    pub stage: FailureStage,
    pub error: String,
}

/// Outcome of a single unit of work, emitted as progress while a run is live.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ItemOutcome {
    Embedded { record_id: RecordId, dimension: usize },
    Failed(ItemFailure),
    Cancelled { record_id: RecordId },
}

impl ItemOutcome {
    pub fn record_id(&self) -> RecordId {
        match self {
            ItemOutcome::Embedded { record_id, .. } => *record_id,
            ItemOutcome::Failed(failure) => failure.record_id,
            ItemOutcome::Cancelled { record_id } => *record_id,
        }
    }
}

/// Summary of one batch embedding run.
///
/// Every record in the working set is accounted for exactly once:
/// `succeeded + failures.len() + cancelled.len() == total`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchReport {
    pub run_id: Uuid,
    pub mode: EmbeddingMode,
    pub total: usize,
    pub succeeded: usize,
    pub failures: Vec<ItemFailure>,
    pub cancelled: Vec<RecordId>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl BatchReport {
    pub fn failed_count(&self) -> usize {
        self.failures.len()
    }

    /// Ids of failed records, in the order their failures resolved.
    pub fn failed_ids(&self) -> Vec<RecordId> {
        self.failures.iter().map(|f| f.record_id).collect()
    }

    /// True when every record in the working set was embedded.
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty() && self.cancelled.is_empty()
    }

    pub fn duration_ms(&self) -> i64 {
        (self.finished_at - self.started_at).num_milliseconds()
    }
}
