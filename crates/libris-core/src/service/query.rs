//! Free-text query: embed, rank, join back to records.

use std::collections::HashSet;
use std::sync::Arc;

use libris_types::embedding::{EmbeddingTask, QueryOutcome, SearchHit};
use libris_types::error::{ProviderError, QueryError};

use crate::embedding::provider::EmbeddingProvider;
use crate::repository::record::RecordRepository;
use crate::repository::vector::VectorRepository;
use crate::search::SimilarityEngine;

pub struct QueryService<R, V, P> {
    records: Arc<R>,
    engine: Arc<SimilarityEngine<V>>,
    provider: Arc<P>,
    task: EmbeddingTask,
}

impl<R, V, P> QueryService<R, V, P>
where
    R: RecordRepository,
    V: VectorRepository,
    P: EmbeddingProvider,
{
    pub fn new(records: Arc<R>, engine: Arc<SimilarityEngine<V>>, provider: Arc<P>) -> Self {
        Self {
            records,
            engine,
            provider,
            task: EmbeddingTask::SearchQuery,
        }
    }

    /// Set the task tag prefixed to query text.
    pub fn with_task(mut self, task: EmbeddingTask) -> Self {
        self.task = task;
        self
    }

    /// Embed query text with the query task prefix.
    pub async fn embed_query(&self, text: &str) -> Result<Vec<f64>, QueryError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(QueryError::EmptyQuery);
        }
        let vector = self.provider.generate(&self.task.apply(text)).await?;
        if vector.is_empty() {
            return Err(ProviderError::MalformedResponse("empty embedding".into()).into());
        }
        Ok(vector)
    }

    /// Return the records closest to `text`, best first.
    ///
    /// The engine is asked for `k` rows. A record stored with several
    /// embeddings keeps only its best-ranked occurrence, so fewer than `k`
    /// hits may come back. Rows whose record no longer exists are listed in
    /// `missing` instead of being dropped silently.
    pub async fn query(&self, text: &str, k: usize) -> Result<QueryOutcome, QueryError> {
        let vector = self.embed_query(text).await?;
        let ranked = self.engine.search(&vector, k).await?;

        let mut seen = HashSet::with_capacity(ranked.len());
        let mut hits = Vec::with_capacity(ranked.len());
        let mut missing = Vec::new();

        for scored in ranked {
            if !seen.insert(scored.record_id) {
                continue;
            }
            match self.records.get_by_id(scored.record_id).await? {
                Some(record) => hits.push(SearchHit {
                    record,
                    score: scored.score,
                }),
                None => {
                    tracing::warn!(
                        record_id = %scored.record_id,
                        "embedding refers to a record that does not exist"
                    );
                    missing.push(scored.record_id);
                }
            }
        }

        tracing::debug!(hits = hits.len(), missing = missing.len(), k, "query resolved");

        Ok(QueryOutcome { hits, missing })
    }
}
