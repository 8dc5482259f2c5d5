//! Brute-force similarity search over the vector store.
//!
//! Every stored vector is scored against the query with a plain inner
//! product. Vectors are not normalised, so the score depends on both norms
//! and not only on the angle between them; ranking is NOT cosine ranking.
//!
//! Callers must not run `purge_all` on the same store while a search is in
//! progress; the scan takes no lock across pages.

use std::sync::Arc;

use tokio::sync::RwLock;

use libris_types::embedding::{ScanCursor, ScoredRecord, StoredEmbedding};
use libris_types::error::SearchError;

use crate::repository::vector::{VectorRepository, DEFAULT_SCAN_BATCH};

/// Inner product of two equal-length vectors.
pub fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

/// Score `rows` against `query`, appending to `scored` in row order.
///
/// Fails on the first row whose length differs from the query.
fn score_rows(
    query: &[f64],
    rows: &[StoredEmbedding],
    scored: &mut Vec<ScoredRecord>,
) -> Result<(), SearchError> {
    for row in rows {
        if row.vector.len() != query.len() {
            return Err(SearchError::DimensionMismatch {
                record_id: row.record_id,
                query: query.len(),
                stored: row.vector.len(),
            });
        }
        scored.push(ScoredRecord {
            record_id: row.record_id,
            score: dot(query, &row.vector),
        });
    }
    Ok(())
}

/// Sort by descending score and keep the first `k`.
///
/// The sort is stable, so equal scores keep their scan order.
pub fn rank(mut scored: Vec<ScoredRecord>, k: usize) -> Vec<ScoredRecord> {
    scored.sort_by(|a, b| b.score.total_cmp(&a.score));
    scored.truncate(k);
    scored
}

/// Full-scan top-K search engine.
pub struct SimilarityEngine<V> {
    vectors: Arc<V>,
    batch_size: usize,
    cache: Option<RwLock<Option<CachedVectors>>>,
}

/// Loaded vector set plus the row count it was loaded at.
struct CachedVectors {
    rows_at_load: u64,
    rows: Arc<Vec<StoredEmbedding>>,
}

impl<V: VectorRepository> SimilarityEngine<V> {
    pub fn new(vectors: Arc<V>) -> Self {
        Self {
            vectors,
            batch_size: DEFAULT_SCAN_BATCH,
            cache: None,
        }
    }

    /// Rows fetched per storage round trip while scanning.
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Keep the loaded vector set in memory between searches.
    ///
    /// Each search compares the store's row count with the count at load
    /// time and reloads when they differ, so rows appended or purged by
    /// another process are picked up. A purge followed by a re-embed that
    /// lands on the same row count is not detected; call
    /// [`SimilarityEngine::invalidate_cache`] after such writes in-process.
    pub fn with_cache(mut self, enabled: bool) -> Self {
        self.cache = enabled.then(|| RwLock::new(None));
        self
    }

    pub fn vectors(&self) -> &V {
        &self.vectors
    }

    /// Drop the cached vector set, if any. The next search reloads it.
    pub async fn invalidate_cache(&self) {
        if let Some(cache) = &self.cache {
            *cache.write().await = None;
        }
    }

    /// Return up to `k` record ids ranked by descending dot-product score.
    ///
    /// - `k == 0` or an empty store yields an empty result.
    /// - A stored vector whose length differs from the query fails the whole
    ///   search with `SearchError::DimensionMismatch`.
    /// - A record with several embeddings can appear several times.
    pub async fn search(
        &self,
        query: &[f64],
        k: usize,
    ) -> Result<Vec<ScoredRecord>, SearchError> {
        if k == 0 {
            return Ok(Vec::new());
        }

        let mut scored = Vec::new();

        if let Some(cache) = &self.cache {
            let rows = self.cached_rows(cache).await?;
            score_rows(query, &rows, &mut scored)?;
        } else {
            let mut cursor = ScanCursor::START;
            loop {
                let batch = self.vectors.scan_batch(cursor, self.batch_size).await?;
                score_rows(query, &batch.rows, &mut scored)?;
                match batch.next {
                    Some(next) => cursor = next,
                    None => break,
                }
            }
        }

        tracing::debug!(
            scanned = scored.len(),
            dimension = query.len(),
            k,
            "scored stored embeddings"
        );

        Ok(rank(scored, k))
    }

    async fn cached_rows(
        &self,
        cache: &RwLock<Option<CachedVectors>>,
    ) -> Result<Arc<Vec<StoredEmbedding>>, SearchError> {
        let current = self.vectors.count().await?;

        if let Some(cached) = cache.read().await.as_ref()
            && cached.rows_at_load == current
        {
            return Ok(Arc::clone(&cached.rows));
        }

        let mut slot = cache.write().await;
        if let Some(cached) = slot.as_ref()
            && cached.rows_at_load == current
        {
            return Ok(Arc::clone(&cached.rows));
        }
        let rows = Arc::new(self.vectors.get_all().await?);
        tracing::debug!(rows = rows.len(), "loaded vector cache");
        *slot = Some(CachedVectors {
            rows_at_load: rows.len() as u64,
            rows: Arc::clone(&rows),
        });
        Ok(rows)
    }
}
