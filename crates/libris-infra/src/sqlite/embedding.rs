//! SQLite vector store implementation.
//!
//! Each embedding row stores its vector as a blob of little-endian `f64`
//! components next to the component count. Scans page through rows in rowid
//! order, which is insertion order.

use std::collections::HashSet;

use chrono::Utc;
use sqlx::Row;

use libris_core::repository::vector::VectorRepository;
use libris_types::embedding::{EmbeddingBatch, ScanCursor, StoredEmbedding};
use libris_types::error::StorageError;
use libris_types::record::RecordId;

use super::pool::DatabasePool;
use super::record::format_datetime;

const F64_LEN: usize = std::mem::size_of::<f64>();

/// SQLite-backed implementation of `VectorRepository`.
pub struct SqliteVectorRepository {
    pool: DatabasePool,
}

impl SqliteVectorRepository {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }

    /// Number of distinct records that own at least one embedding.
    pub async fn embedded_record_count(&self) -> Result<u64, StorageError> {
        let row = sqlx::query("SELECT COUNT(DISTINCT record_id) as count FROM embeddings")
            .fetch_one(&self.pool.reader)
            .await
            .map_err(|e| StorageError::Query(e.to_string()))?;
        let count: i64 = row
            .try_get("count")
            .map_err(|e| StorageError::Query(e.to_string()))?;
        Ok(count as u64)
    }
}

pub(crate) fn encode_vector(vector: &[f64]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(std::mem::size_of_val(vector));
    for &value in vector {
        bytes.extend_from_slice(&value.to_le_bytes());
    }
    bytes
}

pub(crate) fn decode_vector(blob: &[u8], dimension: usize) -> Result<Vec<f64>, StorageError> {
    let expected_len = dimension
        .checked_mul(F64_LEN)
        .ok_or_else(|| StorageError::CorruptPayload("dimension overflows".to_string()))?;
    if blob.len() != expected_len {
        return Err(StorageError::CorruptPayload(format!(
            "expected {expected_len} bytes for {dimension} components, got {}",
            blob.len()
        )));
    }

    let mut out = Vec::with_capacity(dimension);
    for chunk in blob.chunks_exact(F64_LEN) {
        let mut raw = [0u8; F64_LEN];
        raw.copy_from_slice(chunk);
        out.push(f64::from_le_bytes(raw));
    }
    Ok(out)
}

/// Internal row type for a scanned embedding.
struct EmbeddingRow {
    rowid: i64,
    record_id: i64,
    vector: Vec<u8>,
    dimension: i64,
}

impl EmbeddingRow {
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            rowid: row.try_get("rowid")?,
            record_id: row.try_get("record_id")?,
            vector: row.try_get("vector")?,
            dimension: row.try_get("dimension")?,
        })
    }

    fn into_stored(self) -> Result<StoredEmbedding, StorageError> {
        let dimension = usize::try_from(self.dimension).map_err(|_| {
            StorageError::CorruptPayload(format!("negative dimension {}", self.dimension))
        })?;
        Ok(StoredEmbedding {
            record_id: RecordId(self.record_id),
            vector: decode_vector(&self.vector, dimension)?,
        })
    }
}

impl VectorRepository for SqliteVectorRepository {
    async fn put(&self, record_id: RecordId, vector: &[f64]) -> Result<(), StorageError> {
        let result = sqlx::query(
            r#"INSERT INTO embeddings (record_id, vector, dimension, created_at)
               VALUES (?, ?, ?, ?)"#,
        )
        .bind(record_id.0)
        .bind(encode_vector(vector))
        .bind(vector.len() as i64)
        .bind(format_datetime(&Utc::now()))
        .execute(&self.pool.writer)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(db_err)) if db_err.message().contains("FOREIGN KEY") => {
                Err(StorageError::UnknownRecord(record_id))
            }
            Err(e) => Err(StorageError::Query(e.to_string())),
        }
    }

    async fn scan_batch(
        &self,
        after: ScanCursor,
        limit: usize,
    ) -> Result<EmbeddingBatch, StorageError> {
        let limit = limit.max(1);
        let rows = sqlx::query(
            r#"SELECT rowid, record_id, vector, dimension FROM embeddings
               WHERE rowid > ?
               ORDER BY rowid
               LIMIT ?"#,
        )
        .bind(after.0)
        .bind(limit as i64)
        .fetch_all(&self.pool.reader)
        .await
        .map_err(|e| StorageError::Query(e.to_string()))?;

        let mut stored = Vec::with_capacity(rows.len());
        let mut last = None;
        for row in &rows {
            let row = EmbeddingRow::from_row(row).map_err(|e| StorageError::Query(e.to_string()))?;
            last = Some(row.rowid);
            stored.push(row.into_stored()?);
        }

        let next = if stored.len() == limit {
            last.map(ScanCursor)
        } else {
            None
        };

        Ok(EmbeddingBatch { rows: stored, next })
    }

    async fn purge_all(&self) -> Result<u64, StorageError> {
        let mut tx = self
            .pool
            .writer
            .begin()
            .await
            .map_err(|e| StorageError::Transaction(e.to_string()))?;

        let result = sqlx::query("DELETE FROM embeddings")
            .execute(&mut *tx)
            .await
            .map_err(|e| StorageError::Transaction(e.to_string()))?;

        tx.commit()
            .await
            .map_err(|e| StorageError::Transaction(e.to_string()))?;

        tracing::info!(deleted = result.rows_affected(), "purged all embeddings");
        Ok(result.rows_affected())
    }

    async fn count(&self) -> Result<u64, StorageError> {
        let row = sqlx::query("SELECT COUNT(*) as count FROM embeddings")
            .fetch_one(&self.pool.reader)
            .await
            .map_err(|e| StorageError::Query(e.to_string()))?;
        let count: i64 = row
            .try_get("count")
            .map_err(|e| StorageError::Query(e.to_string()))?;
        Ok(count as u64)
    }

    async fn embedded_record_ids(&self) -> Result<HashSet<RecordId>, StorageError> {
        let rows = sqlx::query("SELECT DISTINCT record_id FROM embeddings")
            .fetch_all(&self.pool.reader)
            .await
            .map_err(|e| StorageError::Query(e.to_string()))?;

        rows.iter()
            .map(|row| {
                row.try_get::<i64, _>("record_id")
                    .map(RecordId)
                    .map_err(|e| StorageError::Query(e.to_string()))
            })
            .collect()
    }

    async fn count_for(&self, record_id: RecordId) -> Result<u64, StorageError> {
        let row = sqlx::query("SELECT COUNT(*) as count FROM embeddings WHERE record_id = ?")
            .bind(record_id.0)
            .fetch_one(&self.pool.reader)
            .await
            .map_err(|e| StorageError::Query(e.to_string()))?;
        let count: i64 = row
            .try_get("count")
            .map_err(|e| StorageError::Query(e.to_string()))?;
        Ok(count as u64)
    }
}
