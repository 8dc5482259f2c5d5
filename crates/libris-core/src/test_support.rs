//! In-memory fakes for core tests.

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use chrono::{TimeZone, Utc};

use libris_types::embedding::{EmbeddingBatch, ScanCursor, StoredEmbedding};
use libris_types::error::{ProviderError, StorageError};
use libris_types::record::{Record, RecordId};
use libris_types::sync::SyncCursor;

use crate::embedding::provider::EmbeddingProvider;
use crate::repository::record::RecordRepository;
use crate::repository::vector::VectorRepository;

pub fn make_record(id: i64, title: &str) -> Record {
    Record {
        id: RecordId(id),
        code: format!("C-{id}"),
        title: title.to_string(),
        author: format!("Author {id}"),
        summary: Some(format!("Summary {id}")),
        stamp: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() + chrono::Duration::days(id),
    }
}

#[derive(Default)]
pub struct InMemoryRecordRepository {
    records: Mutex<Vec<Record>>,
}

impl InMemoryRecordRepository {
    pub fn seed(&self, record: Record) {
        self.records.lock().unwrap().push(record);
    }
}

impl RecordRepository for InMemoryRecordRepository {
    async fn insert(&self, record: &Record) -> Result<(), StorageError> {
        let mut records = self.records.lock().unwrap();
        if records.iter().any(|r| r.id == record.id) {
            return Err(StorageError::DuplicateKey(record.id));
        }
        records.push(record.clone());
        Ok(())
    }

    async fn get_by_id(&self, id: RecordId) -> Result<Option<Record>, StorageError> {
        Ok(self
            .records
            .lock()
            .unwrap()
            .iter()
            .find(|r| r.id == id)
            .cloned())
    }

    async fn get_all(&self) -> Result<Vec<Record>, StorageError> {
        let mut all = self.records.lock().unwrap().clone();
        all.sort_by_key(|r| r.id);
        Ok(all)
    }

    async fn count(&self) -> Result<u64, StorageError> {
        Ok(self.records.lock().unwrap().len() as u64)
    }

    async fn latest_cursor(&self) -> Result<Option<SyncCursor>, StorageError> {
        let records = self.records.lock().unwrap();
        if records.is_empty() {
            return Ok(None);
        }
        let mut cursor = SyncCursor::initial();
        for r in records.iter() {
            cursor.advance(r.id, r.stamp);
        }
        Ok(Some(cursor))
    }
}

/// Vector store backed by a `Vec`; row positions act as scan cursors.
#[derive(Default)]
pub struct InMemoryVectorRepository {
    rows: Mutex<Vec<StoredEmbedding>>,
    rejected: HashSet<RecordId>,
    scans: AtomicUsize,
}

impl InMemoryVectorRepository {
    pub fn with_rows(rows: Vec<StoredEmbedding>) -> Self {
        Self {
            rows: Mutex::new(rows),
            ..Default::default()
        }
    }

    /// Make `put` fail for these records.
    pub fn rejecting(mut self, ids: &[RecordId]) -> Self {
        self.rejected = ids.iter().copied().collect();
        self
    }

    pub fn rows(&self) -> Vec<StoredEmbedding> {
        self.rows.lock().unwrap().clone()
    }

    /// Number of `scan_batch` calls served.
    pub fn scans(&self) -> usize {
        self.scans.load(Ordering::SeqCst)
    }
}

impl VectorRepository for InMemoryVectorRepository {
    async fn put(&self, record_id: RecordId, vector: &[f64]) -> Result<(), StorageError> {
        if self.rejected.contains(&record_id) {
            return Err(StorageError::UnknownRecord(record_id));
        }
        self.rows.lock().unwrap().push(StoredEmbedding {
            record_id,
            vector: vector.to_vec(),
        });
        Ok(())
    }

    async fn scan_batch(
        &self,
        after: ScanCursor,
        limit: usize,
    ) -> Result<EmbeddingBatch, StorageError> {
        self.scans.fetch_add(1, Ordering::SeqCst);
        let rows = self.rows.lock().unwrap();
        let start = after.0 as usize;
        let page: Vec<StoredEmbedding> = rows.iter().skip(start).take(limit).cloned().collect();
        let end = start + page.len();
        let next = (end < rows.len()).then_some(ScanCursor(end as i64));
        Ok(EmbeddingBatch { rows: page, next })
    }

    async fn purge_all(&self) -> Result<u64, StorageError> {
        let mut rows = self.rows.lock().unwrap();
        let n = rows.len() as u64;
        rows.clear();
        Ok(n)
    }

    async fn count(&self) -> Result<u64, StorageError> {
        Ok(self.rows.lock().unwrap().len() as u64)
    }

    async fn embedded_record_ids(&self) -> Result<HashSet<RecordId>, StorageError> {
        Ok(self.rows.lock().unwrap().iter().map(|r| r.record_id).collect())
    }

    async fn count_for(&self, record_id: RecordId) -> Result<u64, StorageError> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.record_id == record_id)
            .count() as u64)
    }
}

/// Provider returning `[len(text), 1.0, 0.0, ...]` of a fixed dimension.
///
/// Tracks how many calls are in flight at once, and can fail on inputs that
/// mention given titles.
pub struct ScriptedProvider {
    dimension: usize,
    delay: Option<Duration>,
    failing: Vec<String>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    calls: AtomicUsize,
    inputs: Mutex<Vec<String>>,
}

impl ScriptedProvider {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            delay: None,
            failing: Vec::new(),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            calls: AtomicUsize::new(0),
            inputs: Mutex::new(Vec::new()),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Fail for any input containing `"Title: {title},"`.
    pub fn failing_titles(mut self, titles: &[&str]) -> Self {
        self.failing = titles.iter().map(|t| format!("Title: {t},")).collect();
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    pub fn seen_inputs(&self) -> Vec<String> {
        self.inputs.lock().unwrap().clone()
    }
}

struct InFlightGuard<'a>(&'a AtomicUsize);

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl EmbeddingProvider for ScriptedProvider {
    async fn generate(&self, text: &str) -> Result<Vec<f64>, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inputs.lock().unwrap().push(text.to_string());

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        let _guard = InFlightGuard(&self.in_flight);
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        } else {
            tokio::task::yield_now().await;
        }

        if self.failing.iter().any(|needle| text.contains(needle.as_str())) {
            return Err(ProviderError::Timeout);
        }

        let mut vector = vec![0.0; self.dimension];
        if let Some(first) = vector.first_mut() {
            *first = text.len() as f64;
        }
        if let Some(second) = vector.get_mut(1) {
            *second = 1.0;
        }
        Ok(vector)
    }

    fn model_name(&self) -> &str {
        "scripted"
    }
}
