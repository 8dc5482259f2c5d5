//! Batch embedding pipeline: bounded fan-out over the record store, fan-in
//! into a [`BatchReport`].
//!
//! # Execution flow
//!
//! 1. Load the working set (all records, or only those without embeddings).
//! 2. For each record, acquire one of `C` semaphore slots, then spawn a unit
//!    of work onto a `JoinSet`.
//! 3. Each unit: embed the task-prefixed canonical text, append the vector
//!    to the vector store, release the slot.
//! 4. Per-unit failures are recorded and never abort sibling units.
//! 5. The run resolves only after every unit has finished (success, failure
//!    or cancellation).
//!
//! Cancellation stops new dispatches and abandons provider calls that are
//! still waiting; a vector is written only after it was fully received.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::{mpsc, Semaphore};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use libris_types::batch::{BatchReport, EmbeddingMode, FailureStage, ItemFailure, ItemOutcome};
use libris_types::embedding::EmbeddingTask;
use libris_types::error::{PipelineError, StorageError};
use libris_types::record::{Record, RecordId};

use super::provider::EmbeddingProvider;
use crate::repository::record::RecordRepository;
use crate::repository::vector::VectorRepository;

/// Default number of provider calls allowed in flight.
pub const DEFAULT_CONCURRENCY: usize = 10;

/// Drives an [`EmbeddingProvider`] over a working set of records under a
/// fixed concurrency cap.
pub struct BatchEmbeddingPipeline<R, V, P> {
    records: Arc<R>,
    vectors: Arc<V>,
    provider: Arc<P>,
    concurrency: usize,
    task: EmbeddingTask,
    progress: Option<mpsc::UnboundedSender<ItemOutcome>>,
}

impl<R, V, P> BatchEmbeddingPipeline<R, V, P>
where
    R: RecordRepository + 'static,
    V: VectorRepository + 'static,
    P: EmbeddingProvider + 'static,
{
    pub fn new(records: Arc<R>, vectors: Arc<V>, provider: Arc<P>) -> Self {
        Self {
            records,
            vectors,
            provider,
            concurrency: DEFAULT_CONCURRENCY,
            task: EmbeddingTask::default(),
            progress: None,
        }
    }

    /// Set the concurrency cap. Values below 1 are raised to 1.
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Set the task tag prefixed to every record text.
    pub fn with_task(mut self, task: EmbeddingTask) -> Self {
        self.task = task;
        self
    }

    /// Emit an [`ItemOutcome`] on this channel as each unit resolves.
    pub fn with_progress(mut self, progress: mpsc::UnboundedSender<ItemOutcome>) -> Self {
        self.progress = Some(progress);
        self
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Load the records a run in `mode` would process, de-duplicated by id.
    pub async fn working_set(&self, mode: EmbeddingMode) -> Result<Vec<Record>, StorageError> {
        let all = self.records.get_all().await?;

        let embedded = match mode {
            EmbeddingMode::All => HashSet::new(),
            EmbeddingMode::MissingOnly => self.vectors.embedded_record_ids().await?,
        };

        let mut seen = HashSet::with_capacity(all.len());
        Ok(all
            .into_iter()
            .filter(|record| !embedded.contains(&record.id))
            .filter(|record| seen.insert(record.id))
            .collect())
    }

    /// Run the pipeline to completion.
    ///
    /// Only a failure to load the working set is an error; everything that
    /// goes wrong for a single record ends up in the report.
    pub async fn run(
        &self,
        mode: EmbeddingMode,
        cancel: &CancellationToken,
    ) -> Result<BatchReport, PipelineError> {
        let run_id = Uuid::now_v7();
        let started_at = Utc::now();

        let working_set = self.working_set(mode).await?;
        let total = working_set.len();

        tracing::info!(
            run_id = %run_id,
            mode = %mode,
            total,
            concurrency = self.concurrency,
            model = self.provider.model_name(),
            "starting embedding run"
        );

        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        let mut join_set = JoinSet::new();
        let mut in_flight: HashMap<RecordId, String> = HashMap::new();

        let mut succeeded = 0usize;
        let mut failures: Vec<ItemFailure> = Vec::new();
        let mut cancelled: Vec<RecordId> = Vec::new();

        let mut queue = working_set.into_iter();
        while let Some(record) = queue.next() {
            let permit = tokio::select! {
                biased;
                _ = cancel.cancelled() => None,
                permit = Arc::clone(&semaphore).acquire_owned() => permit.ok(),
            };

            let Some(permit) = permit else {
                self.emit(ItemOutcome::Cancelled { record_id: record.id });
                cancelled.push(record.id);
                for rest in queue.by_ref() {
                    self.emit(ItemOutcome::Cancelled { record_id: rest.id });
                    cancelled.push(rest.id);
                }
                break;
            };

            let input = self.task.apply(&record.canonical_text());
            let vectors = Arc::clone(&self.vectors);
            let provider = Arc::clone(&self.provider);
            let token = cancel.clone();
            let progress = self.progress.clone();

            in_flight.insert(record.id, record.title.clone());

            join_set.spawn(async move {
                let outcome =
                    embed_record(&record, &input, vectors.as_ref(), provider.as_ref(), &token)
                        .await;
                drop(permit);
                if let Some(tx) = &progress {
                    let _ = tx.send(outcome.clone());
                }
                outcome
            });
        }

        while let Some(joined) = join_set.join_next().await {
            match joined {
                Ok(outcome) => {
                    in_flight.remove(&outcome.record_id());
                    match outcome {
                        ItemOutcome::Embedded { .. } => succeeded += 1,
                        ItemOutcome::Failed(failure) => failures.push(failure),
                        ItemOutcome::Cancelled { record_id } => cancelled.push(record_id),
                    }
                }
                Err(e) => {
                    tracing::error!(run_id = %run_id, "embedding worker aborted: {e}");
                }
            }
        }

        // Units whose task died without reporting back.
        for (record_id, title) in in_flight.drain() {
            let failure = ItemFailure {
                record_id,
                title,
                stage: FailureStage::Worker,
                error: "worker task aborted".to_string(),
            };
            self.emit(ItemOutcome::Failed(failure.clone()));
            failures.push(failure);
        }

        let report = BatchReport {
            run_id,
            mode,
            total,
            succeeded,
            failures,
            cancelled,
            started_at,
            finished_at: Utc::now(),
        };

        tracing::info!(
            run_id = %run_id,
            succeeded = report.succeeded,
            failed = report.failed_count(),
            cancelled = report.cancelled.len(),
            duration_ms = report.duration_ms(),
            "embedding run finished"
        );

        Ok(report)
    }

    fn emit(&self, outcome: ItemOutcome) {
        if let Some(tx) = &self.progress {
            let _ = tx.send(outcome);
        }
    }
}

/// One unit of work: embed, validate, persist.
async fn embed_record<V, P>(
    record: &Record,
    input: &str,
    vectors: &V,
    provider: &P,
    cancel: &CancellationToken,
) -> ItemOutcome
where
    V: VectorRepository,
    P: EmbeddingProvider,
{
    let generated = tokio::select! {
        biased;
        _ = cancel.cancelled() => {
            tracing::debug!(record_id = %record.id, "cancelled before embedding arrived");
            return ItemOutcome::Cancelled { record_id: record.id };
        }
        generated = provider.generate(input) => generated,
    };

    let vector = match generated {
        Ok(vector) if vector.is_empty() => {
            return failed(record, FailureStage::Provider, "provider returned an empty vector");
        }
        Ok(vector) => vector,
        Err(e) => return failed(record, FailureStage::Provider, &e.to_string()),
    };

    if let Err(e) = vectors.put(record.id, &vector).await {
        return failed(record, FailureStage::Storage, &e.to_string());
    }

    tracing::debug!(
        record_id = %record.id,
        dimension = vector.len(),
        "embedded record"
    );

    ItemOutcome::Embedded {
        record_id: record.id,
        dimension: vector.len(),
    }
}

fn failed(record: &Record, stage: FailureStage, error: &str) -> ItemOutcome {
    tracing::warn!(
        record_id = %record.id,
        title = record.title.as_str(),
        stage = %stage,
        "failed to embed record: {error}"
    );
    ItemOutcome::Failed(ItemFailure {
        record_id: record.id,
        title: record.title.clone(),
        stage,
        error: error.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{
        make_record, InMemoryRecordRepository, InMemoryVectorRepository, ScriptedProvider,
    };
    use std::time::Duration;

    fn pipeline(
        records: &Arc<InMemoryRecordRepository>,
        vectors: &Arc<InMemoryVectorRepository>,
        provider: &Arc<ScriptedProvider>,
    ) -> BatchEmbeddingPipeline<InMemoryRecordRepository, InMemoryVectorRepository, ScriptedProvider>
    {
        BatchEmbeddingPipeline::new(
            Arc::clone(records),
            Arc::clone(vectors),
            Arc::clone(provider),
        )
    }

    fn seeded(n: i64) -> Arc<InMemoryRecordRepository> {
        let repo = InMemoryRecordRepository::default();
        for i in 1..=n {
            repo.seed(make_record(i, &format!("Book {i}")));
        }
        Arc::new(repo)
    }

    #[tokio::test]
    async fn test_run_embeds_every_record() {
        let records = seeded(5);
        let vectors = Arc::new(InMemoryVectorRepository::default());
        let provider = Arc::new(ScriptedProvider::new(3));

        let report = pipeline(&records, &vectors, &provider)
            .run(EmbeddingMode::All, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(report.total, 5);
        assert_eq!(report.succeeded, 5);
        assert!(report.is_complete());
        assert_eq!(vectors.rows().len(), 5);
        assert_eq!(provider.calls(), 5);
    }

    #[tokio::test]
    async fn test_provider_failures_are_isolated_and_reported() {
        let records = seeded(10);
        let vectors = Arc::new(InMemoryVectorRepository::default());
        let provider = Arc::new(ScriptedProvider::new(4).failing_titles(&["Book 3", "Book 7"]));

        let report = pipeline(&records, &vectors, &provider)
            .run(EmbeddingMode::All, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(report.succeeded, 8);
        assert_eq!(report.failed_count(), 2);
        let mut failed = report.failed_ids();
        failed.sort();
        assert_eq!(failed, vec![RecordId(3), RecordId(7)]);
        assert!(report
            .failures
            .iter()
            .all(|f| f.stage == FailureStage::Provider));
        assert_eq!(vectors.rows().len(), 8);
    }

    #[tokio::test]
    async fn test_missing_only_reprocesses_exactly_the_failures() {
        let records = seeded(10);
        let vectors = Arc::new(InMemoryVectorRepository::default());
        let flaky = Arc::new(ScriptedProvider::new(4).failing_titles(&["Book 2", "Book 9"]));

        let first = pipeline(&records, &vectors, &flaky)
            .run(EmbeddingMode::All, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(first.failed_count(), 2);

        let healthy = Arc::new(ScriptedProvider::new(4));
        let second = pipeline(&records, &vectors, &healthy)
            .run(EmbeddingMode::MissingOnly, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(second.total, 2);
        assert_eq!(second.succeeded, 2);
        assert_eq!(healthy.calls(), 2);
        let mut seen = healthy.seen_inputs();
        seen.sort();
        assert!(seen[0].contains("Book 2"));
        assert!(seen[1].contains("Book 9"));
        assert_eq!(vectors.rows().len(), 10);
    }

    #[tokio::test]
    async fn test_concurrency_cap_holds() {
        let records = seeded(40);
        let vectors = Arc::new(InMemoryVectorRepository::default());
        let provider =
            Arc::new(ScriptedProvider::new(2).with_delay(Duration::from_millis(10)));

        let report = pipeline(&records, &vectors, &provider)
            .with_concurrency(3)
            .run(EmbeddingMode::All, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(report.succeeded, 40);
        assert!(provider.max_in_flight() <= 3, "observed {}", provider.max_in_flight());
        assert!(provider.max_in_flight() >= 2, "cap was never exercised");
    }

    #[tokio::test]
    async fn test_zero_concurrency_is_raised_to_one() {
        let records = seeded(3);
        let vectors = Arc::new(InMemoryVectorRepository::default());
        let provider = Arc::new(ScriptedProvider::new(2));

        let pipe = pipeline(&records, &vectors, &provider).with_concurrency(0);
        assert_eq!(pipe.concurrency(), 1);

        let report = pipe
            .run(EmbeddingMode::All, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(report.succeeded, 3);
        assert_eq!(provider.max_in_flight(), 1);
    }

    #[tokio::test]
    async fn test_storage_failure_is_reported_per_record() {
        let records = seeded(4);
        let vectors = Arc::new(InMemoryVectorRepository::default().rejecting(&[RecordId(2)]));
        let provider = Arc::new(ScriptedProvider::new(2));

        let report = pipeline(&records, &vectors, &provider)
            .run(EmbeddingMode::All, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(report.succeeded, 3);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].record_id, RecordId(2));
        assert_eq!(report.failures[0].stage, FailureStage::Storage);
        assert_eq!(report.failures[0].title, "Book 2");
    }

    #[tokio::test]
    async fn test_empty_vector_is_a_failure() {
        let records = seeded(2);
        let vectors = Arc::new(InMemoryVectorRepository::default());
        let provider = Arc::new(ScriptedProvider::new(0));

        let report = pipeline(&records, &vectors, &provider)
            .run(EmbeddingMode::All, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(report.succeeded, 0);
        assert_eq!(report.failed_count(), 2);
        assert!(vectors.rows().is_empty());
    }

    #[tokio::test]
    async fn test_recompute_all_appends_rather_than_replaces() {
        let records = seeded(3);
        let vectors = Arc::new(InMemoryVectorRepository::default());
        let provider = Arc::new(ScriptedProvider::new(2));

        let pipe = pipeline(&records, &vectors, &provider);
        pipe.run(EmbeddingMode::All, &CancellationToken::new())
            .await
            .unwrap();
        pipe.run(EmbeddingMode::All, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(vectors.rows().len(), 6);

        let report = pipe
            .run(EmbeddingMode::MissingOnly, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(report.total, 0);
        assert!(report.is_complete());
    }

    #[tokio::test]
    async fn test_task_prefix_is_applied() {
        let records = seeded(1);
        let vectors = Arc::new(InMemoryVectorRepository::default());
        let provider = Arc::new(ScriptedProvider::new(2));

        pipeline(&records, &vectors, &provider)
            .with_task(EmbeddingTask::SearchDocument)
            .run(EmbeddingMode::All, &CancellationToken::new())
            .await
            .unwrap();

        let inputs = provider.seen_inputs();
        assert_eq!(
            inputs,
            vec!["search_document: Title: Book 1, Author: Author 1, Summary: Summary 1".to_string()]
        );
    }

    #[tokio::test]
    async fn test_progress_reports_every_item() {
        let records = seeded(6);
        let vectors = Arc::new(InMemoryVectorRepository::default());
        let provider = Arc::new(ScriptedProvider::new(2).failing_titles(&["Book 4"]));
        let (tx, mut rx) = mpsc::unbounded_channel();

        let report = pipeline(&records, &vectors, &provider)
            .with_progress(tx)
            .run(EmbeddingMode::All, &CancellationToken::new())
            .await
            .unwrap();

        let mut outcomes = Vec::new();
        while let Ok(outcome) = rx.try_recv() {
            outcomes.push(outcome);
        }
        assert_eq!(outcomes.len(), report.total);
        assert_eq!(
            outcomes
                .iter()
                .filter(|o| matches!(o, ItemOutcome::Failed(_)))
                .count(),
            1
        );
    }

    #[tokio::test]
    async fn test_cancelled_run_writes_nothing_partial() {
        let records = seeded(20);
        let vectors = Arc::new(InMemoryVectorRepository::default());
        let provider =
            Arc::new(ScriptedProvider::new(2).with_delay(Duration::from_millis(200)));
        let cancel = CancellationToken::new();

        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            trigger.cancel();
        });

        let report = pipeline(&records, &vectors, &provider)
            .with_concurrency(4)
            .run(EmbeddingMode::All, &cancel)
            .await
            .unwrap();

        assert_eq!(report.total, 20);
        assert_eq!(
            report.succeeded + report.failed_count() + report.cancelled.len(),
            20
        );
        assert_eq!(report.succeeded, 0);
        assert_eq!(report.cancelled.len(), 20);
        assert!(vectors.rows().is_empty());
    }

    #[tokio::test]
    async fn test_already_cancelled_run_dispatches_nothing() {
        let records = seeded(5);
        let vectors = Arc::new(InMemoryVectorRepository::default());
        let provider = Arc::new(ScriptedProvider::new(2));
        let cancel = CancellationToken::new();
        cancel.cancel();

        let report = pipeline(&records, &vectors, &provider)
            .run(EmbeddingMode::All, &cancel)
            .await
            .unwrap();

        assert_eq!(report.cancelled.len(), 5);
        assert_eq!(provider.calls(), 0);
    }

    #[tokio::test]
    async fn test_empty_working_set() {
        let records = Arc::new(InMemoryRecordRepository::default());
        let vectors = Arc::new(InMemoryVectorRepository::default());
        let provider = Arc::new(ScriptedProvider::new(2));

        let report = pipeline(&records, &vectors, &provider)
            .run(EmbeddingMode::All, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(report.total, 0);
        assert!(report.is_complete());
    }
}
