//! Application state wiring all services together.
//!
//! AppState holds the concrete service instances used by both CLI and REST API.
//! Services are generic over repository/provider/catalog traits, but AppState
//! pins them to the concrete infra implementations.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;

use libris_core::embedding::box_provider::BoxEmbeddingProvider;
use libris_core::embedding::pipeline::BatchEmbeddingPipeline;
use libris_core::search::SimilarityEngine;
use libris_core::service::query::QueryService;
use libris_core::service::sync::SyncService;
use libris_infra::catalog::http::HttpCatalogClient;
use libris_infra::config::{load_global_config, resolve_data_dir, resolve_database_url};
use libris_infra::embedding::build_provider;
use libris_infra::sqlite::embedding::SqliteVectorRepository;
use libris_infra::sqlite::pool::DatabasePool;
use libris_infra::sqlite::record::SqliteRecordRepository;
use libris_types::config::GlobalConfig;

/// Concrete type aliases for the service generics pinned to infra implementations.
pub type ConcreteEngine = SimilarityEngine<SqliteVectorRepository>;

pub type ConcreteQueryService =
    QueryService<SqliteRecordRepository, SqliteVectorRepository, BoxEmbeddingProvider>;

pub type ConcreteSyncService = SyncService<SqliteRecordRepository, HttpCatalogClient>;

pub type ConcretePipeline =
    BatchEmbeddingPipeline<SqliteRecordRepository, SqliteVectorRepository, BoxEmbeddingProvider>;

/// Shared application state.
///
/// Used by both CLI commands and REST API handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<GlobalConfig>,
    pub records: Arc<SqliteRecordRepository>,
    pub vectors: Arc<SqliteVectorRepository>,
    pub provider: Arc<BoxEmbeddingProvider>,
    pub engine: Arc<ConcreteEngine>,
    pub query_service: Arc<ConcreteQueryService>,
    pub sync_service: Arc<ConcreteSyncService>,
    pub data_dir: PathBuf,
    pub db_pool: DatabasePool,
}

impl AppState {
    /// Resolve the data directory, load config, open the database and wire
    /// services.
    pub async fn init(data_dir: Option<PathBuf>) -> anyhow::Result<Self> {
        let data_dir = data_dir.unwrap_or_else(resolve_data_dir);

        tokio::fs::create_dir_all(&data_dir)
            .await
            .with_context(|| format!("failed to create data dir {}", data_dir.display()))?;

        let config = load_global_config(&data_dir).await;
        let provider = build_provider(&config.embedding)?;

        Self::from_parts(data_dir, config, provider).await
    }

    /// Wire services from an already-built config and provider.
    pub async fn from_parts(
        data_dir: PathBuf,
        config: GlobalConfig,
        provider: BoxEmbeddingProvider,
    ) -> anyhow::Result<Self> {
        let db_url = resolve_database_url(&config, &data_dir);
        let db_pool = DatabasePool::new(&db_url)
            .await
            .with_context(|| format!("failed to open database {db_url}"))?;

        let records = Arc::new(SqliteRecordRepository::new(db_pool.clone()));
        let vectors = Arc::new(SqliteVectorRepository::new(db_pool.clone()));
        let provider = Arc::new(provider);

        let engine = Arc::new(
            SimilarityEngine::new(Arc::clone(&vectors)).with_cache(config.search.cache_vectors),
        );

        let query_service = QueryService::new(
            Arc::clone(&records),
            Arc::clone(&engine),
            Arc::clone(&provider),
        )
        .with_task(config.embedding.query_task);

        let catalog = HttpCatalogClient::new(&config.catalog)
            .context("failed to construct catalog client")?;
        let sync_service = SyncService::new(Arc::clone(&records), Arc::new(catalog));

        Ok(Self {
            config: Arc::new(config),
            records,
            vectors,
            provider,
            engine,
            query_service: Arc::new(query_service),
            sync_service: Arc::new(sync_service),
            data_dir,
            db_pool,
        })
    }

    /// Build a pipeline run with the configured task and concurrency, or the
    /// given override.
    pub fn pipeline(&self, concurrency: Option<usize>) -> ConcretePipeline {
        BatchEmbeddingPipeline::new(
            Arc::clone(&self.records),
            Arc::clone(&self.vectors),
            Arc::clone(&self.provider),
        )
        .with_task(self.config.embedding.index_task)
        .with_concurrency(concurrency.unwrap_or(self.config.pipeline.concurrency))
    }
}
