//! Global configuration types for libris.
//!
//! `GlobalConfig` represents the top-level `config.toml` in the data
//! directory. Every section and field has a default, so an empty or missing
//! file yields a working local setup (SQLite in the data dir, Ollama on
//! localhost).

use serde::{Deserialize, Serialize};

use std::fmt;
use std::str::FromStr;

use crate::embedding::EmbeddingTask;

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GlobalConfig {
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub catalog: CatalogConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub pipeline: PipelineConfig,
    #[serde(default)]
    pub search: SearchConfig,
}

/// Database location. When `url` is unset the database lives in the data dir.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default)]
    pub url: Option<String>,
}

/// Upstream catalog endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogConfig {
    #[serde(default = "default_catalog_base_url")]
    pub base_url: String,
    #[serde(default = "default_catalog_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_catalog_timeout_secs")]
    pub timeout_secs: u64,
    /// Maximum number of records requested per pull.
    #[serde(default = "default_page_size")]
    pub page_size: i64,
}

fn default_catalog_base_url() -> String {
    "http://localhost:8282".to_string()
}

fn default_catalog_endpoint() -> String {
    "/api/Libros/ObtenerResumenes".to_string()
}

fn default_catalog_timeout_secs() -> u64 {
    60
}

fn default_page_size() -> i64 {
    i64::from(i32::MAX)
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            base_url: default_catalog_base_url(),
            endpoint: default_catalog_endpoint(),
            timeout_secs: default_catalog_timeout_secs(),
            page_size: default_page_size(),
        }
    }
}

/// Which embedding backend to talk to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    #[default]
    Ollama,
    /// Any server speaking the OpenAI `/embeddings` protocol.
    Openai,
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderKind::Ollama => write!(f, "ollama"),
            ProviderKind::Openai => write!(f, "openai"),
        }
    }
}

impl FromStr for ProviderKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ollama" => Ok(ProviderKind::Ollama),
            "openai" => Ok(ProviderKind::Openai),
            other => Err(format!("invalid embedding provider: '{other}'")),
        }
    }
}

/// Embedding model configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    #[serde(default)]
    pub provider: ProviderKind,
    #[serde(default = "default_embedding_base_url")]
    pub base_url: String,
    #[serde(default = "default_embedding_model")]
    pub model: String,
    /// Name of the environment variable holding the API key (OpenAI only).
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    /// Expected vector length. Responses of any other length are rejected.
    #[serde(default)]
    pub dimensions: Option<usize>,
    #[serde(default = "default_embedding_timeout_secs")]
    pub timeout_secs: u64,
    /// Task tag used when embedding records.
    #[serde(default)]
    pub index_task: EmbeddingTask,
    /// Task tag used when embedding search queries.
    #[serde(default = "default_query_task")]
    pub query_task: EmbeddingTask,
}

fn default_embedding_base_url() -> String {
    "http://localhost:11434".to_string()
}

fn default_embedding_model() -> String {
    "nomic-embed-text".to_string()
}

fn default_api_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}

fn default_embedding_timeout_secs() -> u64 {
    30
}

fn default_query_task() -> EmbeddingTask {
    EmbeddingTask::SearchQuery
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: ProviderKind::default(),
            base_url: default_embedding_base_url(),
            model: default_embedding_model(),
            api_key_env: default_api_key_env(),
            dimensions: None,
            timeout_secs: default_embedding_timeout_secs(),
            index_task: EmbeddingTask::default(),
            query_task: default_query_task(),
        }
    }
}

/// Batch embedding pipeline settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Maximum number of provider calls in flight at once.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
}

fn default_concurrency() -> usize {
    10
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
        }
    }
}

/// Similarity search settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    #[serde(default = "default_limit")]
    pub default_limit: usize,
    /// Keep the loaded vector set in memory between searches.
    ///
    /// The cache reloads whenever the stored row count changes. A long-lived
    /// `serve` process does not notice an external purge and re-embed that
    /// ends at the same row count; restart it after `libris embed --purge`.
    #[serde(default)]
    pub cache_vectors: bool,
}

fn default_limit() -> usize {
    20
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            default_limit: default_limit(),
            cache_vectors: false,
        }
    }
}
