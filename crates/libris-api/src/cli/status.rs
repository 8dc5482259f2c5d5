//! System status: record and embedding counts.

use anyhow::Result;
use console::style;
use serde::Serialize;

use libris_core::embedding::provider::EmbeddingProvider;
use libris_core::repository::record::RecordRepository;
use libris_core::repository::vector::VectorRepository;
use libris_types::error::StorageError;

use crate::state::AppState;

/// Counts shared by `libris status` and `GET /api/v1/stats`.
#[derive(Debug, Serialize)]
pub struct StatusSummary {
    pub records: u64,
    pub embeddings: u64,
    pub embedded_records: u64,
    pub missing_embeddings: u64,
    pub provider: String,
    pub model: String,
    pub concurrency: usize,
}

pub async fn gather(state: &AppState) -> Result<StatusSummary, StorageError> {
    let records = state.records.count().await?;
    let embeddings = state.vectors.count().await?;
    let embedded_records = state.vectors.embedded_record_count().await?;

    Ok(StatusSummary {
        records,
        embeddings,
        embedded_records,
        missing_embeddings: records.saturating_sub(embedded_records),
        provider: state.config.embedding.provider.to_string(),
        model: state.provider.model_name().to_string(),
        concurrency: state.config.pipeline.concurrency.max(1),
    })
}

pub async fn status(state: &AppState, json: bool) -> Result<()> {
    let summary = gather(state).await?;

    if json {
        let mut value = serde_json::to_value(&summary)?;
        value["version"] = serde_json::json!(env!("CARGO_PKG_VERSION"));
        value["data_dir"] = serde_json::json!(state.data_dir.display().to_string());
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    println!();
    println!(
        "  {} libris v{}",
        style("⚡").bold(),
        env!("CARGO_PKG_VERSION")
    );
    println!();

    println!("  {}", style("── Records ──").dim());
    println!("  Stored:     {}", style(summary.records).bold());
    println!("  Embedded:   {}", style(summary.embedded_records).green());
    if summary.missing_embeddings > 0 {
        println!("  Missing:    {}", style(summary.missing_embeddings).yellow());
    }
    println!("  Vectors:    {}", summary.embeddings);
    println!();

    println!("  {}", style("── Embedding ──").dim());
    println!("  Provider:    {}", summary.provider);
    println!("  Model:       {}", style(&summary.model).cyan());
    println!("  Concurrency: {}", summary.concurrency);
    println!();

    println!("  {}", style("── System ──").dim());
    println!("  Data dir: {}", style(state.data_dir.display()).dim());
    println!("  Database: {}", style("SQLite (WAL mode)").dim());
    println!();

    Ok(())
}
