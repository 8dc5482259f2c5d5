//! `libris embed` and `libris purge`.

use anyhow::Result;
use comfy_table::{presets, Cell, Color, ContentArrangement, Table};
use console::style;
use dialoguer::Confirm;
use indicatif::{ProgressBar, ProgressStyle};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use libris_core::repository::vector::VectorRepository;
use libris_types::batch::{BatchReport, EmbeddingMode, ItemOutcome};

use crate::state::AppState;

/// Run the batch embedding pipeline with a progress bar.
///
/// Ctrl+C stops dispatching new records and abandons pending provider calls;
/// the run still finishes with a full report.
pub async fn embed(
    state: &AppState,
    mode: EmbeddingMode,
    concurrency: Option<usize>,
    purge: bool,
    json: bool,
    quiet: bool,
) -> Result<()> {
    let mode = if purge {
        let deleted = state.vectors.purge_all().await?;
        state.engine.invalidate_cache().await;
        if !json && !quiet {
            println!(
                "  {} Purged {} embedding{}",
                style("x").red().bold(),
                deleted,
                if deleted == 1 { "" } else { "s" }
            );
        }
        EmbeddingMode::All
    } else {
        mode
    };

    let pipeline = state.pipeline(concurrency);
    let total = pipeline.working_set(mode).await?.len() as u64;

    let bar = if json || quiet {
        ProgressBar::hidden()
    } else {
        let bar = ProgressBar::new(total);
        bar.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.cyan} [{bar:40.cyan/blue}] {pos}/{len} {msg}")?
                .progress_chars("=> "),
        );
        bar.enable_steady_tick(std::time::Duration::from_millis(100));
        bar
    };

    let (tx, mut rx) = mpsc::unbounded_channel::<ItemOutcome>();
    let progress = {
        let bar = bar.clone();
        tokio::spawn(async move {
            let mut failed = 0u64;
            while let Some(outcome) = rx.recv().await {
                if matches!(outcome, ItemOutcome::Failed(_)) {
                    failed += 1;
                    bar.set_message(format!("{failed} failed"));
                }
                bar.inc(1);
            }
        })
    };

    let cancel = CancellationToken::new();
    let ctrl_c = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("interrupt received, cancelling embedding run");
                cancel.cancel();
            }
        })
    };

    let result = pipeline.with_progress(tx).run(mode, &cancel).await;
    ctrl_c.abort();
    let _ = progress.await;
    bar.finish_and_clear();

    let report = result?;
    state.engine.invalidate_cache().await;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else if !quiet {
        print_report(&report);
    }

    if !report.is_complete() {
        anyhow::bail!(
            "{} of {} records were not embedded",
            report.failed_count() + report.cancelled.len(),
            report.total
        );
    }
    Ok(())
}

fn print_report(report: &BatchReport) {
    println!();
    println!(
        "  {} Embedded {}/{} records ({} mode) in {:.1}s",
        if report.is_complete() {
            style("✓").green().bold()
        } else {
            style("!").yellow().bold()
        },
        style(report.succeeded).bold(),
        report.total,
        report.mode,
        report.duration_ms() as f64 / 1000.0
    );

    if !report.failures.is_empty() {
        let mut table = Table::new();
        table.load_preset(presets::UTF8_FULL_CONDENSED);
        table.set_content_arrangement(ContentArrangement::Dynamic);
        table.set_header(vec![
            Cell::new("Id").fg(Color::White),
            Cell::new("Title").fg(Color::White),
            Cell::new("Stage").fg(Color::White),
            Cell::new("Error").fg(Color::White),
        ]);
        for failure in &report.failures {
            table.add_row(vec![
                Cell::new(failure.record_id).fg(Color::Yellow),
                Cell::new(&failure.title),
                Cell::new(failure.stage).fg(Color::Red),
                Cell::new(&failure.error).fg(Color::DarkGrey),
            ]);
        }
        println!();
        println!("{table}");
        println!(
            "  {}",
            style("Re-run `libris embed` to retry records without embeddings.").dim()
        );
    }

    if !report.cancelled.is_empty() {
        println!(
            "  {} {} record{} cancelled",
            style("-").dim(),
            report.cancelled.len(),
            if report.cancelled.len() == 1 { "" } else { "s" }
        );
    }
    println!();
}

/// Delete every stored embedding, after confirmation unless `force`.
pub async fn purge(state: &AppState, force: bool, json: bool) -> Result<()> {
    let count = state.vectors.count().await?;

    if count == 0 {
        if json {
            println!("{}", serde_json::json!({ "deleted": 0 }));
        } else {
            println!("  {} No embeddings to delete.", style("i").blue().bold());
        }
        return Ok(());
    }

    if !force && !json {
        let confirmed = Confirm::new()
            .with_prompt(format!(
                "Delete all {} embeddings? This cannot be undone.",
                style(count).bold()
            ))
            .default(false)
            .interact()?;

        if !confirmed {
            println!("  Cancelled.");
            return Ok(());
        }
    }

    let deleted = state.vectors.purge_all().await?;
    state.engine.invalidate_cache().await;

    if json {
        println!("{}", serde_json::json!({ "deleted": deleted }));
    } else {
        println!(
            "  {} Deleted {} embedding{}.",
            style("x").red().bold(),
            deleted,
            if deleted == 1 { "" } else { "s" }
        );
    }

    Ok(())
}
