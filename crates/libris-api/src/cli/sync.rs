//! `libris sync`: pull new records from the upstream catalog.

use anyhow::Result;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};

use crate::state::AppState;

pub async fn sync(state: &AppState, json: bool, quiet: bool) -> Result<()> {
    let spinner = if json || quiet {
        ProgressBar::hidden()
    } else {
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}")?);
        spinner.set_message("Fetching catalog...");
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        spinner
    };

    let result = state.sync_service.sync(None).await;
    spinner.finish_and_clear();
    let report = result?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }
    if quiet {
        return Ok(());
    }

    println!();
    println!(
        "  {} Fetched {} record{}, stored {}",
        style("✓").green().bold(),
        style(report.fetched).bold(),
        if report.fetched == 1 { "" } else { "s" },
        style(report.inserted).green()
    );
    if !report.duplicates.is_empty() {
        let ids: Vec<String> = report.duplicates.iter().map(|id| id.to_string()).collect();
        println!(
            "  {} Skipped {} already stored: {}",
            style("!").yellow().bold(),
            report.duplicates.len(),
            style(ids.join(", ")).dim()
        );
    }
    println!(
        "  {}",
        style(format!(
            "Next pull after id {} / {}",
            report.cursor.last_id,
            report.cursor.last_stamp.format("%Y-%m-%dT%H:%M:%S")
        ))
        .dim()
    );
    println!();

    Ok(())
}
