//! `libris show` and `libris list`.

use anyhow::Result;
use comfy_table::{presets, Cell, Color, ContentArrangement, Table};
use console::style;

use libris_core::repository::record::RecordRepository;
use libris_core::repository::vector::VectorRepository;
use libris_types::record::RecordId;

use crate::state::AppState;

/// Show one record with its embedding count.
pub async fn show(state: &AppState, id: i64, json: bool) -> Result<()> {
    let id = RecordId(id);
    let Some(record) = state.records.get_by_id(id).await? else {
        anyhow::bail!("record {id} not found");
    };
    let embeddings = state.vectors.count_for(id).await?;

    if json {
        let mut value = serde_json::to_value(&record)?;
        value["embeddings"] = serde_json::json!(embeddings);
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    println!();
    println!(
        "  {} {}",
        style(&record.title).cyan().bold(),
        style(format!("#{}", record.id)).dim()
    );
    println!("  Author:     {}", record.author);
    println!("  Code:       {}", record.code);
    println!(
        "  Stamp:      {}",
        record.stamp.format("%Y-%m-%d %H:%M:%S UTC")
    );
    println!(
        "  Embeddings: {}",
        if embeddings == 0 {
            style(embeddings.to_string()).yellow()
        } else {
            style(embeddings.to_string()).green()
        }
    );
    println!();
    match &record.summary {
        Some(summary) => println!("  {summary}"),
        None => println!("  {}", style("(no summary)").dim()),
    }
    println!();

    Ok(())
}

/// List stored records ordered by id.
pub async fn list(state: &AppState, limit: usize, json: bool) -> Result<()> {
    let records = state.records.get_all().await?;
    let embedded = state.vectors.embedded_record_ids().await?;
    let total = records.len();
    let shown: Vec<_> = records.into_iter().take(limit).collect();

    if json {
        println!("{}", serde_json::to_string_pretty(&shown)?);
        return Ok(());
    }

    if shown.is_empty() {
        println!();
        println!(
            "  {} No records yet. Run {} to pull the catalog.",
            style("i").blue().bold(),
            style("libris sync").cyan()
        );
        println!();
        return Ok(());
    }

    let mut table = Table::new();
    table.load_preset(presets::UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        Cell::new("Id").fg(Color::White),
        Cell::new("Code").fg(Color::White),
        Cell::new("Title").fg(Color::White),
        Cell::new("Author").fg(Color::White),
        Cell::new("Embedded").fg(Color::White),
    ]);

    for record in &shown {
        let embedded_cell = if embedded.contains(&record.id) {
            Cell::new("yes").fg(Color::Green)
        } else {
            Cell::new("no").fg(Color::Yellow)
        };
        table.add_row(vec![
            Cell::new(record.id),
            Cell::new(&record.code).fg(Color::DarkGrey),
            Cell::new(&record.title).fg(Color::Cyan),
            Cell::new(&record.author),
            embedded_cell,
        ]);
    }

    println!();
    println!("{table}");
    if total > shown.len() {
        println!(
            "  {}",
            style(format!("Showing {} of {total} records", shown.len())).dim()
        );
    }
    println!();

    Ok(())
}
