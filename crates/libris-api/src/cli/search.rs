//! `libris search`: rank records against free text.

use anyhow::Result;
use comfy_table::{presets, Cell, Color, ContentArrangement, Table};
use console::style;

use crate::state::AppState;

pub async fn search(state: &AppState, text: &str, k: Option<usize>, json: bool) -> Result<()> {
    let k = k.unwrap_or(state.config.search.default_limit);
    let outcome = state.query_service.query(text, k).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
        return Ok(());
    }

    if outcome.hits.is_empty() {
        println!();
        println!(
            "  {} No matches. Run {} first if nothing is embedded yet.",
            style("i").blue().bold(),
            style("libris embed").cyan()
        );
        println!();
        return Ok(());
    }

    let mut table = Table::new();
    table.load_preset(presets::UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        Cell::new("#").fg(Color::White),
        Cell::new("Score").fg(Color::White),
        Cell::new("Id").fg(Color::White),
        Cell::new("Title").fg(Color::White),
        Cell::new("Author").fg(Color::White),
    ]);

    for (rank, hit) in outcome.hits.iter().enumerate() {
        table.add_row(vec![
            Cell::new(rank + 1).fg(Color::DarkGrey),
            Cell::new(format!("{:.4}", hit.score)).fg(Color::Yellow),
            Cell::new(hit.record.id),
            Cell::new(&hit.record.title).fg(Color::Cyan),
            Cell::new(&hit.record.author),
        ]);
    }

    println!();
    println!("{table}");
    if !outcome.missing.is_empty() {
        let ids: Vec<String> = outcome.missing.iter().map(|id| id.to_string()).collect();
        println!(
            "  {} Embeddings reference missing records: {}",
            style("!").yellow().bold(),
            ids.join(", ")
        );
    }
    println!();

    Ok(())
}
