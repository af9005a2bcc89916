//! The `quizpilot stats` and `quizpilot clear` commands.

use anyhow::Result;
use comfy_table::{Cell, Table};
use tracing::warn;

use super::Context;

pub fn execute(ctx: &Context) -> Result<()> {
    let config = ctx.config()?;
    let stats = config.memory_repository().stats()?;
    let ring = config.credential_store()?.load()?;

    let mut table = Table::new();
    table.set_header(vec!["Metric", "Value"]);
    table.add_row(vec![Cell::new("Questions"), Cell::new(stats.total)]);
    table.add_row(vec![Cell::new("With correct answer"), Cell::new(stats.with_correct)]);
    table.add_row(vec![Cell::new("With wrong answers"), Cell::new(stats.with_wrong)]);
    table.add_row(vec![Cell::new("Wrong choices"), Cell::new(stats.wrong_choices)]);
    table.add_row(vec![Cell::new("With options"), Cell::new(stats.with_options)]);
    let active = ring
        .current()
        .map(|c| c.ordinal())
        .unwrap_or_else(|| "none".to_string());
    table.add_row(vec![Cell::new("Active API key"), Cell::new(active)]);

    println!("Memory: {}", config.memory_path().display());
    println!("{table}");
    Ok(())
}

pub fn clear(ctx: &Context, yes: bool) -> Result<()> {
    anyhow::ensure!(yes, "refusing to delete stored answers without --yes");
    let config = ctx.config()?;
    config.memory_repository().clear_all()?;
    warn!(path = %config.memory_path().display(), "stored answers deleted");
    println!("Deleted all stored answers.");
    Ok(())
}
