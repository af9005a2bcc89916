//! The `quizpilot keys` commands.

use anyhow::Result;
use comfy_table::{Cell, Table};
use tracing::info;

use quizpilot_core::credentials::mask_key;

use super::Context;

pub fn list(ctx: &Context) -> Result<()> {
    let config = ctx.config()?;
    let ring = config.credential_store()?.load()?;
    let Some(active) = ring.current() else {
        println!("No API keys configured. Run `quizpilot keys set <key>...`.");
        return Ok(());
    };

    let mut table = Table::new();
    table.set_header(vec!["#", "Key", "Active"]);
    for (i, key) in ring.keys().iter().enumerate() {
        table.add_row(vec![
            Cell::new(i + 1),
            Cell::new(mask_key(key)),
            Cell::new(if i == active.index { "*" } else { "" }),
        ]);
    }
    println!("{table}");
    println!("Active key: {}", active.ordinal());
    Ok(())
}

pub fn set(ctx: &Context, keys: Vec<String>) -> Result<()> {
    let config = ctx.config()?;
    let store = config.credential_store()?;
    let mut ring = store.load()?;
    ring.replace(keys);
    anyhow::ensure!(!ring.is_empty(), "no usable API keys given");
    store.save(&ring)?;
    info!(count = ring.len(), path = %config.credentials_path().display(), "API keys replaced");
    println!("Saved {} API key(s); active key is #1/{}.", ring.len(), ring.len());
    Ok(())
}
