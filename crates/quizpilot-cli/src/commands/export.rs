//! The `quizpilot export` command.

use std::path::PathBuf;

use anyhow::Result;
use tracing::info;

use quizpilot_report::{from_graded, from_memory, render, write_export, ExportFormat};

use super::harvest::load_observations;
use super::Context;

pub fn execute(
    ctx: &Context,
    format: String,
    source: String,
    input: Option<PathBuf>,
    output: Option<PathBuf>,
) -> Result<()> {
    let format: ExportFormat = format.parse()?;

    let records = match source.as_str() {
        "memory" => {
            let config = ctx.config()?;
            let records = from_memory(&config.memory_repository().snapshot()?);
            eprintln!("Exported from memory: {} item(s)", records.len());
            records
        }
        "graded" => {
            let Some(input) = input else {
                anyhow::bail!("--input is required for --source graded");
            };
            let (records, summary) = from_graded(&load_observations(&input)?);
            eprintln!(
                "Exported (graded): {}. Dedup: {}, IncorrectFiltered: {}, NoQ: {}, NoAns: {}, NoChosen: {}",
                summary.exported,
                summary.duplicates,
                summary.incorrect_filtered,
                summary.no_question_text,
                summary.no_answers,
                summary.no_chosen
            );
            records
        }
        other => anyhow::bail!("unknown export source: {other} (expected memory or graded)"),
    };

    anyhow::ensure!(!records.is_empty(), "nothing to export: no question has a known correct answer");

    match output {
        Some(path) => {
            write_export(&records, format, &path)?;
            info!(records = records.len(), ?format, path = %path.display(), "export written");
            eprintln!("Written to: {}", path.display());
        }
        None => println!("{}", render(&records, format)?),
    }
    Ok(())
}
