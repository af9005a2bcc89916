//! The `quizpilot harvest` command.

use std::path::{Path, PathBuf};

use anyhow::{Context as _, Result};
use tracing::info;

use quizpilot_core::harvest::{GradedObservation, HarvestImporter};

use super::Context;

/// Read a graded observation batch from a JSON file.
pub fn load_observations(path: &Path) -> Result<Vec<GradedObservation>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read graded results: {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("failed to parse graded results: {}", path.display()))
}

pub fn execute(ctx: &Context, input: PathBuf) -> Result<()> {
    let config = ctx.config()?;
    let batch = load_observations(&input)?;
    anyhow::ensure!(!batch.is_empty(), "no graded questions in {}", input.display());

    let importer = HarvestImporter::new(config.memory_repository());
    let report = importer.import(&batch)?;
    info!(
        input = %input.display(),
        learned_correct = report.learned_correct,
        learned_wrong = report.learned_wrong,
        skipped = report.skipped,
        "harvest finished"
    );

    println!("Harvest complete ({} question(s) read)", batch.len());
    println!("- Learned correct: {}", report.learned_correct);
    println!("- Learned wrong:   {}", report.learned_wrong);
    println!("- Skipped:         {}", report.skipped);
    println!(
        "  NoQuestionText: {}, NoAnswers: {}, NoChosen: {}, Duplicates: {}",
        report.no_question_text, report.no_answers, report.no_chosen, report.duplicates
    );
    Ok(())
}
