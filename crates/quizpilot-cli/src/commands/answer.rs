//! The `quizpilot answer` command.

use anyhow::Result;

use super::{build_engine, Context};

pub async fn execute(ctx: &Context, question: String, options: Vec<String>) -> Result<()> {
    let config = ctx.config()?;
    let engine = build_engine(&config)?;

    let resolution = engine.resolve(&question, &options).await?;

    println!(
        "Answer: [{}] {}",
        resolution.chosen_index, resolution.chosen_text
    );
    println!("Source: {}", resolution.source);
    println!(
        "Inference used: {}",
        if resolution.used_inference { "yes" } else { "no" }
    );
    Ok(())
}
