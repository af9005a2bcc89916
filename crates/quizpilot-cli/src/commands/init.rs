//! The `quizpilot init` command.

use anyhow::Result;

pub fn execute() -> Result<()> {
    if std::path::Path::new("quizpilot.toml").exists() {
        println!("quizpilot.toml already exists, skipping.");
    } else {
        std::fs::write("quizpilot.toml", SAMPLE_CONFIG)?;
        println!("Created quizpilot.toml");
    }

    println!("\nNext steps:");
    println!("  1. Export GEMINI_API_KEY or edit api_keys in quizpilot.toml");
    println!("  2. Run: quizpilot answer --question \"2 + 2 = ?\" --option 3 --option 4");
    println!("  3. After grading, run: quizpilot harvest --input graded.json");

    Ok(())
}

const SAMPLE_CONFIG: &str = r#"# quizpilot configuration

# Keys are tried in order; failures can switch to the next one.
api_keys = ["${GEMINI_API_KEY}"]

model = "gemini-2.5-flash-lite"
base_url = "https://generativelanguage.googleapis.com"
# subject = "political economy"

# Switch keys on quota/auth failures without asking.
auto_rotate = false
rate_limit_delay_ms = 800
timeout_secs = 60

data_dir = "./quizpilot-data"

# Run loop defaults
num_questions = 1
delay_secs = 1.0
"#;
