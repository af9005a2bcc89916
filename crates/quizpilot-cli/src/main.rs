//! quizpilot CLI — the user-facing command-line interface.

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "quizpilot",
    version,
    about = "Memory-first multiple-choice quiz answerer"
)]
struct Cli {
    /// Config file path
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Rotate API keys without asking
    #[arg(long, global = true)]
    autopilot: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Answer a single question
    Answer {
        /// Question text
        #[arg(long)]
        question: String,

        /// Option text (repeat for each option, in display order)
        #[arg(long = "option", required = true)]
        options: Vec<String>,
    },

    /// Answer a sequence of questions from a quiz file
    Run {
        /// JSON file: array of {"question": ..., "options": [...]}
        #[arg(long)]
        quiz: PathBuf,

        /// Number of questions to answer (default from config)
        #[arg(long)]
        count: Option<u32>,

        /// Seconds to wait between questions (default from config)
        #[arg(long)]
        delay: Option<f64>,
    },

    /// Learn from graded results
    Harvest {
        /// JSON file: array of graded observations
        #[arg(long)]
        input: PathBuf,
    },

    /// Export learned answers
    Export {
        /// Output format: json, csv
        #[arg(long, default_value = "json")]
        format: String,

        /// Record source: memory, graded
        #[arg(long, default_value = "memory")]
        source: String,

        /// Graded observations file (for --source graded)
        #[arg(long)]
        input: Option<PathBuf>,

        /// Output file (stdout if omitted)
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Show memory statistics
    Stats,

    /// Delete all stored answers
    Clear {
        /// Confirm deletion
        #[arg(long)]
        yes: bool,
    },

    /// Manage API keys
    Keys {
        #[command(subcommand)]
        action: KeysAction,
    },

    /// Create a starter config file
    Init,
}

#[derive(Subcommand)]
enum KeysAction {
    /// List keys (masked) and the active one
    List,
    /// Replace the key list; the first key becomes active
    Set {
        #[arg(required = true)]
        keys: Vec<String>,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("quizpilot=info".parse().unwrap()),
        )
        .init();

    let cli = Cli::parse();
    let ctx = commands::Context {
        config_path: cli.config,
        autopilot: cli.autopilot,
    };

    let result = match cli.command {
        Commands::Answer { question, options } => {
            commands::answer::execute(&ctx, question, options).await
        }
        Commands::Run { quiz, count, delay } => {
            commands::run::execute(&ctx, quiz, count, delay).await
        }
        Commands::Harvest { input } => commands::harvest::execute(&ctx, input),
        Commands::Export {
            format,
            source,
            input,
            output,
        } => commands::export::execute(&ctx, format, source, input, output),
        Commands::Stats => commands::stats::execute(&ctx),
        Commands::Clear { yes } => commands::stats::clear(&ctx, yes),
        Commands::Keys { action } => match action {
            KeysAction::List => commands::keys::list(&ctx),
            KeysAction::Set { keys } => commands::keys::set(&ctx, keys),
        },
        Commands::Init => commands::init::execute(),
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}
