//! evoforge - CLI tool to inspect evolution sessions and learned patterns
//!
//! Reads session and pattern documents written by the learning loop and
//! triages captured compiler logs. Never runs a compiler itself.

mod render;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use evoforge_core::categorize::{focused_instructions, priority_plan};
use evoforge_core::fixer::{impact, should_rollback};
use evoforge_core::intake::{parse_error_log, raw_messages};
use evoforge_core::{
    categorize_all, Config, EvolutionSession, IncrementalFixer, PatternLibrary, SourceSnapshot,
};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "evoforge")]
#[command(about = "Inspect evolution sessions and learned repair patterns")]
#[command(version)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Show the evolution summary of a session
    Summary {
        /// Session ID
        session_id: String,

        /// Output format: text (default) or json
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Show targeted feedback and the error learning context of a session
    Feedback {
        /// Session ID
        session_id: String,
    },

    /// Show what the success pattern library has learned
    Patterns {
        /// Output format: text (default) or json
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Categorize a captured compiler log and print focused fix instructions
    Triage {
        /// Path to the compiler log
        log_file: PathBuf,

        /// Maximum number of errors to include in the instructions
        #[arg(short, long, default_value_t = 5)]
        max_fixes: usize,

        /// Source file to propose minimal fixes for
        #[arg(short, long)]
        source: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let args = Args::parse();

    Config::ensure_xdg_env();

    // Load configuration
    let config = Config::load().context("failed to load configuration")?;

    // Initialize logging
    let _log_guard =
        evoforge_core::logging::init(&config.logging).context("failed to initialize logging")?;

    match args.command {
        Command::Summary { session_id, format } => {
            let session = EvolutionSession::open_configured(&config, &session_id);
            let summary = session.summary();
            match format.as_str() {
                "json" => println!("{}", serde_json::to_string_pretty(&summary)?),
                "text" => print!("{}", render::summary(&summary)),
                other => anyhow::bail!("unknown format '{}', expected text or json", other),
            }
        }
        Command::Feedback { session_id } => {
            let session = EvolutionSession::open_configured(&config, &session_id);
            print!("{}", session.targeted_feedback());
            let context = session.error_learning_context();
            if !context.is_empty() {
                println!();
                println!("{}", context);
            }
        }
        Command::Patterns { format } => {
            let library = PatternLibrary::open_configured(&config);
            let report = library.report();
            match format.as_str() {
                "json" => println!("{}", serde_json::to_string_pretty(&report)?),
                "text" => print!("{}", render::learning_report(&report)),
                other => anyhow::bail!("unknown format '{}', expected text or json", other),
            }
        }
        Command::Triage {
            log_file,
            max_fixes,
            source,
        } => {
            let log = std::fs::read_to_string(&log_file)
                .with_context(|| format!("failed to read log file {}", log_file.display()))?;
            let errors = parse_error_log(&log);
            let categorized = categorize_all(&raw_messages(&errors));
            tracing::info!(errors = categorized.len(), "Triaged compiler log");

            println!("{}", focused_instructions(&categorized, max_fixes));
            println!();
            print!("{}", render::priority_plan(&priority_plan(&categorized)));

            if let Some(source) = source {
                let text = std::fs::read_to_string(&source)
                    .with_context(|| format!("failed to read source file {}", source.display()))?;
                let before = SourceSnapshot::from_text(&text);
                let fixer = IncrementalFixer::from_config(&config.fixer);
                let outcome = fixer.apply_minimal_fixes(&before, &categorized);
                let impact = impact(&before, &outcome.snapshot);
                // no rebuild happens here, so no error improvement is known
                let rollback = should_rollback(&impact, 0);
                println!();
                print!("{}", render::fix_outcome(&outcome, &impact, rollback));
            }
        }
    }

    Ok(())
}
