//! # Captain Cortex CLI (`cortex`)
//!
//! ## Usage
//!
//! ```bash
//! cortex --config ./config/cortex.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `cortex init` | Create the SQLite database and run schema migrations |
//! | `cortex import <file.json>` | Load a JSON dataset into the database |
//! | `cortex explain "<question>" --org <id>` | Show intent, entities, grounding and the LLM input, without calling the LLM |
//! | `cortex ask "<question>" --org <id>` | Answer a question |
//! | `cortex serve` | Start the HTTP server |
//!
//! ## Examples
//!
//! ```bash
//! cortex init
//! cortex import ./data/sample-dataset.json
//! cortex explain "What is the electricity bill for Villa Aruna in January 2025?" --org org-demo
//! OPENAI_API_KEY=sk-... cortex ask "Show me pending maintenance tasks" --org org-demo
//! cortex serve
//! ```

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use captain_cortex::config::{self, Config};
use captain_cortex::cortex::Cortex;
use captain_cortex::sqlite_store::SqliteStore;
use captain_cortex::{db, import, migrate, server};

/// Captain Cortex: grounded answers to questions about short-term-rental
/// operations data.
#[derive(Parser)]
#[command(name = "cortex", version)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/cortex.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema. Safe to run repeatedly.
    Init,

    /// Import a JSON dataset (properties, utility bills, tasks, bookings,
    /// finances). Existing records with the same id are updated.
    Import {
        /// Path to the dataset file.
        file: PathBuf,

        /// Validate and count records without writing.
        #[arg(long)]
        dry_run: bool,
    },

    /// Run every stage except the LLM call and print what was found.
    Explain {
        question: String,

        /// Organization (tenant) id.
        #[arg(long)]
        org: String,

        /// Print the result as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Answer a question.
    Ask {
        question: String,

        /// Organization (tenant) id.
        #[arg(long)]
        org: String,

        /// Print the full AnswerResult as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Start the HTTP server on `[server].bind`.
    Serve,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Init => {
            migrate::run_migrations(&cfg).await?;
            println!("Database initialized successfully.");
        }
        Commands::Import { file, dry_run } => {
            import::run_import(&cfg, &file, dry_run).await?;
        }
        Commands::Explain {
            question,
            org,
            json,
        } => {
            let cortex = open_cortex(&cfg).await?;
            let explanation = cortex.explain(&question, &org).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&explanation)?);
            } else {
                println!(
                    "intent:     {} ({:.2})",
                    explanation.intent.query_type, explanation.intent.confidence
                );
                println!(
                    "entities:   {}",
                    serde_json::to_string(&explanation.entities)?
                );
                println!("sources:");
                for source in &explanation.grounded.metadata.sources {
                    println!(
                        "  {:<20} {:<5} {:>4}ms  {}",
                        source.route,
                        if source.success { "ok" } else { "FAIL" },
                        source.latency,
                        serde_json::to_string(&source.params)?
                    );
                }
                println!();
                println!("{}", explanation.normalized);
            }
        }
        Commands::Ask {
            question,
            org,
            json,
        } => {
            let cortex = open_cortex(&cfg).await?;
            let result = cortex.answer_question(&question, &org).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                println!("{}", result.answer);
                println!();
                println!(
                    "intent: {} ({:.2})  latency: {}ms",
                    result.intent, result.confidence, result.latency
                );
                for source in &result.sources {
                    println!(
                        "  source: {} {}",
                        source.route,
                        serde_json::to_string(&source.params)?
                    );
                }
            }
        }
        Commands::Serve => {
            let cortex = open_cortex(&cfg).await?;
            server::run_server(&cfg, Arc::new(cortex)).await?;
        }
    }

    Ok(())
}

async fn open_cortex(cfg: &Config) -> Result<Cortex> {
    let pool = db::connect(cfg).await?;
    migrate::apply(&pool).await?;
    let store = Arc::new(SqliteStore::new(pool));
    Ok(Cortex::from_config(store, cfg))
}
