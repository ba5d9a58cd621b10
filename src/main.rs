//! # Filings Advisor CLI (`advisor`)
//!
//! ```bash
//! advisor --config ./config/advisor.toml <command>
//! ```
//!
//! | Command | Description |
//! |---------|-------------|
//! | `advisor serve` | Start the HTTP server |
//! | `advisor ask "<question>"` | Answer one question and print it |
//! | `advisor rank "<question>"` | Show prefilter candidates, no model calls |
//! | `advisor index` | Load the corpus and list its documents |

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use filings_advisor::config;
use filings_advisor::pipeline::{AdviceError, Advisor, Outcome};
use filings_advisor::server;

/// Filings Advisor: answer questions about financial filings, grounded in
/// the filings themselves.
#[derive(Parser)]
#[command(name = "advisor", version)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/advisor.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server.
    ///
    /// Binds to `[server].bind` and serves `POST /api/advice` and `GET /health`.
    Serve,

    /// Answer a single question and print the result.
    Ask {
        /// The question.
        question: String,
    },

    /// Show how the prefilter ranks documents for a question.
    ///
    /// Makes no model calls and needs no API key.
    Rank {
        /// The question.
        question: String,

        /// Number of candidates to show (defaults to `[retrieval].candidate_k`).
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Load the corpus and print each document's path and fragment count.
    Index,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,filings_advisor=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Serve => {
            server::run_server(&cfg).await?;
        }
        Commands::Ask { question } => {
            let advisor = Advisor::from_config(&cfg)?;
            match advisor.advise(&question).await {
                Ok(Outcome::Answered { advice, .. }) => println!("{}", advice),
                Ok(Outcome::EmptyQuestion) => println!("{}", server::EMPTY_QUESTION_ADVICE),
                Ok(Outcome::NoCandidates) => println!("{}", server::NO_CONTENT_ADVICE),
                Err(AdviceError::Configuration(var)) => {
                    anyhow::bail!(server::configuration_advice(&var))
                }
                Err(AdviceError::Unexpected(e)) => return Err(e),
            }
        }
        Commands::Rank { question, limit } => {
            let advisor = Advisor::from_config(&cfg)?;
            let limit = limit.unwrap_or(cfg.retrieval.candidate_k);
            let candidates = advisor.candidates(&question, limit).await?;
            if candidates.is_empty() {
                println!("No candidates.");
            }
            for c in candidates {
                println!("{:>3}. [{}] {}", c.rank, c.score, c.document.path);
            }
        }
        Commands::Index => {
            let advisor = Advisor::from_config(&cfg)?;
            let docs = advisor.index().load().await?;
            println!("{} documents from {}", docs.len(), cfg.corpus.path.display());
            for d in docs {
                println!("  {} ({} fragments)", d.path, d.fragments.len());
            }
        }
    }

    Ok(())
}
