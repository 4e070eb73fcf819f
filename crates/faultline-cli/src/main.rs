//! # Faultline CLI (`faultline`)
//!
//! The `faultline` binary drives the incident knowledge base: schema setup,
//! CSV ingestion, similarity search, and synthesized answers.
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `faultline init` | Create the pgvector schema |
//! | `faultline ingest <csv>` | Load, preprocess, embed, and store a CSV dataset |
//! | `faultline ask "<query>"` | Answer a query from similar resolved incidents |
//! | `faultline search "<query>"` | Ranked similarity search without synthesis |
//! | `faultline tier <level> <value>` | List incidents by resolution tier |
//! | `faultline stats` | Dataset counts and category breakdown |
//! | `faultline health` | Probe the inference backend |
//!
//! ## Examples
//!
//! ```bash
//! # One-time setup against a local Postgres with pgvector
//! faultline init
//!
//! # Full refresh from a ServiceNow-style CSV export
//! faultline ingest ./incidents.csv --replace
//!
//! # Ask with tier filters (routes through hybrid search)
//! faultline ask "checkout keeps timing out" --tier2 Backend
//!
//! # Raw ranked matches for debugging retrieval
//! faultline search "checkout keeps timing out" --threshold 0.5
//! ```
//!
//! Connection and model settings come from the environment (`DATABASE_URL`,
//! `OLLAMA_URL`, `FAULTLINE_*`); a `.env` file is honored.

mod app;
mod ask;
mod health;
mod ingest;
mod init;
mod search;
mod stats;
mod tier;

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use faultline_core::{EmbeddingContent, TierFilters};
use faultline_rag::AskOptions;

/// Faultline CLI, an incident knowledge base with semantic search and
/// synthesized answers.
#[derive(Parser)]
#[command(
    name = "faultline",
    about = "Faultline - incident knowledge base with semantic search and synthesized answers",
    version
)]
struct Cli {
    /// Postgres connection string. The database must have the pgvector
    /// extension available.
    #[arg(
        long,
        global = true,
        env = "DATABASE_URL",
        default_value = "postgres://localhost/faultline"
    )]
    database_url: String,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema.
    ///
    /// Creates the vector extension, the incident and embedding tables, and
    /// their indexes, sized to the active embedding model's dimension.
    /// Idempotent; safe to run repeatedly.
    Init,

    /// Ingest a CSV export of incident records.
    ///
    /// Loads the file, preprocesses it (placeholder fills, category mode
    /// fill, deduplication), embeds every record, and stores the result in
    /// fixed-size batches. Each batch commits independently, so a mid-run
    /// failure keeps earlier batches.
    Ingest {
        /// Path to the CSV file.
        csv: PathBuf,

        /// Records per commit unit. Defaults to `FAULTLINE_BATCH_SIZE` or 100.
        #[arg(long)]
        batch_size: Option<usize>,

        /// Clear all existing incidents first (full refresh). Not safe
        /// against concurrent readers.
        #[arg(long)]
        replace: bool,

        /// Stop the run at the first failed batch instead of skipping it.
        #[arg(long)]
        halt_on_batch_failure: bool,
    },

    /// Answer a query from similar resolved incidents.
    ///
    /// Embeds the query, ranks similar incidents, and synthesizes a
    /// structured answer with category, estimated resolution time, and
    /// trending percentage. Prints the ranked matches afterwards for
    /// diagnostics.
    Ask {
        #[command(flatten)]
        query: QueryArgs,
    },

    /// Ranked similarity search without answer synthesis.
    Search {
        #[command(flatten)]
        query: QueryArgs,
    },

    /// List incidents matching one resolution tier value.
    Tier {
        /// Tier level: 1, 2, or 3.
        level: i16,

        /// Tier value to match exactly.
        value: String,

        /// Maximum number of incidents to list.
        #[arg(long, default_value_t = 10)]
        limit: i64,
    },

    /// Print dataset counts and the category breakdown.
    Stats,

    /// Probe the inference backend and report its models.
    Health,
}

/// Shared query arguments for `ask` and `search`.
#[derive(Args)]
struct QueryArgs {
    /// The query text.
    query: String,

    /// Embedding variant to match: `description`, `resolution`, `combined`,
    /// or `all`.
    #[arg(long, default_value = "description")]
    content_type: String,

    /// Restrict matches to one product.
    #[arg(long)]
    product: Option<String>,

    /// Filter by resolution tier 1. Any tier filter routes the query
    /// through hybrid search.
    #[arg(long)]
    tier1: Option<String>,

    /// Filter by resolution tier 2.
    #[arg(long)]
    tier2: Option<String>,

    /// Filter by resolution tier 3.
    #[arg(long)]
    tier3: Option<String>,

    /// Minimum cosine similarity. Defaults to 0.7, or 0.6 with tier filters.
    #[arg(long)]
    threshold: Option<f32>,

    /// Maximum number of matches.
    #[arg(long, default_value_t = 10)]
    limit: i64,
}

impl QueryArgs {
    fn to_ask_options(&self) -> anyhow::Result<AskOptions> {
        let content = match self.content_type.as_str() {
            "all" => None,
            other => match EmbeddingContent::from_str_loose(other) {
                Some(content) => Some(content),
                None => anyhow::bail!(
                    "Unknown content type '{other}'. Use description, resolution, combined, or all."
                ),
            },
        };

        Ok(AskOptions {
            content,
            product: self.product.clone(),
            tiers: TierFilters {
                tier_1: self.tier1.clone(),
                tier_2: self.tier2.clone(),
                tier_3: self.tier3.clone(),
            },
            min_similarity: self.threshold,
            limit: self.limit,
        })
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // RUST_LOG overrides the default filter.
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        "faultline_cli=info,faultline_db=info,faultline_inference=info,faultline_ingest=info,faultline_rag=info".into()
    });
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let cli = Cli::parse();

    // Health only needs the backend, not a database.
    if matches!(cli.command, Commands::Health) {
        let backend = app::make_backend()?;
        return health::run_health(backend.as_ref()).await;
    }

    let app = app::AppContext::connect(&cli.database_url).await?;

    match cli.command {
        Commands::Init => {
            init::run_init(&app).await?;
        }
        Commands::Ingest {
            csv,
            batch_size,
            replace,
            halt_on_batch_failure,
        } => {
            ingest::run_ingest(&app, &csv, batch_size, replace, halt_on_batch_failure).await?;
        }
        Commands::Ask { query } => {
            let options = query.to_ask_options()?;
            ask::run_ask(&app, &query.query, &options).await?;
        }
        Commands::Search { query } => {
            let options = query.to_ask_options()?;
            search::run_search(&app, &query.query, &options).await?;
        }
        Commands::Tier {
            level,
            value,
            limit,
        } => {
            tier::run_tier(&app, level, &value, limit).await?;
        }
        Commands::Stats => {
            stats::run_stats(&app).await?;
        }
        Commands::Health => unreachable!(),
    }

    Ok(())
}
