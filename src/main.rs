//! # NG12 CLI (`ng12`)
//!
//! ## Usage
//!
//! ```bash
//! ng12 --config ./config/ng12.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `ng12 init` | Create the store file and schema |
//! | `ng12 ingest` | Chunk, embed and index the guideline PDF |
//! | `ng12 search "<query>"` | Retrieve the nearest guideline excerpts |
//! | `ng12 collections` | List collections with metric, dims and size |
//! | `ng12 patient <id>` | Print a patient record as JSON |
//! | `ng12 serve` | Start the JSON HTTP server |

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use ng12_rag::{config, ingest, logging, migrate, patients, search, server, stats};

/// NG12 guideline retrieval: ingest the NICE NG12 PDF into a local vector
/// store and search it.
#[derive(Parser)]
#[command(
    name = "ng12",
    about = "Ingest and search NICE NG12 guideline excerpts",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/ng12.toml")]
    config: PathBuf,

    /// Debug-level logging on stderr (overridden by RUST_LOG).
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the store file and schema. Idempotent.
    Init,

    /// Extract, chunk, embed and index the guideline PDF.
    Ingest {
        /// PDF to ingest instead of `[ingest].pdf_path`.
        #[arg(long, conflicts_with = "text")]
        pdf: Option<PathBuf>,

        /// Pre-extracted text to ingest, pages separated by form feeds.
        #[arg(long)]
        text: Option<PathBuf>,

        /// Drop the collection before ingesting.
        #[arg(long)]
        rebuild: bool,

        /// Show page and chunk counts without embedding or writing.
        #[arg(long)]
        dry_run: bool,
    },

    /// Retrieve the guideline excerpts nearest to a query.
    Search {
        query: String,

        /// Number of excerpts (defaults to `[retrieval].top_n`).
        #[arg(long)]
        top_n: Option<usize>,

        /// Print the structured `{"results": [...]}` form.
        #[arg(long)]
        json: bool,
    },

    /// List collections in the store.
    Collections,

    /// Print a patient record from `[patients].path`.
    Patient { id: String },

    /// Start the JSON HTTP server on `[server].bind`.
    Serve,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    logging::init(cli.verbose);

    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Init => {
            migrate::run_migrations(&cfg).await?;
            println!("Store initialized at {}", cfg.db.path.display());
        }
        Commands::Ingest {
            pdf,
            text,
            rebuild,
            dry_run,
        } => {
            let input = match (pdf, text) {
                (Some(p), _) => Some(ingest::PageSource::Pdf(p)),
                (None, Some(t)) => Some(ingest::PageSource::Text(t)),
                (None, None) => None,
            };
            ingest::run_ingest(&cfg, input, rebuild, dry_run).await?;
        }
        Commands::Search { query, top_n, json } => {
            if top_n == Some(0) {
                anyhow::bail!("--top-n must be >= 1");
            }
            search::run_search(&cfg, &query, top_n, json).await?;
        }
        Commands::Collections => {
            stats::run_collections(&cfg).await?;
        }
        Commands::Patient { id } => {
            let path = cfg
                .patients
                .path
                .as_ref()
                .ok_or_else(|| anyhow::anyhow!("[patients] path is not configured"))?;
            let registry = patients::PatientRegistry::load(path)?;
            println!("{}", serde_json::to_string_pretty(&registry.lookup(&id))?);
        }
        Commands::Serve => {
            server::run_server(&cfg).await?;
        }
    }

    Ok(())
}
