//! # Scribe: book-grounded retrieval from the command line
//!
//! Usage:
//!   scribe init                          # Write default config to ~/.scribe/config.toml
//!   scribe ingest book.pdf               # Replace the corpus with book.pdf (or .txt)
//!   scribe query "what makes a mentor?"  # Top passages for a question
//!   scribe query "..." --context         # Prompt-ready context block
//!   scribe stats                         # Record count and dimension
//!   scribe clear                         # Drop every stored passage

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use scribe_core::ScribeConfig;
use scribe_core::traits::VectorStore;
use scribe_knowledge::{KnowledgeEngine, SqliteVectorStore};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "scribe", version, about = "📚 Scribe, retrieval engine for grounded answers")]
struct Cli {
    /// Config file (default: ~/.scribe/config.toml)
    #[arg(short, long, global = true)]
    config: Option<String>,

    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Write a default config file
    Init {
        /// Overwrite an existing config
        #[arg(long)]
        force: bool,
    },
    /// Chunk, embed and store a text or PDF file, replacing the current corpus
    Ingest {
        file: PathBuf,
        #[arg(long)]
        chunk_size: Option<usize>,
        #[arg(long)]
        overlap: Option<usize>,
    },
    /// Retrieve the passages closest to a question
    Query {
        text: String,
        #[arg(short = 'k', long)]
        top_k: Option<usize>,
        /// Print the joined context block instead of scored passages
        #[arg(long)]
        context: bool,
        /// Print results as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show store statistics
    Stats,
    /// Remove every stored passage
    Clear,
}

fn config_path(cli: &Cli) -> PathBuf {
    match &cli.config {
        Some(p) => PathBuf::from(shellexpand::tilde(p).to_string()),
        None => ScribeConfig::default_path(),
    }
}

fn load_config(path: &Path) -> Result<ScribeConfig> {
    if path.exists() {
        ScribeConfig::load_from(path).with_context(|| format!("loading {}", path.display()))
    } else {
        tracing::debug!("No config at {}, using defaults", path.display());
        Ok(ScribeConfig::default())
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        "scribe=debug,scribe_knowledge=debug,scribe_providers=debug"
    } else {
        "scribe=info,scribe_knowledge=info,scribe_providers=warn"
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .with_target(false)
        .init();

    let path = config_path(&cli);

    if let Command::Init { force } = &cli.command {
        if path.exists() && !force {
            println!("⚠️  Config already exists at {} (use --force to overwrite)", path.display());
            return Ok(());
        }
        ScribeConfig::default().save_to(&path)?;
        println!("✅ Wrote default config to {}", path.display());
        println!("   Providers: {}", scribe_providers::available_providers().join(", "));
        return Ok(());
    }

    let config = load_config(&path)?;

    // Store-only commands work without an embedding credential
    match &cli.command {
        Command::Stats => {
            let store = SqliteVectorStore::new(config.store.resolved_path());
            println!("📊 Scribe store");
            println!("   Backend:   {}", store.name());
            println!("   Store:     {}", config.store.resolved_path().display());
            println!("   Embedder:  {} ({})", config.embedding.provider, config.embedding.model);
            println!("   Records:   {}", store.count().await?);
            match store.dimension().await? {
                Some(d) => println!("   Dimension: {d}"),
                None => println!("   Dimension: -"),
            }
            return Ok(());
        }
        Command::Clear => {
            SqliteVectorStore::new(config.store.resolved_path()).clear().await?;
            println!("🗑️  Store cleared");
            return Ok(());
        }
        _ => {}
    }

    let engine = KnowledgeEngine::from_config(&config)?;

    match cli.command {
        Command::Init { .. } | Command::Stats | Command::Clear => {}
        Command::Ingest { file, chunk_size, overlap } => {
            let (default_size, default_overlap) = engine.chunking();
            let report = engine
                .ingest_file_with(
                    &file,
                    chunk_size.unwrap_or(default_size),
                    overlap.unwrap_or(default_overlap),
                )
                .await?;
            println!(
                "✅ {} → {} chunks ({} batches, {} chars)",
                file.display(),
                report.chunk_count,
                report.batch_count,
                report.characters
            );
        }
        Command::Query { text, top_k, context, json } => {
            let top_k = top_k.unwrap_or(engine.default_top_k());
            if context {
                println!("{}", engine.context_for(&text, top_k).await?);
                return Ok(());
            }
            let results = engine.query(&text, top_k).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&results)?);
            } else if results.is_empty() {
                println!("📭 No passages found. Run `scribe ingest <file>` first.");
            } else {
                for (rank, r) in results.iter().enumerate() {
                    println!("{}. [{}] score {:.4}", rank + 1, r.id, r.score);
                    println!("   {}\n", r.text);
                }
            }
        }
    }

    Ok(())
}
