use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use passage_core::config::Config;
use passage_core::data_processor::TextDirectory;
use passage_retrieval::{Ingestor, RetrievalEngine};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "passage", about = "Offline passage retrieval over a directory of text files", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Chunk, embed and index every .txt file under DATA_DIR
    Ingest {
        /// Defaults to storage.raw_text_dir
        data_dir: Option<PathBuf>,
        #[arg(long)]
        no_progress: bool,
        /// Only read the first N files
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Return the passages most similar to QUERY
    Query {
        query: String,
        /// Defaults to retrieval.max_results
        #[arg(long, short = 'n')]
        limit: Option<usize>,
        #[arg(long)]
        json: bool,
    },
    /// Print what the index and the embedding cache hold
    Status,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let settings = Config::load()
        .and_then(|c| c.settings())
        .context("loading configuration")?;
    tracing::debug!(?settings, "loaded configuration");

    match cli.command {
        Command::Ingest { data_dir, no_progress, limit } => {
            let root = data_dir.unwrap_or_else(|| settings.storage.raw_text_root());
            let dir = TextDirectory::new(root);
            let docs = match limit {
                Some(n) => dir.read_documents_limited(n)?,
                None => dir.read_documents()?,
            };
            println!("Ingesting {} documents from {}", docs.len(), dir.root().display());

            let ingestor = Ingestor::from_settings(&settings)?.with_progress(!no_progress);
            let report = ingestor.run(&docs)?;
            println!(
                "Indexed {} chunks from {} documents ({} dims, {}) in {:.1}s",
                report.chunks,
                report.documents,
                report.dim,
                report.model_id,
                report.elapsed.as_secs_f64()
            );
            println!("  index:  {}", ingestor.store().index_path().display());
            println!("  chunks: {}", ingestor.store().chunks_path().display());
        }
        Command::Query { query, limit, json } => {
            let engine = RetrievalEngine::open(&settings)?;
            let k = limit.unwrap_or(settings.retrieval.max_results);
            let results = engine.retrieve(&query, k)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&results)?);
            } else if results.is_empty() {
                println!("No passages above the similarity threshold.");
            } else {
                for r in &results {
                    println!("{}. [{:.3}] {} #{}", r.rank, r.similarity_score, r.chunk.source, r.chunk.chunk_id);
                    println!("   {}", r.chunk.text);
                }
            }
        }
        Command::Status => {
            let engine = RetrievalEngine::open(&settings)?;
            println!("{}", serde_json::to_string_pretty(&engine.status())?);
        }
    }
    Ok(())
}
