use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use tracing_subscriber::EnvFilter;

use docindex_core::config::Config;
use docindex_core::extract::ChunkExtractor;
use docindex_embed::{get_default_embedder, EmbeddingGateway};
use docindex_query::QueryEngine;
use docindex_vector::VectorStore;

#[derive(Parser)]
#[command(name = "docindex", about = "Index refined release notes and retrieve passages")]
struct Cli {
    /// Index directory (overrides `index.dir`)
    #[arg(long, global = true, env = "DOCINDEX_DIR")]
    index_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Rebuild the index from a refined JSON document
    Build {
        document: PathBuf,
        /// Input is a raw refiner response with ===DOC_JSON=== fences
        #[arg(long)]
        refiner_output: bool,
    },
    /// Print the passages closest to a question
    Query {
        text: String,
        #[arg(short, long)]
        k: Option<usize>,
        /// Show distances and positions
        #[arg(long)]
        distances: bool,
    },
    /// Ask questions until `quit`
    Repl {
        #[arg(short, long)]
        k: Option<usize>,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let settings = Config::load().context("loading configuration")?.settings()?;
    let index_dir = match cli.index_dir {
        Some(dir) => dir,
        None => settings.index_dir(&std::env::current_dir()?),
    };
    let embedder = get_default_embedder(&settings.embedder).context("initialising embedder")?;
    let store = Arc::new(VectorStore::open(&index_dir).with_context(|| format!("opening {}", index_dir.display()))?);
    let engine = QueryEngine::new(store, EmbeddingGateway::new(embedder));
    let default_k = settings.index.top_k;

    match cli.command {
        Command::Build { document, refiner_output } => {
            let raw = std::fs::read_to_string(&document).with_context(|| format!("reading {}", document.display()))?;
            let extractor = ChunkExtractor::new();
            let chunks = if refiner_output { extractor.extract_refiner_output(&raw)? } else { extractor.extract_str(&raw)? };

            let pb = ProgressBar::new_spinner();
            pb.set_style(ProgressStyle::default_spinner().template("{spinner:.green} [{elapsed_precise}] {msg}")?);
            pb.enable_steady_tick(Duration::from_millis(120));
            pb.set_message(format!("embedding {} chunks", chunks.len()));
            let result = engine.build(&chunks);
            pb.finish_and_clear();
            let count = result?;
            println!("Indexed {} chunks into {}", count, index_dir.display());
        }
        Command::Query { text, k, distances } => {
            engine.load()?;
            let hits = engine.search(&text, k.unwrap_or(default_k))?;
            for (rank, hit) in hits.iter().enumerate() {
                if distances {
                    println!("{}. [#{} d={:.4}] {}", rank + 1, hit.position, hit.distance, hit.text);
                } else {
                    println!("{}. {}", rank + 1, hit.text);
                }
            }
        }
        Command::Repl { k } => {
            engine.load()?;
            let k = k.unwrap_or(default_k);
            let stdin = io::stdin();
            let mut lines = stdin.lock().lines();
            loop {
                print!("Ask a question (or 'quit'): ");
                io::stdout().flush()?;
                let Some(line) = lines.next() else { break };
                let question = line?;
                let question = question.trim();
                if question.eq_ignore_ascii_case("quit") {
                    break;
                }
                if question.is_empty() {
                    continue;
                }
                match engine.context_block(question, k) {
                    Ok(context) => println!("\n{}\n", context),
                    Err(e) => eprintln!("error: {}", e),
                }
            }
        }
    }
    Ok(())
}
