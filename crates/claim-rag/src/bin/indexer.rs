//! Offline corpus indexer
//!
//! Embeds a corpus CSV and writes a snapshot the server can load with
//! `--snapshot`, so startup skips re-embedding.

use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use std::time::Instant;

use claim_rag::{
    config::ClaimConfig,
    embeddings::{build_provider, Embedder},
    ingestion::{load_csv, snapshot},
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "claim-rag-indexer", version, about = "Build a claim corpus index snapshot")]
struct Args {
    /// TOML configuration file (embedding settings)
    #[arg(short, long, env = "CLAIM_RAG_CONFIG")]
    config: Option<PathBuf>,

    /// Corpus CSV with chunk_id, source_doc, page, text columns
    #[arg(long)]
    corpus: PathBuf,

    /// Snapshot output path
    #[arg(short, long)]
    output: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "claim_rag=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();
    let config = ClaimConfig::load(args.config.as_deref())?;
    let start = Instant::now();

    let chunks = load_csv(&args.corpus)?;
    let embedder = Embedder::new(build_provider(&config).await?);
    embedder
        .index_corpus(chunks)
        .await
        .with_context(|| format!("indexing {}", args.corpus.display()))?;

    let corpus = embedder
        .snapshot()
        .context("index missing after build")?;
    snapshot::save(&corpus, &args.output)?;

    println!(
        "Indexed {} chunks with {} in {:.1}s -> {}",
        corpus.len(),
        corpus.model(),
        start.elapsed().as_secs_f32(),
        args.output.display()
    );

    Ok(())
}
