//! Claim decision server binary
//!
//! Run with: cargo run -p claim-rag --bin claim-rag-server -- --corpus policies.csv

use clap::Parser;
use std::path::PathBuf;

use claim_rag::{config::ClaimConfig, server::ClaimServer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "claim-rag-server", version, about = "Insurance claim decision API")]
struct Args {
    /// TOML configuration file
    #[arg(short, long, env = "CLAIM_RAG_CONFIG")]
    config: Option<PathBuf>,

    /// Corpus CSV (chunk_id, source_doc, page, text) to embed at startup
    #[arg(long)]
    corpus: Option<PathBuf>,

    /// Index snapshot written by claim-rag-indexer
    #[arg(long)]
    snapshot: Option<PathBuf>,

    /// Bind host
    #[arg(long)]
    host: Option<String>,

    /// Bind port
    #[arg(short, long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "claim_rag=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    let mut config = ClaimConfig::load(args.config.as_deref())?;
    if let Some(corpus) = args.corpus {
        config.corpus.csv_path = Some(corpus);
        config.corpus.snapshot_path = None;
        config.corpus.snapshot_url = None;
    }
    if let Some(snapshot) = args.snapshot {
        config.corpus.snapshot_path = Some(snapshot);
        config.corpus.snapshot_url = None;
    }
    if let Some(host) = args.host {
        config.server.host = host;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }
    config.validate()?;

    tracing::info!("Configuration loaded");
    tracing::info!("  - Embedding backend: {:?}", config.embeddings.backend);
    tracing::info!("  - Embedding model: {}", config.embeddings.model);
    tracing::info!("  - Generation backend: {:?}", config.generation.backend);
    tracing::info!("  - Generation model: {}", config.generation.model_name());
    tracing::info!("  - Top k: {}", config.corpus.top_k);

    let server = ClaimServer::new(config).await?;

    println!("\nServer starting...");
    println!("  API: http://{}", server.address());
    println!("  Health: http://{}/health", server.address());
    println!("\nEndpoints:");
    println!("  POST /hackrx/run  - Decide on a claim (Bearer token required)");
    println!("\nPress Ctrl+C to stop\n");

    server.start().await?;

    Ok(())
}
