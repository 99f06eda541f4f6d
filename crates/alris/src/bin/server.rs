//! ALRIS server binary
//!
//! Run with: cargo run -p alris --bin alris-server

use alris::{
    config::{load_dotenv, AlrisConfig},
    server::AlrisServer,
};
use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Serve the question-answering API and front end.
#[derive(Parser, Debug)]
#[command(name = "alris-server", version, about)]
struct Cli {
    /// Path to a TOML config file (defaults to alris.toml when present).
    #[arg(long, env = "ALRIS_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    load_dotenv();
    let cli = Cli::parse();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "alris=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    println!(
        r#"
╔═══════════════════════════════════════════════════════════╗
║                          ALRIS                            ║
║        Document Q&A over Weaviate + Hugging Face          ║
╚═══════════════════════════════════════════════════════════╝
"#
    );

    let config = AlrisConfig::load(cli.config.as_deref())?;

    tracing::info!("Configuration loaded");
    tracing::info!("  - Weaviate: {}", config.weaviate.url);
    tracing::info!("  - Collection: {}", config.weaviate.default_collection);
    tracing::info!("  - Answer mode: {:?}", config.retrieval.answer_mode);
    tracing::info!("  - Chat model: {}", config.huggingface.chat_model);
    tracing::info!("  - Retrieval limit: {}", config.retrieval.limit);

    let server = AlrisServer::new(config)?;

    println!("\nServer starting...");
    println!("  Front end: http://{}", server.address());
    println!("  Health:    http://{}/health", server.address());
    println!("\nEndpoints:");
    println!("  POST /ask          - Ask a question");
    println!("  POST /search       - Retrieve matching chunks");
    println!("  GET  /collections  - List collections");
    println!("\nPress Ctrl+C to stop\n");

    server.start().await?;

    Ok(())
}
