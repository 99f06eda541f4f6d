//! ALRIS ingestion binary: load a directory of documents into Weaviate
//!
//! Run with: cargo run -p alris --bin alris-ingest -- --data-dir data

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::bail;
use clap::Parser;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use alris::config::{load_dotenv, AlrisConfig};
use alris::ingestion::{CollectionTarget, IngestPipeline, IngestReport, Ingestor};
use alris::providers::{
    EmbeddingProvider, HuggingFaceClient, VectorStoreProvider, Vectorizer, WeaviateClient,
};

/// Parse, chunk and store documents for retrieval.
#[derive(Parser, Debug)]
#[command(name = "alris-ingest", version, about)]
struct Cli {
    /// Path to a TOML config file (defaults to alris.toml when present).
    #[arg(long, env = "ALRIS_CONFIG")]
    config: Option<PathBuf>,

    /// Directory scanned recursively for .pdf, .md and .txt files.
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Target collection for every file.
    #[arg(long, conflicts_with = "per_file_collections")]
    collection: Option<String>,

    /// Store each file in its own collection named after the file.
    #[arg(long)]
    per_file_collections: bool,

    /// Chunk size in characters.
    #[arg(long)]
    chunk_size: Option<usize>,

    /// Overlap between consecutive chunks in characters.
    #[arg(long)]
    overlap: Option<usize>,

    /// Parse and chunk only; nothing is written.
    #[arg(long)]
    dry_run: bool,
}

impl Cli {
    fn apply(&self, config: &mut AlrisConfig) {
        if let Some(dir) = &self.data_dir {
            config.ingest.data_dir = dir.clone();
        }
        if let Some(collection) = &self.collection {
            config.weaviate.default_collection = collection.clone();
        }
        if let Some(size) = self.chunk_size {
            config.chunking.chunk_size = size;
        }
        if let Some(overlap) = self.overlap {
            config.chunking.chunk_overlap = overlap;
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    load_dotenv();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "alris=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let mut config = AlrisConfig::load(cli.config.as_deref())?;
    cli.apply(&mut config);
    config.validate()?;

    let target = if cli.per_file_collections {
        CollectionTarget::PerFile
    } else {
        CollectionTarget::Single(config.weaviate.default_collection.clone())
    };
    let pipeline = IngestPipeline::from_config(&config)?.with_target(target);

    let files = pipeline.discover(&config.ingest.data_dir)?;
    if files.is_empty() {
        println!(
            "{} No supported files found in {}",
            style("!").yellow().bold(),
            config.ingest.data_dir.display()
        );
        return Ok(());
    }

    println!(
        "{} {} files, chunk size {} / overlap {}",
        style("Ingesting").cyan().bold(),
        files.len(),
        pipeline.chunker().chunk_size(),
        pipeline.chunker().overlap()
    );

    let pb = ProgressBar::new(files.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")?
            .progress_chars("#>-"),
    );
    let on_file = |path: &Path| {
        pb.set_message(file_label(path));
        pb.inc(1);
    };

    let report = if cli.dry_run {
        pipeline.dry_run(&files, on_file)
    } else {
        let store = Arc::new(WeaviateClient::new(
            &config.weaviate,
            config.huggingface.api_key.as_deref(),
        )?);
        match store.health_check().await {
            Ok(true) => {}
            Ok(false) => bail!("Weaviate at {} is not ready", config.weaviate.url),
            Err(e) => bail!("Weaviate at {} is unreachable: {}", config.weaviate.url, e),
        }

        let vectorizer = Vectorizer::HuggingFace {
            model: config.weaviate.vectorizer_model.clone(),
        };
        let mut ingestor = Ingestor::new(pipeline, store, vectorizer);
        if config.weaviate.client_side_vectors {
            let embedder = Arc::new(HuggingFaceClient::new(&config.huggingface)?);
            match embedder.health_check().await {
                Ok(true) => {}
                Ok(false) => bail!("Embedding endpoint {} is not available", embedder.name()),
                Err(e) => bail!("Embedding endpoint {} is unreachable: {}", embedder.name(), e),
            }
            ingestor = ingestor.with_embedder(embedder);
        }
        ingestor.run(&files, on_file).await
    };
    pb.finish_and_clear();

    print_report(&report, cli.dry_run);

    if report.files_processed == 0 {
        bail!("No files were ingested");
    }
    Ok(())
}

fn file_label(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn print_report(report: &IngestReport, dry_run: bool) {
    let verb = if dry_run { "would write" } else { "wrote" };
    println!(
        "{} {} files, {} {} chunks",
        style("Done").green().bold(),
        report.files_processed,
        verb,
        report.chunks_written
    );

    for collection in &report.collections {
        let created = report.collections_created.contains(collection);
        println!(
            "  {} {}{}",
            style("-").dim(),
            collection,
            if created { " (created)" } else { "" }
        );
    }

    if !report.failures.is_empty() {
        println!("{} {} files skipped:", style("!").red().bold(), report.failures.len());
        for failure in &report.failures {
            println!("  {} {}: {}", style("x").red(), failure.path.display(), failure.error);
        }
    }
}
