//! Ingestion pipeline orchestration: discover, parse, chunk, store

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use walkdir::WalkDir;

use crate::config::AlrisConfig;
use crate::error::{Error, Result};
use crate::providers::{EmbeddingProvider, VectorStoreProvider, Vectorizer};
use crate::types::DocumentChunk;

use super::chunker::TextChunker;
use super::parser::FileParser;

/// Chunks embedded per inference request when vectors are computed client-side
const EMBED_BATCH_SIZE: usize = 32;

/// Where the chunks of a file are stored
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CollectionTarget {
    /// Every file goes into one collection
    Single(String),
    /// Each file gets a collection named after its stem
    PerFile,
}

/// Derive a collection name from a file stem.
///
/// ASCII alphanumeric runs become capitalised words; a `Doc` prefix is added
/// when the result would not start with a letter.
pub fn collection_name_for(path: &Path) -> String {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();

    let mut name: String = stem
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect();

    if !name.starts_with(|c: char| c.is_ascii_alphabetic()) {
        name.insert_str(0, "Doc");
    }
    name
}

/// A parsed and chunked file, ready to be stored
#[derive(Debug, Clone)]
pub struct ProcessedFile {
    pub path: PathBuf,
    pub collection: String,
    pub chunks: Vec<DocumentChunk>,
}

/// A file that could not be ingested
#[derive(Debug, Clone)]
pub struct FileFailure {
    pub path: PathBuf,
    pub error: String,
}

/// Outcome of an ingestion run
#[derive(Debug, Clone, Default)]
pub struct IngestReport {
    /// Files parsed and stored
    pub files_processed: usize,
    /// Chunks written (or produced, on a dry run)
    pub chunks_written: usize,
    /// Collections touched
    pub collections: BTreeSet<String>,
    /// Collections created during the run
    pub collections_created: Vec<String>,
    /// Files skipped because of an error
    pub failures: Vec<FileFailure>,
}

impl IngestReport {
    fn record_success(&mut self, collection: &str, chunks: usize) {
        self.files_processed += 1;
        self.chunks_written += chunks;
        self.collections.insert(collection.to_string());
    }

    fn record_failure(&mut self, path: &Path, error: &Error) {
        tracing::warn!("Skipping {}: {}", path.display(), error);
        self.failures.push(FileFailure {
            path: path.to_path_buf(),
            error: error.to_string(),
        });
    }

    /// True when no file failed
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}

/// File discovery, parsing and chunking
#[derive(Debug, Clone)]
pub struct IngestPipeline {
    chunker: TextChunker,
    extensions: Vec<String>,
    target: CollectionTarget,
}

impl IngestPipeline {
    /// Create a new ingestion pipeline
    pub fn new(chunker: TextChunker, extensions: Vec<String>, target: CollectionTarget) -> Self {
        Self {
            chunker,
            extensions: extensions.into_iter().map(|e| e.to_ascii_lowercase()).collect(),
            target,
        }
    }

    /// Create from configuration, storing into the default collection
    pub fn from_config(config: &AlrisConfig) -> Result<Self> {
        Ok(Self::new(
            TextChunker::from_config(&config.chunking)?,
            config.ingest.extensions.clone(),
            CollectionTarget::Single(config.weaviate.default_collection.clone()),
        ))
    }

    /// Replace the collection target
    pub fn with_target(mut self, target: CollectionTarget) -> Self {
        self.target = target;
        self
    }

    pub fn chunker(&self) -> &TextChunker {
        &self.chunker
    }

    /// Recursively list supported files below `data_dir`, sorted by path
    pub fn discover(&self, data_dir: &Path) -> Result<Vec<PathBuf>> {
        if !data_dir.is_dir() {
            return Err(Error::Config(format!(
                "Data directory {} does not exist",
                data_dir.display()
            )));
        }

        let mut files = Vec::new();
        for entry in WalkDir::new(data_dir).follow_links(true) {
            let entry = entry.map_err(|e| Error::Io(std::io::Error::other(e)))?;
            if entry.file_type().is_file() && self.is_wanted(entry.path()) {
                files.push(entry.into_path());
            }
        }
        files.sort();

        tracing::info!("Found {} files in {}", files.len(), data_dir.display());
        Ok(files)
    }

    fn is_wanted(&self, path: &Path) -> bool {
        path.extension()
            .map(|ext| ext.to_string_lossy().to_ascii_lowercase())
            .is_some_and(|ext| self.extensions.iter().any(|e| *e == ext))
    }

    /// Collection a file is stored in
    pub fn collection_for(&self, path: &Path) -> String {
        match &self.target {
            CollectionTarget::Single(name) => name.clone(),
            CollectionTarget::PerFile => collection_name_for(path),
        }
    }

    /// Read, parse and chunk one file
    pub fn process_file(&self, path: &Path) -> Result<ProcessedFile> {
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| Error::file_parse(path.display().to_string(), "path has no file name"))?;

        let data = std::fs::read(path)?;
        let parsed = FileParser::parse(&file_name, &data)?;
        let chunks: Vec<DocumentChunk> = self
            .chunker
            .chunk_file(&file_name, parsed.file_type, &parsed.content)
            .into_iter()
            .map(|chunk| chunk.with_content_hash(parsed.content_hash.as_str()))
            .collect();

        tracing::debug!(
            "Parsed {} ({} chars, {} chunks, {} pages, sha256 {})",
            file_name,
            parsed.content.chars().count(),
            chunks.len(),
            parsed.total_pages.map_or_else(|| "-".to_string(), |p| p.to_string()),
            parsed.content_hash
        );

        Ok(ProcessedFile {
            path: path.to_path_buf(),
            collection: self.collection_for(path),
            chunks,
        })
    }

    /// Parse and chunk without storing anything
    pub fn dry_run<F>(&self, files: &[PathBuf], mut on_file: F) -> IngestReport
    where
        F: FnMut(&Path),
    {
        let mut report = IngestReport::default();
        for path in files {
            on_file(path);
            match self.process_file(path) {
                Ok(file) => report.record_success(&file.collection, file.chunks.len()),
                Err(e) => report.record_failure(path, &e),
            }
        }
        report
    }
}

/// Writes processed files into the vector store
pub struct Ingestor {
    pipeline: IngestPipeline,
    store: Arc<dyn VectorStoreProvider>,
    embedder: Option<Arc<dyn EmbeddingProvider>>,
    vectorizer: Vectorizer,
}

impl Ingestor {
    /// Create an ingestor whose collections vectorize on the store side
    pub fn new(
        pipeline: IngestPipeline,
        store: Arc<dyn VectorStoreProvider>,
        vectorizer: Vectorizer,
    ) -> Self {
        Self {
            pipeline,
            store,
            embedder: None,
            vectorizer,
        }
    }

    /// Compute chunk vectors with `embedder` before inserting
    pub fn with_embedder(mut self, embedder: Arc<dyn EmbeddingProvider>) -> Self {
        self.embedder = Some(embedder);
        self.vectorizer = Vectorizer::None;
        self
    }

    /// Ingest every file, skipping (and reporting) the ones that fail.
    /// `on_file` is called before each file is processed.
    pub async fn run<F>(&self, files: &[PathBuf], mut on_file: F) -> IngestReport
    where
        F: FnMut(&Path),
    {
        let mut report = IngestReport::default();

        for path in files {
            on_file(path);

            let file = match self.pipeline.process_file(path) {
                Ok(file) => file,
                Err(e) => {
                    report.record_failure(path, &e);
                    continue;
                }
            };

            match self.store_file(&file).await {
                Ok((written, created)) => {
                    if created {
                        report.collections_created.push(file.collection.clone());
                    }
                    report.record_success(&file.collection, written);
                }
                Err(e) => report.record_failure(path, &e),
            }
        }

        tracing::info!(
            "Ingested {} files ({} chunks), {} failed",
            report.files_processed,
            report.chunks_written,
            report.failures.len()
        );
        report
    }

    /// Store one file; returns chunks written and whether its collection was created
    async fn store_file(&self, file: &ProcessedFile) -> Result<(usize, bool)> {
        let created = self
            .store
            .ensure_collection(&file.collection, &self.vectorizer)
            .await?;

        if file.chunks.is_empty() {
            tracing::warn!("{} produced no text", file.path.display());
            return Ok((0, created));
        }

        let written = match &self.embedder {
            Some(embedder) => {
                let vectors = Self::embed_chunks(embedder.as_ref(), &file.chunks).await?;
                self.store
                    .insert_chunks(&file.collection, &file.chunks, Some(&vectors))
                    .await?
            }
            None => {
                self.store
                    .insert_chunks(&file.collection, &file.chunks, None)
                    .await?
            }
        };

        tracing::info!(
            "Stored {} chunks from {} in {}",
            written,
            file.path.display(),
            file.collection
        );
        Ok((written, created))
    }

    async fn embed_chunks(
        embedder: &dyn EmbeddingProvider,
        chunks: &[DocumentChunk],
    ) -> Result<Vec<Vec<f32>>> {
        let mut vectors = Vec::with_capacity(chunks.len());
        for batch in chunks.chunks(EMBED_BATCH_SIZE) {
            let texts: Vec<String> = batch.iter().map(|c| c.content.clone()).collect();
            vectors.extend(embedder.embed_batch(&texts).await?);
        }
        Ok(vectors)
    }
}
