use std::time::{Duration, Instant};

use indicatif::{ProgressBar, ProgressStyle};
use passage_core::config::Settings;
use passage_core::traits::PersistentIndex;
use passage_core::types::SourceDocument;
use passage_core::{Chunker, Error, Result};
use passage_embed::{get_default_embedder, EmbeddingProvider};
use passage_vector::{FlatIndex, IndexStore, StoreManifest};

#[derive(Debug, Clone)]
pub struct IngestReport {
    pub documents: usize,
    pub chunks: usize,
    pub dim: usize,
    pub model_id: String,
    pub manifest: StoreManifest,
    pub elapsed: Duration,
}

/// Batch pipeline: chunk every document, embed every chunk, build one index
/// and persist it with its chunks. Nothing is written unless every step succeeds.
pub struct Ingestor {
    chunker: Chunker,
    provider: EmbeddingProvider,
    store: IndexStore,
    show_progress: bool,
}

impl Ingestor {
    pub fn new(chunker: Chunker, provider: EmbeddingProvider, store: IndexStore) -> Self {
        Self { chunker, provider, store, show_progress: false }
    }

    pub fn from_settings(settings: &Settings) -> Result<Self> {
        settings.validate()?;
        let chunker = Chunker::from_settings(&settings.chunking)?;
        let embedder = get_default_embedder(&settings.embedding)?;
        let store = IndexStore::new(settings.storage.index_file(), settings.storage.chunks_file())
            .with_model_id(embedder.model_id());
        let provider = EmbeddingProvider::new(embedder, &settings.embedding)?;
        Ok(Self::new(chunker, provider, store))
    }

    #[must_use]
    pub fn with_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    pub fn store(&self) -> &IndexStore {
        &self.store
    }

    pub fn run(&self, docs: &[SourceDocument]) -> Result<IngestReport> {
        let start = Instant::now();
        let chunks = self.chunker.chunk_documents(docs);
        if chunks.is_empty() {
            return Err(Error::IndexBuild(format!("{} documents produced no chunks", docs.len())));
        }
        tracing::info!(documents = docs.len(), chunks = chunks.len(), "chunked corpus");

        let pb = self.progress_bar(chunks.len());
        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let embeddings = match self.provider.encode_batch_with_progress(&texts, |n| pb.inc(n as u64)) {
            Ok(e) => e,
            Err(e) => {
                pb.abandon_with_message("embedding failed");
                return Err(e);
            }
        };
        pb.finish_with_message("embedded");

        let labels = chunks.iter().map(|c| c.chunk_id).collect();
        let index = FlatIndex::build_labeled(embeddings, labels)?;
        let manifest = self.store.save(&index, &chunks)?;

        let report = IngestReport {
            documents: docs.len(),
            chunks: chunks.len(),
            dim: self.provider.dim(),
            model_id: self.provider.model_id().to_string(),
            manifest,
            elapsed: start.elapsed(),
        };
        tracing::info!(
            documents = report.documents,
            chunks = report.chunks,
            dim = report.dim,
            elapsed_ms = report.elapsed.as_millis() as u64,
            "ingestion complete"
        );
        Ok(report)
    }

    fn progress_bar(&self, len: usize) -> ProgressBar {
        if !self.show_progress {
            return ProgressBar::hidden();
        }
        let pb = ProgressBar::new(len as u64);
        pb.set_style(
            ProgressStyle::with_template(
                "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} chunks ({percent}%) {msg}",
            )
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-"),
        );
        pb
    }
}
