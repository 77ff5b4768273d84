use std::time::Instant;

use passage_core::config::{RetrievalSettings, Settings};
use passage_core::types::RetrievalResult;
use passage_core::{Error, Result};
use passage_embed::{get_default_embedder, CacheStats, EmbeddingProvider};
use passage_vector::{FlatIndex, IndexStore, LoadedCorpus};
use serde::Serialize;

/// Snapshot of what the engine is serving.
#[derive(Debug, Clone, Serialize)]
pub struct EngineStatus {
    pub degraded: bool,
    pub chunk_count: usize,
    pub dimension: usize,
    pub model_id: String,
    pub index_created_at: Option<String>,
    pub cache: CacheStats,
}

/// Serving context: the query embedding path plus one read-only index and
/// its aligned chunks.
///
/// Built once at startup and shared by reference (or `Arc`) between request
/// handlers. Without a loaded corpus the engine runs degraded and every query
/// returns no results.
pub struct RetrievalEngine {
    provider: EmbeddingProvider,
    corpus: Option<LoadedCorpus>,
    settings: RetrievalSettings,
}

impl RetrievalEngine {
    /// Loads the embedding model and the persisted index named by `settings`.
    ///
    /// A model that cannot be loaded or a corrupt index is fatal. Missing index
    /// files put the engine in degraded mode.
    pub fn open(settings: &Settings) -> Result<Self> {
        settings.validate()?;
        let embedder = get_default_embedder(&settings.embedding)?;
        let provider = EmbeddingProvider::new(embedder, &settings.embedding)?;
        let store = IndexStore::new(settings.storage.index_file(), settings.storage.chunks_file());
        Self::from_store(provider, &store, settings.retrieval.clone())
    }

    pub fn from_store(provider: EmbeddingProvider, store: &IndexStore, settings: RetrievalSettings) -> Result<Self> {
        let corpus = match store.load::<FlatIndex>() {
            Ok(corpus) => Some(corpus),
            Err(Error::IndexNotFound(path)) => {
                tracing::warn!(missing = %path.display(), "no index available, serving in degraded mode");
                None
            }
            Err(e) => return Err(e),
        };
        Self::new(provider, corpus, settings)
    }

    pub fn new(provider: EmbeddingProvider, corpus: Option<LoadedCorpus>, settings: RetrievalSettings) -> Result<Self> {
        settings.validate()?;
        if let Some(corpus) = &corpus {
            if corpus.index.dim() != provider.dim() {
                return Err(Error::DimensionMismatch { expected: provider.dim(), actual: corpus.index.dim() });
            }
            if let Some(indexed_with) = corpus.manifest.model_id.as_deref() {
                if indexed_with != provider.model_id() {
                    tracing::warn!(
                        index_model = indexed_with,
                        query_model = provider.model_id(),
                        "index was built with a different embedding model"
                    );
                }
            }
        }
        Ok(Self { provider, corpus, settings })
    }

    pub fn is_degraded(&self) -> bool {
        self.corpus.is_none()
    }

    /// Up to `max_results` chunks scoring strictly above the similarity
    /// threshold, best first, ranked from 1.
    pub fn retrieve(&self, query: &str, max_results: usize) -> Result<Vec<RetrievalResult>> {
        let Some(corpus) = &self.corpus else {
            tracing::debug!("degraded mode, returning no results");
            return Ok(vec![]);
        };
        if query.trim().is_empty() || max_results == 0 {
            return Ok(vec![]);
        }

        let start = Instant::now();
        let query_vec = self.provider.encode_cached(query)?;
        let hits = corpus.index.search(&query_vec, max_results)?;
        let threshold = self.settings.similarity_threshold;
        let results: Vec<RetrievalResult> = hits
            .into_iter()
            .filter(|hit| hit.score > threshold)
            .filter_map(|hit| corpus.chunks.get(hit.row).map(|chunk| (hit.score, chunk)))
            .enumerate()
            .map(|(i, (score, chunk))| RetrievalResult {
                chunk: chunk.clone(),
                similarity_score: score,
                rank: i + 1,
            })
            .collect();

        let elapsed = start.elapsed();
        if elapsed > self.provider.soft_timeout() {
            tracing::warn!(elapsed_ms = elapsed.as_millis() as u64, "slow retrieval");
        }
        tracing::debug!(results = results.len(), max_results, "retrieved");
        Ok(results)
    }

    pub fn retrieve_default(&self, query: &str) -> Result<Vec<RetrievalResult>> {
        self.retrieve(query, self.settings.max_results)
    }

    /// Like [`retrieve`](Self::retrieve) but logs failures and returns no results.
    pub fn retrieve_or_empty(&self, query: &str, max_results: usize) -> Vec<RetrievalResult> {
        self.retrieve(query, max_results).unwrap_or_else(|e| {
            tracing::warn!(error = %e, "retrieval failed, returning no results");
            vec![]
        })
    }

    pub fn status(&self) -> EngineStatus {
        EngineStatus {
            degraded: self.is_degraded(),
            chunk_count: self.corpus.as_ref().map_or(0, |c| c.chunks.len()),
            dimension: self.provider.dim(),
            model_id: self.provider.model_id().to_string(),
            index_created_at: self.corpus.as_ref().map(|c| c.manifest.created_at.clone()),
            cache: self.provider.cache_stats(),
        }
    }
}
