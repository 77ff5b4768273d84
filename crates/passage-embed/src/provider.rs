use std::sync::{Arc, OnceLock};
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use passage_core::config::EmbeddingSettings;
use passage_core::traits::Embedder;
use passage_core::{Error, Result};

use crate::cache::{CacheStats, QueryCache};
use crate::workers::InferencePool;

#[derive(Debug, Clone)]
pub struct ProviderOptions {
    pub batch_size: usize,
    pub cache_capacity: usize,
    pub workers: usize,
    pub queue_capacity: usize,
    pub soft_timeout: Duration,
}

impl Default for ProviderOptions {
    fn default() -> Self {
        Self::from(&EmbeddingSettings::default())
    }
}

impl From<&EmbeddingSettings> for ProviderOptions {
    fn from(settings: &EmbeddingSettings) -> Self {
        Self {
            batch_size: settings.batch_size,
            cache_capacity: settings.cache_capacity,
            workers: settings.workers,
            queue_capacity: settings.queue_capacity,
            soft_timeout: Duration::from_millis(settings.soft_timeout_ms),
        }
    }
}

/// Text-to-vector front end shared by ingestion and serving.
///
/// `encode_batch` is the uncached bulk path used while ingesting.
/// `encode_cached` is the query path: exact-text LRU lookup, then a bounded
/// worker pool for misses. The pool threads start on the first cache miss.
pub struct EmbeddingProvider {
    embedder: Arc<dyn Embedder>,
    cache: QueryCache,
    pool: OnceLock<InferencePool>,
    pool_init: Mutex<()>,
    workers: usize,
    queue_capacity: usize,
    batch_size: usize,
    soft_timeout: Duration,
}

impl EmbeddingProvider {
    pub fn new(embedder: Arc<dyn Embedder>, settings: &EmbeddingSettings) -> Result<Self> {
        Self::with_options(embedder, ProviderOptions::from(settings))
    }

    pub fn with_options(embedder: Arc<dyn Embedder>, options: ProviderOptions) -> Result<Self> {
        if options.batch_size == 0 {
            return Err(Error::InvalidConfig("batch_size must be greater than zero".into()));
        }
        if options.workers == 0 || options.queue_capacity == 0 {
            return Err(Error::InvalidConfig(
                "inference pool needs at least one worker and one queue slot".into(),
            ));
        }
        Ok(Self {
            cache: QueryCache::new(options.cache_capacity)?,
            pool: OnceLock::new(),
            pool_init: Mutex::new(()),
            workers: options.workers,
            queue_capacity: options.queue_capacity,
            embedder,
            batch_size: options.batch_size,
            soft_timeout: options.soft_timeout,
        })
    }

    pub fn model_id(&self) -> &str {
        self.embedder.model_id()
    }

    pub fn dim(&self) -> usize {
        self.embedder.dim()
    }

    pub fn soft_timeout(&self) -> Duration {
        self.soft_timeout
    }

    pub fn encode_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        self.encode_batch_with_progress(texts, |_| {})
    }

    /// Embeds `texts` in `batch_size` slices, calling `on_progress` with the
    /// size of each completed slice. The first failing slice aborts the whole call.
    pub fn encode_batch_with_progress<F>(&self, texts: &[String], mut on_progress: F) -> Result<Vec<Vec<f32>>>
    where
        F: FnMut(usize),
    {
        let mut out = Vec::with_capacity(texts.len());
        for (batch_index, batch) in texts.chunks(self.batch_size).enumerate() {
            let vectors = self
                .embedder
                .embed_batch(batch)
                .and_then(|vectors| self.check_output(batch.len(), &vectors).map(|()| vectors))
                .map_err(|e| match e {
                    Error::Embedding(msg) => Error::Embedding(format!("batch {batch_index}: {msg}")),
                    other => other,
                })?;
            out.extend(vectors);
            on_progress(batch.len());
        }
        Ok(out)
    }

    /// Embeds one query, serving repeats of the exact same text from the cache.
    pub fn encode_cached(&self, text: &str) -> Result<Vec<f32>> {
        if let Some(hit) = self.cache.get(text) {
            tracing::debug!("query embedding cache hit");
            return Ok(hit);
        }

        let start = Instant::now();
        let embedder = Arc::clone(&self.embedder);
        let input = vec![text.to_string()];
        let vectors = self.pool()?.run(move || embedder.embed_batch(&input))??;
        self.check_output(1, &vectors)?;
        let elapsed = start.elapsed();
        if elapsed > self.soft_timeout {
            tracing::warn!(
                elapsed_ms = elapsed.as_millis() as u64,
                soft_timeout_ms = self.soft_timeout.as_millis() as u64,
                "slow query embedding"
            );
        }

        let vector = vectors.into_iter().next().unwrap_or_default();
        self.cache.insert(text.to_string(), vector.clone());
        Ok(vector)
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    pub fn queued_requests(&self) -> usize {
        self.pool.get().map_or(0, InferencePool::queued)
    }

    /// Inference threads currently running; zero until the first query miss.
    pub fn inference_workers(&self) -> usize {
        self.pool.get().map_or(0, InferencePool::workers)
    }

    fn pool(&self) -> Result<&InferencePool> {
        if let Some(pool) = self.pool.get() {
            return Ok(pool);
        }
        let _guard = self.pool_init.lock();
        if let Some(pool) = self.pool.get() {
            return Ok(pool);
        }
        let pool = InferencePool::new(self.workers, self.queue_capacity)?;
        Ok(self.pool.get_or_init(|| pool))
    }

    fn check_output(&self, expected: usize, vectors: &[Vec<f32>]) -> Result<()> {
        if vectors.len() != expected {
            return Err(Error::Embedding(format!(
                "model returned {} vectors for {expected} inputs",
                vectors.len()
            )));
        }
        let dim = self.embedder.dim();
        if let Some(bad) = vectors.iter().find(|v| v.len() != dim) {
            return Err(Error::Embedding(format!(
                "model returned a vector of dimension {}, expected {dim}",
                bad.len()
            )));
        }
        Ok(())
    }
}
