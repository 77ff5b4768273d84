//! Layered configuration and path helpers.
//!
//! Figment merges typed defaults, `config.toml`, `config.<env>.toml` (from
//! `RUST_ENV`) and `APP_*` environment variables, with `__` separating nested
//! keys (`APP_CHUNKING__CHUNK_SIZE=200`).

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

pub struct Config {
    figment: Figment,
}

impl Config {
    /// Loads configuration files from the current working directory.
    pub fn load() -> Result<Self> {
        Self::load_from(Path::new("."))
    }

    pub fn load_from(dir: &Path) -> Result<Self> {
        let env_name = env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string());

        let mut figment = Figment::from(Serialized::defaults(Settings::default()))
            .merge(Toml::file(dir.join("config.toml")));
        match env_name.as_str() {
            "dev" | "development" => figment = figment.merge(Toml::file(dir.join("config.dev.toml"))),
            "prod" | "production" => figment = figment.merge(Toml::file(dir.join("config.prod.toml"))),
            "test" | "testing" => figment = figment.merge(Toml::file(dir.join("config.test.toml"))),
            other => tracing::debug!(env = other, "no environment-specific config file for this env"),
        }
        figment = figment.merge(Env::prefixed("APP_").split("__"));

        Ok(Self { figment })
    }

    pub fn get<T>(&self, key: &str) -> Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        self.figment
            .extract_inner(key)
            .map_err(|e| Error::InvalidConfig(format!("failed to get '{key}': {e}")))
    }

    /// Extracts and validates the full settings tree.
    pub fn settings(&self) -> Result<Settings> {
        let settings: Settings = self
            .figment
            .extract()
            .map_err(|e| Error::InvalidConfig(e.to_string()))?;
        settings.validate()?;
        Ok(settings)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub chunking: ChunkingSettings,
    pub embedding: EmbeddingSettings,
    pub retrieval: RetrievalSettings,
    pub storage: StorageSettings,
}

impl Settings {
    pub fn validate(&self) -> Result<()> {
        self.chunking.validate()?;
        self.embedding.validate()?;
        self.retrieval.validate()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingSettings {
    /// Window length in words.
    pub chunk_size: usize,
    /// Words shared by consecutive windows. Must be smaller than `chunk_size`.
    pub chunk_overlap: usize,
}

impl Default for ChunkingSettings {
    fn default() -> Self {
        Self { chunk_size: 300, chunk_overlap: 50 }
    }
}

impl ChunkingSettings {
    pub fn validate(&self) -> Result<()> {
        if self.chunk_size <= self.chunk_overlap {
            return Err(Error::InvalidConfig(format!(
                "chunk_size ({}) must be greater than chunk_overlap ({})",
                self.chunk_size, self.chunk_overlap
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingBackend {
    /// Sentence-transformer model run locally with candle.
    Minilm,
    /// Deterministic feature hashing; needs no model files.
    Hashing,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingSettings {
    pub backend: EmbeddingBackend,
    pub model: String,
    pub model_dir: Option<String>,
    /// Output dimension of the hashing backend. The model backend reports its own.
    pub dimension: usize,
    pub max_len: usize,
    pub batch_size: usize,
    pub cache_capacity: usize,
    pub workers: usize,
    pub queue_capacity: usize,
    pub soft_timeout_ms: u64,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            backend: EmbeddingBackend::Minilm,
            model: "all-MiniLM-L6-v2".to_string(),
            model_dir: None,
            dimension: 384,
            max_len: 256,
            batch_size: 32,
            cache_capacity: 1000,
            workers: num_cpus::get(),
            queue_capacity: 64,
            soft_timeout_ms: 250,
        }
    }
}

impl EmbeddingSettings {
    pub fn validate(&self) -> Result<()> {
        let positive = [
            ("batch_size", self.batch_size),
            ("cache_capacity", self.cache_capacity),
            ("workers", self.workers),
            ("queue_capacity", self.queue_capacity),
            ("max_len", self.max_len),
        ];
        for (name, value) in positive {
            if value == 0 {
                return Err(Error::InvalidConfig(format!("embedding.{name} must be greater than zero")));
            }
        }
        if self.backend == EmbeddingBackend::Hashing && self.dimension == 0 {
            return Err(Error::InvalidConfig("embedding.dimension must be greater than zero".into()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalSettings {
    pub max_results: usize,
    /// Candidates must score strictly above this to be returned.
    pub similarity_threshold: f32,
}

impl Default for RetrievalSettings {
    fn default() -> Self {
        Self { max_results: 4, similarity_threshold: 0.10 }
    }
}

impl RetrievalSettings {
    pub fn validate(&self) -> Result<()> {
        if !(-1.0..=1.0).contains(&self.similarity_threshold) {
            return Err(Error::InvalidConfig(format!(
                "retrieval.similarity_threshold ({}) must lie in [-1, 1]",
                self.similarity_threshold
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    pub raw_text_dir: String,
    pub index_path: String,
    pub chunks_path: String,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            raw_text_dir: "data/txt".to_string(),
            index_path: "document.index".to_string(),
            chunks_path: "documents.json".to_string(),
        }
    }
}

impl StorageSettings {
    pub fn raw_text_root(&self) -> PathBuf {
        expand_path(&self.raw_text_dir)
    }

    pub fn index_file(&self) -> PathBuf {
        expand_path(&self.index_path)
    }

    pub fn chunks_file(&self) -> PathBuf {
        expand_path(&self.chunks_path)
    }
}

/// Expand a user-provided path string:
/// - Expands leading '~' to the user's home directory
/// - Expands ${VAR} and $VAR environment variables
/// - Returns a PathBuf without attempting to canonicalize
pub fn expand_path<S: AsRef<str>>(input: S) -> PathBuf {
    let s = input.as_ref();
    let expanded_env = shellexpand::env(s).unwrap_or(std::borrow::Cow::Borrowed(s));
    let expanded = shellexpand::tilde(&expanded_env);
    PathBuf::from(expanded.as_ref())
}

/// Resolve a possibly relative path against a given base directory after expansion.
pub fn resolve_with_base<S: AsRef<str>>(base: &Path, p: S) -> PathBuf {
    let p = expand_path(p);
    if p.is_absolute() {
        p
    } else {
        base.join(p)
    }
}
