use std::path::{Path, PathBuf};
use std::sync::Arc;

use candle_core::{DType, Device};
use candle_nn::VarBuilder;
use candle_transformers::models::bert::{BertModel, Config as BertConfig};
use passage_core::config::{expand_path, EmbeddingBackend, EmbeddingSettings};
use passage_core::traits::Embedder;
use passage_core::{Error, Result};
use tokenizers::Tokenizer;

pub mod cache;
pub mod device;
pub mod hashing;
pub mod pool;
pub mod provider;
pub mod tokenize;
pub mod workers;

pub use cache::{CacheStats, QueryCache};
pub use hashing::HashingEmbedder;
pub use pool::masked_mean_l2;
pub use provider::{EmbeddingProvider, ProviderOptions};
pub use workers::InferencePool;

/// Sentence-transformer encoder (BERT backbone, e.g. `all-MiniLM-L6-v2`) run with candle.
///
/// Loads `config.json`, `tokenizer.json` and `model.safetensors` (or
/// `pytorch_model.bin`) from a local directory. Output vectors are the
/// masked mean of the last hidden layer, L2-normalized.
pub struct EmbeddingModel {
    model: BertModel,
    tokenizer: Tokenizer,
    device: Device,
    model_id: String,
    dim: usize,
    max_len: usize,
}

impl EmbeddingModel {
    pub fn from_settings(settings: &EmbeddingSettings) -> Result<Self> {
        let model_dir = resolve_model_dir(settings)?;
        Self::load(&model_dir, &settings.model, settings.max_len)
    }

    pub fn load(model_dir: &Path, model_id: &str, max_len: usize) -> Result<Self> {
        let device = device::select_device();
        tracing::info!(model = model_id, dir = %model_dir.display(), "loading embedding model");

        let tokenizer_path = model_dir.join("tokenizer.json");
        let tokenizer = Tokenizer::from_file(&tokenizer_path).map_err(|e| {
            Error::ModelLoad(format!("failed to load tokenizer from {}: {e}", tokenizer_path.display()))
        })?;

        let config_path = model_dir.join("config.json");
        let raw_config = std::fs::read_to_string(&config_path)
            .map_err(|e| Error::ModelLoad(format!("failed to read {}: {e}", config_path.display())))?;
        let config: BertConfig = serde_json::from_str(&raw_config)
            .map_err(|e| Error::ModelLoad(format!("invalid {}: {e}", config_path.display())))?;

        let vb = load_weights(model_dir, &device)?;
        let model = BertModel::load(vb, &config).map_err(|e| Error::ModelLoad(e.to_string()))?;
        // Position embeddings bound the usable sequence length.
        let max_len = max_len.min(config.max_position_embeddings);

        tracing::info!(model = model_id, dim = config.hidden_size, max_len, "embedding model loaded");
        Ok(Self {
            model,
            tokenizer,
            device,
            model_id: model_id.to_string(),
            dim: config.hidden_size,
            max_len,
        })
    }

    fn forward(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let tokens = tokenize::tokenize_batch(&self.tokenizer, texts, self.max_len, &self.device)?;
        let to_err = |e: candle_core::Error| Error::Embedding(e.to_string());
        let hidden = self
            .model
            .forward(&tokens.input_ids, &tokens.token_type_ids, Some(&tokens.attention_mask))
            .map_err(to_err)?;
        let pooled = masked_mean_l2(&hidden, &tokens.attention_mask).map_err(to_err)?;
        pooled
            .to_device(&Device::Cpu)
            .and_then(|t| t.to_dtype(DType::F32))
            .and_then(|t| t.to_vec2::<f32>())
            .map_err(to_err)
    }
}

impl Embedder for EmbeddingModel {
    fn model_id(&self) -> &str {
        &self.model_id
    }

    fn dim(&self) -> usize {
        self.dim
    }

    fn max_len(&self) -> usize {
        self.max_len
    }

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(vec![]);
        }
        self.forward(texts)
    }
}

fn load_weights(model_dir: &Path, device: &Device) -> Result<VarBuilder<'static>> {
    let safetensors = model_dir.join("model.safetensors");
    if safetensors.exists() {
        // SAFETY: the file is opened read-only and not modified while mapped.
        return unsafe { VarBuilder::from_mmaped_safetensors(&[safetensors], DType::F32, device) }
            .map_err(|e| Error::ModelLoad(e.to_string()));
    }
    let pickle = model_dir.join("pytorch_model.bin");
    if pickle.exists() {
        return VarBuilder::from_pth(&pickle, DType::F32, device).map_err(|e| Error::ModelLoad(e.to_string()));
    }
    Err(Error::ModelLoad(format!(
        "no model.safetensors or pytorch_model.bin in {}",
        model_dir.display()
    )))
}

/// Builds the backend selected by `settings.backend`.
pub fn get_default_embedder(settings: &EmbeddingSettings) -> Result<Arc<dyn Embedder>> {
    match settings.backend {
        EmbeddingBackend::Hashing => {
            tracing::info!(dim = settings.dimension, "using hashing embedder");
            Ok(Arc::new(HashingEmbedder::new(settings.dimension, settings.max_len)?))
        }
        EmbeddingBackend::Minilm => Ok(Arc::new(EmbeddingModel::from_settings(settings)?)),
    }
}

/// Model directory lookup: `model_dir` setting, then `APP_MODEL_DIR`, then
/// `models/<model>` and `../models/<model>` relative to the working directory.
pub fn resolve_model_dir(settings: &EmbeddingSettings) -> Result<PathBuf> {
    if let Some(dir) = &settings.model_dir {
        let p = expand_path(dir);
        if p.is_dir() {
            return Ok(p);
        }
        return Err(Error::ModelLoad(format!("configured model_dir {} does not exist", p.display())));
    }
    if let Ok(dir) = std::env::var("APP_MODEL_DIR") {
        let p = expand_path(dir);
        if p.is_dir() {
            tracing::debug!(dir = %p.display(), "using APP_MODEL_DIR");
            return Ok(p);
        }
    }
    for candidate in [Path::new("models"), Path::new("../models")] {
        let p = candidate.join(&settings.model);
        if p.is_dir() {
            return Ok(p);
        }
    }
    Err(Error::ModelLoad(format!(
        "could not locate model directory for '{}' (set embedding.model_dir or APP_MODEL_DIR)",
        settings.model
    )))
}
