//! Deterministic feature-hashing embedder.
//!
//! Each normalized word token is hashed with XxHash64 (seed 0); the low bits
//! pick a bucket and the top bit picks a sign. The bucket counts are then
//! L2-normalized, so two texts score by the (signed) overlap of their
//! content words. Needs no model files, which makes it the backend for tests
//! and offline smoke runs.

use std::hash::Hasher;

use passage_core::traits::Embedder;
use passage_core::vector::l2_normalize;
use passage_core::{Error, Result};
use twox_hash::XxHash64;

const STOPWORDS: &[&str] = &[
    "a", "an", "and", "are", "as", "at", "be", "by", "do", "does", "for", "from", "how", "in",
    "into", "is", "it", "of", "on", "or", "that", "the", "this", "to", "was", "what", "with",
];

pub struct HashingEmbedder {
    dim: usize,
    max_len: usize,
    model_id: String,
}

impl HashingEmbedder {
    pub fn new(dim: usize, max_len: usize) -> Result<Self> {
        if dim == 0 {
            return Err(Error::InvalidConfig("hashing dimension must be greater than zero".into()));
        }
        Ok(Self { dim, max_len, model_id: format!("hashing:d{dim}") })
    }

    pub fn embed_text(&self, text: &str) -> Vec<f32> {
        let mut v = vec![0f32; self.dim];
        for token in tokens(text).take(self.max_len) {
            let mut hasher = XxHash64::with_seed(0);
            hasher.write(token.as_bytes());
            let h = hasher.finish();
            let idx = (h % self.dim as u64) as usize;
            v[idx] += if h >> 63 == 1 { -1.0 } else { 1.0 };
        }
        l2_normalize(&mut v);
        v
    }
}

impl Embedder for HashingEmbedder {
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
        Ok(texts.iter().map(|t| self.embed_text(t)).collect())
    }
}

/// Lowercased alphanumeric runs, minus stopwords, with a trailing plural `s` trimmed.
pub fn tokens(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_lowercase)
        .filter(|w| !STOPWORDS.contains(&w.as_str()))
        .map(|mut w| {
            if w.chars().count() > 3 && w.ends_with('s') && !w.ends_with("ss") {
                w.pop();
            }
            w
        })
}
