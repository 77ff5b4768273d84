use std::io::{Read, Write};

use crate::error::Result;
use crate::types::Neighbor;

pub trait Embedder: Send + Sync {
    /// Stable identifier of the model and its output space, e.g. `all-MiniLM-L6-v2`.
    fn model_id(&self) -> &str;
    fn dim(&self) -> usize;
    fn max_len(&self) -> usize;
    /// Returns exactly one vector of length `dim()` per input text, in input order.
    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;
}

/// Read-only nearest-neighbour search over L2-normalized rows.
pub trait VectorIndex: Send + Sync {
    fn dim(&self) -> usize;
    fn len(&self) -> usize;
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
    /// Per-row labels; `labels()[i]` is the chunk id embedded at row `i`.
    fn labels(&self) -> &[u64];
    /// Top `min(k, len())` rows by inner product, score descending then row ascending.
    fn search(&self, query: &[f32], k: usize) -> Result<Vec<Neighbor>>;
}

/// An index backend that can be built from an embedding matrix and round-tripped through bytes.
pub trait PersistentIndex: VectorIndex + Sized {
    fn build_labeled(embeddings: Vec<Vec<f32>>, labels: Vec<u64>) -> Result<Self>;
    fn write_to<W: Write>(&self, writer: &mut W) -> Result<()>;
    fn read_from<R: Read>(reader: &mut R) -> Result<Self>;
}
