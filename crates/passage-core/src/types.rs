//! Domain types shared by the chunker, the index store and the retrieval engine.

use serde::{Deserialize, Serialize};

/// A contiguous word window cut from one source document.
///
/// - `source`: identifier of the document the window came from
/// - `chunk_id`: sequential id of the retained window (see `Chunker`)
/// - `word_count`: number of words actually present in `text`
/// - `start_word`/`end_word`: window bounds before clipping to the document length
///
/// Chunks are only produced by the chunker and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    pub text: String,
    pub source: String,
    pub chunk_id: u64,
    pub word_count: usize,
    pub start_word: usize,
    pub end_word: usize,
}

/// One `(source, text)` pair supplied by a document source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceDocument {
    pub source: String,
    pub text: String,
}

impl SourceDocument {
    pub fn new(source: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            text: text.into(),
        }
    }
}

/// A scored index row. `row` is the position in the index, which is also the
/// position of the matching chunk in the persisted chunk array.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
    pub row: usize,
    pub score: f32,
}

/// A ranked passage returned to the caller for one query.
///
/// Serializes flat: the chunk fields followed by `similarity_score` and `rank`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievalResult {
    #[serde(flatten)]
    pub chunk: Chunk,
    pub similarity_score: f32,
    pub rank: usize,
}
