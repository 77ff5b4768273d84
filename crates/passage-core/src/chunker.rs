//! Overlapping word-window chunking.

use regex::Regex;
use std::sync::LazyLock;

use crate::config::ChunkingSettings;
use crate::error::{Error, Result};
use crate::types::{Chunk, SourceDocument};

/// Windows whose trimmed text has this many characters or fewer are dropped.
pub const MIN_CHUNK_CHARS: usize = 50;

/// Normalized lines of this many characters or fewer are dropped.
const MIN_LINE_CHARS: usize = 10;

static DISALLOWED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^\w\s.,!?;:()\-]").expect("valid pattern"));
static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("valid pattern"));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Chunker {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl Chunker {
    /// Fails with `InvalidConfig` unless `chunk_size > chunk_overlap`.
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Result<Self> {
        if chunk_size <= chunk_overlap {
            return Err(Error::InvalidConfig(format!(
                "chunk_size ({chunk_size}) must be greater than chunk_overlap ({chunk_overlap})"
            )));
        }
        Ok(Self { chunk_size, chunk_overlap })
    }

    pub fn from_settings(settings: &ChunkingSettings) -> Result<Self> {
        Self::new(settings.chunk_size, settings.chunk_overlap)
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn chunk_overlap(&self) -> usize {
        self.chunk_overlap
    }

    pub fn stride(&self) -> usize {
        self.chunk_size - self.chunk_overlap
    }

    /// Number of windows, before length filtering, for a text of `words` words.
    pub fn window_count(&self, words: usize) -> usize {
        words.div_ceil(self.stride())
    }

    /// Splits `text` into retained windows with ids `0..n` in window order.
    pub fn chunk(&self, text: &str, source: &str) -> Vec<Chunk> {
        let mut chunks = Vec::new();
        self.chunk_into(text, source, &mut chunks);
        chunks
    }

    /// Chunks every document in order, numbering chunks across the whole run so
    /// that `chunk_id` equals the chunk's position in the returned vector.
    pub fn chunk_documents(&self, docs: &[SourceDocument]) -> Vec<Chunk> {
        let mut chunks = Vec::new();
        for doc in docs {
            let before = chunks.len();
            self.chunk_into(&doc.text, &doc.source, &mut chunks);
            tracing::debug!(source = %doc.source, chunks = chunks.len() - before, "chunked document");
        }
        chunks
    }

    fn chunk_into(&self, text: &str, source: &str, out: &mut Vec<Chunk>) {
        let words: Vec<&str> = text.split_whitespace().collect();
        let mut start = 0;
        while start < words.len() {
            let end = start + self.chunk_size;
            let window = &words[start..end.min(words.len())];
            let joined = window.join(" ");
            if joined.trim().chars().count() > MIN_CHUNK_CHARS {
                out.push(Chunk {
                    text: joined,
                    source: source.to_string(),
                    chunk_id: out.len() as u64,
                    word_count: window.len(),
                    start_word: start,
                    end_word: end,
                });
            }
            start += self.stride();
        }
    }
}

/// Cleans extracted text: strips characters other than word characters,
/// whitespace and `.,!?;:()-`, collapses whitespace within each line, drops
/// short lines and joins the rest with single spaces.
pub fn normalize_text(raw: &str) -> String {
    raw.lines()
        .map(|line| {
            let kept = DISALLOWED.replace_all(line, "");
            WHITESPACE.replace_all(kept.trim(), " ").into_owned()
        })
        .filter(|line| line.chars().count() > MIN_LINE_CHARS)
        .collect::<Vec<_>>()
        .join(" ")
}
