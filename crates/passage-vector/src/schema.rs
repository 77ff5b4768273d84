//! On-disk layouts of the index file.
//!
//! The index file is a [`StoreManifest`] followed by the index payload
//! ([`FLAT_INDEX_MAGIC`] for [`crate::FlatIndex`]). Both are bincode-encoded
//! with the standard configuration; `f32` rows are stored as raw little-endian
//! bits so a reload is bit-identical.

use serde::{Deserialize, Serialize};

pub const FLAT_INDEX_MAGIC: [u8; 8] = *b"PSGFLAT1";
pub const FLAT_INDEX_VERSION: u32 = 1;

pub const STORE_MAGIC: [u8; 8] = *b"PSGSTOR1";
pub const STORE_VERSION: u32 = 1;

pub(crate) fn bincode_config() -> bincode::config::Configuration {
    bincode::config::standard()
}

/// Payload written by `FlatIndex::write_to`; rows are row-major, `count * dim` floats.
#[derive(Serialize)]
pub(crate) struct FlatIndexRecord<'a> {
    pub magic: [u8; 8],
    pub version: u32,
    pub dim: u64,
    pub count: u64,
    pub labels: &'a [u64],
    pub data: &'a [f32],
}

#[derive(Deserialize)]
pub(crate) struct FlatIndexOwned {
    pub magic: [u8; 8],
    pub version: u32,
    pub dim: u64,
    pub count: u64,
    pub labels: Vec<u64>,
    pub data: Vec<f32>,
}

/// Header of a persisted index/chunk pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreManifest {
    magic: [u8; 8],
    pub version: u32,
    /// RFC 3339 creation time.
    pub created_at: String,
    pub model_id: Option<String>,
    pub dim: u64,
    pub count: u64,
    /// blake3 hex digest of the exact chunk-file bytes.
    pub chunks_blake3: String,
}

impl StoreManifest {
    pub(crate) fn new(model_id: Option<String>, dim: usize, count: usize, chunks_blake3: String) -> Self {
        Self {
            magic: STORE_MAGIC,
            version: STORE_VERSION,
            created_at: chrono::Utc::now().to_rfc3339(),
            model_id,
            dim: dim as u64,
            count: count as u64,
            chunks_blake3,
        }
    }

    pub(crate) fn has_valid_magic(&self) -> bool {
        self.magic == STORE_MAGIC
    }
}
