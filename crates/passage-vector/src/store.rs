use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use passage_core::traits::{PersistentIndex, VectorIndex};
use passage_core::types::Chunk;
use passage_core::{Error, Result};
use tempfile::NamedTempFile;

use crate::schema::{bincode_config, StoreManifest, STORE_VERSION};

/// A validated index and the chunk array aligned with its rows.
pub struct LoadedCorpus {
    pub index: Arc<dyn VectorIndex>,
    pub chunks: Arc<[Chunk]>,
    pub manifest: StoreManifest,
}

impl std::fmt::Debug for LoadedCorpus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoadedCorpus")
            .field("rows", &self.index.len())
            .field("dim", &self.index.dim())
            .field("manifest", &self.manifest)
            .finish()
    }
}

/// Persists an index file and a chunk file as one unit.
///
/// The index file starts with a [`StoreManifest`] holding the blake3 digest of
/// the chunk file, so a chunk file from another run is detected at load.
pub struct IndexStore {
    index_path: PathBuf,
    chunks_path: PathBuf,
    model_id: Option<String>,
}

impl IndexStore {
    pub fn new(index_path: impl Into<PathBuf>, chunks_path: impl Into<PathBuf>) -> Self {
        Self { index_path: index_path.into(), chunks_path: chunks_path.into(), model_id: None }
    }

    /// Records the embedding model in the manifest of saved pairs.
    #[must_use]
    pub fn with_model_id(mut self, model_id: impl Into<String>) -> Self {
        self.model_id = Some(model_id.into());
        self
    }

    pub fn index_path(&self) -> &Path {
        &self.index_path
    }

    pub fn chunks_path(&self) -> &Path {
        &self.chunks_path
    }

    pub fn exists(&self) -> bool {
        self.index_path.is_file() && self.chunks_path.is_file()
    }

    /// Writes both files to temporaries, then renames the chunk file and the
    /// index file into place.
    ///
    /// Failures before the first rename leave any previous pair untouched. If
    /// the index rename fails, the freshly renamed chunk file is removed, so the
    /// previous pair is gone too and serving starts in degraded mode.
    pub fn save<I: PersistentIndex>(&self, index: &I, chunks: &[Chunk]) -> Result<StoreManifest> {
        check_alignment(index, chunks)?;

        let chunk_bytes = serde_json::to_vec_pretty(chunks)?;
        let manifest = StoreManifest::new(
            self.model_id.clone(),
            index.dim(),
            index.len(),
            blake3::hash(&chunk_bytes).to_hex().to_string(),
        );

        let mut chunk_tmp = NamedTempFile::new_in(ensure_parent(&self.chunks_path)?)?;
        chunk_tmp.write_all(&chunk_bytes)?;
        chunk_tmp.as_file().sync_all()?;

        let mut index_tmp = NamedTempFile::new_in(ensure_parent(&self.index_path)?)?;
        {
            let mut writer = BufWriter::new(index_tmp.as_file_mut());
            bincode::serde::encode_into_std_write(&manifest, &mut writer, bincode_config())
                .map_err(|e| Error::Io(std::io::Error::other(e.to_string())))?;
            index.write_to(&mut writer)?;
            writer.flush()?;
        }
        index_tmp.as_file().sync_all()?;

        chunk_tmp.persist(&self.chunks_path).map_err(|e| Error::Io(e.error))?;
        if let Err(e) = index_tmp.persist(&self.index_path) {
            let _ = fs::remove_file(&self.chunks_path);
            return Err(Error::Io(e.error));
        }

        tracing::info!(
            index = %self.index_path.display(),
            chunks = %self.chunks_path.display(),
            rows = manifest.count,
            "saved index store"
        );
        Ok(manifest)
    }

    /// Loads and cross-checks the pair. A missing file is `IndexNotFound`;
    /// every other inconsistency is `IndexCorrupt`.
    pub fn load<I: PersistentIndex + 'static>(&self) -> Result<LoadedCorpus> {
        for path in [&self.index_path, &self.chunks_path] {
            if !path.is_file() {
                return Err(Error::IndexNotFound(path.clone()));
            }
        }

        let mut reader = BufReader::new(File::open(&self.index_path)?);
        let manifest = read_manifest(&mut reader)?;
        let index = I::read_from(&mut reader)?;

        if manifest.count != index.len() as u64 || manifest.dim != index.dim() as u64 {
            return Err(Error::IndexCorrupt(format!(
                "manifest describes {} rows of dimension {}, index holds {} rows of dimension {}",
                manifest.count,
                manifest.dim,
                index.len(),
                index.dim()
            )));
        }

        let chunk_bytes = fs::read(&self.chunks_path)?;
        let chunks: Vec<Chunk> = serde_json::from_slice(&chunk_bytes)
            .map_err(|e| Error::IndexCorrupt(format!("unreadable chunk file: {e}")))?;
        check_alignment(&index, &chunks)?;

        let digest = blake3::hash(&chunk_bytes).to_hex().to_string();
        if digest != manifest.chunks_blake3 {
            return Err(Error::IndexCorrupt(
                "chunk file does not match the one saved with this index".into(),
            ));
        }

        tracing::info!(rows = index.len(), dim = index.dim(), created_at = %manifest.created_at, "loaded index store");
        Ok(LoadedCorpus { index: Arc::new(index), chunks: chunks.into(), manifest })
    }

    /// Reads only the manifest at the head of the index file.
    pub fn manifest(&self) -> Result<StoreManifest> {
        if !self.index_path.is_file() {
            return Err(Error::IndexNotFound(self.index_path.clone()));
        }
        read_manifest(&mut BufReader::new(File::open(&self.index_path)?))
    }
}

fn read_manifest(reader: &mut BufReader<File>) -> Result<StoreManifest> {
    let manifest: StoreManifest = bincode::serde::decode_from_std_read(reader, bincode_config())
        .map_err(|e| Error::IndexCorrupt(format!("undecodable store header: {e}")))?;
    if !manifest.has_valid_magic() {
        return Err(Error::IndexCorrupt("not a passage index file".into()));
    }
    if manifest.version != STORE_VERSION {
        return Err(Error::IndexCorrupt(format!("unsupported store version {}", manifest.version)));
    }
    Ok(manifest)
}

/// Row `i` must hold the embedding of `chunks[i]`: equal counts and equal labels.
fn check_alignment<I: VectorIndex>(index: &I, chunks: &[Chunk]) -> Result<()> {
    if index.len() != chunks.len() {
        return Err(Error::IndexCorrupt(format!(
            "index has {} rows but there are {} chunks",
            index.len(),
            chunks.len()
        )));
    }
    if let Some((row, (label, chunk))) = index
        .labels()
        .iter()
        .zip(chunks)
        .enumerate()
        .find(|(_, (label, chunk))| **label != chunk.chunk_id)
    {
        return Err(Error::IndexCorrupt(format!(
            "row {row} holds chunk {label} but chunk array has {} there",
            chunk.chunk_id
        )));
    }
    Ok(())
}

fn ensure_parent(path: &Path) -> Result<&Path> {
    match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => {
            fs::create_dir_all(dir)?;
            Ok(dir)
        }
        _ => Ok(Path::new(".")),
    }
}
