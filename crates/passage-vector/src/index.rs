use std::cmp::Ordering;
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use passage_core::traits::{PersistentIndex, VectorIndex};
use passage_core::types::Neighbor;
use passage_core::vector::{dot, l2_normalize};
use passage_core::{Error, Result};
use rayon::prelude::*;

use crate::schema::{bincode_config, FlatIndexOwned, FlatIndexRecord, FLAT_INDEX_MAGIC, FLAT_INDEX_VERSION};

/// Exact inner-product index over L2-normalized rows stored contiguously.
#[derive(Debug, Clone, PartialEq)]
pub struct FlatIndex {
    dim: usize,
    labels: Vec<u64>,
    data: Vec<f32>,
}

impl FlatIndex {
    /// Builds an index whose row labels are `0..N`.
    pub fn build(embeddings: Vec<Vec<f32>>) -> Result<Self> {
        let labels = (0..embeddings.len() as u64).collect();
        Self::build_labeled(embeddings, labels)
    }

    pub fn row(&self, i: usize) -> Option<&[f32]> {
        self.data.chunks_exact(self.dim).nth(i)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let mut writer = BufWriter::new(File::create(path)?);
        self.write_to(&mut writer)?;
        writer.flush()?;
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(Error::IndexNotFound(path.to_path_buf()));
        }
        Self::read_from(&mut BufReader::new(File::open(path)?))
    }
}

fn rank_order(a: &Neighbor, b: &Neighbor) -> Ordering {
    b.score.total_cmp(&a.score).then(a.row.cmp(&b.row))
}

impl VectorIndex for FlatIndex {
    fn dim(&self) -> usize {
        self.dim
    }

    fn len(&self) -> usize {
        self.labels.len()
    }

    fn labels(&self) -> &[u64] {
        &self.labels
    }

    fn search(&self, query: &[f32], k: usize) -> Result<Vec<Neighbor>> {
        if query.len() != self.dim {
            return Err(Error::DimensionMismatch { expected: self.dim, actual: query.len() });
        }
        if k == 0 || self.labels.is_empty() {
            return Ok(vec![]);
        }
        let mut q = query.to_vec();
        l2_normalize(&mut q);

        let mut scored: Vec<Neighbor> = self
            .data
            .par_chunks_exact(self.dim)
            .enumerate()
            .map(|(row, v)| Neighbor { row, score: dot(v, &q).clamp(-1.0, 1.0) })
            .collect();

        let k = k.min(scored.len());
        if k < scored.len() {
            scored.select_nth_unstable_by(k - 1, rank_order);
            scored.truncate(k);
        }
        scored.sort_unstable_by(rank_order);
        Ok(scored)
    }
}

impl PersistentIndex for FlatIndex {
    /// Normalizes every row in place. Empty, ragged or non-finite input is rejected.
    fn build_labeled(embeddings: Vec<Vec<f32>>, labels: Vec<u64>) -> Result<Self> {
        let Some(first) = embeddings.first() else {
            return Err(Error::IndexBuild("embedding set is empty".into()));
        };
        let dim = first.len();
        if dim == 0 {
            return Err(Error::IndexBuild("embeddings have zero dimension".into()));
        }
        if labels.len() != embeddings.len() {
            return Err(Error::IndexBuild(format!(
                "{} labels for {} embeddings",
                labels.len(),
                embeddings.len()
            )));
        }

        let mut data = Vec::with_capacity(embeddings.len() * dim);
        for (row, mut v) in embeddings.into_iter().enumerate() {
            if v.len() != dim {
                return Err(Error::IndexBuild(format!("row {row} has dimension {}, expected {dim}", v.len())));
            }
            if v.iter().any(|x| !x.is_finite()) {
                return Err(Error::IndexBuild(format!("row {row} contains non-finite values")));
            }
            l2_normalize(&mut v);
            data.extend_from_slice(&v);
        }
        tracing::debug!(rows = labels.len(), dim, "built flat index");
        Ok(Self { dim, labels, data })
    }

    fn write_to<W: Write>(&self, writer: &mut W) -> Result<()> {
        let record = FlatIndexRecord {
            magic: FLAT_INDEX_MAGIC,
            version: FLAT_INDEX_VERSION,
            dim: self.dim as u64,
            count: self.labels.len() as u64,
            labels: &self.labels,
            data: &self.data,
        };
        bincode::serde::encode_into_std_write(&record, writer, bincode_config())
            .map_err(|e| Error::Io(std::io::Error::other(e.to_string())))?;
        Ok(())
    }

    fn read_from<R: Read>(reader: &mut R) -> Result<Self> {
        let record: FlatIndexOwned = bincode::serde::decode_from_std_read(reader, bincode_config())
            .map_err(|e| Error::IndexCorrupt(format!("undecodable index payload: {e}")))?;
        if record.magic != FLAT_INDEX_MAGIC {
            return Err(Error::IndexCorrupt("not a flat index payload".into()));
        }
        if record.version != FLAT_INDEX_VERSION {
            return Err(Error::IndexCorrupt(format!("unsupported flat index version {}", record.version)));
        }
        let dim = usize::try_from(record.dim).map_err(|_| Error::IndexCorrupt("dimension overflows".into()))?;
        let count = usize::try_from(record.count).map_err(|_| Error::IndexCorrupt("count overflows".into()))?;
        if dim == 0 {
            return Err(Error::IndexCorrupt("zero dimension".into()));
        }
        if record.labels.len() != count {
            return Err(Error::IndexCorrupt(format!("{} labels for {count} rows", record.labels.len())));
        }
        if Some(record.data.len()) != count.checked_mul(dim) {
            return Err(Error::IndexCorrupt(format!(
                "{} values for {count} rows of dimension {dim}",
                record.data.len()
            )));
        }
        Ok(Self { dim, labels: record.labels, data: record.data })
    }
}
