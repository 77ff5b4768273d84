use passage_core::traits::{PersistentIndex, VectorIndex};
use passage_core::Error;
use passage_vector::FlatIndex;

fn unit(v: &[f32]) -> Vec<f32> {
    let n = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    v.iter().map(|x| x / n).collect()
}

/// Deterministic pseudo-random rows without pulling in an RNG crate.
fn rows(n: usize, dim: usize) -> Vec<Vec<f32>> {
    let mut state = 0x9E37_79B9_7F4A_7C15u64;
    (0..n)
        .map(|_| {
            (0..dim)
                .map(|_| {
                    state ^= state << 13;
                    state ^= state >> 7;
                    state ^= state << 17;
                    (state % 2001) as f32 / 1000.0 - 1.0
                })
                .collect()
        })
        .collect()
}

#[test]
fn build_normalizes_rows_and_records_shape() -> anyhow::Result<()> {
    let index = FlatIndex::build(vec![vec![3.0, 4.0], vec![0.0, 2.0]])?;
    assert_eq!(index.dim(), 2);
    assert_eq!(index.len(), 2);
    assert_eq!(index.labels(), &[0, 1]);
    let r0 = index.row(0).expect("row 0");
    assert!((r0[0] - 0.6).abs() < 1e-6 && (r0[1] - 0.8).abs() < 1e-6);
    Ok(())
}

#[test]
fn build_rejects_empty_ragged_and_non_finite() {
    assert!(matches!(FlatIndex::build(vec![]), Err(Error::IndexBuild(_))));
    assert!(matches!(FlatIndex::build(vec![vec![]]), Err(Error::IndexBuild(_))));
    assert!(matches!(FlatIndex::build(vec![vec![1.0, 0.0], vec![1.0]]), Err(Error::IndexBuild(_))));
    assert!(matches!(FlatIndex::build(vec![vec![f32::NAN, 1.0]]), Err(Error::IndexBuild(_))));
    assert!(matches!(
        FlatIndex::build_labeled(vec![vec![1.0, 0.0]], vec![0, 1]),
        Err(Error::IndexBuild(_))
    ));
}

#[test]
fn search_returns_top_k_sorted_with_cosine_scores() -> anyhow::Result<()> {
    let index = FlatIndex::build(vec![
        vec![1.0, 0.0, 0.0],
        vec![0.0, 1.0, 0.0],
        vec![1.0, 1.0, 0.0],
        vec![-1.0, 0.0, 0.0],
    ])?;
    let hits = index.search(&[2.0, 0.0, 0.0], 3)?;

    assert_eq!(hits.len(), 3);
    assert_eq!(hits.iter().map(|h| h.row).collect::<Vec<_>>(), vec![0, 2, 1]);
    assert!((hits[0].score - 1.0).abs() < 1e-6);
    assert!((hits[1].score - 1.0 / 2.0f32.sqrt()).abs() < 1e-6);
    assert!(hits[2].score.abs() < 1e-6);
    Ok(())
}

#[test]
fn k_larger_than_rows_returns_every_row() -> anyhow::Result<()> {
    let index = FlatIndex::build(vec![vec![1.0, 0.0], vec![0.0, 1.0]])?;
    assert_eq!(index.search(&[1.0, 0.0], 10)?.len(), 2);
    assert!(index.search(&[1.0, 0.0], 0)?.is_empty());
    Ok(())
}

#[test]
fn ties_break_by_ascending_row() -> anyhow::Result<()> {
    let index = FlatIndex::build(vec![
        vec![0.0, 1.0],
        vec![1.0, 0.0],
        vec![0.0, 1.0],
        vec![1.0, 0.0],
        vec![1.0, 0.0],
    ])?;
    let hits = index.search(&[1.0, 0.0], 2)?;
    assert_eq!(hits.iter().map(|h| h.row).collect::<Vec<_>>(), vec![1, 3]);

    let all = index.search(&[1.0, 0.0], 5)?;
    assert_eq!(all.iter().map(|h| h.row).collect::<Vec<_>>(), vec![1, 3, 4, 0, 2]);
    Ok(())
}

#[test]
fn scores_stay_in_range_and_descend() -> anyhow::Result<()> {
    let data = rows(200, 16);
    let index = FlatIndex::build(data.clone())?;
    for q in data.iter().take(10) {
        let hits = index.search(q, 25)?;
        assert_eq!(hits.len(), 25);
        for w in hits.windows(2) {
            assert!(w[0].score > w[1].score || (w[0].score == w[1].score && w[0].row < w[1].row));
        }
        assert!(hits.iter().all(|h| (-1.0..=1.0).contains(&h.score)));
        // A stored row is its own best match.
        assert!((hits[0].score - 1.0).abs() < 1e-5);
    }
    Ok(())
}

#[test]
fn top_k_matches_full_ranking_prefix() -> anyhow::Result<()> {
    let data = rows(300, 8);
    let index = FlatIndex::build(data)?;
    let query = unit(&[0.3, -0.2, 0.9, 0.1, 0.0, -0.5, 0.4, 0.2]);
    let full = index.search(&query, 300)?;
    let top = index.search(&query, 7)?;
    assert_eq!(top, full[..7].to_vec());
    Ok(())
}

#[test]
fn query_dimension_must_match() -> anyhow::Result<()> {
    let index = FlatIndex::build(vec![vec![1.0, 0.0]])?;
    assert!(matches!(
        index.search(&[1.0, 0.0, 0.0], 1),
        Err(Error::DimensionMismatch { expected: 2, actual: 3 })
    ));
    Ok(())
}

#[test]
fn save_load_round_trip_reproduces_ranking() -> anyhow::Result<()> {
    let tmp = tempfile::tempdir()?;
    let path = tmp.path().join("flat.index");
    let index = FlatIndex::build_labeled(rows(64, 12), (100..164).collect())?;
    index.save(&path)?;
    let reloaded = FlatIndex::load(&path)?;

    assert_eq!(reloaded, index);
    assert_eq!(reloaded.labels()[0], 100);
    for q in rows(5, 12) {
        assert_eq!(index.search(&q, 10)?, reloaded.search(&q, 10)?);
    }
    Ok(())
}

#[test]
fn load_rejects_missing_and_garbage_files() -> anyhow::Result<()> {
    let tmp = tempfile::tempdir()?;
    let missing = tmp.path().join("absent.index");
    assert!(matches!(FlatIndex::load(&missing), Err(Error::IndexNotFound(_))));

    let garbage = tmp.path().join("garbage.index");
    std::fs::write(&garbage, b"definitely not an index")?;
    assert!(matches!(FlatIndex::load(&garbage), Err(Error::IndexCorrupt(_))));

    let mut bytes = Vec::new();
    FlatIndex::build(rows(4, 4))?.write_to(&mut bytes)?;
    bytes.truncate(bytes.len() - 3);
    assert!(matches!(FlatIndex::read_from(&mut bytes.as_slice()), Err(Error::IndexCorrupt(_))));
    Ok(())
}
