use passage_core::config::{EmbeddingBackend, EmbeddingSettings};
use passage_core::vector::dot;
use passage_core::Error;
use passage_embed::hashing::tokens;
use passage_embed::{get_default_embedder, resolve_model_dir, HashingEmbedder};

fn norm(v: &[f32]) -> f32 {
    v.iter().map(|x| x * x).sum::<f32>().sqrt()
}

fn hashing_settings(dimension: usize) -> EmbeddingSettings {
    EmbeddingSettings { backend: EmbeddingBackend::Hashing, dimension, ..EmbeddingSettings::default() }
}

#[test]
fn hashing_embedder_shapes_and_determinism() {
    let embedder = get_default_embedder(&hashing_settings(384)).expect("embedder");
    assert_eq!(embedder.dim(), 384);
    assert_eq!(embedder.model_id(), "hashing:d384");

    let texts = vec!["hello world".to_string(), "hello world".to_string()];
    let embs = embedder.embed_batch(&texts).expect("embed_batch");
    assert_eq!(embs.len(), 2);
    assert_eq!(embs[0].len(), 384);
    assert!((norm(&embs[0]) - 1.0).abs() <= 1e-5, "vector is L2-normalized");
    assert_eq!(embs[0], embs[1]);
}

#[test]
fn tokens_drop_stopwords_and_trim_plurals() {
    let got: Vec<String> = tokens("How do the Plants use sunlight? Glass, gas & cells.").collect();
    assert_eq!(got, vec!["plant", "use", "sunlight", "glass", "gas", "cell"]);
}

#[test]
fn shared_content_words_score_higher() {
    let embedder = HashingEmbedder::new(384, 256).expect("embedder");
    let query = embedder.embed_text("how do plants use sunlight for energy");
    let related = embedder.embed_text("Photosynthesis uses sunlight to convert carbon dioxide and water into glucose");
    let unrelated = embedder.embed_text("Mitosis is the process of cell division producing two daughter cells");

    let s_related = dot(&query, &related);
    let s_unrelated = dot(&query, &unrelated);
    assert!(s_related > 0.10, "related score {s_related}");
    assert!(s_related > s_unrelated);
}

#[test]
fn stopword_only_text_embeds_to_zero_vector() {
    let embedder = HashingEmbedder::new(16, 256).expect("embedder");
    let v = embedder.embed_text("what is it");
    assert!(v.iter().all(|x| *x == 0.0));
}

#[test]
fn hashing_respects_max_len() {
    let embedder = HashingEmbedder::new(64, 2).expect("embedder");
    assert_eq!(embedder.embed_text("alpha beta gamma"), embedder.embed_text("alpha beta delta"));
}

#[test]
fn zero_dimension_is_rejected() {
    assert!(matches!(HashingEmbedder::new(0, 10), Err(Error::InvalidConfig(_))));
}

#[test]
fn missing_configured_model_dir_is_model_load_error() {
    let settings = EmbeddingSettings {
        model_dir: Some("/nonexistent/passage-model".into()),
        ..EmbeddingSettings::default()
    };
    assert!(matches!(resolve_model_dir(&settings), Err(Error::ModelLoad(_))));
    assert!(matches!(get_default_embedder(&settings), Err(Error::ModelLoad(_))));
}

#[test]
fn model_dir_without_weights_is_model_load_error() {
    let tmp = tempfile::TempDir::new().expect("tempdir");
    let settings = EmbeddingSettings {
        model_dir: Some(tmp.path().to_string_lossy().into_owned()),
        ..EmbeddingSettings::default()
    };
    assert!(matches!(get_default_embedder(&settings), Err(Error::ModelLoad(_))));
}

/// Needs the all-MiniLM-L6-v2 files; point `APP_MODEL_DIR` at them.
#[test]
#[ignore = "requires local model weights"]
fn minilm_embeds_normalized_vectors() {
    let embedder = get_default_embedder(&EmbeddingSettings::default()).expect("model");
    assert_eq!(embedder.dim(), 384);
    let texts = vec![
        "how do plants use sunlight for energy".to_string(),
        "Photosynthesis uses sunlight to convert carbon dioxide and water into glucose".to_string(),
        "quarterly financial report projections".to_string(),
    ];
    let embs = embedder.embed_batch(&texts).expect("embed");
    for e in &embs {
        assert!((norm(e) - 1.0).abs() < 1e-3);
    }
    assert!(dot(&embs[0], &embs[1]) > dot(&embs[0], &embs[2]));
}
