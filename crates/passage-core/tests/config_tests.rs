use figment::Jail;
use std::path::Path;

use passage_core::config::{expand_path, resolve_with_base, Config, EmbeddingBackend, Settings};
use passage_core::Error;

#[test]
fn defaults_apply_without_any_file() {
    Jail::expect_with(|_jail| {
        let settings = Config::load().and_then(|c| c.settings()).map_err(|e| e.to_string())?;
        assert_eq!(settings.chunking.chunk_size, 300);
        assert_eq!(settings.chunking.chunk_overlap, 50);
        assert_eq!(settings.embedding.backend, EmbeddingBackend::Minilm);
        assert_eq!(settings.embedding.model, "all-MiniLM-L6-v2");
        assert_eq!(settings.embedding.cache_capacity, 1000);
        assert_eq!(settings.embedding.batch_size, 32);
        assert_eq!(settings.retrieval.max_results, 4);
        assert!((settings.retrieval.similarity_threshold - 0.10).abs() < f32::EPSILON);
        assert_eq!(settings.storage.index_path, "document.index");
        assert_eq!(settings.storage.chunks_path, "documents.json");
        Ok(())
    });
}

#[test]
fn file_then_env_layers_override_defaults() {
    Jail::expect_with(|jail| {
        jail.create_file(
            "config.toml",
            r#"
            [chunking]
            chunk_size = 120
            chunk_overlap = 20

            [embedding]
            backend = "hashing"
            dimension = 64
            "#,
        )?;
        jail.create_file("config.dev.toml", "[retrieval]\nmax_results = 8\n")?;
        jail.set_env("APP_CHUNKING__CHUNK_OVERLAP", "30");
        jail.set_env("APP_STORAGE__INDEX_PATH", "idx/test.index");

        let config = Config::load().map_err(|e| e.to_string())?;
        let settings = config.settings().map_err(|e| e.to_string())?;
        assert_eq!(settings.chunking.chunk_size, 120);
        assert_eq!(settings.chunking.chunk_overlap, 30);
        assert_eq!(settings.embedding.backend, EmbeddingBackend::Hashing);
        assert_eq!(settings.embedding.dimension, 64);
        assert_eq!(settings.retrieval.max_results, 8);
        assert_eq!(settings.storage.index_path, "idx/test.index");

        let size: usize = config.get("chunking.chunk_size").map_err(|e| e.to_string())?;
        assert_eq!(size, 120);
        Ok(())
    });
}

#[test]
fn invalid_chunking_is_rejected_at_extraction() {
    Jail::expect_with(|jail| {
        jail.set_env("APP_CHUNKING__CHUNK_SIZE", "40");
        jail.set_env("APP_CHUNKING__CHUNK_OVERLAP", "40");
        let result = Config::load().and_then(|c| c.settings());
        assert!(matches!(result, Err(Error::InvalidConfig(_))));
        Ok(())
    });
}

#[test]
fn validate_rejects_zero_capacities_and_bad_threshold() {
    let mut settings = Settings::default();
    settings.embedding.cache_capacity = 0;
    assert!(matches!(settings.validate(), Err(Error::InvalidConfig(_))));

    let mut settings = Settings::default();
    settings.embedding.queue_capacity = 0;
    assert!(settings.validate().is_err());

    let mut settings = Settings::default();
    settings.retrieval.similarity_threshold = 1.5;
    assert!(settings.validate().is_err());

    let mut settings = Settings::default();
    settings.embedding.backend = EmbeddingBackend::Hashing;
    settings.embedding.dimension = 0;
    assert!(settings.validate().is_err());

    assert!(Settings::default().validate().is_ok());
}

#[test]
fn paths_expand_home_and_resolve_against_base() {
    Jail::expect_with(|jail| {
        jail.set_env("PASSAGE_TEST_ROOT", "/srv/passage");
        assert_eq!(expand_path("$PASSAGE_TEST_ROOT/index"), Path::new("/srv/passage/index"));
        assert_eq!(resolve_with_base(Path::new("/base"), "rel/file"), Path::new("/base/rel/file"));
        assert_eq!(resolve_with_base(Path::new("/base"), "/abs/file"), Path::new("/abs/file"));
        Ok(())
    });
}
