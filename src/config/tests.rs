use super::*;

use tempfile::TempDir;

#[test]
fn missing_file_yields_defaults() {
    let dir = TempDir::new().expect("tempdir");
    let config = Config::load(dir.path()).expect("load should succeed");

    assert_eq!(config, Config {
        base_dir: dir.path().to_path_buf(),
        ..Config::default()
    });
    assert_eq!(config.cohere.embed_model, "embed-english-v3.0");
    assert_eq!(config.cohere.batch_size, 10);
    assert_eq!(config.chunking.chunk_size, 600);
    assert_eq!(config.chunking.chunk_overlap, 300);
    assert_eq!(config.retrieval.top_k, 3);
    assert_eq!(config.session.max_turns, 10);
    assert_eq!(config.session.retention_days, 10);
}

#[test]
fn save_and_reload_round_trips() {
    let dir = TempDir::new().expect("tempdir");

    let mut config = Config::load(dir.path()).expect("load should succeed");
    config.retrieval.top_k = 5;
    config.chunking.chunk_size = 800;
    config.save().expect("save should succeed");

    let reloaded = Config::load(dir.path()).expect("reload should succeed");
    assert_eq!(reloaded.retrieval.top_k, 5);
    assert_eq!(reloaded.chunking.chunk_size, 800);
}

#[test]
fn partial_file_falls_back_to_section_defaults() {
    let dir = TempDir::new().expect("tempdir");
    fs::write(
        dir.path().join("config.toml"),
        "[retrieval]\ntop_k = 7\n",
    )
    .expect("write config");

    let config = Config::load(dir.path()).expect("load should succeed");
    assert_eq!(config.retrieval.top_k, 7);
    assert_eq!(config.chunking.chunk_size, 600);
}

#[test]
fn invalid_overlap_is_rejected() {
    let mut config = Config::default();
    config.chunking.chunk_overlap = config.chunking.chunk_size;

    assert!(matches!(
        config.validate(),
        Err(ConfigError::OverlapTooLarge(_, _))
    ));
}

#[test]
fn invalid_batch_size_is_rejected() {
    let mut config = Config::default();
    config.cohere.batch_size = 0;
    assert!(matches!(
        config.validate(),
        Err(ConfigError::InvalidBatchSize(0))
    ));

    config.cohere.batch_size = 97;
    assert!(matches!(
        config.validate(),
        Err(ConfigError::InvalidBatchSize(97))
    ));
}

#[test]
fn empty_model_is_rejected() {
    let mut config = Config::default();
    config.cohere.embed_model = "  ".to_string();
    assert!(matches!(
        config.validate(),
        Err(ConfigError::InvalidModel(_))
    ));
}

#[test]
fn invalid_temperature_is_rejected() {
    let mut config = Config::default();
    config.generation.temperature = 2.5;
    assert!(matches!(
        config.validate(),
        Err(ConfigError::InvalidTemperature(_))
    ));
}

#[test]
fn invalid_values_in_file_fail_to_load() {
    let dir = TempDir::new().expect("tempdir");
    fs::write(
        dir.path().join("config.toml"),
        "[session]\nmax_turns = 0\n",
    )
    .expect("write config");

    assert!(Config::load(dir.path()).is_err());
}

#[test]
fn config_file_api_key_is_used_when_env_is_unset() {
    let config = CohereConfig {
        api_key: Some("from-file".to_string()),
        ..CohereConfig::default()
    };

    // The environment variable may legitimately be set on a developer
    // machine; only assert the file fallback when it is not.
    if env::var(API_KEY_ENV_VAR).is_err() {
        assert_eq!(config.resolve_api_key().expect("key resolves"), "from-file");

        let empty = CohereConfig::default();
        assert!(matches!(
            empty.resolve_api_key(),
            Err(ConfigError::MissingApiKey)
        ));
    }
}

#[test]
fn sessions_dir_is_under_the_base_dir() {
    let dir = TempDir::new().expect("tempdir");
    let config = Config::load(dir.path()).expect("load should succeed");

    assert_eq!(config.sessions_dir_path(), dir.path().join("sessions"));
    assert_eq!(config.config_file_path(), dir.path().join("config.toml"));
}
