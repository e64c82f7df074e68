#![expect(
    clippy::tests_outside_test_module,
    reason = "integration tests are only compiled in test mode"
)]

// Integration tests that require a live Cohere API key.
// Run with: COHERE_API_KEY=... cargo test --test integration_cohere

use std::env;
use std::time::Duration;

use doc_chat::config::CohereConfig;
use doc_chat::embeddings::{CohereEmbedder, Embedder};
use doc_chat::generation::{AnswerProvider, CohereGenerator};
use tracing::info;

fn api_key() -> Option<String> {
    env::var("COHERE_API_KEY")
        .ok()
        .filter(|key| !key.trim().is_empty())
}

fn init_test_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter("debug")
        .with_test_writer()
        .try_init()
        .ok();
}

#[test]
fn real_cohere_document_and_query_embeddings() {
    init_test_tracing();
    if api_key().is_none() {
        eprintln!("Skipping: COHERE_API_KEY is not set");
        return;
    }

    let config = CohereConfig::default();
    let client = CohereEmbedder::new(&config)
        .expect("Failed to create Cohere client")
        .with_timeout(Duration::from_secs(60));

    let texts = vec![
        "The mitochondria is the powerhouse of the cell.".to_string(),
        "Rust guarantees memory safety without garbage collection.".to_string(),
    ];

    let embeddings = client
        .embed_documents(&texts)
        .expect("Document embedding should succeed");

    assert_eq!(embeddings.len(), 2);
    let dimension = embeddings[0].len();
    assert!(dimension > 0);
    assert!(embeddings.iter().all(|e| e.len() == dimension));
    info!("Document embeddings have dimension {dimension}");

    let query = client
        .embed_query("What guarantees does Rust make?")
        .expect("Query embedding should succeed");
    assert_eq!(query.len(), dimension);
}

#[test]
fn real_cohere_generation() {
    init_test_tracing();
    if api_key().is_none() {
        eprintln!("Skipping: COHERE_API_KEY is not set");
        return;
    }

    let config = CohereConfig::default();
    let generator = CohereGenerator::new(&config)
        .expect("Failed to create Cohere generator")
        .with_timeout(Duration::from_secs(120));

    let reply = generator
        .complete("Reply with the single word: pong", 16, 0.0)
        .expect("Generation should succeed");

    assert!(!reply.trim().is_empty());
    info!("Generator replied: {reply}");
}
