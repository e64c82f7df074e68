
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;
use url::Url;

use crate::config::CohereConfig;
use crate::embeddings::{Embedder, EmbeddingIntent};

const DEFAULT_TIMEOUT_SECONDS: u64 = 30;

/// Client for the Cohere embed API. Document-side requests are batched at
/// a fixed size. A provider failure fails the whole operation; there is
/// no retry and no fallback here.
#[derive(Debug, Clone)]
pub struct CohereEmbedder {
    base_url: Url,
    api_key: String,
    model: String,
    batch_size: usize,
    agent: ureq::Agent,
}

#[derive(Debug, Serialize)]
struct EmbedRequest {
    texts: Vec<String>,
    model: String,
    input_type: &'static str,
}

#[derive(Debug, Deserialize)]
struct EmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

impl CohereEmbedder {
    #[inline]
    pub fn new(config: &CohereConfig) -> Result<Self> {
        let base_url = config
            .base_url()
            .context("Failed to parse Cohere base URL from config")?;
        let api_key = config
            .resolve_api_key()
            .context("Failed to resolve Cohere API key")?;

        let agent = ureq::Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(DEFAULT_TIMEOUT_SECONDS)))
            .build()
            .into();

        Ok(Self {
            base_url,
            api_key,
            model: config.embed_model.clone(),
            batch_size: config.batch_size,
            agent,
        })
    }

    #[inline]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.agent = ureq::Agent::config_builder()
            .timeout_global(Some(timeout))
            .build()
            .into();
        self
    }

    /// One embed call for a single batch of texts.
    fn embed_batch(&self, texts: &[String], intent: EmbeddingIntent) -> Result<Vec<Vec<f32>>> {
        let url = self
            .base_url
            .join("/v1/embed")
            .context("Failed to build embed URL")?;

        let request = EmbedRequest {
            texts: texts.to_vec(),
            model: self.model.clone(),
            input_type: intent.as_input_type(),
        };

        let request_json =
            serde_json::to_string(&request).context("Failed to serialize embed request")?;

        debug!(
            "Embedding {} texts with intent {}",
            texts.len(),
            intent.as_input_type()
        );

        let response_text = self
            .agent
            .post(url.as_str())
            .header("Authorization", &format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .send(&request_json)
            .and_then(|mut resp| resp.body_mut().read_to_string())
            .context("Cohere embed request failed")?;

        let response: EmbedResponse =
            serde_json::from_str(&response_text).context("Failed to parse embed response")?;

        if response.embeddings.len() != texts.len() {
            anyhow::bail!(
                "Embed response count mismatch: sent {} texts, got {} embeddings",
                texts.len(),
                response.embeddings.len()
            );
        }

        if let Some(first) = response.embeddings.first() {
            if first.is_empty() {
                anyhow::bail!("Embed response contained an empty vector");
            }
            if let Some(bad) = response
                .embeddings
                .iter()
                .find(|e| e.len() != first.len())
            {
                anyhow::bail!(
                    "Embed response dimensions disagree: {} vs {}",
                    first.len(),
                    bad.len()
                );
            }
        }

        Ok(response.embeddings)
    }
}

impl Embedder for CohereEmbedder {
    #[inline]
    fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        debug!("Generating document embeddings for {} texts", texts.len());

        // Batch i's vectors land at positions [i * batch_size, ...), so the
        // final list lines up with the input order.
        let mut embeddings = Vec::with_capacity(texts.len());
        for batch in texts.chunks(self.batch_size) {
            let batch_embeddings = self
                .embed_batch(batch, EmbeddingIntent::Document)
                .with_context(|| format!("Failed to embed batch of {} texts", batch.len()))?;
            embeddings.extend(batch_embeddings);
        }

        debug!("Generated {} document embeddings", embeddings.len());
        Ok(embeddings)
    }

    #[inline]
    fn embed_query(&self, text: &str) -> Result<Vec<f32>> {
        if text.trim().is_empty() {
            anyhow::bail!("Cannot embed an empty query");
        }

        let mut embeddings = self
            .embed_batch(&[text.to_string()], EmbeddingIntent::Query)
            .context("Failed to embed query")?;

        embeddings
            .pop()
            .ok_or_else(|| anyhow::anyhow!("Embed response contained no query vector"))
    }
}
