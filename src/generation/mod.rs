
use std::time::Duration;

use anyhow::Context;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;
use url::Url;

use crate::config::{CohereConfig, GenerationConfig};
use crate::{ChatError, Result};

const DEFAULT_TIMEOUT_SECONDS: u64 = 60;

/// Separator placed between retrieved chunks when they are joined into
/// the prompt context.
pub const CONTEXT_DELIMITER: &str = "\n\n";

/// What the model sees when retrieval produced nothing. An empty context
/// string is never sent; this phrasing reliably triggers the model's
/// "not found" answer instead.
pub const NO_CONTEXT_PLACEHOLDER: &str = "No context available.";

/// Generation backend seam: one prompt in, the reply text out.
pub trait AnswerProvider {
    fn complete(&self, prompt: &str, max_tokens: u32, temperature: f32)
    -> anyhow::Result<String>;
}

/// Build the grounding prompt: instruction, retrieved context, question.
/// The instruction confines the model to the supplied context and tells it
/// to say so when the answer is absent.
#[inline]
pub fn build_grounding_prompt(question: &str, context: &str) -> String {
    let context = if context.trim().is_empty() {
        NO_CONTEXT_PLACEHOLDER
    } else {
        context
    };

    format!(
        "Answer the question using only the context below. If the context does \
         not contain the answer, say that it is not available in the provided \
         documents.\n\n\
         Context:\n{context}\n\n\
         Question: {question}\n\
         Answer (respond concisely, ideally in one word or a short phrase):"
    )
}

/// Produce a grounded answer for `question` given already-joined retrieved
/// context. An empty question is rejected before any provider call; empty
/// context is allowed and communicated as "no context available".
#[inline]
pub fn generate_answer(
    provider: &dyn AnswerProvider,
    question: &str,
    context: &str,
    config: &GenerationConfig,
) -> Result<String> {
    if question.trim().is_empty() {
        return Err(ChatError::Generation(
            "question is empty; nothing to answer".to_string(),
        ));
    }

    let prompt = build_grounding_prompt(question, context);

    let reply = provider
        .complete(&prompt, config.max_tokens, config.temperature)
        .map_err(|e| ChatError::Generation(format!("{e:#}")))?;

    Ok(reply.trim().to_string())
}

/// Client for the Cohere generate API. Low temperature and bounded output
/// by configuration; provider failures carry their cause and are never
/// retried here.
#[derive(Debug, Clone)]
pub struct CohereGenerator {
    base_url: Url,
    api_key: String,
    model: String,
    agent: ureq::Agent,
}

#[derive(Debug, Serialize)]
struct GenerateRequest {
    model: String,
    prompt: String,
    max_tokens: u32,
    temperature: f32,
}

impl CohereGenerator {
    #[inline]
    pub fn new(config: &CohereConfig) -> anyhow::Result<Self> {
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
            model: config.generate_model.clone(),
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
}

impl AnswerProvider for CohereGenerator {
    #[inline]
    fn complete(
        &self,
        prompt: &str,
        max_tokens: u32,
        temperature: f32,
    ) -> anyhow::Result<String> {
        let url = self
            .base_url
            .join("/v1/generate")
            .context("Failed to build generate URL")?;

        let request = GenerateRequest {
            model: self.model.clone(),
            prompt: prompt.to_string(),
            max_tokens,
            temperature,
        };

        let request_json =
            serde_json::to_string(&request).context("Failed to serialize generate request")?;

        debug!(
            "Generate request: model={}, max_tokens={}, temperature={}",
            self.model, max_tokens, temperature
        );

        let response_text = self
            .agent
            .post(url.as_str())
            .header("Authorization", &format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .send(&request_json)
            .and_then(|mut resp| resp.body_mut().read_to_string())
            .context("Cohere generate request failed")?;

        let response: Value =
            serde_json::from_str(&response_text).context("Failed to parse generate response")?;

        normalize_reply(&response)
            .ok_or_else(|| anyhow::anyhow!("Unrecognized generate response shape"))
    }
}

/// Pull the reply text out of whichever response shape the provider used:
/// the generate API's `generations[0].text`, the chat API's top-level
/// `text`, or the newer `message.content[0].text`. Returns `None` when
/// none of the known shapes match, so the caller can fail explicitly.
#[inline]
pub fn normalize_reply(response: &Value) -> Option<String> {
    if let Some(text) = response["generations"][0]["text"].as_str() {
        return Some(text.to_string());
    }

    if let Some(text) = response["text"].as_str() {
        return Some(text.to_string());
    }

    if let Some(text) = response["message"]["content"][0]["text"].as_str() {
        return Some(text.to_string());
    }

    None
}
