
use std::sync::Arc;

use chrono::Local;
use tracing::{debug, info};

use crate::chunking::chunk_text;
use crate::config::Config;
use crate::embeddings::{CohereEmbedder, Embedder};
use crate::extract::{ExtractionWarning, UploadedFile, extract_text};
use crate::generation::{AnswerProvider, CONTEXT_DELIMITER, CohereGenerator, generate_answer};
use crate::retrieval::{DocumentSet, build_document_set, retrieve};
use crate::session::{ConversationTurn, SessionId, SessionStore};
use crate::{ChatError, Result};

/// Summary of one document processing run.
#[derive(Debug, Clone)]
pub struct ProcessingStats {
    pub files: usize,
    pub chunks: usize,
    pub dimension: usize,
    pub warnings: Vec<ExtractionWarning>,
}

/// Ties the pipeline together for one session: documents are processed
/// into a chunk/index pair, questions are answered against it, and every
/// exchange is persisted to the session's history.
pub struct ChatEngine {
    config: Config,
    embedder: Box<dyn Embedder>,
    generator: Box<dyn AnswerProvider>,
    sessions: SessionStore,
    session_id: SessionId,
    documents: Option<Arc<DocumentSet>>,
}

impl ChatEngine {
    /// Build an engine wired to the Cohere providers from configuration.
    #[inline]
    pub fn new(config: Config) -> Result<Self> {
        let embedder = CohereEmbedder::new(&config.cohere)
            .map_err(|e| ChatError::Config(format!("{e:#}")))?;
        let generator = CohereGenerator::new(&config.cohere)
            .map_err(|e| ChatError::Config(format!("{e:#}")))?;

        Self::with_providers(config, Box::new(embedder), Box::new(generator))
    }

    /// Build an engine over caller-supplied providers.
    #[inline]
    pub fn with_providers(
        config: Config,
        embedder: Box<dyn Embedder>,
        generator: Box<dyn AnswerProvider>,
    ) -> Result<Self> {
        let sessions = SessionStore::new(config.sessions_dir_path(), config.session.max_turns)?;
        let session_id = sessions.create_or_resume()?;

        Ok(Self {
            config,
            embedder,
            generator,
            sessions,
            session_id,
            documents: None,
        })
    }

    #[inline]
    pub fn session_id(&self) -> SessionId {
        self.session_id
    }

    #[inline]
    pub fn has_documents(&self) -> bool {
        self.documents.is_some()
    }

    /// Run the build phase: extract, chunk, embed, index. The new
    /// chunk/index pair is built completely before it replaces the old one
    /// in a single assignment, so a failure leaves the previous document
    /// set untouched and queries never observe a half-replaced pair.
    #[inline]
    pub fn process_documents(&mut self, files: &[UploadedFile]) -> Result<ProcessingStats> {
        info!("Processing {} uploaded files", files.len());

        let extraction = extract_text(files)?;
        let chunks = chunk_text(&extraction.text, &self.config.chunking)?;
        let documents = build_document_set(chunks, self.embedder.as_ref())?;

        let stats = ProcessingStats {
            files: files.len(),
            chunks: documents.len(),
            dimension: documents.index().dimension(),
            warnings: extraction.warnings,
        };

        self.documents = Some(Arc::new(documents));

        info!(
            "Processed document set: {} chunks, dimension {}",
            stats.chunks, stats.dimension
        );
        Ok(stats)
    }

    /// Answer a question from the processed documents and persist the
    /// exchange.
    #[inline]
    pub fn ask(&mut self, question: &str) -> Result<String> {
        let question = question.trim();
        if question.is_empty() {
            return Err(ChatError::Generation(
                "question is empty; nothing to answer".to_string(),
            ));
        }

        let documents = self.documents.clone().ok_or_else(|| {
            ChatError::Retrieval(
                "no documents have been processed yet; nothing to search".to_string(),
            )
        })?;

        let top_chunks = retrieve(
            &documents,
            question,
            self.embedder.as_ref(),
            self.config.retrieval.top_k,
        )?;
        debug!("Retrieved {} chunks for the question", top_chunks.len());

        let context = top_chunks.join(CONTEXT_DELIMITER);

        let asked_at = Local::now().naive_local();
        let answer = generate_answer(
            self.generator.as_ref(),
            question,
            &context,
            &self.config.generation,
        )?;
        let answered_at = Local::now().naive_local();

        self.sessions.append_turn(
            self.session_id,
            ConversationTurn {
                question: question.to_string(),
                answer: answer.clone(),
                asked_at,
                answered_at,
            },
        )?;

        Ok(answer)
    }

    /// Up to the `n` most recent turns of this session, oldest first.
    #[inline]
    pub fn history(&self, n: usize) -> Result<Vec<ConversationTurn>> {
        self.sessions.load_recent(self.session_id, n)
    }

    /// Drop the document set and the persisted history for this session.
    #[inline]
    pub fn clear(&mut self) -> Result<()> {
        self.documents = None;
        self.sessions.clear(self.session_id)
    }

    /// Remove sessions idle past the configured retention window.
    #[inline]
    pub fn reap_expired(&self) -> Result<usize> {
        self.sessions.reap_expired(self.config.session.retention_days)
    }
}
