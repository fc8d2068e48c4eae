//! Per-request question-answering pipeline
//!
//! One run walks a single upload through every stage in order:
//!
//! ```text
//! Received -> Extracted -> Chunked -> Embedded -> Indexed
//!          -> Searched -> Filtered -> Generated -> Completed
//! ```
//!
//! Any stage before generation can fail the run, and the failure carries the
//! stage it happened in. Generation failures never fail the run; they
//! degrade to a non-answer. Scratch files are keyed by a fresh request id and
//! released once the run ends, whichever way it ends.

use serde::Serialize;
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::Instrument;
use uuid::Uuid;

use crate::config::{LlmBackend, RagConfig, RetrievalConfig};
use crate::error::{Error, Result};
use crate::generation::AnswerGenerator;
use crate::ingestion::{PdfTextExtractor, TextChunker};
use crate::providers::{
    EmbeddingProvider, GeminiLlm, LlmProvider, LocalScratchStore, OllamaClient, OllamaEmbedder,
    OllamaLlm, ScratchStore, TextExtractor,
};
use crate::retrieval::{self, IndexAdapter, IndexStore};
use crate::types::{QueryRequest, QueryResult};

/// Pipeline stages, named after the state a successful stage leaves the run in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    Received,
    Extracted,
    Chunked,
    Embedded,
    Indexed,
    Searched,
    Filtered,
    Generated,
    Completed,
    Failed,
}

impl PipelineStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Received => "received",
            Self::Extracted => "extracted",
            Self::Chunked => "chunked",
            Self::Embedded => "embedded",
            Self::Indexed => "indexed",
            Self::Searched => "searched",
            Self::Filtered => "filtered",
            Self::Generated => "generated",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A failed run: the stage that was in progress and what went wrong
#[derive(Debug)]
pub struct PipelineFailure {
    pub stage: PipelineStage,
    pub error: Error,
}

impl PipelineFailure {
    pub fn new(stage: PipelineStage, error: Error) -> Self {
        Self { stage, error }
    }

    /// Message safe to hand back to the caller
    pub fn user_message(&self) -> String {
        match &self.error {
            Error::Extraction(_) => "Failed to extract text from the PDF".to_string(),
            Error::Chunking(_) => "Failed to create meaningful text chunks".to_string(),
            Error::Validation(message) => message.clone(),
            other => format!("An error occurred: {}", other),
        }
    }
}

impl fmt::Display for PipelineFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} stage failed: {}", self.stage, self.error)
    }
}

impl std::error::Error for PipelineFailure {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}

fn at(stage: PipelineStage) -> impl FnOnce(Error) -> PipelineFailure {
    move |error| PipelineFailure::new(stage, error)
}

/// Extraction failures of any kind are reported as extraction errors
fn as_extraction_error(error: Error) -> Error {
    match error {
        Error::Extraction(_) => error,
        other => Error::extraction(other.to_string()),
    }
}

/// Scratch files of one run, released exactly once
///
/// Released explicitly when the run ends. If the run is dropped first (the
/// caller went away mid-request), release is handed to a background task.
struct ScratchLease {
    scratch: Arc<dyn ScratchStore>,
    request_id: Uuid,
    armed: bool,
}

impl ScratchLease {
    fn new(scratch: Arc<dyn ScratchStore>, request_id: Uuid) -> Self {
        Self {
            scratch,
            request_id,
            armed: true,
        }
    }

    async fn release(mut self) {
        self.armed = false;
        release_scratch(Arc::clone(&self.scratch), self.request_id).await;
    }
}

impl Drop for ScratchLease {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }

        let scratch = Arc::clone(&self.scratch);
        let request_id = self.request_id;
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                tracing::warn!(%request_id, "Run abandoned, releasing scratch files in the background");
                handle.spawn(release_scratch(scratch, request_id));
            }
            Err(_) => {
                tracing::warn!(%request_id, "Run abandoned outside a runtime, scratch files left behind");
            }
        }
    }
}

/// Release failures are logged and swallowed
async fn release_scratch(scratch: Arc<dyn ScratchStore>, request_id: Uuid) {
    if let Err(e) = scratch.release(request_id).await {
        tracing::warn!(
            %request_id,
            store = scratch.name(),
            error = %e,
            "Failed to release scratch files"
        );
    }
}

/// Question-answering pipeline over one uploaded PDF per request
pub struct QueryPipeline {
    extractor: Arc<dyn TextExtractor>,
    chunker: TextChunker,
    adapter: IndexAdapter,
    index_store: IndexStore,
    generator: AnswerGenerator,
    scratch: Arc<dyn ScratchStore>,
    retrieval: RetrievalConfig,
}

impl QueryPipeline {
    /// Assemble a pipeline from explicit providers
    pub fn new(
        extractor: Arc<dyn TextExtractor>,
        embedder: Arc<dyn EmbeddingProvider>,
        llm: Arc<dyn LlmProvider>,
        scratch: Arc<dyn ScratchStore>,
        config: &RagConfig,
    ) -> Self {
        Self {
            extractor,
            chunker: TextChunker::from_config(&config.chunking),
            adapter: IndexAdapter::new(embedder),
            index_store: IndexStore::new(),
            generator: AnswerGenerator::new(llm, config.generation.clone()),
            scratch,
            retrieval: config.retrieval.clone(),
        }
    }

    /// Build the default providers described by `config`
    pub fn from_config(config: &RagConfig) -> Result<Self> {
        let ollama = Arc::new(OllamaClient::new(&config.llm)?);
        let embedder: Arc<dyn EmbeddingProvider> =
            Arc::new(OllamaEmbedder::new(Arc::clone(&ollama), &config.embeddings));

        let llm: Arc<dyn LlmProvider> = match config.llm.backend {
            LlmBackend::Ollama => Arc::new(OllamaLlm::new(
                Arc::clone(&ollama),
                config.llm.generate_model.clone(),
            )),
            LlmBackend::Gemini => Arc::new(GeminiLlm::new(
                &config.llm.gemini,
                config.generation.timeout_secs,
            )?),
        };

        Ok(Self::new(
            Arc::new(PdfTextExtractor::default()),
            embedder,
            llm,
            Arc::new(LocalScratchStore::from_config(&config.scratch)),
            config,
        ))
    }

    pub fn embedder(&self) -> &Arc<dyn EmbeddingProvider> {
        self.adapter.embedder()
    }

    pub fn llm(&self) -> &Arc<dyn LlmProvider> {
        self.generator.llm()
    }

    pub fn scratch(&self) -> &Arc<dyn ScratchStore> {
        &self.scratch
    }

    /// Answer one question about one uploaded PDF
    pub async fn run(
        &self,
        request: QueryRequest,
    ) -> std::result::Result<QueryResult, PipelineFailure> {
        let request_id = Uuid::new_v4();
        let span = tracing::info_span!(
            "query",
            request.id = %request_id,
            filename = %request.document.filename
        );

        self.run_request(request_id, request).instrument(span).await
    }

    async fn run_request(
        &self,
        request_id: Uuid,
        request: QueryRequest,
    ) -> std::result::Result<QueryResult, PipelineFailure> {
        let start = Instant::now();
        request.validate().map_err(at(PipelineStage::Received))?;

        tracing::info!(
            bytes = request.document.size(),
            question = %request.question,
            "Query received"
        );

        let lease = ScratchLease::new(Arc::clone(&self.scratch), request_id);
        let result = self.store_and_answer(request_id, &request, start).await;
        lease.release().await;

        match &result {
            Ok(result) => tracing::info!(
                stage = %PipelineStage::Completed,
                elapsed_ms = result.processing_time_ms,
                context_items = result.relevant_context.len(),
                generation_failed = result.generation_failed,
                "Query completed"
            ),
            Err(failure) => tracing::warn!(
                stage = %failure.stage,
                error = %failure.error,
                "Query failed"
            ),
        }

        result
    }

    async fn store_and_answer(
        &self,
        request_id: Uuid,
        request: &QueryRequest,
        start: Instant,
    ) -> std::result::Result<QueryResult, PipelineFailure> {
        let path = self
            .scratch
            .store_document(request_id, &request.document.data)
            .await
            .map_err(at(PipelineStage::Received))?;

        self.run_stages(request_id, &path, &request.question, start)
            .await
    }

    async fn run_stages(
        &self,
        request_id: Uuid,
        document_path: &Path,
        question: &str,
        start: Instant,
    ) -> std::result::Result<QueryResult, PipelineFailure> {
        let text = self
            .extractor
            .extract(document_path)
            .await
            .map_err(as_extraction_error)
            .and_then(|text| {
                if text.trim().is_empty() {
                    Err(Error::extraction("No extractable text in document"))
                } else {
                    Ok(text)
                }
            })
            .map_err(at(PipelineStage::Extracted))?;
        tracing::debug!(
            stage = %PipelineStage::Extracted,
            chars = text.len(),
            extractor = self.extractor.name()
        );

        let chunks = self.chunker.chunk(&text);
        if chunks.is_empty() {
            return Err(PipelineFailure::new(
                PipelineStage::Chunked,
                Error::Chunking("Text produced no chunks".to_string()),
            ));
        }
        tracing::debug!(stage = %PipelineStage::Chunked, chunks = chunks.len());

        let embeddings = self
            .adapter
            .embed(&chunks)
            .await
            .map_err(at(PipelineStage::Embedded))?;
        tracing::debug!(stage = %PipelineStage::Embedded, embeddings = embeddings.len());

        let index_path = self.scratch.index_path(request_id);
        let index = async {
            let built = self.adapter.build_index(&embeddings)?;
            self.index_store.save(&index_path, &built).await?;
            self.index_store.load(&index_path).await
        }
        .await
        .map_err(at(PipelineStage::Indexed))?;
        tracing::debug!(stage = %PipelineStage::Indexed, entries = index.len());

        let candidates = self
            .adapter
            .search(&index, question, self.retrieval.top_k)
            .await
            .map_err(at(PipelineStage::Searched))?;
        let candidates_retrieved = candidates.len();
        tracing::debug!(stage = %PipelineStage::Searched, candidates = candidates_retrieved);

        let (context, threshold_used) =
            retrieval::filter(candidates, self.retrieval.relevance_threshold);
        tracing::debug!(
            stage = %PipelineStage::Filtered,
            threshold = threshold_used,
            kept = context.len()
        );

        let max_context_items = self.generator.config().max_context_items;
        let outcome = self
            .generator
            .generate(question, &context, max_context_items)
            .await
            .map_err(at(PipelineStage::Generated))?;
        let generation_failed = outcome.is_failed();
        let answer = outcome.into_answer();
        tracing::debug!(stage = %PipelineStage::Generated, generation_failed);

        Ok(QueryResult {
            answer: answer.text,
            relevant_context: context.into_iter().map(|c| c.text).collect(),
            cited_context: answer.cited_context,
            threshold_used,
            candidates_retrieved,
            generation_failed,
            processing_time_ms: start.elapsed().as_millis() as u64,
        })
    }
}
