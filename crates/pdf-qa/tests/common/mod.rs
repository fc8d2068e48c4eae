//! Test doubles shared by the integration tests
#![allow(dead_code)]

use async_trait::async_trait;
use futures_util::stream::{self, StreamExt};
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tempfile::TempDir;
use uuid::Uuid;

use pdf_qa::config::{RagConfig, SamplingConfig};
use pdf_qa::pipeline::QueryPipeline;
use pdf_qa::providers::{
    EmbeddingProvider, LlmProvider, LocalScratchStore, ScratchStore, TextExtractor, TextStream,
};
use pdf_qa::{Error, Result};

pub const LOAN_AGREEMENT: &str = "\
This Loan Agreement is made between the Lender and the Borrower. The parties agree to the terms below.

The annual percentage rate on the principal is five percent. Interest accrues daily on the unpaid principal balance.

Payments are due on the first day of each month. A late payment fee of twenty five dollars applies after a ten day grace period.

Either party may terminate this agreement with thirty days written notice. Termination does not release the Borrower from amounts owed.";

/// Returns fixed text (or an error) for any stored document
pub struct StaticExtractor {
    text: Option<String>,
    pub calls: AtomicUsize,
    pub saw_stored_file: Mutex<Vec<bool>>,
}

impl StaticExtractor {
    pub fn new(text: &str) -> Arc<Self> {
        Arc::new(Self {
            text: Some(text.to_string()),
            calls: AtomicUsize::new(0),
            saw_stored_file: Mutex::new(Vec::new()),
        })
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            text: None,
            calls: AtomicUsize::new(0),
            saw_stored_file: Mutex::new(Vec::new()),
        })
    }
}

#[async_trait]
impl TextExtractor for StaticExtractor {
    async fn extract(&self, path: &Path) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.saw_stored_file.lock().push(path.exists());
        self.text
            .clone()
            .ok_or_else(|| Error::extraction("xref table is corrupt"))
    }

    fn name(&self) -> &str {
        "static"
    }
}

/// Bag-of-words embedder: each lowercase word is hashed into one of `DIMS` buckets
pub struct HashingEmbedder {
    fail: bool,
    pub calls: AtomicUsize,
}

impl HashingEmbedder {
    pub const DIMS: usize = 64;

    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            fail: false,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            fail: true,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn vector(text: &str) -> Vec<f32> {
        let mut v = vec![0.0; Self::DIMS];
        // Shared bias keeps every pair of texts at a positive similarity
        v[0] = 0.5;
        for word in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| w.len() > 2)
        {
            let hash = word
                .to_lowercase()
                .bytes()
                .fold(0xcbf29ce484222325u64, |h, b| {
                    (h ^ b as u64).wrapping_mul(0x100000001b3)
                });
            v[1 + (hash % (Self::DIMS as u64 - 1)) as usize] += 1.0;
        }
        v
    }
}

#[async_trait]
impl EmbeddingProvider for HashingEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(Error::embedding("model not loaded"));
        }
        Ok(Self::vector(text))
    }

    fn dimensions(&self) -> usize {
        Self::DIMS
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(!self.fail)
    }

    fn name(&self) -> &str {
        "hashing"
    }
}

enum Reply {
    Fragments(Vec<String>),
    Fail,
    Hang,
}

/// LLM that replies with fixed fragments (fails, or never finishes) and records its prompts
pub struct RecordingLlm {
    reply: Reply,
    pub prompts: Mutex<Vec<String>>,
}

impl RecordingLlm {
    fn with(reply: Reply) -> Arc<Self> {
        Arc::new(Self {
            reply,
            prompts: Mutex::new(Vec::new()),
        })
    }

    pub fn replying(fragments: &[&str]) -> Arc<Self> {
        Self::with(Reply::Fragments(
            fragments.iter().map(|f| f.to_string()).collect(),
        ))
    }

    pub fn failing() -> Arc<Self> {
        Self::with(Reply::Fail)
    }

    /// Accepts the prompt, then never yields a token
    pub fn hanging() -> Arc<Self> {
        Self::with(Reply::Hang)
    }

    pub fn calls(&self) -> usize {
        self.prompts.lock().len()
    }
}

#[async_trait]
impl LlmProvider for RecordingLlm {
    async fn generate_stream(&self, prompt: &str, _sampling: &SamplingConfig) -> Result<TextStream> {
        self.prompts.lock().push(prompt.to_string());
        match &self.reply {
            Reply::Fragments(fragments) => {
                let items: Vec<Result<String>> = fragments.iter().cloned().map(Ok).collect();
                Ok(stream::iter(items).boxed())
            }
            Reply::Fail => Err(Error::generation("HTTP 500 - model crashed")),
            Reply::Hang => Ok(stream::pending().boxed()),
        }
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(true)
    }

    fn name(&self) -> &str {
        "recording"
    }

    fn model(&self) -> &str {
        "recording-1"
    }
}

/// Local scratch store in a temp dir that counts stores and releases
pub struct CountingScratch {
    inner: LocalScratchStore,
    fail_release: bool,
    pub stored: Mutex<Vec<Uuid>>,
    pub released: Mutex<Vec<Uuid>>,
    _dir: TempDir,
}

impl CountingScratch {
    pub fn new() -> Arc<Self> {
        Self::build(false)
    }

    pub fn failing_release() -> Arc<Self> {
        Self::build(true)
    }

    fn build(fail_release: bool) -> Arc<Self> {
        let dir = TempDir::new().expect("create temp dir");
        Arc::new(Self {
            inner: LocalScratchStore::new(dir.path().join("scratch")),
            fail_release,
            stored: Mutex::new(Vec::new()),
            released: Mutex::new(Vec::new()),
            _dir: dir,
        })
    }

    pub fn dir(&self) -> &Path {
        self.inner.dir()
    }

    /// Files currently left in the scratch directory
    pub fn leftover_files(&self) -> Vec<PathBuf> {
        match std::fs::read_dir(self.inner.dir()) {
            Ok(entries) => entries.filter_map(|e| e.ok()).map(|e| e.path()).collect(),
            Err(_) => Vec::new(),
        }
    }
}

#[async_trait]
impl ScratchStore for CountingScratch {
    async fn store_document(&self, request_id: Uuid, data: &[u8]) -> Result<PathBuf> {
        self.stored.lock().push(request_id);
        self.inner.store_document(request_id, data).await
    }

    fn index_path(&self, request_id: Uuid) -> PathBuf {
        self.inner.index_path(request_id)
    }

    async fn release(&self, request_id: Uuid) -> Result<()> {
        self.released.lock().push(request_id);
        if self.fail_release {
            return Err(Error::Io(std::io::Error::new(
                std::io::ErrorKind::PermissionDenied,
                "scratch dir is read-only",
            )));
        }
        self.inner.release(request_id).await
    }

    fn name(&self) -> &str {
        "counting"
    }
}

/// Configuration with chunks small enough that the agreement splits into several
pub fn test_config() -> RagConfig {
    let mut config = RagConfig::default();
    config.chunking.chunk_size = 160;
    config.chunking.chunk_overlap = 0;
    config.chunking.min_chunk_size = 40;
    config.embeddings.dimensions = HashingEmbedder::DIMS;
    config
}

/// Handles to every double wired into a pipeline
pub struct Harness {
    pub extractor: Arc<StaticExtractor>,
    pub embedder: Arc<HashingEmbedder>,
    pub llm: Arc<RecordingLlm>,
    pub scratch: Arc<CountingScratch>,
    pub pipeline: Arc<QueryPipeline>,
}

impl Harness {
    pub fn new(
        extractor: Arc<StaticExtractor>,
        embedder: Arc<HashingEmbedder>,
        llm: Arc<RecordingLlm>,
        scratch: Arc<CountingScratch>,
    ) -> Self {
        let pipeline = Arc::new(QueryPipeline::new(
            extractor.clone(),
            embedder.clone(),
            llm.clone(),
            scratch.clone(),
            &test_config(),
        ));
        Self {
            extractor,
            embedder,
            llm,
            scratch,
            pipeline,
        }
    }

    /// Pipeline over the loan agreement with a model that answers
    pub fn loan() -> Self {
        Self::new(
            StaticExtractor::new(LOAN_AGREEMENT),
            HashingEmbedder::new(),
            RecordingLlm::replying(&["The annual percentage rate ", "is five percent. "]),
            CountingScratch::new(),
        )
    }

    pub fn embed_calls(&self) -> usize {
        self.embedder.calls.load(Ordering::SeqCst)
    }
}
