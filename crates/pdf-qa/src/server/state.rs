//! Application state for the query server

use parking_lot::RwLock;
use std::sync::Arc;

use crate::config::RagConfig;
use crate::error::Result;
use crate::pipeline::QueryPipeline;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    /// Configuration
    config: RagConfig,
    /// Query pipeline shared by all requests
    pipeline: Arc<QueryPipeline>,
    /// Ready state
    ready: RwLock<bool>,
}

impl AppState {
    /// Create application state with the providers named in `config`
    pub async fn new(config: RagConfig) -> Result<Self> {
        tracing::info!(
            "Initializing application state (llm backend: {:?})...",
            config.llm.backend
        );

        let pipeline = Arc::new(QueryPipeline::from_config(&config)?);
        tracing::info!(
            embedder = pipeline.embedder().name(),
            llm = pipeline.llm().name(),
            model = pipeline.llm().model(),
            scratch = %config.scratch.dir.display(),
            "Pipeline initialized"
        );

        Ok(Self::from_pipeline(config, pipeline))
    }

    /// Wrap an already assembled pipeline
    pub fn from_pipeline(config: RagConfig, pipeline: Arc<QueryPipeline>) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                config,
                pipeline,
                ready: RwLock::new(true),
            }),
        }
    }

    /// Get configuration
    pub fn config(&self) -> &RagConfig {
        &self.inner.config
    }

    /// Get the query pipeline
    pub fn pipeline(&self) -> &Arc<QueryPipeline> {
        &self.inner.pipeline
    }

    /// Check if ready
    pub fn is_ready(&self) -> bool {
        *self.inner.ready.read()
    }

    /// Set ready state
    pub fn set_ready(&self, ready: bool) {
        *self.inner.ready.write() = ready;
    }
}
