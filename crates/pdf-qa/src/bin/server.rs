//! Query server binary
//!
//! Run with: cargo run -p pdf-qa --bin pdf-qa-server

use pdf_qa::{
    config::{LlmBackend, RagConfig},
    server::RagServer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pdf_qa=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = RagConfig::load()?;

    tracing::info!("Configuration loaded");
    tracing::info!("  - Embedding model: {}", config.embeddings.model);
    tracing::info!("  - Embedding dimensions: {}", config.embeddings.dimensions);
    tracing::info!("  - LLM backend: {:?}", config.llm.backend);
    match config.llm.backend {
        LlmBackend::Ollama => tracing::info!("  - LLM model: {}", config.llm.generate_model),
        LlmBackend::Gemini => tracing::info!("  - LLM model: {}", config.llm.gemini.model),
    }
    tracing::info!(
        "  - Chunk size: {} (overlap {})",
        config.chunking.chunk_size,
        config.chunking.chunk_overlap
    );
    tracing::info!(
        "  - Retrieval: top_k {}, threshold {}",
        config.retrieval.top_k,
        config.retrieval.relevance_threshold
    );
    tracing::info!("  - Scratch dir: {}", config.scratch.dir.display());

    let server = RagServer::new(config).await?;

    // Providers are checked but not required at startup
    let pipeline = server.state().pipeline();
    match pipeline.embedder().health_check().await {
        Ok(true) => tracing::info!("Embedding provider {} is available", pipeline.embedder().name()),
        _ => {
            tracing::warn!(
                "Embedding provider {} is not available",
                pipeline.embedder().name()
            );
            tracing::warn!("Start Ollama and pull the model: ollama pull nomic-embed-text");
        }
    }
    match pipeline.llm().health_check().await {
        Ok(true) => tracing::info!(
            "LLM provider {} ({}) is available",
            pipeline.llm().name(),
            pipeline.llm().model()
        ),
        _ => tracing::warn!(
            "LLM provider {} ({}) is not available",
            pipeline.llm().name(),
            pipeline.llm().model()
        ),
    }

    println!("\nServer starting...");
    println!("  API: http://{}", server.address());
    println!("  Health: http://{}/health", server.address());
    println!("  API Info: http://{}/api/info", server.address());
    println!("\nEndpoints:");
    println!("  POST /api/query - Ask a question about a PDF (multipart: file, question)");
    println!("\nPress Ctrl+C to stop\n");

    server.start().await?;

    Ok(())
}
