//! HTTP server for PDF question answering

pub mod routes;
pub mod state;

use axum::{
    extract::State,
    http::{HeaderValue, Method, StatusCode},
    routing::get,
    Router,
};
use std::net::SocketAddr;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};

use crate::config::{RagConfig, ServerConfig};
use crate::error::{Error, Result};
use state::AppState;

/// Query HTTP server
pub struct RagServer {
    config: RagConfig,
    state: AppState,
}

impl RagServer {
    /// Create a new server with providers built from `config`
    pub async fn new(config: RagConfig) -> Result<Self> {
        let state = AppState::new(config.clone()).await?;
        Ok(Self { config, state })
    }

    /// Create a server around existing state
    pub fn with_state(state: AppState) -> Self {
        Self {
            config: state.config().clone(),
            state,
        }
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Build the router with all routes
    pub fn router(&self) -> Router {
        let router = Router::new()
            .route("/health", get(health_check))
            .route("/ready", get(readiness))
            .nest("/api", routes::api_routes(self.config.server.max_upload_size))
            .with_state(self.state.clone())
            .layer(TraceLayer::new_for_http());

        match cors_layer(&self.config.server) {
            Some(cors) => router.layer(cors),
            None => router,
        }
    }

    /// Start the server
    pub async fn start(self) -> Result<()> {
        let addr: SocketAddr = self
            .address()
            .parse()
            .map_err(|e| Error::Config(format!("Invalid address: {}", e)))?;

        let router = self.router();

        tracing::info!("Starting query server on http://{}", addr);

        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|e| Error::Config(format!("Failed to bind: {}", e)))?;

        axum::serve(listener, router)
            .await
            .map_err(|e| Error::internal(format!("Server error: {}", e)))?;

        Ok(())
    }

    /// Get the server address
    pub fn address(&self) -> String {
        format!("{}:{}", self.config.server.host, self.config.server.port)
    }
}

/// CORS restricted to the configured origins; `None` when CORS is disabled
fn cors_layer(config: &ServerConfig) -> Option<CorsLayer> {
    if !config.enable_cors {
        return None;
    }

    let origins: Vec<HeaderValue> = config
        .allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    let allow_origin = if config.allowed_origins.is_empty() {
        AllowOrigin::any()
    } else {
        AllowOrigin::list(origins)
    };

    Some(
        CorsLayer::new()
            .allow_origin(allow_origin)
            .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
            .allow_headers(Any),
    )
}

/// Health check endpoint
async fn health_check() -> &'static str {
    "OK"
}

/// Readiness check endpoint
async fn readiness(State(state): State<AppState>) -> StatusCode {
    if state.is_ready() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    }
}
