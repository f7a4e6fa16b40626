//! HTTP search API for the oncology retrieval pipeline.
//!
//! Exposes `POST /api/search` and `GET /health` over an axum router. The
//! application context ([`AppState`]) is constructed once at process start
//! and handed to every handler by reference; there is no ambient global
//! engine or session factory.
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use onco_server::{AppState, router, serve};
//!
//! let state = AppState::new(Arc::new(retriever), 5);
//! serve("127.0.0.1:8080", state).await?;
//! ```

pub mod error;
pub mod routes;

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::routing::{get, post};
use onco_rag::SearchService;
use tower_http::cors::CorsLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

/// Shared application context, constructed once at startup.
#[derive(Clone)]
pub struct AppState {
    /// The search backend. Store-backed in production, in-memory in tests.
    pub search: Arc<dyn SearchService>,
    /// `top_k` to use when a request omits it.
    pub default_top_k: usize,
}

impl AppState {
    /// Create a new application context.
    pub fn new(search: Arc<dyn SearchService>, default_top_k: usize) -> Self {
        Self { search, default_top_k }
    }
}

/// Build the API router with tracing, CORS, and request-timeout middleware.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/search", post(routes::search))
        .route("/health", get(routes::health))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .layer(TimeoutLayer::new(Duration::from_secs(30)))
        .with_state(state)
}

/// Bind `addr` and serve the API until the process is shut down.
pub async fn serve(addr: &str, state: AppState) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "search API listening");
    axum::serve(listener, router(state)).await?;
    Ok(())
}
