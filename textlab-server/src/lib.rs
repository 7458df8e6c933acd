//! # Text Lab Server Library
//!
//! Shared types and the HTTP router for the Text Lab server.
//! This library is used by both the binary and integration tests.

use std::sync::Arc;

use axum::{
    routing::{get, patch, post},
    Router,
};
use textlab_core::SessionStore;

pub mod config;
pub mod drafts;
pub mod health;
pub mod metrics;
pub mod routes;
pub mod validation;

pub use config::{CliArgs, GeminiConfig, ServerConfig};
pub use drafts::{
    DraftServiceError, GeminiLayoutService, LayoutService, RetryConfig, SampleLayoutService,
};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Composition sessions.
    pub store: SessionStore,
    /// Source of AI layout drafts.
    pub layouts: Arc<dyn LayoutService>,
}

impl AppState {
    /// Create state over a store and a layout service.
    pub fn new(store: SessionStore, layouts: Arc<dyn LayoutService>) -> Self {
        Self { store, layouts }
    }

    /// State backed by the offline sample layout service.
    pub fn offline() -> Self {
        Self::new(SessionStore::new(), Arc::new(SampleLayoutService))
    }

    /// State for a resolved configuration: Gemini when a key is set,
    /// otherwise the sample service.
    ///
    /// # Errors
    ///
    /// Returns an error if the Gemini client cannot be built.
    pub fn from_config(config: &ServerConfig) -> Result<Self, DraftServiceError> {
        let layouts: Arc<dyn LayoutService> = match &config.gemini {
            Some(gemini) => Arc::new(GeminiLayoutService::new(gemini)?),
            None => Arc::new(SampleLayoutService),
        };
        Ok(Self::new(SessionStore::new(), layouts))
    }
}

/// API and health routes, without middleware or the metrics endpoint.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health/live", get(health::liveness))
        .route("/health/ready", get(health::readiness))
        .route("/api/glyphs", get(routes::list_glyphs))
        .route("/api/sessions/{session_id}", get(routes::get_session))
        .route(
            "/api/sessions/{session_id}/elements",
            post(routes::add_element),
        )
        .route(
            "/api/sessions/{session_id}/elements/activate",
            post(routes::activate_glyph),
        )
        .route(
            "/api/sessions/{session_id}/elements/{element_id}",
            patch(routes::update_element),
        )
        .route(
            "/api/sessions/{session_id}/selection",
            post(routes::select),
        )
        .route(
            "/api/sessions/{session_id}/commands",
            post(routes::command),
        )
        .route(
            "/api/sessions/{session_id}/pointer",
            post(routes::pointer),
        )
        .route(
            "/api/sessions/{session_id}/drafts",
            post(routes::request_drafts).delete(routes::discard_drafts),
        )
        .route(
            "/api/sessions/{session_id}/drafts/{index}/accept",
            post(routes::accept_draft),
        )
        .route(
            "/api/sessions/{session_id}/export",
            get(routes::export_scene),
        )
        .with_state(state)
}
