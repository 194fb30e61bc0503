//! API route definitions

use axum::routing::get;
use axum::routing::post;
use axum::Router;

use super::handlers::AppState;
use super::handlers::{
    self,
};

/// Create RESTful API router
pub fn api_routes(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(handlers::health))
        // Retrieval
        .route("/search", post(handlers::search))
        .route("/feedback", post(handlers::submit_feedback))
        // Corpus
        .route("/jokes", post(handlers::add_joke))
        .route("/jokes/random", get(handlers::random_joke))
        .route("/jokes/:id", get(handlers::get_joke))
        // Statistics
        .route("/stats", get(handlers::get_stats))
        .with_state(state)
}
