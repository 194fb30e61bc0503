//! HTTP server implementation

use std::sync::Arc;
use std::time::Duration;

use axum::error_handling::HandleErrorLayer;
use axum::http::StatusCode;
use axum::Json;
use axum::Router;
use tower::limit::GlobalConcurrencyLimitLayer;
use tower::BoxError;
use tower::ServiceBuilder;
use tower_http::compression::CompressionLayer;
use tower_http::cors::Any;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::api::handlers::AppState;
use crate::api::mcp;
use crate::api::routes;
use crate::api::types::ApiResponse;
use crate::config::ServerConfig;
use crate::retrieval::JokeService;
use crate::Result;

async fn handle_middleware_error(err: BoxError) -> (StatusCode, Json<ApiResponse<()>>) {
    if err.is::<tower::timeout::error::Elapsed>() {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ApiResponse::error("Request timed out")),
        )
    } else {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ApiResponse::error(format!("Unhandled middleware error: {err}"))),
        )
    }
}

/// Assemble `/api` and `/mcp` with the middleware stack
pub fn build_router(state: AppState, server: &ServerConfig) -> Router {
    let mut app = Router::new()
        .nest("/api", routes::api_routes(state.clone()))
        .nest("/mcp", mcp::mcp_routes(state));

    app = app
        .layer(
            ServiceBuilder::new()
                .layer(HandleErrorLayer::new(handle_middleware_error))
                .timeout(Duration::from_secs(server.request_timeout_secs.max(1))),
        )
        .layer(GlobalConcurrencyLimitLayer::new(server.max_in_flight.max(1)))
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new());

    // Add CORS if enabled
    if server.enable_cors {
        info!("✅ CORS enabled");
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);
        app = app.layer(cors);
    }

    app
}

/// Start the API server over an already wired service
pub async fn serve_api(service: Arc<JokeService>, server: &ServerConfig) -> Result<()> {
    info!("🚀 Starting joke retrieval API server...");

    let app = build_router(AppState::new(service), server);

    // Start server
    let addr = format!("{}:{}", server.host, server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    info!("🌐 API server listening on http://{}", addr);
    info!("📋 RESTful API available at http://{}/api", addr);
    info!("🔌 MCP service available at http://{}/mcp", addr);
    info!("");
    info!("Available endpoints:");
    info!("  GET  /api/health          - Health check");
    info!("  POST /api/search          - Search jokes");
    info!("  POST /api/feedback        - Like or dislike a joke");
    info!("  POST /api/jokes           - Add a joke");
    info!("  GET  /api/jokes/:id       - Get joke by id");
    info!("  GET  /api/jokes/random    - Random joke");
    info!("  GET  /api/stats           - Statistics");
    info!("");
    info!("  GET  /mcp/                - MCP server info");
    info!("  GET  /mcp/resources       - List MCP resources");
    info!("  POST /mcp/resources/read  - Read MCP resource");
    info!("  GET  /mcp/tools           - List MCP tools");
    info!("  POST /mcp/tools/call      - Call MCP tool");

    axum::serve(listener, app).await?;

    Ok(())
}
