//! API server module for serving joke retrieval via REST and MCP

pub mod handlers;
pub mod mcp;
pub mod routes;
pub mod server;
pub mod types;

pub use handlers::AppState;
pub use server::build_router;
pub use server::serve_api;
