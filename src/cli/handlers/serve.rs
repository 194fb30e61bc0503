//! API server handlers

use std::sync::Arc;

use crate::api::serve_api;
use crate::config::ServerConfig;
use crate::retrieval::JokeService;
use crate::AppConfig;
use crate::Result;

pub async fn handle_serve_api(
    config: &AppConfig,
    service: Arc<JokeService>,
    host: Option<String>,
    port: Option<u16>,
    no_cors: bool,
) -> Result<()> {
    // CLI arguments take priority over config
    let server = ServerConfig {
        host: host.unwrap_or_else(|| config.server.host.clone()),
        port: port.unwrap_or(config.server.port),
        enable_cors: config.server.enable_cors && !no_cors,
        ..config.server.clone()
    };

    println!("🚀 Starting jokerank API Server");
    println!("===============================\n");
    println!("📍 Host: {}", server.host);
    println!("🔌 Port: {}", server.port);
    println!(
        "🌐 CORS: {}",
        if server.enable_cors { "Enabled" } else { "Disabled" }
    );
    println!("🧠 Model: {}", service.embedder().model());
    println!();

    serve_api(service, &server).await
}
