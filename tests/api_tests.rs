//! HTTP and MCP surface tests driven through the router

use std::sync::Arc;

use axum::body::Body;
use axum::http::Method;
use axum::http::Request;
use axum::http::StatusCode;
use axum::Router;
use jokerank::api::build_router;
use jokerank::api::AppState;
use jokerank::config::AppConfig;
use jokerank::config::ServerConfig;
use jokerank::loader;
use jokerank::models::NewJoke;
use jokerank::retrieval::JokeService;
use serde_json::json;
use serde_json::Value;
use tower::ServiceExt;

async fn app_with_samples(seed: bool) -> Router {
    let config = AppConfig::default();
    let service = JokeService::from_config(&config).await.unwrap();
    if seed {
        for record in loader::sample_records() {
            service.add_joke(NewJoke::from(record)).await.unwrap();
        }
    }
    build_router(AppState::new(Arc::new(service)), &ServerConfig::default())
}

async fn send(app: Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

#[tokio::test]
async fn test_health() {
    let app = app_with_samples(false).await;
    let (status, body) = send(app, Method::GET, "/api/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "healthy");
    assert_eq!(body["data"]["embedding_dimension"], 384);
}

#[tokio::test]
async fn test_search_returns_exact_joke() {
    let app = app_with_samples(true).await;
    let (status, body) = send(
        app,
        Method::POST,
        "/api/search",
        Some(json!({
            "query": "Why don't scientists trust atoms? Because they make up everything!",
            "maxResults": 2
        })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["outcome"], "results");
    assert_eq!(body["data"]["results"][0]["joke_id"], "5");
    assert_eq!(body["data"]["results"][0]["category"], "science");
}

#[tokio::test]
async fn test_search_on_empty_corpus() {
    let app = app_with_samples(false).await;
    let (status, body) = send(
        app,
        Method::POST,
        "/api/search",
        Some(json!({ "query": "anything" })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["outcome"], "no_match");
    assert!(body["data"]["message"].is_string());
}

#[tokio::test]
async fn test_empty_query_is_bad_request() {
    let app = app_with_samples(true).await;
    let (status, body) = send(
        app,
        Method::POST,
        "/api/search",
        Some(json!({ "query": "  " })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn test_malformed_body_keeps_envelope() {
    let app = app_with_samples(true).await;
    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/search")
        .header("content-type", "application/json")
        .body(Body::from("{ not json"))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["success"], false);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn test_mistyped_fields_keep_envelope() {
    let app = app_with_samples(true).await;

    let (status, body) = send(
        app.clone(),
        Method::POST,
        "/api/search",
        Some(json!({ "query": 5 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert!(body["error"].is_string());

    let (status, body) = send(
        app,
        Method::POST,
        "/api/jokes",
        Some(json!({ "tags": ["missing text"] })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn test_feedback_accepts_string_and_numeric_ids() {
    let app = app_with_samples(true).await;

    let (status, _) = send(
        app.clone(),
        Method::POST,
        "/api/feedback",
        Some(json!({ "joke_id": "3", "liked": true })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(
        app,
        Method::POST,
        "/api/feedback",
        Some(json!({ "joke_id": 3, "liked": false, "comment": "meh" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["like_count"], 1);
    assert_eq!(body["data"]["dislike_count"], 1);
}

#[tokio::test]
async fn test_feedback_error_statuses() {
    let app = app_with_samples(true).await;

    let (status, _) = send(
        app.clone(),
        Method::POST,
        "/api/feedback",
        Some(json!({ "joke_id": "404", "liked": true })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(
        app,
        Method::POST,
        "/api/feedback",
        Some(json!({ "joke_id": "abc", "liked": true })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_add_then_get_joke() {
    let app = app_with_samples(false).await;

    let (status, body) = send(
        app.clone(),
        Method::POST,
        "/api/jokes",
        Some(json!({
            "id": "42",
            "text": "I'm reading a book about anti-gravity. It's impossible to put down.",
            "category": "Science",
            "tags": ["Physics", "pun"]
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["id"], "42");
    assert_eq!(body["data"]["category"], "science");

    let (status, _) = send(
        app.clone(),
        Method::POST,
        "/api/jokes",
        Some(json!({ "id": 42, "text": "another joke" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, body) = send(app, Method::GET, "/api/jokes/42", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["tags"], json!(["physics", "pun"]));
}

#[tokio::test]
async fn test_random_joke_on_empty_corpus() {
    let app = app_with_samples(false).await;
    let (status, body) = send(app, Method::GET, "/api/jokes/random", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "The corpus is empty");
}

#[tokio::test]
async fn test_stats() {
    let app = app_with_samples(true).await;
    let (status, body) = send(app, Method::GET, "/api/stats", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["total_jokes"], 5);
}

#[tokio::test]
async fn test_mcp_get_joke_tool() {
    let app = app_with_samples(true).await;
    let (status, body) = send(
        app,
        Method::POST,
        "/mcp/tools/call",
        Some(json!({
            "name": "get_joke",
            "arguments": { "query": "What do you call a fake noodle? An impasta!" }
        })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["is_error"], false);
    let text = body["content"][0]["text"].as_str().unwrap();
    let response: Value = serde_json::from_str(text).unwrap();
    assert_eq!(response["results"][0]["joke_id"], "3");
}

#[tokio::test]
async fn test_mcp_tool_errors() {
    let app = app_with_samples(true).await;

    let (status, _) = send(
        app.clone(),
        Method::POST,
        "/mcp/tools/call",
        Some(json!({ "name": "get_joke", "arguments": {} })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        app.clone(),
        Method::POST,
        "/mcp/tools/call",
        Some(json!({ "name": "tell_fortune", "arguments": {} })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = send(
        app,
        Method::POST,
        "/mcp/tools/call",
        Some(json!({
            "name": "record_feedback",
            "arguments": { "joke_id": "999", "liked": true }
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["is_error"], true);
}

#[tokio::test]
async fn test_mcp_resources() {
    let app = app_with_samples(false).await;

    let (status, body) = send(app.clone(), Method::GET, "/mcp/tools", None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body
        .as_array()
        .unwrap()
        .iter()
        .any(|tool| tool["name"] == "record_feedback"));

    let (status, body) = send(
        app,
        Method::POST,
        "/mcp/resources/read",
        Some(json!({ "uri": "jokes://random" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["is_error"], true);
}
