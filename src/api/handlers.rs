//! API request handlers

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::FromRequest;
use axum::extract::Path;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::response::Response;
use axum::Json;
use tracing::error;
use tracing::info;
use tracing::warn;

use crate::api::types::*;
use crate::models::parse_joke_id;
use crate::models::CorpusStats;
use crate::retrieval::JokeService;
use crate::retrieval::SearchRequest;
use crate::JokeError;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<JokeService>,
}

impl AppState {
    pub fn new(service: Arc<JokeService>) -> Self {
        Self { service }
    }
}

/// Maps service errors onto HTTP status codes
#[derive(Debug)]
pub struct ApiError(pub JokeError);

impl From<JokeError> for ApiError {
    fn from(e: JokeError) -> Self {
        Self(e)
    }
}

pub fn status_for(e: &JokeError) -> StatusCode {
    match e {
        JokeError::InvalidInput(_) => StatusCode::BAD_REQUEST,
        JokeError::NotFound(_) => StatusCode::NOT_FOUND,
        JokeError::DuplicateId(_) => StatusCode::CONFLICT,
        JokeError::DependencyUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = status_for(&self.0);
        if status.is_server_error() {
            error!("Request failed: {}", self.0);
        } else {
            warn!("Request rejected: {}", self.0);
        }
        (status, Json(ApiResponse::<()>::error(self.0.to_string()))).into_response()
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self(JokeError::InvalidInput(rejection.body_text()))
    }
}

/// JSON body extractor whose rejections use the `ApiResponse` envelope
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);

type ApiResult<T> = Result<Json<ApiResponse<T>>, ApiError>;

/// Health check handler
pub async fn health(State(state): State<AppState>) -> Json<ApiResponse<HealthResponse>> {
    let embedder = state.service.embedder();
    Json(ApiResponse::success(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        embedding_model: embedder.model().to_string(),
        embedding_dimension: embedder.dimension(),
    }))
}

/// Search jokes
pub async fn search(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<SearchRequest>,
) -> ApiResult<SearchResponse> {
    info!("POST /api/search: {}", req.query);

    let outcome = state.service.search(&req).await?;
    Ok(Json(ApiResponse::success(SearchResponse::from(outcome))))
}

/// Record a like or dislike
pub async fn submit_feedback(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<FeedbackRequest>,
) -> ApiResult<FeedbackResponse> {
    let joke_id = req.joke_id.resolve()?;
    info!("POST /api/feedback: joke {} liked={}", joke_id, req.liked);

    let stats = state
        .service
        .submit_feedback(joke_id, req.liked, req.comment)
        .await?;

    Ok(Json(ApiResponse::success(FeedbackResponse {
        success: true,
        message: Some("Feedback recorded".to_string()),
        like_count: stats.like_count,
        dislike_count: stats.dislike_count,
    })))
}

/// Add a joke
pub async fn add_joke(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<AddJokeRequest>,
) -> Result<(StatusCode, Json<ApiResponse<JokeResponse>>), ApiError> {
    info!("POST /api/jokes");

    let joke = state.service.add_joke(req.into_new_joke()?).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(JokeResponse::from(joke))),
    ))
}

/// Get joke by id
pub async fn get_joke(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<JokeResponse> {
    info!("GET /api/jokes/{}", id);

    let joke = state.service.get_joke(parse_joke_id(&id)?).await?;
    Ok(Json(ApiResponse::success(JokeResponse::from(joke))))
}

/// Get a random joke
pub async fn random_joke(State(state): State<AppState>) -> Response {
    info!("GET /api/jokes/random");

    match state.service.random_joke().await {
        Ok(Some(joke)) => Json(ApiResponse::success(JokeResponse::from(joke))).into_response(),
        Ok(None) => (
            StatusCode::NOT_FOUND,
            Json(ApiResponse::<()>::error("The corpus is empty")),
        )
            .into_response(),
        Err(e) => ApiError(e).into_response(),
    }
}

/// Corpus statistics
pub async fn get_stats(State(state): State<AppState>) -> ApiResult<CorpusStats> {
    info!("GET /api/stats");

    let stats = state.service.stats().await?;
    Ok(Json(ApiResponse::success(stats)))
}
