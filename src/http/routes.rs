use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use axum::extract::multipart::MultipartError;
use axum::extract::{DefaultBodyLimit, Multipart, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use axum::Router;
use serde::Serialize;
use tracing::{info, warn};

use crate::analysis::{EmotionLabel, FEATURE_COUNT};
use crate::error::{ErrorCategory, ErrorCode, ServiceError};
use crate::service::EmotionService;

/// Code reported for requests rejected before decoding
pub const MALFORMED_REQUEST: i32 = 1000;

/// Multipart field carrying the audio file
const UPLOAD_FIELD: &str = "file";

/// Shared application state for HTTP handlers.
#[derive(Clone)]
pub struct AppState {
    service: Arc<EmotionService>,
}

impl AppState {
    pub fn new(service: Arc<EmotionService>) -> Self {
        Self { service }
    }
}

/// HTTP error variants mapped to JSON responses.
#[derive(Debug)]
pub enum HttpServerError {
    BadRequest(String),
    /// Multipart body could not be read; carries the body-limit status when exceeded
    Multipart(MultipartError),
    Service(ServiceError),
}

impl From<MultipartError> for HttpServerError {
    fn from(err: MultipartError) -> Self {
        Self::Multipart(err)
    }
}

impl From<ServiceError> for HttpServerError {
    fn from(err: ServiceError) -> Self {
        Self::Service(err)
    }
}

impl IntoResponse for HttpServerError {
    fn into_response(self) -> Response {
        let (status, message, code, category) = match self {
            Self::BadRequest(msg) => (
                StatusCode::BAD_REQUEST,
                msg,
                MALFORMED_REQUEST,
                ErrorCategory::InvalidInput,
            ),
            Self::Multipart(err) => (
                err.status(),
                err.body_text(),
                MALFORMED_REQUEST,
                ErrorCategory::InvalidInput,
            ),
            Self::Service(err) => {
                let category = err.category();
                let status = match category {
                    ErrorCategory::InvalidInput => StatusCode::BAD_REQUEST,
                    ErrorCategory::Timeout => StatusCode::GATEWAY_TIMEOUT,
                    ErrorCategory::Processing | ErrorCategory::Internal => {
                        StatusCode::INTERNAL_SERVER_ERROR
                    }
                };
                (status, err.message(), err.code(), category)
            }
        };

        (
            status,
            Json(serde_json::json!({
                "error": message,
                "code": code,
                "category": category,
            })),
        )
            .into_response()
    }
}

/// Classification response payload.
#[derive(Debug, Serialize)]
pub struct SentimentResponse {
    pub emotion: EmotionLabel,
}

/// Health endpoint response payload.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub model_classes: usize,
    pub feature_count: usize,
}

/// Build the Axum router with all handlers.
pub fn build_router(state: AppState, max_upload_bytes: usize) -> Router {
    Router::new()
        .route("/sentiment", post(sentiment))
        .route("/health", get(health))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .with_state(state)
}

/// Run the HTTP server loop until Ctrl-C.
pub async fn run_http_server(
    state: AppState,
    addr: SocketAddr,
    max_upload_bytes: usize,
) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding HTTP listener on {}", addr))?;
    info!(%addr, "emotion classifier listening");

    let router = build_router(state, max_upload_bytes);
    axum::serve(listener, router)
        .with_graceful_shutdown(async {
            if tokio::signal::ctrl_c().await.is_err() {
                warn!("failed to install Ctrl-C handler");
            }
        })
        .await
        .context("serving HTTP router")?;
    Ok(())
}

pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        model_classes: state.service.classifier().model().n_classes(),
        feature_count: FEATURE_COUNT,
    })
}

pub async fn sentiment(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<SentimentResponse>, HttpServerError> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }

        let filename = field.file_name().map(ToString::to_string);
        let bytes = field.bytes().await?;

        let emotion = state
            .service
            .classify_upload(bytes.to_vec(), filename.as_deref())
            .await?;
        return Ok(Json(SentimentResponse { emotion }));
    }

    Err(HttpServerError::BadRequest(format!(
        "multipart field '{}' is required",
        UPLOAD_FIELD
    )))
}
