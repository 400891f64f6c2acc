use crate::{
    engine::Engine,
    extract::Extractor,
    format,
    response::ExtractSmartResponse,
    util::now_rfc3339,
};
use axum::{
    Router,
    extract::{DefaultBodyLimit, Json, Multipart, State, multipart::MultipartError},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Semaphore;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::warn;

/// Standard error response structure
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Failures surfaced to HTTP clients.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    TooLarge(String),
    #[error("unsupported file format: {0}")]
    UnsupportedFormat(String),
    /// Conversion failures. The full chain goes to the log, not the client.
    #[error("document conversion failed")]
    Conversion(anyhow::Error),
    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::TooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            AppError::UnsupportedFormat(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            AppError::Conversion(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorResponse {
            error: self.to_string(),
        };
        (self.status(), Json(body)).into_response()
    }
}

impl From<MultipartError> for AppError {
    fn from(err: MultipartError) -> Self {
        if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
            return AppError::TooLarge(err.body_text());
        }
        AppError::BadRequest(format!("failed to read multipart body: {}", err.body_text()))
    }
}

pub struct AppState<E: Engine> {
    extractor: Extractor<E>,
    permits: Arc<Semaphore>,
}

/// Build the application router with all routes configured
pub fn app<E: Engine + 'static>(extractor: Extractor<E>) -> Router {
    let cfg = extractor.config();
    let max_upload = cfg.server.max_upload_bytes;
    let permits = Arc::new(Semaphore::new(cfg.server.max_concurrent_conversions.max(1)));
    let state = Arc::new(AppState { extractor, permits });

    Router::new()
        .route("/", get(health_check))
        .route("/extract-smart", post(extract_smart::<E>))
        // Headroom for multipart framing; the per-file cap is checked in the handler.
        .layer(DefaultBodyLimit::max(max_upload.saturating_add(64 * 1024)))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

pub async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": "smart-extract",
        "version": env!("CARGO_PKG_VERSION"),
        "time": now_rfc3339(),
    }))
}

pub async fn extract_smart<E: Engine + 'static>(
    State(state): State<Arc<AppState<E>>>,
    mut multipart: Multipart,
) -> Result<Json<ExtractSmartResponse>, AppError> {
    let cfg = state.extractor.config();
    let mut upload = None;

    while let Some(field) = multipart.next_field().await? {
        if field.name() == Some("file") {
            let filename = field
                .file_name()
                .filter(|s| !s.is_empty())
                .unwrap_or("upload")
                .to_string();
            let bytes = field.bytes().await?;
            upload = Some((filename, bytes));
            break;
        }
    }

    let (filename, bytes) =
        upload.ok_or_else(|| AppError::BadRequest("no file provided in upload".into()))?;

    if bytes.len() > cfg.server.max_upload_bytes {
        return Err(AppError::TooLarge(format!(
            "upload exceeds {} bytes",
            cfg.server.max_upload_bytes
        )));
    }

    let format = format::detect(cfg, &filename)
        .ok_or_else(|| AppError::UnsupportedFormat(filename.clone()))?;

    // Owned by the blocking task, so a dropped request keeps its slot until
    // the conversion finishes.
    let permit = Arc::clone(&state.permits)
        .acquire_owned()
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?;

    let worker = Arc::clone(&state);
    let result = tokio::task::spawn_blocking(move || {
        let _permit = permit;
        worker
            .extractor
            .extract_upload(&filename, format, &bytes)
    })
    .await
    .map_err(|e| {
        warn!("extraction task aborted: {e}");
        AppError::Internal(format!("extraction task aborted: {e}"))
    })?;

    result.map(Json).map_err(AppError::Conversion)
}
