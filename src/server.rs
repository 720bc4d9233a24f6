//! HTTP surface: score a single comment or label an uploaded CSV.
//!
//! The analyzer is built once at startup. It talks to its backend over
//! blocking HTTP, so every request runs it on the blocking pool.

use crate::analyzer::{Explanation, ProcessSummary, SentimentAnalyzer};
use crate::config::AnalyzerConfig;
use crate::dataset::Dataset;
use crate::error::SentimentError;
use crate::fusion::{Adjustment, Resolution, Rule};
use crate::report::LabelDistribution;
use crate::signals::SignalBundle;
use anyhow::Context;
use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, Query, State},
    http::{header, HeaderName, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use thiserror::Error;
use tower_http::cors::CorsLayer;
use tracing::{error, info};
use utoipa::{IntoParams, OpenApi, ToSchema};
use utoipa_swagger_ui::SwaggerUi;

const MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024;
pub const SUMMARY_HEADER: &str = "x-sentiment-summary";

#[derive(OpenApi)]
#[openapi(
    paths(health, analyze_text, analyze_csv),
    components(
        schemas(
            HealthResponse,
            TextRequest,
            Explanation,
            SignalBundle,
            Resolution,
            Rule,
            Adjustment,
            ProcessSummary,
            LabelDistribution
        )
    ),
    tags(
        (name = "sentiment", description = "Comment sentiment labelling")
    )
)]
struct ApiDoc;

pub struct AppState {
    analyzer: Arc<SentimentAnalyzer>,
}

impl AppState {
    pub fn new(analyzer: SentimentAnalyzer) -> Self {
        Self {
            analyzer: Arc::new(analyzer),
        }
    }
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Sentiment(#[from] SentimentError),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ApiError {
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            ApiError::Sentiment(SentimentError::InputFormat(_)) | ApiError::Sentiment(SentimentError::Csv(_)) => {
                (StatusCode::BAD_REQUEST, "invalid_input")
            }
            ApiError::Sentiment(SentimentError::Configuration(_)) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "configuration_error")
            }
            ApiError::Sentiment(SentimentError::ModelLoad { .. }) => {
                (StatusCode::SERVICE_UNAVAILABLE, "model_unavailable")
            }
            ApiError::Sentiment(SentimentError::Io(_)) | ApiError::Internal(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error")
            }
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, "bad_request"),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();
        if status.is_server_error() {
            error!("Request failed: {}", self);
        }
        let body = Json(json!({
            "error": { "code": code, "message": self.to_string() }
        }));
        (status, body).into_response()
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub backend: String,
    pub model: String,
    pub version: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct TextRequest {
    /// Comment to score; missing or blank scores 0
    pub text: Option<String>,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct CsvParams {
    /// Column holding the comments (default from server config)
    pub text_column: Option<String>,
    /// Column to write labels into (default from server config)
    pub label_column: Option<String>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .merge(SwaggerUi::new("/sentiment-swagger").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .route("/health", get(health))
        .route("/analyze/text", post(analyze_text))
        .route("/analyze/csv", post(analyze_csv))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(CorsLayer::permissive())
        .with_state(Arc::new(state))
}

pub async fn serve(config: AnalyzerConfig, bind: &str) -> anyhow::Result<()> {
    // Connecting probes the model over blocking HTTP.
    let analyzer = tokio::task::spawn_blocking(move || SentimentAnalyzer::new(config))
        .await
        .context("analyzer startup task failed")??;
    let app = router(AppState::new(analyzer));
    let listener = tokio::net::TcpListener::bind(bind)
        .await
        .with_context(|| format!("failed to bind {}", bind))?;
    info!("Listening on {}", listener.local_addr()?);
    axum::serve(listener, app).await?;
    Ok(())
}

/// Run `job` against `analyzer` on the blocking pool.
async fn on_blocking_pool<T, F>(analyzer: Arc<SentimentAnalyzer>, job: F) -> Result<T, ApiError>
where
    T: Send + 'static,
    F: FnOnce(&SentimentAnalyzer) -> Result<T, SentimentError> + Send + 'static,
{
    tokio::task::spawn_blocking(move || job(&analyzer))
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?
        .map_err(ApiError::from)
}

#[utoipa::path(
    get,
    path = "/health",
    responses((status = 200, description = "Service is up", body = HealthResponse)),
    tag = "sentiment"
)]
async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let backend = state.analyzer.backend();
    Json(HealthResponse {
        status: "ok".to_string(),
        backend: backend.kind().to_string(),
        model: backend.model_name().to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

#[utoipa::path(
    post,
    path = "/analyze/text",
    request_body = TextRequest,
    responses(
        (status = 200, description = "Label with the evidence behind it", body = Explanation)
    ),
    tag = "sentiment"
)]
async fn analyze_text(
    State(state): State<Arc<AppState>>,
    Json(request): Json<TextRequest>,
) -> Result<Json<Explanation>, ApiError> {
    let analyzer = Arc::clone(&state.analyzer);
    let explanation = on_blocking_pool(analyzer, move |analyzer| Ok(analyzer.explain(request.text.as_deref()))).await?;
    Ok(Json(explanation))
}

#[utoipa::path(
    post,
    path = "/analyze/csv",
    params(CsvParams),
    request_body(content = String, description = "CSV file (UTF-8, BOM optional)", content_type = "text/csv"),
    responses(
        (status = 200, description = "Labeled CSV (UTF-8 with BOM)", body = String, content_type = "text/csv"),
        (status = 400, description = "Not a CSV, or the text column is missing")
    ),
    tag = "sentiment"
)]
async fn analyze_csv(
    State(state): State<Arc<AppState>>,
    Query(params): Query<CsvParams>,
    body: Bytes,
) -> Result<Response, ApiError> {
    let analyzer = state
        .analyzer
        .with_columns(params.text_column, params.label_column)
        .map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let content = std::str::from_utf8(&body).map_err(|_| ApiError::BadRequest("body is not valid UTF-8".to_string()))?;
    let mut dataset = Dataset::from_csv_str(content)?;
    // Schema problems are reported before any model is touched.
    dataset.require_column(&analyzer.config().text_column)?;
    info!("CSV upload: {} rows", dataset.len());

    let (csv, summary) = on_blocking_pool(Arc::new(analyzer), move |analyzer| {
        let summary = analyzer.process(&mut dataset, None)?;
        Ok((dataset.to_csv_bytes()?, summary))
    })
    .await?;

    let filename = format!(
        "sentiment_results_{}.csv",
        chrono::Local::now().format("%Y%m%d_%H%M%S")
    );
    let disposition = HeaderValue::from_str(&format!("attachment; filename=\"{}\"", filename))
        .map_err(|e| ApiError::Internal(e.to_string()))?;
    let summary_json = serde_json::to_string(&summary).map_err(|e| ApiError::Internal(e.to_string()))?;
    let summary_value = HeaderValue::from_str(&summary_json).map_err(|e| ApiError::Internal(e.to_string()))?;

    Ok((
        [
            (header::CONTENT_TYPE, HeaderValue::from_static("text/csv; charset=utf-8")),
            (header::CONTENT_DISPOSITION, disposition),
            (HeaderName::from_static(SUMMARY_HEADER), summary_value),
        ],
        csv,
    )
        .into_response())
}
