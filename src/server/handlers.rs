//! HTTP request handlers for the grid splitter API.
//!
//! # Endpoints
//!
//! - `POST /api/split-image` - Fetch an image and split it into tiles
//! - `GET /api/health` - Health check endpoint
//!
//! Tiles themselves are served by a static file service under `/images`.

use std::sync::Arc;

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use chrono::{SecondsFormat, Utc};
use serde::{Serialize, Serializer};
use tracing::{error, warn};

use crate::error::{SplitError, TileError};
use crate::fetch::ImageFetcher;
use crate::service::{SplitOutcome, SplitService};
use crate::store::TileArtifact;

use super::extract::SplitBody;

// =============================================================================
// Application State
// =============================================================================

/// Shared application state containing the split service.
pub struct AppState<F: ImageFetcher> {
    pub service: Arc<SplitService<F>>,

    /// Public base URL reported to clients; derived from the request when unset
    pub base_url: Option<String>,
}

impl<F: ImageFetcher> AppState<F> {
    pub fn new(service: Arc<SplitService<F>>) -> Self {
        Self {
            service,
            base_url: None,
        }
    }

    pub fn with_base_url(mut self, base_url: Option<String>) -> Self {
        self.base_url = base_url.map(|url| url.trim_end_matches('/').to_string());
        self
    }

    /// Base URL for a request: the configured one, else scheme and host of
    /// the request itself.
    fn base_url_for(&self, headers: &HeaderMap) -> String {
        if let Some(base_url) = &self.base_url {
            return base_url.clone();
        }

        let scheme = headers
            .get("x-forwarded-proto")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .unwrap_or("http");

        match headers.get(http::header::HOST).and_then(|v| v.to_str().ok()) {
            Some(host) => format!("{}://{}", scheme, host),
            None => String::new(),
        }
    }
}

impl<F: ImageFetcher> Clone for AppState<F> {
    fn clone(&self) -> Self {
        Self {
            service: Arc::clone(&self.service),
            base_url: self.base_url.clone(),
        }
    }
}

// =============================================================================
// Response Types
// =============================================================================

/// JSON error response returned for all error conditions.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Error type identifier (e.g., "invalid_request", "fetch_error")
    pub error: String,

    /// Human-readable error message
    pub message: String,

    /// HTTP status code (included for convenience)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,

    /// Request field a validation error refers to
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

impl ErrorResponse {
    pub fn with_status(
        error: impl Into<String>,
        message: impl Into<String>,
        status: StatusCode,
    ) -> Self {
        Self {
            error: error.into(),
            message: message.into(),
            status: Some(status.as_u16()),
            field: None,
        }
    }

    pub fn with_field(mut self, field: Option<&str>) -> Self {
        self.field = field.map(str::to_string);
        self
    }
}

/// Successful response of the create endpoint.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SplitResponse {
    pub success: bool,
    pub session_id: String,

    /// Normalized grid, e.g. `"2x2"`
    pub grid: String,

    pub tiles_count: usize,

    /// Whole numbers of days are written as integers, e.g. `1` not `1.0`
    #[serde(serialize_with = "serialize_days")]
    pub expires_in_days: f64,

    /// Format detected in the source image
    pub original_format: String,

    /// ISO 8601 expiry of every tile in the session
    pub expires_at: String,

    pub tiles: Vec<TileArtifact>,
    pub base_url: String,
}

fn serialize_days<S: Serializer>(days: &f64, serializer: S) -> Result<S::Ok, S::Error> {
    if days.fract() == 0.0 && *days >= 0.0 && *days <= u64::MAX as f64 {
        serializer.serialize_u64(*days as u64)
    } else {
        serializer.serialize_f64(*days)
    }
}

impl SplitResponse {
    fn new(outcome: SplitOutcome, base_url: String) -> Self {
        Self {
            success: true,
            session_id: outcome.session_id.to_string(),
            grid: outcome.grid.to_string(),
            tiles_count: outcome.artifacts.len(),
            expires_in_days: outcome.retention.days(),
            original_format: outcome.original_format.to_string(),
            expires_at: outcome
                .expires_at
                .to_rfc3339_opts(SecondsFormat::Millis, true),
            tiles: outcome.artifacts,
            base_url,
        }
    }
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,

    /// Current server time, ISO 8601
    pub timestamp: String,

    pub version: String,
}

// =============================================================================
// Error Mapping
// =============================================================================

/// Convert SplitError to HTTP response.
///
/// Validation problems are the caller's to fix and map to 400. A failed
/// fetch is an upstream problem (502); everything else is a 500 carrying the
/// underlying message.
impl IntoResponse for SplitError {
    fn into_response(self) -> Response {
        let (status, error_type, field) = match &self {
            SplitError::Validation(e) => (StatusCode::BAD_REQUEST, "invalid_request", e.field()),
            SplitError::Fetch(_) => (StatusCode::BAD_GATEWAY, "fetch_error", None),
            SplitError::Tile(TileError::Decode { .. }) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "decode_error", None)
            }
            SplitError::Tile(TileError::Geometry { .. }) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "geometry_error", None)
            }
            SplitError::Tile(TileError::Encode { .. }) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "tiling_error", None)
            }
            SplitError::Store(_) => (StatusCode::INTERNAL_SERVER_ERROR, "persist_error", None),
            SplitError::Task { .. } => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", None),
        };
        let message = self.to_string();

        if status.is_server_error() {
            error!(
                error_type = error_type,
                status = status.as_u16(),
                "Server error: {}",
                message
            );
        } else {
            warn!(
                error_type = error_type,
                status = status.as_u16(),
                "Client error: {}",
                message
            );
        }

        let error_response = ErrorResponse::with_status(error_type, message, status).with_field(field);
        (status, Json(error_response)).into_response()
    }
}

// =============================================================================
// Handlers
// =============================================================================

/// Handle create requests.
///
/// # Endpoint
///
/// `POST /api/split-image`
///
/// # Body
///
/// JSON, urlencoded or multipart form with the fields:
///
/// - `imageUrl`: absolute http(s) URL of the source image (required)
/// - `grid`: `<cols>x<rows>`, each between 1 and 10 (required)
/// - `expiresInDays`: retention in days, fractional allowed (default: 1)
///
/// # Response
///
/// - `200 OK`: tile manifest
/// - `400 Bad Request`: invalid or missing field
/// - `502 Bad Gateway`: source image could not be fetched
/// - `500 Internal Server Error`: decoding, tiling or storage failed
pub async fn split_image_handler<F: ImageFetcher + 'static>(
    State(state): State<AppState<F>>,
    headers: HeaderMap,
    body: SplitBody,
) -> Result<Json<SplitResponse>, SplitError> {
    let request = body.into_request()?;
    let outcome = state.service.create_split(request).await?;

    Ok(Json(SplitResponse::new(outcome, state.base_url_for(&headers))))
}

/// Handle health check requests.
///
/// # Endpoint
///
/// `GET /api/health`
///
/// # Response
///
/// `200 OK` with JSON body:
/// ```json
/// {
///   "status": "ok",
///   "timestamp": "2024-05-01T10:00:00.000Z",
///   "version": "0.1.0"
/// }
/// ```
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}
