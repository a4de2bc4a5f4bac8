//! Wire types for the HTTP API.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use geowatch_core::{GeoError, Report};
use serde::{Deserialize, Serialize};
use serde_json::Value;

// =============================================================================
// REQUESTS
// =============================================================================

/// Body of `POST /location`.
///
/// Coordinates are kept as raw JSON so that missing, `null` and
/// non-numeric values all surface as the same client error. Numeric strings
/// (as posted by plain HTML forms) are accepted.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct LocationRequest {
    #[serde(default)]
    pub tag: Option<String>,
    #[serde(default)]
    pub lat: Option<Value>,
    #[serde(default)]
    pub lon: Option<Value>,
}

impl LocationRequest {
    /// Convert to a core report, substituting `default_tag` when no tag
    /// was sent. An explicit empty tag is kept and rejected downstream.
    pub fn into_report(self, default_tag: &str) -> Result<Report, GeoError> {
        Ok(Report {
            tag: self.tag.unwrap_or_else(|| default_tag.to_string()),
            lat: coordinate("lat", self.lat)?,
            lon: coordinate("lon", self.lon)?,
        })
    }
}

fn coordinate(field: &str, value: Option<Value>) -> Result<Option<f64>, GeoError> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => n
            .as_f64()
            .map(Some)
            .ok_or_else(|| GeoError::InvalidReport(format!("{} is not a valid number", field))),
        Some(Value::String(s)) => s
            .trim()
            .parse::<f64>()
            .map(Some)
            .map_err(|_| GeoError::InvalidReport(format!("{} is not numeric: {:?}", field, s))),
        Some(other) => Err(GeoError::InvalidReport(format!(
            "{} must be a number, got {}",
            field, other
        ))),
    }
}

// =============================================================================
// RESPONSES
// =============================================================================

/// Successful `POST /location` response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocationResponse {
    pub status: String,
    /// Distance from home in meters.
    pub distance: f64,
    pub inside: bool,
}

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// Presence overview.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusResponse {
    pub home_lat: f64,
    pub home_lon: f64,
    pub radius_m: f64,
    pub authorized_tags: usize,
    pub tracked_tags: usize,
    pub inside_count: usize,
    pub inside: Vec<String>,
}

/// Error body, shared by every failing endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub status: String,
    pub message: String,
}

// =============================================================================
// ERRORS
// =============================================================================

/// Errors surfaced to HTTP clients.
#[derive(Debug)]
pub enum ApiError {
    /// Unparseable body or invalid report.
    BadRequest(String),
    /// The failure is not the client's fault.
    Internal(String),
}

impl From<GeoError> for ApiError {
    fn from(err: GeoError) -> Self {
        if !err.is_invalid_report() {
            return Self::Internal(err.to_string());
        }
        match err {
            GeoError::InvalidReport(msg) => Self::BadRequest(msg),
            other => Self::BadRequest(other.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::BadRequest(message) => {
                tracing::warn!("Bad request: {}", message);
                (StatusCode::BAD_REQUEST, message)
            }
            Self::Internal(message) => {
                tracing::error!("Internal error: {}", message);
                (StatusCode::INTERNAL_SERVER_ERROR, message)
            }
        };
        let body = ErrorResponse {
            status: "error".to_string(),
            message,
        };
        (status, Json(body)).into_response()
    }
}

// =============================================================================
// TESTS
// =============================================================================
