//! Request handlers.

use super::AppState;
use super::types::{
    ApiError, HealthResponse, LocationRequest, LocationResponse, StatusResponse,
};
use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use std::sync::Arc;

/// `POST /location`
///
/// Runs the report through the tracker and, on an entry, hands the
/// notification to the dispatcher after the tracker has returned.
pub async fn location_handler(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<LocationRequest>, JsonRejection>,
) -> Result<Json<LocationResponse>, ApiError> {
    let Json(request) = payload.map_err(|rejection| ApiError::BadRequest(rejection.body_text()))?;
    let report = request.into_report(&state.default_tag)?;
    let outcome = state.tracker.process(&report)?;

    tracing::info!(
        tag = %report.tag,
        lat = ?report.lat,
        lon = ?report.lon,
        distance_m = outcome.distance_m,
        inside = outcome.within_fence,
        "location received"
    );

    if let Some(intent) = outcome.notification {
        tracing::warn!(
            tag = %intent.tag,
            authorized = intent.authorized,
            "geofence entry"
        );
        // Detached: the report does not wait for delivery.
        drop(state.dispatcher.dispatch(intent));
    }

    Ok(Json(LocationResponse {
        status: "ok".to_string(),
        distance: outcome.distance_m,
        inside: outcome.within_fence,
    }))
}

/// `GET /health`
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// `GET /status`
pub async fn status_handler(State(state): State<Arc<AppState>>) -> Json<StatusResponse> {
    let reference = state.tracker.reference();
    let snapshot = state.tracker.snapshot();
    Json(StatusResponse {
        home_lat: reference.location.lat,
        home_lon: reference.location.lon,
        radius_m: reference.radius_m,
        authorized_tags: state.tracker.authorization().len(),
        tracked_tags: snapshot.tracked,
        inside_count: snapshot.inside_count(),
        inside: snapshot.inside,
    })
}
