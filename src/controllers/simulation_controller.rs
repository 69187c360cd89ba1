use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use tracing::info;

use crate::error::{EngineError, GeocodeError};
use crate::models::power::{ErrorBody, GeocodeQuery, HealthStatus, SimulationRequest, SimulationResponse};
use crate::models::solar::Location;
use crate::shared_state::{AppState, RunGuard};

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(ErrorBody { error: message.into() })).into_response()
}

fn engine_error_response(e: EngineError) -> Response {
    let status = match &e {
        EngineError::Location(GeocodeError::NotFound(_)) => StatusCode::NOT_FOUND,
        EngineError::Location(GeocodeError::Invalid(_)) => StatusCode::UNPROCESSABLE_ENTITY,
        EngineError::Location(_) => StatusCode::BAD_GATEWAY,
        EngineError::Configuration(_) => StatusCode::UNPROCESSABLE_ENTITY,
        EngineError::Cancelled => StatusCode::CONFLICT,
    };
    error_response(status, e.to_string())
}

/// POST /api/simulations
/// Run a simulation
///
/// Resolves the location (place name or coordinates), then simulates hourly
/// irradiance, cell temperature and DC/AC power over the requested days and
/// returns the series together with daily and total energy. Days whose weather
/// could not be fetched are reported as zero-energy gaps.
#[utoipa::path(
    post,
    path = "/api/simulations",
    request_body = SimulationRequest,
    responses(
        (status = 200, description = "Simulation result", body = SimulationResponse),
        (status = 404, description = "Place not found", body = ErrorBody),
        (status = 409, description = "Run cancelled, or run_id already in use", body = ErrorBody),
        (status = 422, description = "Invalid location, panel or range", body = ErrorBody),
        (status = 502, description = "Geocoder unavailable", body = ErrorBody)
    )
)]
pub async fn run_simulation(
    State(state): State<AppState>,
    Json(req): Json<SimulationRequest>,
) -> Response {
    let run_id = req
        .run_id
        .clone()
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
    let Some(cancel) = state.register_run(&run_id) else {
        return error_response(StatusCode::CONFLICT, format!("run {} is already in progress", run_id));
    };
    let _guard = RunGuard::new(state.clone(), run_id.clone());

    info!("[API] run {} started", run_id);
    match state.engine.run_request(&req, &cancel).await {
        Ok(result) => (
            StatusCode::OK,
            Json(SimulationResponse {
                run_id,
                place: req.place,
                result,
            }),
        )
            .into_response(),
        Err(e) => engine_error_response(e),
    }
}

/// DELETE /api/simulations/{run_id}
/// Cancel a running simulation
#[utoipa::path(
    delete,
    path = "/api/simulations/{run_id}",
    params(
        ("run_id" = String, Path, description = "Id returned by, or passed to, POST /api/simulations")
    ),
    responses(
        (status = 202, description = "Cancellation requested"),
        (status = 404, description = "No run with this id is in progress", body = ErrorBody)
    )
)]
pub async fn cancel_simulation(
    Path(run_id): Path<String>,
    State(state): State<AppState>,
) -> Response {
    if state.cancel_run(&run_id) {
        info!("[API] run {} cancellation requested", run_id);
        StatusCode::ACCEPTED.into_response()
    } else {
        error_response(StatusCode::NOT_FOUND, format!("no run {} in progress", run_id))
    }
}

/// GET /api/geocode
/// Resolve a place name to coordinates
#[utoipa::path(
    get,
    path = "/api/geocode",
    params(GeocodeQuery),
    responses(
        (status = 200, description = "Resolved location", body = Location),
        (status = 404, description = "Place not found", body = ErrorBody),
        (status = 502, description = "Geocoder unavailable", body = ErrorBody)
    )
)]
pub async fn geocode(
    State(state): State<AppState>,
    Query(query): Query<GeocodeQuery>,
) -> Response {
    match state.engine.geocode(&query.q).await {
        Ok(location) => Json(location).into_response(),
        Err(e) => engine_error_response(e),
    }
}

/// GET /api/health
#[utoipa::path(
    get,
    path = "/api/health",
    responses(
        (status = 200, description = "Service status", body = HealthStatus)
    )
)]
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    Json(HealthStatus {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        active_runs: state.active_runs(),
        cache_enabled: state.cache_enabled,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ValidationError;

    #[test]
    fn test_status_mapping() {
        let status = |e: EngineError| engine_error_response(e).status();
        assert_eq!(status(GeocodeError::NotFound("x".into()).into()), StatusCode::NOT_FOUND);
        assert_eq!(status(GeocodeError::Status(503).into()), StatusCode::BAD_GATEWAY);
        assert_eq!(status(ValidationError::PanelArea(0.0).into()), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(status(EngineError::Cancelled), StatusCode::CONFLICT);
    }
}
