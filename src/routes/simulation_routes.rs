use axum::{
    routing::{delete, get, post},
    Router,
};

use crate::controllers::simulation_controller::{cancel_simulation, geocode, health, run_simulation};
use crate::shared_state::AppState;

/// Build the `/api/*` sub-router.
pub fn api_routes(state: AppState) -> Router {
    Router::new()
        .route("/simulations",          post(run_simulation))
        .route("/simulations/{run_id}", delete(cancel_simulation))
        .route("/geocode",              get(geocode))
        .route("/health",               get(health))
        .with_state(state)
}
