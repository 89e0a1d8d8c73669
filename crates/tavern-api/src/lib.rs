//! Tavern combat orchestrator: HTTP routes and the real-time endpoint.

pub mod config;
pub mod error;
pub mod realtime;
pub mod routes;
pub mod state;
pub mod telemetry;

use axum::Router;

use crate::state::AppState;

/// Builds the application router without transport layers.
pub fn app(state: AppState) -> Router {
    Router::new()
        .merge(routes::health::router())
        .nest("/api/v1", routes::combat::router())
        .merge(realtime::router())
        .with_state(state)
}
