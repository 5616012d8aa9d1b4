//! HTTP façade: a thin axum layer over `PulseRepository`.
//! Everything past validation and id/clock assignment is delegated straight
//! through; the enrichment pipeline runs out-of-band off the stream, not
//! inline with these handlers.

pub mod dto;
mod handlers;

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::clock::{Clock, IdGen};
use crate::repository::PulseRepository;

pub struct AppState {
    pub repo: Arc<PulseRepository>,
    pub clock: Arc<dyn Clock>,
    pub idgen: Arc<dyn IdGen>,
}

pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any);

    Router::new()
        .route("/start-pulse", post(handlers::start_pulse).get(handlers::get_started_pulse))
        .route("/stop-pulse", post(handlers::stop_pulse))
        .route("/ingested-pulses", get(handlers::list_ingested_pulses))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
