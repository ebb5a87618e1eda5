//! REST API over a live fleet runtime.
//!
//! Read endpoints serve the newest committed snapshot:
//! - `GET /snapshot`: vehicles, stations, metrics, events and history
//! - `GET /events`: the event stream, newest first (`?limit=N`)
//! - `GET /metrics`: accumulators, derived ratios and grid state
//!
//! Control endpoints forward a command to the stepper:
//! - `POST /control/start`, `/control/stop`, `/control/reset`
//! - `POST /control/mode` with `{ "mode": "BASELINE" | "ADAPTIVE" }`

mod handlers;
mod types;

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};

use crate::runtime::FleetHandle;

pub use types::{ControlResponse, ErrorResponse, EventsQuery, MetricsResponse, ModeRequest};

/// Application state shared across all request handlers.
///
/// Holds only a handle; every request reads the stepper's latest snapshot.
pub struct AppState {
    pub fleet: FleetHandle,
}

/// Builds the axum router with all API routes.
///
/// # Arguments
///
/// * `state` - Shared application state
///
/// # Returns
///
/// Configured `Router` ready to serve.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/snapshot", get(handlers::get_snapshot))
        .route("/events", get(handlers::get_events))
        .route("/metrics", get(handlers::get_metrics))
        .route("/control/start", post(handlers::start))
        .route("/control/stop", post(handlers::stop))
        .route("/control/reset", post(handlers::reset))
        .route("/control/mode", post(handlers::set_mode))
        .with_state(state)
}

/// Binds to the given address and serves the API until the process exits.
///
/// # Errors
///
/// Returns an `io::Error` if the listener cannot bind or the server fails.
pub async fn serve(state: Arc<AppState>, addr: SocketAddr) -> io::Result<()> {
    let app = router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "API server listening");
    axum::serve(listener, app).await
}
