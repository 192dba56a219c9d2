//! REST API for a finished run.
//!
//! Provides two GET endpoints:
//! - `/state`: run summary, final queue and latest tick
//! - `/ticks`: tick records with optional range filtering

mod handlers;
mod types;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use axum::routing::get;
use tracing::info;

use crate::schedule::TimeframeIntervalSnapshot;
use crate::sim::{RunSummary, TickRecord};

/// Immutable application state shared across all request handlers.
///
/// Constructed once after the run completes and wrapped in `Arc`; all data
/// is read-only so no locks are needed.
pub struct AppState {
    /// Appliance the run scheduled.
    pub appliance_id: String,
    /// Aggregate run summary.
    pub summary: RunSummary,
    /// Queue left after the last tick, evaluated at the end of the run.
    pub queue: Vec<TimeframeIntervalSnapshot>,
    /// Per-tick records.
    pub ticks: Vec<TickRecord>,
}

/// Builds the axum router with all API routes.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/state", get(handlers::get_state))
        .route("/ticks", get(handlers::get_ticks))
        .with_state(state)
}

/// Binds to the given address and serves the API.
///
/// # Errors
///
/// Returns an `io::Error` if the listener cannot bind or the server fails.
pub async fn serve(state: Arc<AppState>, addr: SocketAddr) -> std::io::Result<()> {
    let app = router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("API server listening on http://{addr}");
    axum::serve(listener, app).await
}
