//! Health check endpoint handler.
//!
//! This module provides the `/health` endpoint handler that returns
//! exporter health statistics.

use axum::{extract::State, http::StatusCode, response::IntoResponse};
use tracing::{debug, instrument};

use crate::state::SharedState;

/// Footer text for human-readable HTTP endpoints.
pub const FOOTER_TEXT: &str = concat!("package-exporter ", env!("CARGO_PKG_VERSION"));

/// Handler for the /health endpoint.
#[instrument(skip(state))]
pub async fn health_handler(State(state): State<SharedState>) -> impl IntoResponse {
    debug!("Processing /health request");

    // Derive HTTP status from the most recent collection
    let (status, message) = if state.health_stats.last_collection_failed() {
        (StatusCode::SERVICE_UNAVAILABLE, "Last collection failed")
    } else {
        (StatusCode::OK, "OK")
    };

    let table = state.health_stats.render_table();

    debug!("Health check: {} - {}", status, message);
    (
        status,
        [("Content-Type", "text/plain; charset=utf-8")],
        format!(
            "{message}\n\npackage manager: {}\n\n{table}\n{FOOTER_TEXT}",
            state.collector.family()
        ),
    )
}
