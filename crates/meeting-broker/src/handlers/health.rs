//! Health check handler.
//!
//! Liveness only: the service is up whenever it can answer. Whether ACS is
//! configured is reported but does not change the status.

use crate::models::HealthResponse;
use crate::routes::AppState;
use axum::extract::State;
use axum::Json;
use std::sync::Arc;
use tracing::instrument;

/// Handler for GET /health
///
/// ## Example Response
///
/// ```json
/// {
///   "status": "healthy",
///   "acsConfigured": true
/// }
/// ```
#[instrument(skip_all, name = "mb.health.check")]
pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        acs_configured: state.broker.is_configured(),
    })
}
