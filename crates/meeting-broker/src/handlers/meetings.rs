//! Meeting handlers for Meeting Broker.
//!
//! Implements the meeting endpoints:
//!
//! - `POST /api/CreateMeeting` - Create a meeting with a host identity
//! - `POST /api/JoinMeeting` - Join a meeting with a fresh identity
//!
//! # Security
//!
//! - Tokens are returned to the caller but never logged
//! - Meeting IDs are room codes, not credentials
//! - Upstream error text is forwarded to the caller with a flow prefix

use crate::errors::{Operation, OperationError};
use crate::handlers::{parse_body, parse_body_or_default, respond};
use crate::models::{CreateMeetingRequest, JoinMeetingRequest};
use crate::routes::AppState;
use axum::{body::Bytes, extract::State, response::Response};
use std::sync::Arc;
use std::time::Instant;
use tracing::instrument;

// ============================================================================
// Handler: POST /api/CreateMeeting
// ============================================================================

/// Handler for POST /api/CreateMeeting
///
/// Provisions a host identity, issues its token and returns a new meeting ID
/// with the meeting settings (defaults applied). A body that is not valid
/// JSON is treated as empty.
///
/// # Response
///
/// - 200 OK: Meeting descriptor
/// - 500 Internal Server Error: ACS not configured, or ACS call failed
#[instrument(skip_all, name = "mb.meeting.create")]
pub async fn create_meeting(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Response, OperationError> {
    let start = Instant::now();

    let request: CreateMeetingRequest = parse_body_or_default(&body);
    let result = state.broker.create_meeting(request).await;

    respond(
        Operation::CreateMeeting,
        &state.config.cors_allowed_origin,
        result,
        start,
    )
}

// ============================================================================
// Handler: POST /api/JoinMeeting
// ============================================================================

/// Handler for POST /api/JoinMeeting
///
/// Validates the meeting ID format, provisions a participant identity and
/// issues its token. The meeting ID is not looked up anywhere.
///
/// # Response
///
/// - 200 OK: Join descriptor
/// - 400 Bad Request: Missing field, malformed meeting ID or body
/// - 500 Internal Server Error: ACS not configured, or ACS call failed
#[instrument(skip_all, name = "mb.meeting.join")]
pub async fn join_meeting(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Response, OperationError> {
    let start = Instant::now();

    let result = match parse_body::<JoinMeetingRequest>(&body) {
        Ok(request) => state.broker.join_meeting(request).await,
        Err(e) => Err(e),
    };

    respond(
        Operation::JoinMeeting,
        &state.config.cors_allowed_origin,
        result,
        start,
    )
}
