//! Token handler for Meeting Broker.
//!
//! `POST /api/GetToken` - issue a token for an existing identity, or for a
//! newly provisioned one when no `userId` is supplied. A malformed body is
//! treated as empty.

use crate::errors::{Operation, OperationError};
use crate::handlers::{parse_body_or_default, respond};
use crate::models::TokenRequest;
use crate::routes::AppState;
use axum::{body::Bytes, extract::State, response::Response};
use std::sync::Arc;
use std::time::Instant;
use tracing::instrument;

/// Handler for POST /api/GetToken
///
/// # Response
///
/// - 200 OK: `{ token, expiresOn, user }`
/// - 500 Internal Server Error: ACS not configured, or ACS call failed
#[instrument(skip_all, name = "mb.token.get")]
pub async fn get_token(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Response, OperationError> {
    let start = Instant::now();

    let request: TokenRequest = parse_body_or_default(&body);
    let result = state.broker.get_token(request).await;

    respond(
        Operation::GetToken,
        &state.config.cors_allowed_origin,
        result,
        start,
    )
}
