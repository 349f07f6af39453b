//! HTTP request handlers for Meeting Broker.
//!
//! The three flow handlers share the helpers below: lenient body parsing
//! and one place that turns a flow result into the response envelope.

pub mod health;
pub mod meetings;
pub mod metrics;
pub mod token;

pub use health::health_check;
pub use meetings::{create_meeting, join_meeting};
pub use metrics::metrics_handler;
pub use token::get_token;

use crate::errors::{BrokerError, Operation, OperationError};
use crate::models::Envelope;
use crate::observability::metrics::record_operation;
use axum::{
    http::{
        header::{
            ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS,
            ACCESS_CONTROL_ALLOW_ORIGIN,
        },
        HeaderValue,
    },
    response::{IntoResponse, Response},
    Json,
};
use serde::{de::DeserializeOwned, Serialize};
use std::time::Instant;
use tracing::warn;

/// Message returned when a request body is not valid JSON for the flow.
pub const INVALID_BODY_MESSAGE: &str = "Invalid request body";

/// Methods advertised on successful flow responses.
const ALLOWED_METHODS: &str = "POST, OPTIONS";

/// Request headers advertised on successful flow responses.
const ALLOWED_HEADERS: &str = "Content-Type, Authorization";

/// Decode an optional JSON body. An empty body is the same as `{}`.
///
/// Content-Type is not checked, since browser clients commonly post JSON as
/// `text/plain` to skip preflight.
fn decode_body<T: DeserializeOwned + Default>(body: &[u8]) -> Result<T, serde_json::Error> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }

    serde_json::from_slice(body)
}

/// Parse a body that must be well-formed; used by the join flow, the only
/// flow allowed to answer 400.
pub(crate) fn parse_body<T: DeserializeOwned + Default>(body: &[u8]) -> Result<T, BrokerError> {
    decode_body(body).map_err(|e| {
        warn!(target: "mb.handlers", error = %e, "Rejected malformed request body");
        BrokerError::Validation(INVALID_BODY_MESSAGE.to_string())
    })
}

/// Parse a body whose fields are all optional. Anything undecodable counts
/// as an empty body.
pub(crate) fn parse_body_or_default<T: DeserializeOwned + Default>(body: &[u8]) -> T {
    decode_body(body).unwrap_or_else(|e| {
        warn!(target: "mb.handlers", error = %e, "Ignoring malformed request body, using defaults");
        T::default()
    })
}

/// Record the flow outcome and render it.
///
/// Success becomes `200 { "success": true, "data": ... }` with the CORS
/// headers; failure is handed to `OperationError`.
pub(crate) fn respond<T: Serialize>(
    operation: Operation,
    allowed_origin: &str,
    result: Result<T, BrokerError>,
    start: Instant,
) -> Result<Response, OperationError> {
    record_operation(
        operation.as_str(),
        result.as_ref().err().map(BrokerError::error_type),
        start.elapsed(),
    );

    let data = result.map_err(|e| e.in_operation(operation))?;

    let mut response = Json(Envelope::success(data)).into_response();
    let headers = response.headers_mut();
    match HeaderValue::from_str(allowed_origin) {
        Ok(value) => {
            headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, value);
        }
        Err(_) => {
            warn!(target: "mb.handlers", "CORS_ALLOWED_ORIGIN is not a valid header value");
        }
    }
    headers.insert(
        ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static(ALLOWED_METHODS),
    );
    headers.insert(
        ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static(ALLOWED_HEADERS),
    );

    Ok(response)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::models::{CreateMeetingRequest, JoinMeetingRequest, TokenRequest};
    use axum::http::StatusCode;
    use http_body_util::BodyExt;

    #[test]
    fn test_parse_body_empty_is_default() {
        let request: TokenRequest = parse_body(b"").unwrap();
        assert!(request.user_id.is_none());

        let request: TokenRequest = parse_body(b"  \n").unwrap();
        assert!(request.user_id.is_none());
    }

    #[test]
    fn test_parse_body_json() {
        let request: TokenRequest = parse_body(br#"{"userId":"existing-id-123"}"#).unwrap();
        assert_eq!(request.user_id.as_deref(), Some("existing-id-123"));
    }

    #[test]
    fn test_parse_body_malformed_is_validation_error() {
        let result: Result<JoinMeetingRequest, _> = parse_body(b"{not json");
        assert_eq!(
            result.unwrap_err(),
            BrokerError::Validation(INVALID_BODY_MESSAGE.to_string())
        );

        let result: Result<JoinMeetingRequest, _> = parse_body(br#"{"meetingId":42}"#);
        assert!(matches!(result, Err(BrokerError::Validation(_))));
    }

    #[test]
    fn test_parse_body_or_default_ignores_malformed_json() {
        let request: CreateMeetingRequest = parse_body_or_default(b"{\"title\": ");
        assert!(request.title.is_none());

        let request: TokenRequest = parse_body_or_default(b"[1, 2, 3]");
        assert!(request.user_id.is_none());
    }

    #[test]
    fn test_parse_body_or_default_keeps_well_typed_fields() {
        let request: CreateMeetingRequest =
            parse_body_or_default(br#"{"title":"Retro","maxParticipants":"10"}"#);

        assert_eq!(request.title.as_deref(), Some("Retro"));
        assert!(request.max_participants.is_none());
    }

    #[tokio::test]
    async fn test_respond_success_sets_cors_headers() {
        let response = respond(
            Operation::GetToken,
            "https://app.example.com",
            Ok(serde_json::json!({ "token": "abc" })),
            Instant::now(),
        )
        .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[ACCESS_CONTROL_ALLOW_ORIGIN],
            "https://app.example.com"
        );
        assert_eq!(
            response.headers()[ACCESS_CONTROL_ALLOW_METHODS],
            "POST, OPTIONS"
        );
        assert_eq!(
            response.headers()[ACCESS_CONTROL_ALLOW_HEADERS],
            "Content-Type, Authorization"
        );

        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["success"], true);
        assert_eq!(body["data"]["token"], "abc");
    }

    #[test]
    fn test_respond_failure_keeps_operation() {
        let result: Result<(), _> = Err(BrokerError::Upstream("boom".to_string()));

        let err = respond(Operation::JoinMeeting, "*", result, Instant::now()).unwrap_err();

        assert_eq!(err.operation, Operation::JoinMeeting);
        assert_eq!(err.client_message(), "Failed to join meeting: boom");
    }
}
