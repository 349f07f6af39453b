//! Meeting Broker error types.
//!
//! Every flow returns `Result<_, BrokerError>`. The HTTP layer wraps the
//! error in an `OperationError`, which knows which flow failed and renders
//! the uniform `{ "success": false, "error": "..." }` envelope. The same
//! adapter is used by all three flows.

use crate::models::Envelope;
use crate::services::identity::ProviderError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

/// Fixed message returned when the ACS connection string is not configured.
pub const CONFIGURATION_ERROR_MESSAGE: &str = "ACS connection string not configured";

/// Meeting Broker error type.
///
/// Maps to HTTP status codes:
/// - Configuration, Upstream: 500 Internal Server Error
/// - Validation: 400 Bad Request
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BrokerError {
    /// The identity provider connection is not configured.
    #[error("ACS connection string not configured")]
    Configuration,

    /// Missing or malformed caller input. Never reaches the identity provider.
    #[error("{0}")]
    Validation(String),

    /// Any failure reported by the identity provider.
    #[error("{0}")]
    Upstream(String),
}

impl BrokerError {
    /// Returns the HTTP status code for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            BrokerError::Configuration | BrokerError::Upstream(_) => 500,
            BrokerError::Validation(_) => 400,
        }
    }

    /// Short label used for metrics.
    pub fn error_type(&self) -> &'static str {
        match self {
            BrokerError::Configuration => "configuration",
            BrokerError::Validation(_) => "validation",
            BrokerError::Upstream(_) => "upstream",
        }
    }

    /// Attach the failing operation so the error can be rendered.
    pub fn in_operation(self, operation: Operation) -> OperationError {
        OperationError {
            operation,
            error: self,
        }
    }
}

impl From<ProviderError> for BrokerError {
    fn from(err: ProviderError) -> Self {
        BrokerError::Upstream(err.to_string())
    }
}

/// The broker's three public flows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    CreateMeeting,
    GetToken,
    JoinMeeting,
}

impl Operation {
    /// Prefix placed in front of upstream error messages.
    pub fn failure_prefix(&self) -> &'static str {
        match self {
            Operation::CreateMeeting => "Failed to create meeting",
            Operation::GetToken => "Failed to get token",
            Operation::JoinMeeting => "Failed to join meeting",
        }
    }

    /// Metrics label.
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::CreateMeeting => "create_meeting",
            Operation::GetToken => "get_token",
            Operation::JoinMeeting => "join_meeting",
        }
    }
}

/// A `BrokerError` tied to the operation that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationError {
    pub operation: Operation,
    pub error: BrokerError,
}

impl OperationError {
    /// Message placed in the failure envelope.
    ///
    /// Upstream failures carry the flow prefix; configuration and validation
    /// failures use their fixed messages unchanged.
    pub fn client_message(&self) -> String {
        match &self.error {
            BrokerError::Upstream(message) => {
                format!("{}: {}", self.operation.failure_prefix(), message)
            }
            other => other.to_string(),
        }
    }
}

impl IntoResponse for OperationError {
    fn into_response(self) -> Response {
        let status = match &self.error {
            BrokerError::Configuration => {
                tracing::error!(
                    target: "mb.errors",
                    operation = self.operation.as_str(),
                    "Identity provider connection is not configured"
                );
                StatusCode::INTERNAL_SERVER_ERROR
            }
            BrokerError::Upstream(message) => {
                // Log actual upstream message server-side as well
                tracing::warn!(
                    target: "mb.errors",
                    operation = self.operation.as_str(),
                    error = %message,
                    "Identity provider call failed"
                );
                StatusCode::INTERNAL_SERVER_ERROR
            }
            BrokerError::Validation(_) => StatusCode::BAD_REQUEST,
        };

        let body: Envelope<()> = Envelope::failure(self.client_message());

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use axum::body::Body;
    use http_body_util::BodyExt;

    // Helper function to read the response body as JSON
    async fn read_body_json(body: Body) -> serde_json::Value {
        let bytes = body.collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn test_display_configuration_error() {
        assert_eq!(
            BrokerError::Configuration.to_string(),
            CONFIGURATION_ERROR_MESSAGE
        );
    }

    #[test]
    fn test_display_validation_error() {
        let error = BrokerError::Validation("Invalid meeting ID format".to_string());
        assert_eq!(error.to_string(), "Invalid meeting ID format");
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(BrokerError::Configuration.status_code(), 500);
        assert_eq!(BrokerError::Validation("x".to_string()).status_code(), 400);
        assert_eq!(BrokerError::Upstream("x".to_string()).status_code(), 500);
    }

    #[test]
    fn test_upstream_message_carries_flow_prefix() {
        let upstream = BrokerError::Upstream("quota exceeded".to_string());

        assert_eq!(
            upstream
                .clone()
                .in_operation(Operation::CreateMeeting)
                .client_message(),
            "Failed to create meeting: quota exceeded"
        );
        assert_eq!(
            upstream
                .clone()
                .in_operation(Operation::GetToken)
                .client_message(),
            "Failed to get token: quota exceeded"
        );
        assert_eq!(
            upstream.in_operation(Operation::JoinMeeting).client_message(),
            "Failed to join meeting: quota exceeded"
        );
    }

    #[test]
    fn test_configuration_and_validation_messages_are_unprefixed() {
        assert_eq!(
            BrokerError::Configuration
                .in_operation(Operation::JoinMeeting)
                .client_message(),
            CONFIGURATION_ERROR_MESSAGE
        );
        assert_eq!(
            BrokerError::Validation("Meeting ID and userName are required".to_string())
                .in_operation(Operation::JoinMeeting)
                .client_message(),
            "Meeting ID and userName are required"
        );
    }

    #[test]
    fn test_provider_error_becomes_upstream() {
        let err: BrokerError = ProviderError::Rejected {
            status: 403,
            message: "Denied by the resource provider.".to_string(),
        }
        .into();

        assert_eq!(
            err,
            BrokerError::Upstream("Denied by the resource provider.".to_string())
        );
    }

    #[tokio::test]
    async fn test_into_response_configuration_error() {
        let response = BrokerError::Configuration
            .in_operation(Operation::CreateMeeting)
            .into_response();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body_json = read_body_json(response.into_body()).await;
        assert_eq!(body_json["success"], false);
        assert_eq!(body_json["error"], CONFIGURATION_ERROR_MESSAGE);
        assert!(body_json.get("data").is_none());
    }

    #[tokio::test]
    async fn test_into_response_validation_error() {
        let response = BrokerError::Validation("Invalid meeting ID format".to_string())
            .in_operation(Operation::JoinMeeting)
            .into_response();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body_json = read_body_json(response.into_body()).await;
        assert_eq!(body_json["success"], false);
        assert_eq!(body_json["error"], "Invalid meeting ID format");
    }

    #[tokio::test]
    async fn test_into_response_upstream_error() {
        let response = BrokerError::Upstream("Identity service unavailable".to_string())
            .in_operation(Operation::GetToken)
            .into_response();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body_json = read_body_json(response.into_body()).await;
        assert_eq!(body_json["success"], false);
        assert_eq!(
            body_json["error"],
            "Failed to get token: Identity service unavailable"
        );
    }
}
