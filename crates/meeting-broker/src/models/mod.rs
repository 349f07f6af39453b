//! Meeting Broker models.
//!
//! Request bodies, response descriptors and the uniform response envelope.
//! All JSON field names are camelCase to match what browser clients send
//! and expect. Nothing here is persisted; every value lives for one request.

use crate::meeting_id::MeetingId;
use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Deserialize, Deserializer, Serialize};

/// Title used when a meeting is created without one.
pub const DEFAULT_MEETING_TITLE: &str = "Video Call Meeting";

/// Participant limit used when a meeting is created without one.
pub const DEFAULT_MAX_PARTICIPANTS: u32 = 50;

// ============================================================================
// Provider Types
// ============================================================================

/// A communication-platform user issued by the identity provider.
///
/// Serialized in the shape ACS client SDKs expect:
/// `{ "communicationUserId": "8:acs:..." }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    /// Opaque identity handle.
    pub communication_user_id: String,
}

impl Identity {
    pub fn new(communication_user_id: impl Into<String>) -> Self {
        Self {
            communication_user_id: communication_user_id.into(),
        }
    }

    pub fn id(&self) -> &str {
        &self.communication_user_id
    }
}

/// Short-lived credential bound to an identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessToken {
    /// The issued token.
    pub token: String,

    /// Expiry timestamp.
    pub expires_on: DateTime<Utc>,
}

// ============================================================================
// Envelope
// ============================================================================

/// Uniform response wrapper used by every flow.
///
/// Success: `{ "success": true, "data": {...} }`
/// Failure: `{ "success": false, "error": "..." }`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub success: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> Envelope<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }
}

// ============================================================================
// Create Meeting
// ============================================================================

/// Deserialize an optional field, treating a value of the wrong type as absent.
fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).ok())
}

/// Request body for `POST /api/CreateMeeting`. Every field is optional, and
/// a field of the wrong type falls back to its default.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateMeetingRequest {
    #[serde(default, deserialize_with = "lenient")]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub max_participants: Option<u32>,
    #[serde(default, deserialize_with = "lenient")]
    pub recording_enabled: Option<bool>,
}

impl CreateMeetingRequest {
    /// Title as supplied, or the placeholder when missing or blank.
    pub fn title_or_default(&self) -> String {
        match &self.title {
            Some(title) if !title.trim().is_empty() => title.clone(),
            _ => DEFAULT_MEETING_TITLE.to_string(),
        }
    }

    /// Participant limit, or 50 when missing or zero.
    pub fn max_participants_or_default(&self) -> u32 {
        self.max_participants
            .filter(|max| *max > 0)
            .unwrap_or(DEFAULT_MAX_PARTICIPANTS)
    }

    pub fn recording_enabled_or_default(&self) -> bool {
        self.recording_enabled.unwrap_or(false)
    }
}

/// Returned by `POST /api/CreateMeeting`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MeetingDescriptor {
    pub meeting_id: MeetingId,
    pub token: String,
    pub expires_on: DateTime<Utc>,
    pub user: Identity,
    pub title: String,
    pub created_at: DateTime<Utc>,
    pub max_participants: u32,
    pub recording_enabled: bool,
}

// ============================================================================
// Get Token
// ============================================================================

/// Request body for `POST /api/GetToken`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenRequest {
    /// Existing identity to refresh a token for. Blank or non-string means
    /// "create one".
    #[serde(default, deserialize_with = "lenient")]
    pub user_id: Option<String>,
}

impl TokenRequest {
    /// The supplied identity, if any. An empty string counts as absent.
    pub fn existing_identity(&self) -> Option<Identity> {
        self.user_id
            .as_deref()
            .filter(|id| !id.is_empty())
            .map(Identity::new)
    }
}

/// Returned by `POST /api/GetToken`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenGrant {
    pub token: String,
    pub expires_on: DateTime<Utc>,
    pub user: Identity,
}

// ============================================================================
// Join Meeting
// ============================================================================

/// Request body for `POST /api/JoinMeeting`. Both fields are required, but
/// they are optional here so a missing field yields our own 400 message
/// rather than a deserialization error.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinMeetingRequest {
    pub meeting_id: Option<String>,
    pub user_name: Option<String>,
}

/// Returned by `POST /api/JoinMeeting`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinDescriptor {
    pub meeting_id: MeetingId,
    pub token: String,
    pub expires_on: DateTime<Utc>,
    pub user: Identity,
    pub user_name: String,
    pub joined_at: DateTime<Utc>,
}

// ============================================================================
// Health
// ============================================================================

/// Health check response.
///
/// Returned by the `/health` endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    /// Service health status.
    pub status: String,

    /// Whether an ACS connection string is configured.
    pub acs_configured: bool,
}
