//! Azure Communication Services identity client.
//!
//! Implements `IdentityProvider` against the ACS identity REST API:
//!
//! - `POST /identities` - create an identity
//! - `POST /identities/{id}/:issueAccessToken` - issue a scoped token
//!
//! # Security
//!
//! - Every request is signed with HMAC-SHA256 using the resource access key
//! - The access key is never logged (`SecretString`, redacted Debug)
//! - Timeouts prevent hanging connections
//! - Requests are never retried; one failure fails the flow

use crate::models::{AccessToken, Identity};
use crate::services::identity::{IdentityProvider, ProviderError};
use base64::{engine::general_purpose, Engine as _};
use chrono::{DateTime, Utc};
use reqwest::Client;
use ring::{digest, hmac};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{error, instrument, warn};

/// Connect timeout for ACS requests in seconds.
const ACS_CONNECT_TIMEOUT_SECS: u64 = 5;

/// Headers covered by the request signature, in signing order.
const SIGNED_HEADERS: &str = "x-ms-date;host;x-ms-content-sha256";

// ============================================================================
// Connection String
// ============================================================================

/// Parsed ACS connection string.
///
/// Format: `endpoint=https://<resource>.communication.azure.com/;accesskey=<base64>`.
/// Keys are case-insensitive and may appear in any order.
#[derive(Clone, Debug)]
pub struct ConnectionString {
    /// Resource endpoint without a trailing slash.
    pub endpoint: String,

    /// Base64 access key as configured.
    pub access_key: SecretString,

    /// HMAC key derived from the decoded access key.
    signing_key: hmac::Key,
}

impl ConnectionString {
    /// Parse a connection string.
    ///
    /// # Errors
    ///
    /// Returns a description of the problem. The description never contains
    /// the access key.
    pub fn parse(raw: &SecretString) -> Result<Self, String> {
        let mut endpoint = None;
        let mut access_key = None;

        for segment in raw
            .expose_secret()
            .split(';')
            .map(str::trim)
            .filter(|segment| !segment.is_empty())
        {
            let (key, value) = segment
                .split_once('=')
                .ok_or_else(|| "expected 'key=value' segments separated by ';'".to_string())?;

            match key.trim().to_ascii_lowercase().as_str() {
                "endpoint" => endpoint = Some(value.trim().trim_end_matches('/').to_string()),
                "accesskey" => access_key = Some(value.trim().to_string()),
                _ => {}
            }
        }

        let endpoint = endpoint.ok_or_else(|| "missing 'endpoint' segment".to_string())?;
        if !(endpoint.starts_with("https://") || endpoint.starts_with("http://")) {
            return Err("endpoint must be an http(s) URL".to_string());
        }

        let access_key = access_key.ok_or_else(|| "missing 'accesskey' segment".to_string())?;
        let key_bytes = general_purpose::STANDARD
            .decode(&access_key)
            .map_err(|_| "accesskey is not valid base64".to_string())?;

        Ok(Self {
            endpoint,
            access_key: SecretString::from(access_key),
            signing_key: hmac::Key::new(hmac::HMAC_SHA256, &key_bytes),
        })
    }

    /// Host (and port, when present) of the endpoint.
    pub fn host(&self) -> &str {
        self.authority_and_path().0
    }

    /// Path prefix of the endpoint (usually empty).
    fn base_path(&self) -> &str {
        self.authority_and_path().1
    }

    fn authority_and_path(&self) -> (&str, &str) {
        let without_scheme = self
            .endpoint
            .split_once("://")
            .map(|(_, rest)| rest)
            .unwrap_or(&self.endpoint);

        match without_scheme.find('/') {
            Some(index) => without_scheme.split_at(index),
            None => (without_scheme, ""),
        }
    }
}

// ============================================================================
// Request Signing
// ============================================================================

/// Authentication headers for one ACS request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedHeaders {
    /// `x-ms-date` (RFC 1123, GMT).
    pub date: String,

    /// `x-ms-content-sha256` (base64 SHA-256 of the body).
    pub content_hash: String,

    /// `Authorization` header value.
    pub authorization: String,
}

/// Sign a POST request.
///
/// String to sign: `POST\n<path?query>\n<date>;<host>;<content-hash>`.
pub fn sign_request(
    connection: &ConnectionString,
    path_and_query: &str,
    body: &[u8],
    now: DateTime<Utc>,
) -> SignedHeaders {
    let date = now.format("%a, %d %b %Y %H:%M:%S GMT").to_string();
    let content_hash =
        general_purpose::STANDARD.encode(digest::digest(&digest::SHA256, body).as_ref());

    let string_to_sign = format!(
        "POST\n{}\n{};{};{}",
        path_and_query,
        date,
        connection.host(),
        content_hash
    );
    let signature = hmac::sign(&connection.signing_key, string_to_sign.as_bytes());

    SignedHeaders {
        authorization: format!(
            "HMAC-SHA256 SignedHeaders={}&Signature={}",
            SIGNED_HEADERS,
            general_purpose::STANDARD.encode(signature.as_ref())
        ),
        date,
        content_hash,
    }
}

// ============================================================================
// Wire Types
// ============================================================================

#[derive(Debug, Serialize)]
struct IssueTokenBody<'a> {
    scopes: &'a [String],
}

#[derive(Debug, Deserialize)]
struct CreateIdentityResponse {
    identity: IdentityBody,
}

#[derive(Debug, Deserialize)]
struct IdentityBody {
    id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct IssueTokenResponse {
    token: String,
    expires_on: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    message: String,
}

// ============================================================================
// Client
// ============================================================================

/// HTTP client for the ACS identity API.
#[derive(Clone)]
pub struct AcsIdentityClient {
    /// HTTP client with configured timeouts.
    client: Client,

    /// Endpoint and signing key.
    connection: ConnectionString,

    /// Value of the `api-version` query parameter.
    api_version: String,
}

impl AcsIdentityClient {
    /// Create a new ACS identity client.
    ///
    /// # Arguments
    ///
    /// * `connection` - Parsed connection string
    /// * `api_version` - Identity API version (e.g., "2023-10-01")
    /// * `request_timeout` - Timeout for a single request
    ///
    /// # Errors
    ///
    /// Returns `ProviderError::Transport` if the HTTP client cannot be built.
    pub fn new(
        connection: ConnectionString,
        api_version: String,
        request_timeout: Duration,
    ) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .timeout(request_timeout)
            .connect_timeout(Duration::from_secs(ACS_CONNECT_TIMEOUT_SECS))
            .build()
            .map_err(|e| {
                error!(target: "mb.services.acs_client", error = %e, "Failed to build HTTP client");
                ProviderError::Transport(format!("Failed to build HTTP client: {}", e))
            })?;

        Ok(Self {
            client,
            connection,
            api_version,
        })
    }

    /// Send a signed POST and decode the JSON response.
    async fn post<T: DeserializeOwned>(
        &self,
        relative_path: &str,
        body: Vec<u8>,
    ) -> Result<T, ProviderError> {
        let path_and_query = format!(
            "{}{}?api-version={}",
            self.connection.base_path(),
            relative_path,
            self.api_version
        );
        let url = format!(
            "{}{}?api-version={}",
            self.connection.endpoint, relative_path, self.api_version
        );

        let signed = sign_request(&self.connection, &path_and_query, &body, Utc::now());

        let response = self
            .client
            .post(&url)
            .header("x-ms-date", signed.date)
            .header("x-ms-content-sha256", signed.content_hash)
            .header("Authorization", signed.authorization)
            .header("Content-Type", "application/json")
            .body(body)
            .send()
            .await
            .map_err(|e| {
                warn!(target: "mb.services.acs_client", error = %e, "ACS request failed");
                if e.is_timeout() {
                    ProviderError::Transport("Identity service request timed out".to_string())
                } else {
                    ProviderError::Transport(format!("Identity service unreachable: {}", e))
                }
            })?;

        Self::handle_response(response).await
    }

    /// Handle ACS response and map status codes to errors.
    async fn handle_response<T: DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, ProviderError> {
        let status = response.status();

        if status.is_success() {
            return response.json().await.map_err(|e| {
                error!(target: "mb.services.acs_client", error = %e, "Failed to parse ACS response");
                ProviderError::InvalidResponse(format!(
                    "Unexpected response from identity service: {}",
                    e
                ))
            });
        }

        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorResponse>(&body)
            .map(|parsed| parsed.error.message)
            .unwrap_or_else(|_| format!("Identity service returned HTTP {}", status.as_u16()));

        warn!(
            target: "mb.services.acs_client",
            status = %status,
            message = %message,
            "ACS rejected request"
        );

        Err(ProviderError::Rejected {
            status: status.as_u16(),
            message,
        })
    }
}

#[async_trait::async_trait]
impl IdentityProvider for AcsIdentityClient {
    #[instrument(skip_all, name = "mb.acs.provision_identity")]
    async fn provision_identity(&self) -> Result<Identity, ProviderError> {
        let response: CreateIdentityResponse = self.post("/identities", b"{}".to_vec()).await?;

        Ok(Identity::new(response.identity.id))
    }

    #[instrument(skip_all, name = "mb.acs.issue_token", fields(scopes = ?scopes))]
    async fn issue_token(
        &self,
        identity: &Identity,
        scopes: &[String],
    ) -> Result<AccessToken, ProviderError> {
        let body = serde_json::to_vec(&IssueTokenBody { scopes }).map_err(|e| {
            ProviderError::InvalidResponse(format!("Failed to encode token request: {}", e))
        })?;
        let relative_path = format!(
            "/identities/{}/:issueAccessToken",
            urlencoding::encode(identity.id())
        );

        let response: IssueTokenResponse = self.post(&relative_path, body).await?;

        Ok(AccessToken {
            token: response.token,
            expires_on: response.expires_on,
        })
    }
}
