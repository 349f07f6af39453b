//! Meeting Broker configuration.
//!
//! Configuration is loaded once from environment variables at startup and
//! injected into the router state. The ACS connection string is kept as a
//! secret and redacted in Debug output.

use crate::services::acs_client::ConnectionString;
use secrecy::SecretString;
use std::collections::HashMap;
use std::env;
use std::fmt;
use thiserror::Error;

/// Default server bind address.
pub const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0:7071";

/// Default ACS identity API version.
pub const DEFAULT_ACS_API_VERSION: &str = "2023-10-01";

/// Default token scope (real-time voice and video).
pub const DEFAULT_TOKEN_SCOPE: &str = "voip";

/// Default timeout for a single ACS request in seconds.
pub const DEFAULT_ACS_REQUEST_TIMEOUT_SECONDS: u64 = 10;

/// Default value of the `Access-Control-Allow-Origin` header.
pub const DEFAULT_CORS_ALLOWED_ORIGIN: &str = "*";

/// Meeting Broker configuration.
///
/// Every field except the connection string has a default. A missing
/// connection string is not a startup error: the service still starts and
/// each flow answers with a configuration error until one is provided.
#[derive(Clone)]
pub struct Config {
    /// Parsed ACS connection string (None when `ACS_CONNECTION_STRING` is unset).
    pub acs_connection: Option<ConnectionString>,

    /// Server bind address (default: "0.0.0.0:7071").
    pub bind_address: String,

    /// ACS identity API version sent as `api-version`.
    pub acs_api_version: String,

    /// Scopes requested for every issued token.
    pub token_scopes: Vec<String>,

    /// Timeout for a single ACS request in seconds.
    pub acs_request_timeout_seconds: u64,

    /// Value returned in `Access-Control-Allow-Origin`.
    pub cors_allowed_origin: String,
}

/// Custom Debug implementation that redacts the connection string.
impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field(
                "acs_connection",
                &self.acs_connection.as_ref().map(|_| "[REDACTED]"),
            )
            .field("bind_address", &self.bind_address)
            .field("acs_api_version", &self.acs_api_version)
            .field("token_scopes", &self.token_scopes)
            .field(
                "acs_request_timeout_seconds",
                &self.acs_request_timeout_seconds,
            )
            .field("cors_allowed_origin", &self.cors_allowed_origin)
            .finish()
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid ACS connection string: {0}")]
    InvalidConnectionString(String),

    #[error("Invalid token scopes configuration: {0}")]
    InvalidTokenScopes(String),

    #[error("Invalid ACS request timeout configuration: {0}")]
    InvalidRequestTimeout(String),
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(&env::vars().collect())
    }

    /// Load configuration from a HashMap (for testing).
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        // An empty value is treated the same as an unset one.
        let acs_connection = match vars
            .get("ACS_CONNECTION_STRING")
            .filter(|value| !value.trim().is_empty())
        {
            Some(raw) => Some(
                ConnectionString::parse(&SecretString::from(raw.clone()))
                    .map_err(ConfigError::InvalidConnectionString)?,
            ),
            None => None,
        };

        let bind_address = vars
            .get("BIND_ADDRESS")
            .cloned()
            .unwrap_or_else(|| DEFAULT_BIND_ADDRESS.to_string());

        let acs_api_version = vars
            .get("ACS_API_VERSION")
            .cloned()
            .unwrap_or_else(|| DEFAULT_ACS_API_VERSION.to_string());

        let token_scopes = match vars.get("ACS_TOKEN_SCOPES") {
            Some(value_str) => {
                let scopes: Vec<String> = value_str
                    .split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .collect();

                if scopes.is_empty() {
                    return Err(ConfigError::InvalidTokenScopes(format!(
                        "ACS_TOKEN_SCOPES must name at least one scope, got '{}'",
                        value_str
                    )));
                }

                scopes
            }
            None => vec![DEFAULT_TOKEN_SCOPE.to_string()],
        };

        let acs_request_timeout_seconds =
            if let Some(value_str) = vars.get("ACS_REQUEST_TIMEOUT_SECONDS") {
                let value: u64 = value_str.parse().map_err(|e| {
                    ConfigError::InvalidRequestTimeout(format!(
                        "ACS_REQUEST_TIMEOUT_SECONDS must be a valid positive integer, got '{}': {}",
                        value_str, e
                    ))
                })?;

                if value == 0 {
                    return Err(ConfigError::InvalidRequestTimeout(
                        "ACS_REQUEST_TIMEOUT_SECONDS must be greater than 0".to_string(),
                    ));
                }

                value
            } else {
                DEFAULT_ACS_REQUEST_TIMEOUT_SECONDS
            };

        let cors_allowed_origin = vars
            .get("CORS_ALLOWED_ORIGIN")
            .cloned()
            .unwrap_or_else(|| DEFAULT_CORS_ALLOWED_ORIGIN.to_string());

        Ok(Config {
            acs_connection,
            bind_address,
            acs_api_version,
            token_scopes,
            acs_request_timeout_seconds,
            cors_allowed_origin,
        })
    }
}
