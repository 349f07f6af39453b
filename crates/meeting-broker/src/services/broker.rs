//! Meeting broker flows.
//!
//! `BrokerService` implements the three public flows on top of an
//! `IdentityProvider`:
//!
//! - create a meeting: new identity, token, fresh meeting ID
//! - get a token: for an existing identity, or a new one
//! - join a meeting: validate the ID, new identity, token
//!
//! The provider is optional. Without one every flow fails with
//! `BrokerError::Configuration` after input validation and before any
//! network call. Provider calls are strictly sequential and never retried,
//! and the calls of one flow share a deadline.

use crate::config::Config;
use crate::errors::BrokerError;
use crate::meeting_id::MeetingId;
use crate::models::{
    AccessToken, CreateMeetingRequest, Identity, JoinDescriptor, JoinMeetingRequest,
    MeetingDescriptor, TokenGrant, TokenRequest,
};
use crate::observability::metrics;
use crate::services::acs_client::AcsIdentityClient;
use crate::services::identity::{IdentityProvider, ProviderError};
use chrono::Utc;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Message returned when a join request lacks one of its fields.
pub const JOIN_FIELDS_REQUIRED_MESSAGE: &str = "Meeting ID and userName are required";

/// Upstream message when a flow's provider calls miss the deadline.
pub const FLOW_TIMEOUT_MESSAGE: &str = "Identity service did not respond in time";

/// Deadline for the provider calls of one flow. Must stay below the
/// router's request timeout.
pub const DEFAULT_FLOW_TIMEOUT: Duration = Duration::from_secs(25);

/// Broker over an optional identity provider.
#[derive(Clone)]
pub struct BrokerService {
    provider: Option<Arc<dyn IdentityProvider>>,
    token_scopes: Vec<String>,
    flow_timeout: Duration,
}

impl BrokerService {
    /// Create a broker over `provider` requesting `token_scopes` for every token.
    pub fn new(provider: Option<Arc<dyn IdentityProvider>>, token_scopes: Vec<String>) -> Self {
        Self {
            provider,
            token_scopes,
            flow_timeout: DEFAULT_FLOW_TIMEOUT,
        }
    }

    /// Replace the deadline shared by the provider calls of one flow.
    pub fn with_flow_timeout(mut self, flow_timeout: Duration) -> Self {
        self.flow_timeout = flow_timeout;
        self
    }

    /// Build a broker backed by ACS when a connection string is configured.
    ///
    /// # Errors
    ///
    /// Returns `ProviderError::Transport` if the HTTP client cannot be built.
    pub fn from_config(config: &Config) -> Result<Self, ProviderError> {
        let provider: Option<Arc<dyn IdentityProvider>> = match &config.acs_connection {
            Some(connection) => Some(Arc::new(AcsIdentityClient::new(
                connection.clone(),
                config.acs_api_version.clone(),
                Duration::from_secs(config.acs_request_timeout_seconds),
            )?)),
            None => {
                warn!(
                    target: "mb.services.broker",
                    "ACS_CONNECTION_STRING not set, all flows will report a configuration error"
                );
                None
            }
        };

        Ok(Self::new(provider, config.token_scopes.clone()))
    }

    /// Whether an identity provider is available.
    pub fn is_configured(&self) -> bool {
        self.provider.is_some()
    }

    /// Scopes requested for every token.
    pub fn token_scopes(&self) -> &[String] {
        &self.token_scopes
    }

    /// Create a meeting: provision an identity, issue its token and mint an ID.
    ///
    /// # Errors
    ///
    /// - `Configuration` when no provider is configured (no provider call)
    /// - `Upstream` when either provider call fails
    pub async fn create_meeting(
        &self,
        request: CreateMeetingRequest,
    ) -> Result<MeetingDescriptor, BrokerError> {
        let provider = self.provider()?;

        let (user, token) = self
            .within_deadline(async {
                let user = self.provision(provider).await?;
                let token = self.issue(provider, &user).await?;
                Ok::<_, BrokerError>((user, token))
            })
            .await?;
        let meeting_id = MeetingId::generate();

        info!(
            target: "mb.services.broker",
            meeting_id = %meeting_id,
            user = %user.id(),
            "Meeting created"
        );

        Ok(MeetingDescriptor {
            meeting_id,
            token: token.token,
            expires_on: token.expires_on,
            user,
            title: request.title_or_default(),
            created_at: Utc::now(),
            max_participants: request.max_participants_or_default(),
            recording_enabled: request.recording_enabled_or_default(),
        })
    }

    /// Issue a token for the supplied identity, or for a newly provisioned one.
    ///
    /// A supplied identity is used as-is; its existence is not checked.
    ///
    /// # Errors
    ///
    /// - `Configuration` when no provider is configured (no provider call)
    /// - `Upstream` when a provider call fails
    pub async fn get_token(&self, request: TokenRequest) -> Result<TokenGrant, BrokerError> {
        let provider = self.provider()?;

        let existing = request.existing_identity();

        let (user, token) = self
            .within_deadline(async {
                let user = match existing {
                    Some(identity) => {
                        debug!(
                            target: "mb.services.broker",
                            user = %identity.id(),
                            "Refreshing token for existing identity"
                        );
                        identity
                    }
                    None => self.provision(provider).await?,
                };
                let token = self.issue(provider, &user).await?;
                Ok::<_, BrokerError>((user, token))
            })
            .await?;

        Ok(TokenGrant {
            token: token.token,
            expires_on: token.expires_on,
            user,
        })
    }

    /// Join a meeting by ID with a fresh identity.
    ///
    /// The ID is checked for format only. Nothing records created meetings,
    /// so any well-formed ID is accepted.
    ///
    /// # Errors
    ///
    /// - `Validation` when a field is missing or empty, or the ID is malformed
    /// - `Configuration` when no provider is configured (after validation)
    /// - `Upstream` when either provider call fails
    pub async fn join_meeting(
        &self,
        request: JoinMeetingRequest,
    ) -> Result<JoinDescriptor, BrokerError> {
        let (meeting_id, user_name) = match (request.meeting_id, request.user_name) {
            (Some(meeting_id), Some(user_name))
                if !meeting_id.is_empty() && !user_name.is_empty() =>
            {
                (meeting_id, user_name)
            }
            _ => {
                return Err(BrokerError::Validation(
                    JOIN_FIELDS_REQUIRED_MESSAGE.to_string(),
                ))
            }
        };
        let meeting_id = MeetingId::parse(&meeting_id)?;

        let provider = self.provider()?;

        let (user, token) = self
            .within_deadline(async {
                let user = self.provision(provider).await?;
                let token = self.issue(provider, &user).await?;
                Ok::<_, BrokerError>((user, token))
            })
            .await?;

        info!(
            target: "mb.services.broker",
            meeting_id = %meeting_id,
            user = %user.id(),
            "Participant joined meeting"
        );

        Ok(JoinDescriptor {
            meeting_id,
            token: token.token,
            expires_on: token.expires_on,
            user,
            user_name,
            joined_at: Utc::now(),
        })
    }

    /// Run the provider calls of one flow under the flow deadline.
    async fn within_deadline<T>(
        &self,
        calls: impl Future<Output = Result<T, BrokerError>>,
    ) -> Result<T, BrokerError> {
        match tokio::time::timeout(self.flow_timeout, calls).await {
            Ok(result) => result,
            Err(_) => {
                warn!(
                    target: "mb.services.broker",
                    timeout_ms = self.flow_timeout.as_millis() as u64,
                    "Identity provider calls exceeded the flow deadline"
                );
                Err(BrokerError::Upstream(FLOW_TIMEOUT_MESSAGE.to_string()))
            }
        }
    }

    fn provider(&self) -> Result<&dyn IdentityProvider, BrokerError> {
        self.provider
            .as_deref()
            .ok_or(BrokerError::Configuration)
    }

    async fn provision(&self, provider: &dyn IdentityProvider) -> Result<Identity, BrokerError> {
        let start = Instant::now();
        let result = provider.provision_identity().await;
        record_provider_outcome("provision_identity", &result, start.elapsed());

        result.map_err(BrokerError::from)
    }

    async fn issue(
        &self,
        provider: &dyn IdentityProvider,
        identity: &Identity,
    ) -> Result<AccessToken, BrokerError> {
        let start = Instant::now();
        let result = provider.issue_token(identity, &self.token_scopes).await;
        record_provider_outcome("issue_token", &result, start.elapsed());

        result.map_err(BrokerError::from)
    }
}

fn record_provider_outcome<T>(call: &str, result: &Result<T, ProviderError>, duration: Duration) {
    match result {
        Ok(_) => metrics::record_provider_call(call, "success", duration),
        Err(e) => {
            warn!(
                target: "mb.services.broker",
                call = call,
                error = %e,
                "Identity provider call failed"
            );
            metrics::record_provider_call(call, "error", duration);
        }
    }
}
