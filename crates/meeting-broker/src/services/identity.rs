//! Identity provider abstraction.
//!
//! The broker needs two capabilities from the communication platform:
//! provisioning a new identity and issuing a scoped access token for an
//! identity. `AcsIdentityClient` implements them against the ACS REST API;
//! `mock::MockIdentityProvider` is a deterministic in-process substitute.

use crate::models::{AccessToken, Identity};
use thiserror::Error;

/// Failure reported by an identity provider.
///
/// The broker does not distinguish causes; every variant becomes an
/// upstream error carrying this message.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProviderError {
    /// The request never produced a response (connect failure, timeout).
    #[error("{0}")]
    Transport(String),

    /// The provider answered with a non-success status.
    #[error("{message}")]
    Rejected { status: u16, message: String },

    /// The provider answered with a body we could not understand.
    #[error("{0}")]
    InvalidResponse(String),
}

/// Trait for identity provider operations (enables mocking).
#[async_trait::async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Create a new communication identity.
    async fn provision_identity(&self) -> Result<Identity, ProviderError>;

    /// Issue an access token for `identity` limited to `scopes`.
    async fn issue_token(
        &self,
        identity: &Identity,
        scopes: &[String],
    ) -> Result<AccessToken, ProviderError>;
}

/// Mock identity provider module for testing.
///
/// This module provides a recording mock used by unit tests, integration
/// tests and the test server harness.
pub mod mock {

    use super::*;
    use chrono::{Duration, Utc};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Lifetime of tokens issued by the mock.
    const MOCK_TOKEN_TTL_HOURS: i64 = 24;

    /// A call observed by the mock, in order of arrival.
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum ProviderCall {
        ProvisionIdentity,
        IssueToken {
            identity: String,
            scopes: Vec<String>,
        },
    }

    /// Mock identity provider for unit testing.
    pub struct MockIdentityProvider {
        /// Calls made, in order.
        calls: Mutex<Vec<ProviderCall>>,
        /// Sequence for generated identity IDs.
        next_identity: AtomicUsize,
        /// Error message returned by `provision_identity`, if set.
        provision_failure: Option<String>,
        /// Error message returned by `issue_token`, if set.
        issue_failure: Option<String>,
        /// Delay before `provision_identity` answers.
        provision_delay: Option<std::time::Duration>,
    }

    impl MockIdentityProvider {
        fn build(provision_failure: Option<String>, issue_failure: Option<String>) -> Self {
            Self {
                calls: Mutex::new(Vec::new()),
                next_identity: AtomicUsize::new(1),
                provision_failure,
                issue_failure,
                provision_delay: None,
            }
        }

        /// Create a mock where every call succeeds.
        pub fn working() -> Self {
            Self::build(None, None)
        }

        /// Create a mock whose identity provisioning fails with `message`.
        pub fn failing_provision(message: &str) -> Self {
            Self::build(Some(message.to_string()), None)
        }

        /// Create a mock whose token issuance fails with `message`.
        pub fn failing_issue(message: &str) -> Self {
            Self::build(None, Some(message.to_string()))
        }

        /// Create a mock whose identity provisioning answers only after `delay`.
        pub fn slow(delay: std::time::Duration) -> Self {
            Self {
                provision_delay: Some(delay),
                ..Self::working()
            }
        }

        /// All calls made so far.
        pub fn calls(&self) -> Vec<ProviderCall> {
            self.calls
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner())
                .clone()
        }

        /// Total number of calls made.
        pub fn call_count(&self) -> usize {
            self.calls().len()
        }

        fn record(&self, call: ProviderCall) {
            self.calls
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner())
                .push(call);
        }
    }

    #[async_trait::async_trait]
    impl IdentityProvider for MockIdentityProvider {
        async fn provision_identity(&self) -> Result<Identity, ProviderError> {
            self.record(ProviderCall::ProvisionIdentity);

            if let Some(delay) = self.provision_delay {
                tokio::time::sleep(delay).await;
            }

            if let Some(message) = &self.provision_failure {
                return Err(ProviderError::Rejected {
                    status: 500,
                    message: message.clone(),
                });
            }

            let sequence = self.next_identity.fetch_add(1, Ordering::SeqCst);
            Ok(Identity::new(format!("8:acs:mock-identity-{:04}", sequence)))
        }

        async fn issue_token(
            &self,
            identity: &Identity,
            scopes: &[String],
        ) -> Result<AccessToken, ProviderError> {
            self.record(ProviderCall::IssueToken {
                identity: identity.id().to_string(),
                scopes: scopes.to_vec(),
            });

            if let Some(message) = &self.issue_failure {
                return Err(ProviderError::Rejected {
                    status: 500,
                    message: message.clone(),
                });
            }

            Ok(AccessToken {
                token: format!("mock-token-for-{}", identity.id()),
                expires_on: Utc::now() + Duration::hours(MOCK_TOKEN_TTL_HOURS),
            })
        }
    }

    #[cfg(test)]
    #[allow(clippy::unwrap_used, clippy::expect_used)]
    mod tests {
        use super::*;

        #[tokio::test]
        async fn test_mock_records_calls_in_order() {
            let mock = MockIdentityProvider::working();

            let identity = mock.provision_identity().await.unwrap();
            let token = mock
                .issue_token(&identity, &["voip".to_string()])
                .await
                .unwrap();

            assert_eq!(identity.id(), "8:acs:mock-identity-0001");
            assert!(!token.token.is_empty());
            assert!(token.expires_on > Utc::now());
            assert_eq!(
                mock.calls(),
                vec![
                    ProviderCall::ProvisionIdentity,
                    ProviderCall::IssueToken {
                        identity: "8:acs:mock-identity-0001".to_string(),
                        scopes: vec!["voip".to_string()],
                    },
                ]
            );
        }

        #[tokio::test]
        async fn test_mock_identities_are_distinct() {
            let mock = MockIdentityProvider::working();

            let first = mock.provision_identity().await.unwrap();
            let second = mock.provision_identity().await.unwrap();

            assert_ne!(first, second);
            assert_eq!(mock.call_count(), 2);
        }

        #[tokio::test]
        async fn test_mock_failing_provision() {
            let mock = MockIdentityProvider::failing_provision("quota exceeded");

            let result = mock.provision_identity().await;

            assert_eq!(result.unwrap_err().to_string(), "quota exceeded");
            assert_eq!(mock.calls(), vec![ProviderCall::ProvisionIdentity]);
        }

        #[tokio::test]
        async fn test_mock_failing_issue() {
            let mock = MockIdentityProvider::failing_issue("identity not found");

            let result = mock
                .issue_token(&Identity::new("existing-id-123"), &["voip".to_string()])
                .await;

            assert_eq!(result.unwrap_err().to_string(), "identity not found");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_error_display_is_the_message() {
        assert_eq!(
            ProviderError::Transport("connection refused".to_string()).to_string(),
            "connection refused"
        );
        assert_eq!(
            ProviderError::Rejected {
                status: 401,
                message: "Denied by the resource provider.".to_string()
            }
            .to_string(),
            "Denied by the resource provider."
        );
        assert_eq!(
            ProviderError::InvalidResponse("missing field `token`".to_string()).to_string(),
            "missing field `token`"
        );
    }
}
