//! # MB Test Utilities
//!
//! Shared test utilities for the Meeting Broker (MB) service.
//!
//! This crate provides:
//! - Server test harness (`TestBrokerServer` for E2E tests)
//!
//! ## Usage
//!
//! ```rust,ignore
//! use mb_test_utils::*;
//! use meeting_broker::services::identity::mock::MockIdentityProvider;
//!
//! #[tokio::test]
//! async fn test_example() -> Result<()> {
//!     let server =
//!         TestBrokerServer::spawn(Some(Arc::new(MockIdentityProvider::working()))).await?;
//!
//!     let response = reqwest::Client::new()
//!         .post(format!("{}/api/CreateMeeting", server.url()))
//!         .json(&serde_json::json!({}))
//!         .send()
//!         .await?;
//!
//!     assert_eq!(response.status(), 200);
//!     Ok(())
//! }
//! ```

pub mod server_harness;

// Re-export commonly used items
pub use server_harness::*;
