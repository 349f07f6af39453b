//! Service layer for Meeting Broker.
//!
//! This module contains services that interact with external systems
//! and encapsulate business logic.
//!
//! # Components
//!
//! - `identity` - Identity provider trait and mock
//! - `acs_client` - HTTP client for the ACS identity API
//! - `broker` - The create, token and join flows

pub mod acs_client;
pub mod broker;
pub mod identity;

pub use acs_client::{AcsIdentityClient, ConnectionString};
pub use broker::BrokerService;
pub use identity::{IdentityProvider, ProviderError};
