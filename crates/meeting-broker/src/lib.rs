//! Meeting Broker Service Library
//!
//! A stateless HTTP service that brokers access to Azure Communication
//! Services (ACS). It is responsible for:
//!
//! - Creating meetings (fresh identity, access token, shareable meeting ID)
//! - Issuing and refreshing access tokens for new or existing identities
//! - Joining meetings by meeting ID (format-checked only, nothing is stored)
//!
//! # Architecture
//!
//! The broker follows the Handler -> Service -> Provider pattern:
//!
//! ```text
//! routes/mod.rs -> handlers/*.rs -> services/broker.rs -> services/identity.rs
//! ```
//!
//! # Modules
//!
//! - `config` - Service configuration from environment
//! - `errors` - Error kinds and the uniform failure envelope
//! - `handlers` - HTTP request handlers
//! - `meeting_id` - Meeting ID generation and validation
//! - `middleware` - HTTP middleware (metrics)
//! - `models` - Request, response and envelope types
//! - `observability` - Metrics definitions
//! - `routes` - Axum router setup
//! - `services` - Flow orchestration and the ACS identity client

pub mod config;
pub mod errors;
pub mod handlers;
pub mod meeting_id;
pub mod middleware;
pub mod models;
pub mod observability;
pub mod routes;
pub mod services;
