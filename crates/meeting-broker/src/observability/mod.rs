//! Observability module for Meeting Broker.
//!
//! Provides metrics definitions and recording helpers.

pub mod metrics;
