//! Integration test utilities for the chorus client
//!
//! Runs the client end to end against a wiremock REST API and an in-memory gateway.

pub mod fixtures;
pub mod helpers;

pub use fixtures::*;
pub use helpers::*;
