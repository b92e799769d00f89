//! Integration test utilities for the Aeon gateway
//!
//! This crate provides helpers for running end-to-end tests against a live
//! gateway over real WebSockets.

pub mod fixtures;
pub mod helpers;

pub use fixtures::*;
pub use helpers::*;
