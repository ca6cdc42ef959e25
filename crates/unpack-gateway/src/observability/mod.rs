//! Observability module for the unpack gateway.
//!
//! Provides metrics definitions and instrumentation helpers.

pub mod metrics;
