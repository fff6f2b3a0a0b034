//! Wayfinder library.
//!
//! This library exposes internal modules for testing purposes.
//! The main entry point is the `wayfinder` binary.

pub mod executor;
pub mod guardrails;
pub mod telemetry;
