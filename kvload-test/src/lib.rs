//! Test utilities for the key-value load generator.
//!
//! This crate provides an in-process key-value server and log capture for integration tests. See
//! the modules for all available utilities.

pub mod server;
pub mod tracing;
