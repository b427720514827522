//! A load generator for HTTP key-value services.
//!
//! A run drives one of three [`Scenario`]s with a number of concurrent virtual users:
//!
//! - *get-popular* reads from a small range of hot keys, modelling skewed, cache-friendly reads.
//! - *put-only* writes random values to random keys across the whole keyspace.
//! - *mixed* decides per iteration between a read and a write at a configurable ratio.
//!
//! Every iteration produces exactly one [`Request`]. Drivers are stateless and draw all their
//! randomness from an injected [`RandomSource`](random::RandomSource), so their output can be
//! scripted in tests. Failed requests are never retried; they are counted and reported in the
//! [`Summary`].
#![warn(missing_docs)]
#![warn(missing_debug_implementations)]

pub mod cli;
pub mod config;
mod error;
pub mod http;
pub mod observability;
pub mod random;
pub mod request;
pub mod runner;
pub mod workload;

pub use crate::config::Config;
pub use crate::error::{Error, Result};
pub use crate::request::{Request, VuId};
pub use crate::runner::{Summary, run};
pub use crate::workload::{Driver, Scenario, Workload};
