//! Log setup for the command line tool.

use std::env;

use tracing::Level;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::{EnvFilter, prelude::*};

/// Installs the global `tracing` subscriber, logging to stderr.
///
/// See [`parse_rust_log`] for how `RUST_LOG` is interpreted.
pub fn initialize_tracing() {
    let (level, env_filter) = parse_rust_log(env::var(EnvFilter::DEFAULT_ENV).ok().as_deref());
    let format = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true);

    tracing_subscriber::registry()
        .with(format.with_filter(LevelFilter::from(level)))
        .with(env_filter)
        .init();
}

/// Derives the log level and filter from the value of `RUST_LOG`.
///
/// A plain level such as `debug` caps the verbosity while the default filter keeps noisy
/// dependencies quiet. Any other value is used literally as an [`EnvFilter`] directive.
pub fn parse_rust_log(rust_log: Option<&str>) -> (Level, EnvFilter) {
    let level = match rust_log {
        Some(value) => match value.parse::<Level>() {
            Ok(level) => level,
            Err(_) => return (Level::TRACE, EnvFilter::new(value)),
        },
        None => Level::INFO,
    };

    // This is the maximum verbosity that will be logged, we filter this down to `level`.
    let env_filter = EnvFilter::new(
        "INFO,\
        hyper_util=WARN,\
        reqwest=WARN,\
        kvload=TRACE,\
        ",
    );

    (level, env_filter)
}
