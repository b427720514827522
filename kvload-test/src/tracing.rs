//! Log capture for tests.

use tracing_subscriber::EnvFilter;

/// Directives used when `RUST_LOG` is not set.
const DEFAULT_DIRECTIVES: &str = "ERROR,kvload=DEBUG,kvload_test=TRACE";

/// Routes logs of the load generator into the output captured by the Rust test runner.
///
/// `RUST_LOG` replaces the default directives when set. Calling this more than once is harmless,
/// only the first subscriber is installed.
///
/// # Example
///
/// ```
/// kvload_test::tracing::init();
/// ```
pub fn init() {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVES));

    tracing_subscriber::fmt::fmt()
        .with_env_filter(env_filter)
        .with_test_writer()
        .compact()
        .try_init()
        .ok();
}
