//! Configuration for a load run.
//!
//! Configuration is loaded once at startup from the following sources, with the highest precedence
//! first:
//!
//! 1. Environment variables (unprefixed, e.g. `BASE_URL`, `VUS`)
//! 2. YAML configuration file (specified via `-c` or `--config` flag)
//! 3. Defaults
//!
//! # Environment Variables
//!
//! | Variable      | Field                    | Default                 |
//! |---------------|--------------------------|-------------------------|
//! | `BASE_URL`    | [`Config::base_url`]     | `http://localhost:8080` |
//! | `DURATION`    | [`Config::duration`]     | `40s`                   |
//! | `VUS`         | [`Config::vus`]          | `1`                     |
//! | `KEYSPACE`    | [`Config::keyspace`]     | `10000`                 |
//! | `HOT_KEY_MAX` | [`Config::hot_key_max`]  | `3000`                  |
//! | `GET_RATIO`   | [`Config::get_ratio`]    | `0.7`                   |
//! | `PUT_RATIO`   | [`Config::put_ratio`]    | `0.3`                   |
//! | `ITERATIONS`  | [`Config::iterations`]   | unset                   |
//! | `TIMEOUT`     | [`Config::timeout`]      | `60s`                   |
//!
//! # YAML Configuration File
//!
//! The same fields in lowercase:
//!
//! ```yaml
//! base_url: http://localhost:8080
//! duration: 2m
//! vus: 32
//! keyspace: 100000
//! get_ratio: 0.9
//! put_ratio: 0.1
//! ```

use std::path::Path;
use std::time::Duration;

use figment::Figment;
use figment::providers::{Env, Format, Serialized, Yaml};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{Error, Result};
use crate::random::MAX_KEY_BOUND;

/// Environment variables that are picked up as configuration overrides.
const ENV_KEYS: &[&str] = &[
    "base_url",
    "duration",
    "vus",
    "keyspace",
    "hot_key_max",
    "get_ratio",
    "put_ratio",
    "iterations",
    "timeout",
];

/// Settings of a single load run.
///
/// Constructed once with [`Config::load`] and then passed by reference to the drivers and the
/// run harness.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    /// Origin of the key-value service under test.
    ///
    /// # Environment Variable
    ///
    /// `BASE_URL`
    pub base_url: String,

    /// How long virtual users keep starting new iterations.
    ///
    /// Accepts [humantime](https://docs.rs/humantime) strings such as `40s` or `2m`.
    ///
    /// # Environment Variable
    ///
    /// `DURATION`
    #[serde(with = "humantime_serde")]
    pub duration: Duration,

    /// Number of concurrent virtual users.
    ///
    /// # Environment Variable
    ///
    /// `VUS`
    pub vus: u32,

    /// Upper bound for keys generated by the write-only and mixed workloads.
    ///
    /// # Environment Variable
    ///
    /// `KEYSPACE`
    pub keyspace: u64,

    /// Upper bound for keys read by the popular-keys workload.
    ///
    /// # Environment Variable
    ///
    /// `HOT_KEY_MAX`
    pub hot_key_max: u64,

    /// Probability that an iteration of the mixed workload is a read.
    ///
    /// # Environment Variable
    ///
    /// `GET_RATIO`
    pub get_ratio: f64,

    /// Nominal write probability of the mixed workload.
    ///
    /// Only [`get_ratio`](Self::get_ratio) decides between reads and writes. This value is kept
    /// for documentation and a consistency warning when it does not complement the read ratio.
    ///
    /// # Environment Variable
    ///
    /// `PUT_RATIO`
    pub put_ratio: f64,

    /// Total number of iterations shared by all virtual users.
    ///
    /// When set, the run ends as soon as this many iterations were started or the
    /// [`duration`](Self::duration) elapsed, whichever comes first.
    ///
    /// # Environment Variable
    ///
    /// `ITERATIONS`
    pub iterations: Option<u64>,

    /// Timeout for a single request, including connecting and reading the response.
    ///
    /// # Environment Variable
    ///
    /// `TIMEOUT`
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080".to_owned(),
            duration: Duration::from_secs(40),
            vus: 1,
            keyspace: 10_000,
            hot_key_max: 3000,
            get_ratio: 0.7,
            put_ratio: 0.3,
            iterations: None,
            timeout: Duration::from_secs(60),
        }
    }
}

impl Config {
    /// Loads and validates the configuration.
    ///
    /// Sources are merged in the following order (later sources override earlier ones):
    /// 1. Default values
    /// 2. YAML configuration file (if `path` is given)
    /// 3. Environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The YAML configuration file cannot be read or parsed
    /// - Environment variables contain values of the wrong type
    /// - A value is out of range, see [`Config::validate`]
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut figment = Figment::from(Serialized::defaults(Config::default()));
        if let Some(path) = path {
            figment = figment.merge(Yaml::file(path));
        }
        let config: Config = figment.merge(Env::raw().only(ENV_KEYS)).extract()?;

        config.validate()?;
        Ok(config)
    }

    /// Checks that all values are within their allowed ranges.
    pub fn validate(&self) -> Result<()> {
        let base_url = self.parsed_base_url()?;
        if !matches!(base_url.scheme(), "http" | "https") {
            return Err(invalid(format!(
                "base_url must use http or https, got `{}`",
                base_url.scheme()
            )));
        }
        if self.duration.is_zero() {
            return Err(invalid("duration must be greater than zero"));
        }
        if self.vus == 0 {
            return Err(invalid("vus must be at least 1"));
        }
        if !(1..=MAX_KEY_BOUND).contains(&self.keyspace) {
            return Err(invalid(format!(
                "keyspace must be within [1, {MAX_KEY_BOUND}], got {}",
                self.keyspace
            )));
        }
        if !(1..=MAX_KEY_BOUND).contains(&self.hot_key_max) {
            return Err(invalid(format!(
                "hot_key_max must be within [1, {MAX_KEY_BOUND}], got {}",
                self.hot_key_max
            )));
        }
        if !(0.0..=1.0).contains(&self.get_ratio) {
            return Err(invalid(format!(
                "get_ratio must be within [0, 1], got {}",
                self.get_ratio
            )));
        }
        if self.iterations == Some(0) {
            return Err(invalid("iterations must be at least 1 when set"));
        }

        if (self.get_ratio + self.put_ratio - 1.0).abs() > 1e-9 {
            tracing::warn!(
                get_ratio = self.get_ratio,
                put_ratio = self.put_ratio,
                "put_ratio does not complement get_ratio; writes happen with probability {}",
                1.0 - self.get_ratio
            );
        }

        Ok(())
    }

    /// Returns the base URL parsed into a [`Url`].
    pub fn parsed_base_url(&self) -> Result<Url> {
        Ok(Url::parse(&self.base_url)?)
    }
}

fn invalid(message: impl Into<String>) -> Error {
    Error::InvalidConfig(message.into())
}
