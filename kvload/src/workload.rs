//! The workload drivers that decide what each iteration sends.
//!
//! A driver is a pure function of the virtual user's identity and a [`RandomSource`]. It holds only
//! immutable settings, so a single instance is shared by all virtual users of a run.

use std::fmt;
use std::str::FromStr;

use crate::config::Config;
use crate::random::{self, RandomSource};
use crate::request::{Request, VuId};

/// Length of the random suffix appended to generated values.
const VALUE_SUFFIX_LEN: usize = 6;

/// Produces the request for a single iteration.
pub trait Driver: fmt::Debug + Send + Sync {
    /// Generates the next request for virtual user `vu`.
    fn next_request(&self, vu: VuId, rng: &mut dyn RandomSource) -> Request;
}

/// Reads from a small range of popular keys to simulate skewed, cache-friendly traffic.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PopularKeyReader {
    /// Keys are drawn from `[1, hot_key_max]`.
    pub hot_key_max: u64,
}

impl PopularKeyReader {
    /// Creates a reader from [`Config::hot_key_max`].
    pub fn from_config(config: &Config) -> Self {
        Self {
            hot_key_max: config.hot_key_max,
        }
    }
}

impl Driver for PopularKeyReader {
    fn next_request(&self, _vu: VuId, mut rng: &mut dyn RandomSource) -> Request {
        Request::Read {
            key: random::sample_key(&mut rng, self.hot_key_max),
        }
    }
}

/// Writes random values to random keys across the keyspace.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct WriteOnlyGenerator {
    /// Keys are drawn from `[1, keyspace]`.
    pub keyspace: u64,
}

impl WriteOnlyGenerator {
    /// Creates a writer from [`Config::keyspace`].
    pub fn from_config(config: &Config) -> Self {
        Self {
            keyspace: config.keyspace,
        }
    }
}

impl Driver for WriteOnlyGenerator {
    fn next_request(&self, vu: VuId, mut rng: &mut dyn RandomSource) -> Request {
        let key = random::sample_key(&mut rng, self.keyspace);
        Request::Create {
            key,
            value: generate_value(vu, &mut rng),
        }
    }
}

/// Randomly mixes reads and writes over the whole keyspace.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MixedWorkloadGenerator {
    /// Keys are drawn from `[1, keyspace]` for both reads and writes.
    pub keyspace: u64,
    /// Probability that an iteration is a read.
    pub get_ratio: f64,
    /// Nominal write probability. Never consulted when branching.
    pub put_ratio: f64,
}

impl MixedWorkloadGenerator {
    /// Creates a mixed generator from the keyspace and ratios in `config`.
    pub fn from_config(config: &Config) -> Self {
        Self {
            keyspace: config.keyspace,
            get_ratio: config.get_ratio,
            put_ratio: config.put_ratio,
        }
    }
}

impl Driver for MixedWorkloadGenerator {
    fn next_request(&self, vu: VuId, mut rng: &mut dyn RandomSource) -> Request {
        let key = random::sample_key(&mut rng, self.keyspace);

        if rng.next() < self.get_ratio {
            Request::Read { key }
        } else {
            Request::Create {
                key,
                value: generate_value(vu, &mut rng),
            }
        }
    }
}

/// Builds a value of the form `val-{vu}-{suffix}` with a random alphanumeric suffix.
///
/// Including the virtual user keeps values from concurrent users apart without coordination.
pub fn generate_value(vu: VuId, rng: &mut impl RandomSource) -> String {
    let suffix = random::alphanumeric(rng, VALUE_SUFFIX_LEN);
    format!("val-{vu}-{suffix}")
}

/// The traffic patterns that can be selected for a run.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Scenario {
    /// Reads from the hot key range, see [`PopularKeyReader`].
    GetPopular,
    /// Only writes, see [`WriteOnlyGenerator`].
    PutOnly,
    /// Reads and writes at a ratio, see [`MixedWorkloadGenerator`].
    Mixed,
}

impl Scenario {
    /// The name used on the command line and in the summary.
    pub fn name(self) -> &'static str {
        match self {
            Self::GetPopular => "get-popular",
            Self::PutOnly => "put-only",
            Self::Mixed => "mixed",
        }
    }
}

impl fmt::Display for Scenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Scenario {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "get-popular" => Ok(Self::GetPopular),
            "put-only" => Ok(Self::PutOnly),
            "mixed" => Ok(Self::Mixed),
            other => Err(format!(
                "unknown scenario `{other}`, expected one of get-popular, put-only, mixed"
            )),
        }
    }
}

/// A configured driver for one of the [`Scenario`]s.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Workload {
    /// See [`PopularKeyReader`].
    GetPopular(PopularKeyReader),
    /// See [`WriteOnlyGenerator`].
    PutOnly(WriteOnlyGenerator),
    /// See [`MixedWorkloadGenerator`].
    Mixed(MixedWorkloadGenerator),
}

impl Workload {
    /// Creates the driver for `scenario` with the settings in `config`.
    pub fn new(scenario: Scenario, config: &Config) -> Self {
        match scenario {
            Scenario::GetPopular => Self::GetPopular(PopularKeyReader::from_config(config)),
            Scenario::PutOnly => Self::PutOnly(WriteOnlyGenerator::from_config(config)),
            Scenario::Mixed => Self::Mixed(MixedWorkloadGenerator::from_config(config)),
        }
    }

    /// The scenario this workload implements.
    pub fn scenario(&self) -> Scenario {
        match self {
            Self::GetPopular(_) => Scenario::GetPopular,
            Self::PutOnly(_) => Scenario::PutOnly,
            Self::Mixed(_) => Scenario::Mixed,
        }
    }
}

impl Driver for Workload {
    fn next_request(&self, vu: VuId, rng: &mut dyn RandomSource) -> Request {
        match self {
            Self::GetPopular(driver) => driver.next_request(vu, rng),
            Self::PutOnly(driver) => driver.next_request(vu, rng),
            Self::Mixed(driver) => driver.next_request(vu, rng),
        }
    }
}
