//! Command line interface.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use argh::FromArgs;

use crate::config::Config;
use crate::http::HttpRemote;
use crate::workload::{Scenario, Workload};
use crate::{observability, runner};

/// Generate read, write or mixed load against an HTTP key-value service.
///
/// Settings are read from the optional YAML file and the environment variables BASE_URL, DURATION,
/// VUS, KEYSPACE, HOT_KEY_MAX, GET_RATIO, PUT_RATIO, ITERATIONS and TIMEOUT.
#[derive(Debug, FromArgs)]
struct Args {
    /// path to the YAML configuration file
    #[argh(option, short = 'c')]
    pub config: Option<PathBuf>,

    #[argh(subcommand)]
    pub command: Command,
}

#[derive(Debug, FromArgs)]
#[argh(subcommand)]
enum Command {
    GetPopular(GetPopularCommand),
    PutOnly(PutOnlyCommand),
    Mixed(MixedCommand),
}

/// read keys from the hot key range
#[derive(Debug, FromArgs)]
#[argh(subcommand, name = "get-popular")]
struct GetPopularCommand {}

/// write random values across the keyspace
#[derive(Debug, FromArgs)]
#[argh(subcommand, name = "put-only")]
struct PutOnlyCommand {}

/// mix reads and writes at GET_RATIO
#[derive(Debug, FromArgs)]
#[argh(subcommand, name = "mixed")]
struct MixedCommand {}

impl Command {
    fn scenario(&self) -> Scenario {
        match self {
            Command::GetPopular(_) => Scenario::GetPopular,
            Command::PutOnly(_) => Scenario::PutOnly,
            Command::Mixed(_) => Scenario::Mixed,
        }
    }
}

/// Bootstrap the runtime and execute the CLI command.
pub fn execute() -> Result<()> {
    let args: Args = argh::from_env();

    observability::initialize_tracing();

    let config = Config::load(args.config.as_deref())?;
    tracing::debug!(?config);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .thread_name("kvload-rt")
        .enable_all()
        .build()?;
    let _runtime_guard = runtime.enter();

    let scenario = args.command.scenario();
    let workload = Workload::new(scenario, &config);
    let remote = HttpRemote::from_config(&config).context("failed to create HTTP client")?;

    tracing::info!(
        %scenario,
        base_url = %remote.base_url(),
        vus = config.vus,
        duration = ?config.duration,
        "starting load run"
    );

    let summary = runtime.block_on(runner::run(Arc::new(remote), Arc::new(workload), &config))?;
    runner::print_summary(scenario.name(), &summary);

    Ok(())
}
