//! Speedtest to Prometheus
//!
//! Pushes the result of a single `speedtest --format=json` run to a
//! Prometheus remote write endpoint.

mod config;

use anyhow::{Context, Result};
use log::{info, warn};
use std::io::Read;

use speedtest_core::labels::{colliding_labels, static_labels, Label};
use speedtest_core::metrics::{build_metrics, Metrics};
use speedtest_core::SpeedTestResult;
use speedtest_remote_write::RemoteWriteClient;

use crate::config::Config;

/// The program's main entry point.
fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    // Configuration errors are fatal before anything is read or sent
    let config = Config::load()?;

    async_std::task::block_on(run(config))
}

async fn run(config: Config) -> Result<()> {
    let mut input = Vec::new();
    std::io::stdin()
        .read_to_end(&mut input)
        .context("failed to read speedtest result from stdin")?;
    let (metrics, labels) = prepare(&input, &config.labels)?;

    let client = RemoteWriteClient::new(config.remote_write_url, config.credentials)
        .with_timeout(config.timeout);
    let sent = client
        .write(&metrics, &labels)
        .await
        .context("failed to push metrics")?;

    info!("Metrics pushed successfully ({} series)", sent);
    Ok(())
}

/// Decode a speedtest result and build its metrics and static labels
fn prepare(input: &[u8], extra_labels: &[Label]) -> Result<(Metrics, Vec<Label>)> {
    let result = SpeedTestResult::from_json(input).context("failed to parse speedtest result")?;

    let labels = static_labels(&result, extra_labels);
    for name in colliding_labels(&labels) {
        warn!(
            "label '{}' is set more than once; each series will repeat it",
            name
        );
    }

    Ok((build_metrics(&result), labels))
}
