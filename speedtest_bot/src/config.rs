use anyhow::{Context, Result};
use std::time::Duration;
use structopt::StructOpt;

use speedtest_core::labels::{parse_labels, Label};
use speedtest_remote_write::Credentials;

#[derive(Debug)]
pub struct Config {
    /// Labels to add to every series, after the labels describing the speedtest run.
    /// e.g. "environment=production,site=home"
    pub labels: Vec<Label>,

    /// The url to send prometheus remote write requests to; it should include the path.
    /// e.g. "https://prometheus.example.com/api/v1/write"
    pub remote_write_url: String,

    /// Basic auth credentials for the remote write endpoint.
    pub credentials: Credentials,

    /// How long to wait for the remote write endpoint to respond.
    pub timeout: Option<Duration>,
}

impl Config {
    /// Loads configuration from arguments, env and dotenv
    pub fn load() -> Result<Config> {
        // Attempts to find a `.env` file to initialize/extend the environment
        dotenv::dotenv().ok();

        // Load the config from arguments, then environment variables
        Config::from_environment(Environment::from_args())
    }

    fn from_environment(env: Environment) -> Result<Config> {
        let remote_write_url = non_empty(env.prom_url).context("missing PROM_URL")?;
        let username = non_empty(env.prom_username).context("missing PROM_USERNAME")?;
        let password = non_empty(env.prom_password).context("missing PROM_PASSWORD")?;
        Ok(Config {
            labels: parse_labels(&env.labels).context("invalid --labels")?,
            remote_write_url,
            credentials: Credentials::new(username, password),
            timeout: env
                .timeout
                .filter(|secs| *secs > 0)
                .map(Duration::from_secs),
        })
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|val| !val.is_empty())
}

#[derive(Debug, StructOpt)]
#[structopt(
    name = "speedtest-to-prom",
    about = "Reads a speedtest JSON result from stdin and pushes it to Prometheus remote write"
)]
struct Environment {
    /// Additional labels in format 'key1=value1,key2=value2'
    #[structopt(long, default_value = "")]
    labels: String,

    /// The url to send prometheus remote write requests to
    #[structopt(long, env = "PROM_URL")]
    prom_url: Option<String>,

    /// The username for basic auth
    #[structopt(long, env = "PROM_USERNAME", hide_env_values = true)]
    prom_username: Option<String>,

    /// The password for basic auth
    #[structopt(long, env = "PROM_PASSWORD", hide_env_values = true)]
    prom_password: Option<String>,

    /// How long (in seconds) to wait for the remote write endpoint; 0 waits indefinitely
    #[structopt(long, env = "PROM_TIMEOUT")]
    timeout: Option<u64>,
}
