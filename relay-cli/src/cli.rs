//! CLI parser and config loading.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use relay_slack::{RelayConfig, RelayOptions, DEFAULT_API_URL};

#[derive(Parser, Debug)]
#[command(name = "relay")]
#[command(about = "Slack relay bot: joins a channel, greets it and prints what it hears", long_about = None)]
#[command(version)]
pub struct Cli {
    /// JSON config with default_room, friend_name, slack_key and slack_team.
    #[arg(long, default_value = "./config.json")]
    pub config_path: PathBuf,

    /// Directory for persistent state.
    #[arg(long, default_value = "./data/")]
    pub data_dir_path: PathBuf,

    /// Slack Web API root.
    #[arg(long, env = "SLACK_API_URL", default_value = DEFAULT_API_URL)]
    pub api_url: String,

    /// Also write logs to this file.
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    /// Seconds to wait for the in-flight handler on shutdown.
    #[arg(long, default_value_t = 5)]
    pub drain_timeout_secs: u64,
}

impl Cli {
    /// Runtime options from the flags; everything else keeps its default.
    pub fn options(&self) -> RelayOptions {
        RelayOptions {
            api_url: self.api_url.clone(),
            data_dir: self.data_dir_path.clone(),
            drain_timeout: Duration::from_secs(self.drain_timeout_secs),
            ..RelayOptions::default()
        }
    }
}

/// Load RelayConfig from `--config-path`.
pub fn load_config(cli: &Cli) -> Result<RelayConfig> {
    Ok(RelayConfig::load(&cli.config_path)?)
}
