//! relay: connect to Slack, greet the configured channel, print events until Ctrl-C.

use anyhow::Result;
use clap::Parser;
use relay_cli::{load_config, Cli};
use relay_slack::run_relay;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    relay_core::init_tracing(cli.log_file.as_deref())?;

    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{e:#}");
            std::process::exit(1);
        }
    };

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "failed to listen for Ctrl-C");
            return;
        }
        info!("Ctrl-C received, shutting down");
        on_signal.cancel();
    });

    match run_relay(config, cli.options(), cancel).await {
        Ok(stats) => {
            info!(
                dispatched = stats.dispatched,
                failed = stats.failed,
                drain_timed_out = stats.drain_timed_out,
                "Relay stopped"
            );
            Ok(())
        }
        Err(e) => {
            eprintln!("{e:#}");
            std::process::exit(1);
        }
    }
}
