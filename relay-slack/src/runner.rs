//! Startup wiring: resolve the room, connect, register handlers, relay until cancelled.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use handler_registry::HandlerRegistry;
use relay_core::{Destination, EventKind};
use relay_runtime::{
    resolve_destination, Console, ConnectionManager, ConsoleHandler, EventRelay, GreetingHandler,
    ReconnectPolicy, RelayStats, DEFAULT_DRAIN_TIMEOUT,
};
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument};

use crate::api::{SlackApi, DEFAULT_API_URL};
use crate::config::RelayConfig;
use crate::session::{SlackTransport, DEFAULT_PING_INTERVAL};

/// Process-level knobs that do not belong in the config file.
#[derive(Clone)]
pub struct RelayOptions {
    pub api_url: String,
    /// Reserved for persistent state; the relay itself does not touch it.
    pub data_dir: PathBuf,
    pub drain_timeout: Duration,
    pub reconnect: ReconnectPolicy,
    /// RTM keepalive interval; three silent intervals end the session.
    pub ping_interval: Duration,
    pub console: Console,
}

impl Default for RelayOptions {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            data_dir: PathBuf::from("./data/"),
            drain_timeout: DEFAULT_DRAIN_TIMEOUT,
            reconnect: ReconnectPolicy::default(),
            ping_interval: DEFAULT_PING_INTERVAL,
            console: Console::stdout(),
        }
    }
}

/// Greeting on `Connected`; console output for messages, transport errors and everything else.
pub fn build_registry(
    config: &RelayConfig,
    destination: Destination,
    console: Console,
) -> HandlerRegistry {
    let printer = Arc::new(ConsoleHandler::new(console.clone()));
    HandlerRegistry::new()
        .with_handler(
            EventKind::Connected,
            Arc::new(GreetingHandler::new(
                destination,
                config.greeting.clone(),
                console,
            )),
        )
        .with_handler(EventKind::Message, printer.clone())
        .with_handler(EventKind::TransportError, printer.clone())
        .with_handler(EventKind::Other, printer)
}

/// Main entry: resolve the destination (fatal on failure, before any connection attempt), start the
/// supervised connection, and run the relay until `cancel` fires.
#[instrument(skip_all, fields(friend = %config.identity_name, room = %config.destination_name))]
pub async fn run_relay(
    config: RelayConfig,
    options: RelayOptions,
    cancel: CancellationToken,
) -> Result<RelayStats> {
    info!(data_dir = %options.data_dir.display(), api_url = %options.api_url, "Initializing relay");

    let api = SlackApi::new(config.api_key.clone()).with_base_url(options.api_url.clone());
    let destination = resolve_destination(&api, &config.destination_name).await?;

    let registry = build_registry(&config, destination, options.console.clone());
    let transport =
        SlackTransport::new(api, config.team.clone()).with_ping_interval(options.ping_interval);
    let connection = ConnectionManager::connect(transport, options.reconnect);
    let relay = EventRelay::new(registry, connection)?.with_drain_timeout(options.drain_timeout);

    info!("Relay started");
    Ok(relay.run(cancel).await)
}
