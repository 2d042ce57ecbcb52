//! Built-in handlers: print events to the console and greet the destination on connect.

use std::io::{self, Write};
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use relay_core::{
    Destination, EventHandler, HandlerError, InboundEvent, Outbound, OutboundEvent, Result,
};
use tracing::{info, warn};

/// Greeting posted on every connect unless the config overrides it.
pub const DEFAULT_GREETING: &str = "/me wakes up and looks around";

/// Line-oriented console output shared by the built-in handlers. Stdout by default.
#[derive(Clone)]
pub struct Console {
    out: Arc<Mutex<Box<dyn Write + Send>>>,
}

impl Console {
    pub fn stdout() -> Self {
        Self::with_writer(io::stdout())
    }

    pub fn with_writer(writer: impl Write + Send + 'static) -> Self {
        Self {
            out: Arc::new(Mutex::new(Box::new(writer))),
        }
    }

    pub fn line(&self, line: &str) -> Result<()> {
        let mut out = self.out.lock().unwrap_or_else(PoisonError::into_inner);
        writeln!(out, "{line}")
            .and_then(|_| out.flush())
            .map_err(|e| HandlerError::Failed(format!("console write failed: {e}")))?;
        Ok(())
    }
}

/// One console line per event.
pub fn render(event: &InboundEvent) -> String {
    match event {
        InboundEvent::Connected(info) => format!("Infos: {info}"),
        InboundEvent::Message(msg) => format!(
            "Message: [{}] {} in {}: {}",
            msg.received_at.format("%H:%M:%S"),
            if msg.sender.is_empty() { "?" } else { msg.sender.as_str() },
            msg.destination,
            msg.text
        ),
        InboundEvent::TransportError(description) => format!("Error: {description}"),
        InboundEvent::Other(raw) => raw.clone(),
    }
}

/// Prints every event it receives.
pub struct ConsoleHandler {
    console: Console,
}

impl ConsoleHandler {
    pub fn new(console: Console) -> Self {
        Self { console }
    }
}

#[async_trait]
impl EventHandler for ConsoleHandler {
    async fn handle(&self, event: &InboundEvent, _outbound: &dyn Outbound) -> Result<()> {
        self.console.line(&render(event))
    }
}

/// On `Connected` (first connect and every reconnect), prints the connection info and posts the
/// greeting to the resolved destination. A failed send is logged and the greeting dropped.
pub struct GreetingHandler {
    destination: Destination,
    greeting: String,
    console: Console,
}

impl GreetingHandler {
    pub fn new(destination: Destination, greeting: impl Into<String>, console: Console) -> Self {
        Self {
            destination,
            greeting: greeting.into(),
            console,
        }
    }
}

#[async_trait]
impl EventHandler for GreetingHandler {
    async fn handle(&self, event: &InboundEvent, outbound: &dyn Outbound) -> Result<()> {
        let InboundEvent::Connected(_) = event else {
            return Ok(());
        };
        self.console.line(&render(event))?;

        let greeting = OutboundEvent::new(self.destination.id.clone(), self.greeting.clone());
        match outbound.send(greeting).await {
            Ok(()) => info!(
                destination = %self.destination.name,
                destination_id = %self.destination.id,
                "greeting sent"
            ),
            Err(e) => warn!(
                destination_id = %self.destination.id,
                error = %e,
                "greeting dropped"
            ),
        }
        Ok(())
    }
}
