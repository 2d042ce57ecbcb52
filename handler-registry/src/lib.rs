//! # Handler registry
//!
//! Maps each [`EventKind`] to one [`EventHandler`]. Dispatch looks up the handler for the event's kind,
//! falling back to a default (log and ignore). Handler errors and panics are caught and logged here so
//! one bad handler never stops the relay loop.

use std::any::Any;
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use async_trait::async_trait;
use futures::FutureExt;
use relay_core::{EventHandler, EventKind, HandlerError, InboundEvent, Outbound, Result};
use tracing::{debug, error, instrument};

/// Result of one dispatch. Never an error: failures are already logged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    Handled,
    Failed,
    Panicked,
}

/// Default handler: logs the event kind at debug level and does nothing else.
pub struct LogAndIgnore;

#[async_trait]
impl EventHandler for LogAndIgnore {
    async fn handle(&self, event: &InboundEvent, _outbound: &dyn Outbound) -> Result<()> {
        debug!(kind = %event.kind(), "no handler registered, event ignored");
        Ok(())
    }
}

/// Kind → handler mapping. Keys are unique; the last registration for a kind wins.
#[derive(Clone)]
pub struct HandlerRegistry {
    handlers: HashMap<EventKind, Arc<dyn EventHandler>>,
    default_handler: Arc<dyn EventHandler>,
}

impl Default for HandlerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl HandlerRegistry {
    /// Creates an empty registry whose default is [`LogAndIgnore`].
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
            default_handler: Arc::new(LogAndIgnore),
        }
    }

    /// Registers `handler` for `kind`, returning the handler it replaced, if any.
    pub fn register(
        &mut self,
        kind: EventKind,
        handler: Arc<dyn EventHandler>,
    ) -> Option<Arc<dyn EventHandler>> {
        let replaced = self.handlers.insert(kind, handler);
        if replaced.is_some() {
            debug!(kind = %kind, "handler replaced");
        }
        replaced
    }

    /// Builder form of [`register`](Self::register).
    pub fn with_handler(mut self, kind: EventKind, handler: Arc<dyn EventHandler>) -> Self {
        self.register(kind, handler);
        self
    }

    /// Replaces the handler used for kinds with no registration.
    pub fn set_default(&mut self, handler: Arc<dyn EventHandler>) {
        self.default_handler = handler;
    }

    fn handler_for(&self, kind: EventKind) -> &Arc<dyn EventHandler> {
        self.handlers.get(&kind).unwrap_or(&self.default_handler)
    }

    /// Runs the matching handler (or the default) to completion.
    ///
    /// `Err` returns and panics are logged and reported as [`DispatchOutcome`]; nothing propagates.
    #[instrument(skip(self, event, outbound), fields(kind = %event.kind()))]
    pub async fn dispatch(&self, event: &InboundEvent, outbound: &dyn Outbound) -> DispatchOutcome {
        let kind = event.kind();
        let handler = self.handler_for(kind);

        match AssertUnwindSafe(handler.handle(event, outbound))
            .catch_unwind()
            .await
        {
            Ok(Ok(())) => {
                debug!(kind = %kind, "handler done");
                DispatchOutcome::Handled
            }
            Ok(Err(e)) => {
                error!(kind = %kind, error = %e, "handler failed");
                DispatchOutcome::Failed
            }
            Err(payload) => {
                let err = HandlerError::Panicked(panic_message(payload.as_ref()));
                error!(kind = %kind, error = %err, "handler panicked");
                DispatchOutcome::Panicked
            }
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

// Dispatch behavior is covered in tests/handler_registry_test.rs
