//! The dispatch loop: takes inbound events in arrival order and runs their handlers one at a time.
//!
//! Handlers run strictly sequentially, so a slow handler delays every event behind it. That keeps
//! ordering exact; there is no per-handler timeout.

use std::time::Duration;

use handler_registry::{DispatchOutcome, HandlerRegistry};
use relay_core::Result;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};

use crate::connection::{ConnectionHandle, InboundEvents};

/// How long an in-flight handler may keep running after cancellation.
pub const DEFAULT_DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Lifecycle of an [`EventRelay`]: Idle → Running → Draining → Stopped.
///
/// The relay stays `Idle` until the first inbound event arrives, so a relay that is still waiting
/// for its first session never reports `Running`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayState {
    Idle,
    Running,
    Draining,
    Stopped,
}

/// Counters returned when the relay stops.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RelayStats {
    pub dispatched: u64,
    pub failed: u64,
    /// The in-flight handler was abandoned because the drain timeout elapsed.
    pub drain_timed_out: bool,
}

pub struct EventRelay {
    registry: HandlerRegistry,
    connection: ConnectionHandle,
    inbound: InboundEvents,
    drain_timeout: Duration,
    state: watch::Sender<RelayState>,
}

impl EventRelay {
    /// Takes the connection's inbound stream; fails with `InboundTaken` if another consumer has it.
    pub fn new(registry: HandlerRegistry, connection: ConnectionHandle) -> Result<Self> {
        let inbound = connection.inbound()?;
        let (state, _) = watch::channel(RelayState::Idle);
        Ok(Self {
            registry,
            connection,
            inbound,
            drain_timeout: DEFAULT_DRAIN_TIMEOUT,
            state,
        })
    }

    pub fn with_drain_timeout(mut self, drain_timeout: Duration) -> Self {
        self.drain_timeout = drain_timeout;
        self
    }

    /// Watches state transitions.
    pub fn state(&self) -> watch::Receiver<RelayState> {
        self.state.subscribe()
    }

    fn set_state(&self, state: RelayState) {
        let previous = self.state.send_replace(state);
        if previous != state {
            info!(from = ?previous, to = ?state, "relay state changed");
        }
    }

    /// Runs until `cancel` fires or the inbound stream ends, then drains and closes the connection.
    #[instrument(skip_all)]
    pub async fn run(mut self, cancel: CancellationToken) -> RelayStats {
        let mut stats = RelayStats::default();

        loop {
            let event = tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                next = self.inbound.recv() => match next {
                    Some(event) => event,
                    None => {
                        warn!("inbound stream ended");
                        break;
                    }
                },
            };
            self.set_state(RelayState::Running);

            let dispatch = self.registry.dispatch(&event, &self.connection);
            tokio::pin!(dispatch);

            let outcome = tokio::select! {
                biased;
                outcome = &mut dispatch => Some(outcome),
                _ = cancel.cancelled() => {
                    self.set_state(RelayState::Draining);
                    match tokio::time::timeout(self.drain_timeout, &mut dispatch).await {
                        Ok(outcome) => Some(outcome),
                        Err(_) => {
                            warn!(
                                timeout_ms = self.drain_timeout.as_millis() as u64,
                                kind = %event.kind(),
                                "drain timeout elapsed, abandoning in-flight handler"
                            );
                            None
                        }
                    }
                }
            };

            match outcome {
                Some(DispatchOutcome::Handled) => stats.dispatched += 1,
                Some(DispatchOutcome::Failed | DispatchOutcome::Panicked) => {
                    stats.dispatched += 1;
                    stats.failed += 1;
                }
                None => stats.drain_timed_out = true,
            }

            if cancel.is_cancelled() {
                break;
            }
        }

        self.set_state(RelayState::Draining);
        self.connection.close().await;
        self.set_state(RelayState::Stopped);
        info!(
            dispatched = stats.dispatched,
            failed = stats.failed,
            "relay stopped"
        );
        stats
    }
}
