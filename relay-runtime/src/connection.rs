//! Transport supervision: keeps one session alive, reconnecting with exponential backoff, and
//! funnels every session's events into a single ordered inbound stream.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use relay_core::{
    InboundEvent, Outbound, OutboundEvent, RelayError, Result, Session, SessionSink, Transport,
};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

/// Longest wait for a session's close handshake before it is abandoned.
pub const SESSION_CLOSE_TIMEOUT: Duration = Duration::from_secs(2);

/// Receiving end of the inbound stream. Unbounded, ordered, single consumer.
pub type InboundEvents = mpsc::UnboundedReceiver<InboundEvent>;

/// Backoff between reconnect attempts: starts at `initial_delay`, doubles, capped at `max_delay`.
/// Reset to `initial_delay` after a session opens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    pub initial_delay: Duration,
    pub max_delay: Duration,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
        }
    }
}

impl ReconnectPolicy {
    pub fn next_delay(&self, current: Duration) -> Duration {
        current.saturating_mul(2).min(self.max_delay)
    }
}

struct Shared {
    /// Write half of the live session; `None` between sessions.
    current: Mutex<Option<Arc<dyn SessionSink>>>,
    inbound: Mutex<Option<InboundEvents>>,
    supervisor: Mutex<Option<JoinHandle<()>>>,
    cancel: CancellationToken,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Handle to a supervised connection. Cheap to clone; all clones share one session.
#[derive(Clone)]
pub struct ConnectionHandle {
    shared: Arc<Shared>,
}

/// Starts connection supervision.
pub struct ConnectionManager;

impl ConnectionManager {
    /// Spawns the supervision task and returns immediately; the first session opens in the background.
    /// Must be called inside a tokio runtime.
    pub fn connect<T: Transport>(transport: T, policy: ReconnectPolicy) -> ConnectionHandle {
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let shared = Arc::new(Shared {
            current: Mutex::new(None),
            inbound: Mutex::new(Some(event_rx)),
            supervisor: Mutex::new(None),
            cancel: CancellationToken::new(),
        });

        let task = tokio::spawn(supervise(transport, policy, shared.clone(), event_tx));
        *lock(&shared.supervisor) = Some(task);

        ConnectionHandle { shared }
    }
}

impl ConnectionHandle {
    /// Takes the inbound event stream. Only the first call succeeds.
    pub fn inbound(&self) -> Result<InboundEvents> {
        lock(&self.shared.inbound)
            .take()
            .ok_or(RelayError::InboundTaken)
    }

    /// Whether a session is currently live.
    pub fn is_connected(&self) -> bool {
        lock(&self.shared.current).is_some()
    }

    /// Best-effort send on the current session. Nothing is buffered: with no live session this fails
    /// with `SendFailed` and the caller decides whether to drop or retry.
    pub async fn send(&self, event: OutboundEvent) -> Result<()> {
        let sink = lock(&self.shared.current).clone();
        let Some(sink) = sink else {
            return Err(RelayError::SendFailed("no active session".to_string()));
        };
        sink.send(&event).await.map_err(|e| match e {
            RelayError::SendFailed(_) => e,
            other => RelayError::SendFailed(other.to_string()),
        })
    }

    /// Stops supervision, closes the live session and waits for the supervisor to exit. Idempotent.
    pub async fn close(&self) {
        self.shared.cancel.cancel();
        let task = lock(&self.shared.supervisor).take();
        if let Some(task) = task {
            if let Err(e) = task.await {
                warn!(error = %e, "connection supervisor did not exit cleanly");
            }
        }
    }
}

#[async_trait]
impl Outbound for ConnectionHandle {
    async fn send(&self, event: OutboundEvent) -> Result<()> {
        ConnectionHandle::send(self, event).await
    }
}

enum SessionEnd {
    Dropped,
    Cancelled,
    ConsumerGone,
}

#[instrument(skip_all)]
async fn supervise<T: Transport>(
    transport: T,
    policy: ReconnectPolicy,
    shared: Arc<Shared>,
    event_tx: mpsc::UnboundedSender<InboundEvent>,
) {
    let mut delay = policy.initial_delay;

    loop {
        info!("opening session");
        let opened = tokio::select! {
            _ = shared.cancel.cancelled() => break,
            opened = transport.open() => opened,
        };

        match opened {
            Ok(session) => {
                delay = policy.initial_delay;
                match pump(session, &shared, &event_tx).await {
                    SessionEnd::Dropped => info!("session dropped"),
                    SessionEnd::Cancelled => break,
                    SessionEnd::ConsumerGone => {
                        info!("inbound consumer gone, stopping supervision");
                        break;
                    }
                }
            }
            Err(e) => {
                warn!(error = %e, "failed to open session");
                if event_tx
                    .send(InboundEvent::TransportError(e.to_string()))
                    .is_err()
                {
                    break;
                }
            }
        }

        info!(delay_ms = delay.as_millis() as u64, "reconnecting after delay");
        tokio::select! {
            _ = shared.cancel.cancelled() => break,
            _ = tokio::time::sleep(delay) => {}
        }
        delay = policy.next_delay(delay);
    }

    *lock(&shared.current) = None;
    info!("connection supervisor stopped");
}

/// Forwards one session's events until it ends, publishing its sink as the current session meanwhile.
async fn pump(
    session: Session,
    shared: &Shared,
    event_tx: &mpsc::UnboundedSender<InboundEvent>,
) -> SessionEnd {
    let Session { mut events, sink } = session;
    *lock(&shared.current) = Some(sink.clone());
    debug!("session active");

    let end = loop {
        tokio::select! {
            _ = shared.cancel.cancelled() => break SessionEnd::Cancelled,
            next = events.next() => match next {
                Some(event) => {
                    if event_tx.send(event).is_err() {
                        break SessionEnd::ConsumerGone;
                    }
                }
                None => break SessionEnd::Dropped,
            },
        }
    };

    *lock(&shared.current) = None;
    match tokio::time::timeout(SESSION_CLOSE_TIMEOUT, sink.close()).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => debug!(error = %e, "session close failed"),
        Err(_) => warn!(
            timeout_ms = SESSION_CLOSE_TIMEOUT.as_millis() as u64,
            "session close timed out, abandoning it"
        ),
    }
    end
}
