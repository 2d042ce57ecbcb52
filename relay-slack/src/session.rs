//! RTM websocket transport: `rtm.connect` for a socket URL, then one websocket per session.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use relay_core::{
    ConnectionInfo, InboundEvent, OutboundEvent, RelayError, Result, Session, SessionSink,
    Transport,
};
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio::time::{interval_at, Instant, Interval, MissedTickBehavior};
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, instrument, warn};

use crate::adapters::{outbound_frame, parse_frame, ping_frame, Frame};
use crate::api::{RtmConnect, SlackApi};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);

/// Interval between RTM keepalive pings.
pub const DEFAULT_PING_INTERVAL: Duration = Duration::from_secs(30);

/// A session with no inbound frame for this many ping intervals is treated as dead.
const IDLE_PING_INTERVALS: u32 = 3;

/// Opens RTM sessions for one bot token.
pub struct SlackTransport {
    api: SlackApi,
    expected_team: String,
    ping_interval: Duration,
}

impl SlackTransport {
    /// `expected_team` is the configured `slack_team`; a mismatch with the token's team is logged.
    pub fn new(api: SlackApi, expected_team: impl Into<String>) -> Self {
        Self {
            api,
            expected_team: expected_team.into(),
            ping_interval: DEFAULT_PING_INTERVAL,
        }
    }

    pub fn with_ping_interval(mut self, ping_interval: Duration) -> Self {
        self.ping_interval = ping_interval;
        self
    }

    fn check_team(&self, connect: &RtmConnect) {
        let team = &connect.team;
        let matches = [&team.id, &team.name, &team.domain]
            .into_iter()
            .any(|t| t.eq_ignore_ascii_case(&self.expected_team));
        if !matches {
            warn!(
                expected = %self.expected_team,
                team_id = %team.id,
                team_name = %team.name,
                "token belongs to a different team than configured"
            );
        }
    }
}

fn connection_info(connect: &RtmConnect) -> ConnectionInfo {
    ConnectionInfo {
        team_id: connect.team.id.clone(),
        team_name: connect.team.name.clone(),
        team_domain: connect.team.domain.clone(),
        self_id: connect.identity.id.clone(),
        self_name: connect.identity.name.clone(),
    }
}

#[async_trait]
impl Transport for SlackTransport {
    #[instrument(skip(self))]
    async fn open(&self) -> Result<Session> {
        let connect = self.api.rtm_connect().await?;
        self.check_team(&connect);

        let handshake = connect_async(connect.url.as_str());
        let (ws, _response) = tokio::time::timeout(HANDSHAKE_TIMEOUT, handshake)
            .await
            .map_err(|_| {
                RelayError::Transport(format!(
                    "websocket handshake timed out after {}s",
                    HANDSHAKE_TIMEOUT.as_secs()
                ))
            })?
            .map_err(|e| RelayError::Transport(format!("websocket connect failed: {e}")))?;
        info!(
            team = %connect.team.name,
            bot = %connect.identity.name,
            "RTM websocket open"
        );

        let (writer, reader) = ws.split();
        let sink = Arc::new(SlackSink {
            writer: Mutex::new(writer),
            next_id: AtomicU64::new(1),
        });
        let mut ping = interval_at(Instant::now() + self.ping_interval, self.ping_interval);
        ping.set_missed_tick_behavior(MissedTickBehavior::Delay);

        Ok(Session {
            events: rtm_events(RtmReader {
                reader,
                sink: sink.clone(),
                conn_info: connection_info(&connect),
                ping,
                idle_timeout: self.ping_interval * IDLE_PING_INTERVALS,
                last_seen: Instant::now(),
            }),
            sink,
        })
    }
}

/// Read side of one socket plus its keepalive state.
struct RtmReader {
    reader: SplitStream<WsStream>,
    sink: Arc<SlackSink>,
    conn_info: ConnectionInfo,
    ping: Interval,
    idle_timeout: Duration,
    last_seen: Instant,
}

/// Inbound events for one socket. Pings the server every interval and ends on close, `goodbye`,
/// a read error, or when nothing has been received for `idle_timeout`.
fn rtm_events(reader: RtmReader) -> futures::stream::BoxStream<'static, InboundEvent> {
    futures::stream::unfold(Some(reader), |state| async move {
        let Some(mut state) = state else {
            return None;
        };
        loop {
            tokio::select! {
                next = state.reader.next() => {
                    state.last_seen = Instant::now();
                    match next {
                        Some(Ok(Message::Text(text))) => {
                            match parse_frame(text.as_str(), &state.conn_info) {
                                Frame::Event(event) => return Some((event, Some(state))),
                                Frame::Pong => continue,
                                Frame::Goodbye => {
                                    info!("RTM goodbye received, session ending");
                                    return None;
                                }
                            }
                        }
                        Some(Ok(Message::Close(frame))) => {
                            debug!(frame = ?frame, "websocket closed by server");
                            return None;
                        }
                        // Ping replies are queued by tungstenite itself.
                        Some(Ok(_)) => continue,
                        Some(Err(e)) => {
                            warn!(error = %e, "websocket read failed");
                            return Some((InboundEvent::TransportError(e.to_string()), None));
                        }
                        None => return None,
                    }
                }
                _ = state.ping.tick() => {
                    let silent_for = state.last_seen.elapsed();
                    if silent_for >= state.idle_timeout {
                        warn!(
                            silent_ms = silent_for.as_millis() as u64,
                            "no RTM traffic, dropping session"
                        );
                        let reason = format!("no RTM traffic for {}ms", silent_for.as_millis());
                        return Some((InboundEvent::TransportError(reason), None));
                    }
                    // A write stuck on a dead socket must not stall idle detection.
                    let ping_budget = state.ping.period();
                    match tokio::time::timeout(ping_budget, state.sink.ping()).await {
                        Ok(Ok(())) => {}
                        Ok(Err(e)) => debug!(error = %e, "keepalive ping failed"),
                        Err(_) => debug!("keepalive ping write timed out"),
                    }
                }
            }
        }
    })
    .boxed()
}

struct SlackSink {
    writer: Mutex<SplitSink<WsStream, Message>>,
    /// RTM requires a per-connection unique id on every outbound frame.
    next_id: AtomicU64,
}

impl SlackSink {
    /// Writes the frame built for the next id and returns that id.
    async fn write_frame(&self, build: impl FnOnce(u64) -> String) -> Result<u64> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let frame = build(id);
        self.writer
            .lock()
            .await
            .send(Message::Text(frame.into()))
            .await
            .map_err(|e| RelayError::SendFailed(e.to_string()))?;
        Ok(id)
    }

    async fn ping(&self) -> Result<()> {
        let id = self.write_frame(ping_frame).await?;
        debug!(id, "RTM ping written");
        Ok(())
    }
}

#[async_trait]
impl SessionSink for SlackSink {
    async fn send(&self, event: &OutboundEvent) -> Result<()> {
        let id = self.write_frame(|id| outbound_frame(id, event)).await?;
        debug!(id, destination_id = %event.destination_id, "RTM message written");
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        self.writer
            .lock()
            .await
            .close()
            .await
            .map_err(|e| RelayError::Transport(e.to_string()))
    }
}
