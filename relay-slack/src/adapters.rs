//! Adapters between Slack RTM frames and relay-core events.
//! Depends only on serde_json and relay-core type definitions.

use chrono::Utc;
use relay_core::{ChatMessage, ConnectionInfo, InboundEvent, OutboundEvent};
use serde::Deserialize;
use serde_json::json;

/// What one RTM text frame means to the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    Event(InboundEvent),
    /// Server is about to close the socket; the session should end so the supervisor reconnects.
    Goodbye,
    /// Reply to one of our keepalive pings. Consumed by the session.
    Pong,
}

#[derive(Deserialize, Default)]
struct RtmErrorBody {
    #[serde(default)]
    code: Option<i64>,
    #[serde(default)]
    msg: Option<String>,
}

#[derive(Deserialize, Default)]
struct RtmFrame {
    #[serde(rename = "type", default)]
    kind: Option<String>,
    #[serde(default)]
    subtype: Option<String>,
    #[serde(default)]
    user: Option<String>,
    #[serde(default)]
    bot_id: Option<String>,
    #[serde(default)]
    channel: Option<String>,
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    ts: Option<String>,
    #[serde(default)]
    error: Option<RtmErrorBody>,
    #[serde(default)]
    reply_to: Option<u64>,
    #[serde(default)]
    ok: Option<bool>,
}

fn describe_error(error: Option<RtmErrorBody>) -> String {
    let error = error.unwrap_or_default();
    match (error.msg, error.code) {
        (Some(msg), Some(code)) => format!("{msg} (code {code})"),
        (Some(msg), None) => msg,
        (None, Some(code)) => format!("RTM error code {code}"),
        (None, None) => "unknown RTM error".to_string(),
    }
}

/// Converts one RTM text frame. `hello` becomes `Connected(info)`; unparseable or unknown frames are
/// passed through as `Other` with the raw text.
pub fn parse_frame(raw: &str, info: &ConnectionInfo) -> Frame {
    let Ok(frame) = serde_json::from_str::<RtmFrame>(raw) else {
        return Frame::Event(InboundEvent::Other(raw.to_string()));
    };

    // Acks for our own sends carry reply_to and no type.
    if frame.kind.is_none() && frame.reply_to.is_some() {
        if frame.ok == Some(false) {
            let reply_to = frame.reply_to.unwrap_or_default();
            return Frame::Event(InboundEvent::TransportError(format!(
                "message {reply_to} rejected: {}",
                describe_error(frame.error)
            )));
        }
        return Frame::Event(InboundEvent::Other(raw.to_string()));
    }

    match frame.kind.as_deref() {
        Some("hello") => Frame::Event(InboundEvent::Connected(info.clone())),
        Some("goodbye") => Frame::Goodbye,
        Some("pong") => Frame::Pong,
        Some("error") => Frame::Event(InboundEvent::TransportError(describe_error(frame.error))),
        Some("message") => Frame::Event(InboundEvent::Message(ChatMessage {
            sender: frame.user.or(frame.bot_id).unwrap_or_default(),
            text: frame.text.unwrap_or_default(),
            destination: frame.channel.unwrap_or_default(),
            ts: frame.ts,
            subtype: frame.subtype,
            received_at: Utc::now(),
        })),
        _ => Frame::Event(InboundEvent::Other(raw.to_string())),
    }
}

/// RTM `message` frame for an outbound event. `id` must be unique per session.
pub fn outbound_frame(id: u64, event: &OutboundEvent) -> String {
    json!({
        "id": id,
        "type": "message",
        "channel": event.destination_id,
        "text": event.text,
    })
    .to_string()
}

/// RTM keepalive `ping` frame. Shares the per-session id sequence with messages.
pub fn ping_frame(id: u64) -> String {
    json!({ "id": id, "type": "ping" }).to_string()
}
