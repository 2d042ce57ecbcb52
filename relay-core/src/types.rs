//! Core types: destination, inbound/outbound events, and the handler and outbound traits.

use std::fmt;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A named channel resolved to its stable backend id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Destination {
    pub name: String,
    pub id: String,
}

/// Session metadata reported by the backend when a connection is (re-)established.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionInfo {
    pub team_id: String,
    pub team_name: String,
    pub team_domain: String,
    pub self_id: String,
    pub self_name: String,
}

impl fmt::Display for ConnectionInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "team={} ({}, {}) self={} ({})",
            self.team_name, self.team_id, self.team_domain, self.self_name, self.self_id
        )
    }
}

/// A chat message seen on the transport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// User id, or bot id for bot posts; empty when the backend omits both.
    pub sender: String,
    pub text: String,
    /// Destination id the message was posted to.
    pub destination: String,
    pub ts: Option<String>,
    pub subtype: Option<String>,
    pub received_at: DateTime<Utc>,
}

/// Inbound event from the transport. Kind-specific payload per variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum InboundEvent {
    /// Session established; emitted again on every reconnect.
    Connected(ConnectionInfo),
    Message(ChatMessage),
    /// Transport-level problem; reconnection happens below the relay.
    TransportError(String),
    /// Anything else, carried as the raw frame text.
    Other(String),
}

/// Payload-free discriminant of [`InboundEvent`], used as the handler registry key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    Connected,
    Message,
    TransportError,
    Other,
}

impl InboundEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            InboundEvent::Connected(_) => EventKind::Connected,
            InboundEvent::Message(_) => EventKind::Message,
            InboundEvent::TransportError(_) => EventKind::TransportError,
            InboundEvent::Other(_) => EventKind::Other,
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EventKind::Connected => "connected",
            EventKind::Message => "message",
            EventKind::TransportError => "transport_error",
            EventKind::Other => "other",
        };
        f.write_str(name)
    }
}

/// A message to post to a destination.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutboundEvent {
    pub destination_id: String,
    pub text: String,
}

impl OutboundEvent {
    pub fn new(destination_id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            destination_id: destination_id.into(),
            text: text.into(),
        }
    }
}

/// Send side handed to handlers. Implemented by the connection handle; tests substitute recorders.
#[async_trait]
pub trait Outbound: Send + Sync {
    /// Best-effort send on the current session. Fails with `SendFailed` when there is none.
    async fn send(&self, event: OutboundEvent) -> crate::error::Result<()>;
}

/// Handles one kind of inbound event. Errors are contained by the registry.
#[async_trait]
pub trait EventHandler: Send + Sync {
    async fn handle(
        &self,
        event: &InboundEvent,
        outbound: &dyn Outbound,
    ) -> crate::error::Result<()>;
}
