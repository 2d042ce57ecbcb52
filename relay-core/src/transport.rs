//! Backend abstraction: a [`Transport`] opens live sessions, a [`ChannelDirectory`] enumerates destinations.
//!
//! Both are transport-agnostic; `relay-slack` implements them over the Slack Web API and RTM websocket.

use std::sync::Arc;

use async_trait::async_trait;
use futures::stream::BoxStream;

use crate::error::Result;
use crate::types::{Destination, InboundEvent, OutboundEvent};

/// One live session: an ordered event stream plus its write half.
///
/// The stream ends when the session drops; the supervisor then reconnects.
pub struct Session {
    pub events: BoxStream<'static, InboundEvent>,
    pub sink: Arc<dyn SessionSink>,
}

/// Write half of a session. Shared between the supervisor (close) and senders.
#[async_trait]
pub trait SessionSink: Send + Sync {
    async fn send(&self, event: &OutboundEvent) -> Result<()>;
    async fn close(&self) -> Result<()>;
}

/// Opens sessions against the backend.
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    async fn open(&self) -> Result<Session>;
}

/// Enumerates the destinations visible to the bot.
#[async_trait]
pub trait ChannelDirectory: Send + Sync {
    async fn list_destinations(&self) -> Result<Vec<Destination>>;
}
