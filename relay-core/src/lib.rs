//! # relay-core
//!
//! Core types and traits for the relay bot: [`InboundEvent`], [`OutboundEvent`], [`EventHandler`],
//! [`Transport`] and [`ChannelDirectory`], the error taxonomy, and tracing initialization.
//! Backend-agnostic; used by handler-registry, relay-runtime and relay-slack.

pub mod error;
pub mod logger;
pub mod transport;
pub mod types;

pub use error::{HandlerError, RelayError, Result};
pub use logger::init_tracing;
pub use transport::{ChannelDirectory, Session, SessionSink, Transport};
pub use types::{
    ChatMessage, ConnectionInfo, Destination, EventHandler, EventKind, InboundEvent, Outbound,
    OutboundEvent,
};
