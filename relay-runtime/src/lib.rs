//! # relay-runtime
//!
//! Backend-agnostic relay machinery: [`ConnectionManager`] supervises the transport session,
//! [`EventRelay`] drives the dispatch loop, [`resolve_destination`] maps a channel name to its id,
//! and the built-in console and greeting handlers.

pub mod connection;
pub mod handlers;
pub mod relay;
pub mod resolver;

pub use connection::{
    ConnectionHandle, ConnectionManager, InboundEvents, ReconnectPolicy, SESSION_CLOSE_TIMEOUT,
};
pub use handlers::{render, Console, ConsoleHandler, GreetingHandler, DEFAULT_GREETING};
pub use relay::{EventRelay, RelayState, RelayStats, DEFAULT_DRAIN_TIMEOUT};
pub use resolver::resolve_destination;
