//! # relay-slack
//!
//! Slack backend for the relay: JSON config, Web API client ([`SlackApi`]), RTM websocket transport
//! ([`SlackTransport`]), frame adapters, and the [`run_relay`] startup sequence.

pub mod adapters;
pub mod api;
pub mod config;
pub mod runner;
pub mod session;

pub use adapters::{outbound_frame, parse_frame, ping_frame, Frame};
pub use api::{RtmConnect, SlackApi, DEFAULT_API_URL};
pub use config::RelayConfig;
pub use runner::{build_registry, run_relay, RelayOptions};
pub use session::{SlackTransport, DEFAULT_PING_INTERVAL};
