use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum RelayError {
    #[error("Config file not found or unreadable at {}: {source}", path.display())]
    ConfigNotFound {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Error parsing config file at {}: {reason}", path.display())]
    ConfigMalformed { path: PathBuf, reason: String },

    #[error("Can't get channels to enumerate: {0}")]
    LookupFailed(String),

    #[error("Channel {0} not found")]
    NotFound(String),

    #[error("Send failed: {0}")]
    SendFailed(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Handler error: {0}")]
    Handler(#[from] HandlerError),

    #[error("Inbound event stream already taken")]
    InboundTaken,
}

#[derive(Error, Debug)]
pub enum HandlerError {
    #[error("Handler failed: {0}")]
    Failed(String),

    #[error("Handler panicked: {0}")]
    Panicked(String),
}

pub type Result<T> = std::result::Result<T, RelayError>;
