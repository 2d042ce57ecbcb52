//! Relay config loaded from a JSON file: room, bot name, API key and team.
//!
//! Keys: `default_room`, `friend_name`, `slack_key`, `slack_team` (required, non-empty) and
//! `greeting` (optional). Unknown keys are ignored.

use std::fs;
use std::path::Path;

use relay_core::{RelayError, Result};
use relay_runtime::DEFAULT_GREETING;
use secrecy::Secret;
use serde::Deserialize;

/// Validated config. Immutable after load; `Debug` redacts the API key.
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Channel the bot hangs out in (`default_room`).
    pub destination_name: String,
    /// Name of the bot (`friend_name`).
    pub identity_name: String,
    /// Slack API token (`slack_key`). Never log this.
    pub api_key: Secret<String>,
    /// Team to connect to (`slack_team`): id, name or domain.
    pub team: String,
    pub greeting: String,
}

#[derive(Deserialize)]
struct RawConfig {
    #[serde(default)]
    default_room: String,
    #[serde(default)]
    friend_name: String,
    #[serde(default)]
    slack_key: String,
    #[serde(default)]
    slack_team: String,
    #[serde(default)]
    greeting: Option<String>,
}

impl RelayConfig {
    /// Reads and validates the config at `path`.
    ///
    /// `ConfigNotFound` if the file cannot be read; `ConfigMalformed` if it is not a JSON object of
    /// the expected shape or any required key is missing or empty.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| RelayError::ConfigNotFound {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&text).map_err(|reason| RelayError::ConfigMalformed {
            path: path.to_path_buf(),
            reason,
        })
    }

    fn parse(text: &str) -> std::result::Result<Self, String> {
        let raw: RawConfig = serde_json::from_str(text).map_err(|e| e.to_string())?;

        let missing: Vec<&str> = [
            ("default_room", &raw.default_room),
            ("friend_name", &raw.friend_name),
            ("slack_key", &raw.slack_key),
            ("slack_team", &raw.slack_team),
        ]
        .into_iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(key, _)| key)
        .collect();
        if !missing.is_empty() {
            return Err(format!("missing or empty keys: {}", missing.join(", ")));
        }

        Ok(Self {
            destination_name: raw.default_room,
            identity_name: raw.friend_name,
            api_key: Secret::new(raw.slack_key),
            team: raw.slack_team,
            greeting: raw
                .greeting
                .filter(|g| !g.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_GREETING.to_string()),
        })
    }
}
