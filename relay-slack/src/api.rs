//! Slack Web API calls used by the relay: `rtm.connect` and `conversations.list`.

use async_trait::async_trait;
use relay_core::{ChannelDirectory, Destination, RelayError, Result};
use secrecy::{ExposeSecret, Secret};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, instrument, warn};

pub const DEFAULT_API_URL: &str = "https://slack.com/api";

/// Upper bound on `conversations.list` pages followed in one enumeration.
const MAX_CHANNEL_PAGES: usize = 50;
const CHANNEL_PAGE_SIZE: &str = "200";

/// Minimal Slack Web API client. The token is sent as a bearer header and never logged.
#[derive(Clone)]
pub struct SlackApi {
    http: reqwest::Client,
    base_url: String,
    token: Secret<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RtmTeam {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub domain: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RtmSelf {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
}

/// `rtm.connect` response: websocket URL plus the team and bot identity it belongs to.
#[derive(Debug, Clone, Deserialize)]
pub struct RtmConnect {
    pub url: String,
    #[serde(default)]
    pub team: RtmTeam,
    #[serde(rename = "self", default)]
    pub identity: RtmSelf,
}

#[derive(Deserialize)]
struct Envelope {
    ok: bool,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Deserialize)]
struct ChannelEntry {
    id: String,
    name: String,
}

#[derive(Default, Deserialize)]
struct ResponseMetadata {
    #[serde(default)]
    next_cursor: String,
}

#[derive(Deserialize)]
struct ChannelPage {
    #[serde(default)]
    channels: Vec<ChannelEntry>,
    #[serde(default)]
    response_metadata: ResponseMetadata,
}

impl SlackApi {
    pub fn new(token: Secret<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: DEFAULT_API_URL.to_string(),
            token,
        }
    }

    /// Points the client at another API root (a mock server in tests).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// GETs `method` and decodes the body, turning `ok: false` into an error carrying Slack's code.
    async fn call<T: DeserializeOwned>(&self, method: &str, query: &[(&str, &str)]) -> Result<T> {
        let url = format!("{}/{}", self.base_url, method);
        let resp = self
            .http
            .get(&url)
            .bearer_auth(self.token.expose_secret())
            .query(query)
            .send()
            .await
            .map_err(|e| RelayError::Transport(format!("{method}: {e}")))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            warn!(method, status = %status, body = %body, "Slack API returned non-success");
            return Err(RelayError::Transport(format!("{method} returned {status}")));
        }

        let body: serde_json::Value = resp
            .json()
            .await
            .map_err(|e| RelayError::Transport(format!("{method}: invalid body: {e}")))?;
        let envelope: Envelope = serde_json::from_value(body.clone())
            .map_err(|e| RelayError::Transport(format!("{method}: invalid body: {e}")))?;
        if !envelope.ok {
            let code = envelope.error.unwrap_or_else(|| "unknown_error".to_string());
            return Err(RelayError::Transport(format!("{method}: {code}")));
        }
        serde_json::from_value(body)
            .map_err(|e| RelayError::Transport(format!("{method}: unexpected body: {e}")))
    }

    /// Asks Slack for a fresh RTM websocket URL.
    #[instrument(skip(self))]
    pub async fn rtm_connect(&self) -> Result<RtmConnect> {
        self.call("rtm.connect", &[]).await
    }

    /// All public, non-archived channels, following `next_cursor` across pages.
    #[instrument(skip(self))]
    pub async fn list_channels(&self) -> Result<Vec<Destination>> {
        let mut destinations = Vec::new();
        let mut cursor = String::new();

        for page_no in 0..MAX_CHANNEL_PAGES {
            let mut query = vec![
                ("exclude_archived", "true"),
                ("types", "public_channel"),
                ("limit", CHANNEL_PAGE_SIZE),
            ];
            if !cursor.is_empty() {
                query.push(("cursor", cursor.as_str()));
            }
            let page: ChannelPage = self.call("conversations.list", &query).await?;
            debug!(page = page_no, channels = page.channels.len(), "channel page fetched");

            destinations.extend(page.channels.into_iter().map(|c| Destination {
                name: c.name,
                id: c.id,
            }));

            if page.response_metadata.next_cursor.is_empty() {
                return Ok(destinations);
            }
            cursor = page.response_metadata.next_cursor;
        }

        warn!(pages = MAX_CHANNEL_PAGES, "channel enumeration truncated");
        Ok(destinations)
    }
}

#[async_trait]
impl ChannelDirectory for SlackApi {
    async fn list_destinations(&self) -> Result<Vec<Destination>> {
        self.list_channels()
            .await
            .map_err(|e| RelayError::LookupFailed(e.to_string()))
    }
}
