//! Config schema types.

use {
    secrecy::{ExposeSecret, Secret},
    serde::{Deserialize, Serialize},
};

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ParleyConfig {
    pub server: ServerConfig,
    pub provider: ProviderConfig,
    pub history: HistoryConfig,
    pub reply: ReplyConfig,
    pub metrics: MetricsConfig,
}

/// Gateway server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address to bind to. Defaults to "127.0.0.1".
    pub bind: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1".into(),
            port: 8080,
        }
    }
}

/// Which messaging provider backs outbound delivery.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    #[default]
    Twilio,
}

/// Messaging provider credentials and addressing.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    pub kind: ProviderKind,

    pub account_sid: String,

    #[serde(serialize_with = "serialize_secret")]
    pub auth_token: Secret<String>,

    /// Sender number replies go out from, without channel prefix.
    pub from_number: String,

    /// Address prefix for the channel, e.g. `whatsapp:`. Stripped from
    /// inbound senders and prepended to outbound addresses.
    pub channel_prefix: String,

    /// REST API base URL. Overridden in tests.
    pub api_base_url: String,
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("kind", &self.kind)
            .field("account_sid", &self.account_sid)
            .field("auth_token", &"[REDACTED]")
            .field("from_number", &self.from_number)
            .finish_non_exhaustive()
    }
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            kind: ProviderKind::default(),
            account_sid: String::new(),
            auth_token: Secret::new(String::new()),
            from_number: String::new(),
            channel_prefix: "whatsapp:".into(),
            api_base_url: "https://api.twilio.com".into(),
        }
    }
}

impl ProviderConfig {
    /// Whether credentials and sender number are all present.
    #[must_use]
    pub fn is_configured(&self) -> bool {
        !self.account_sid.is_empty()
            && !self.auth_token.expose_secret().is_empty()
            && !self.from_number.is_empty()
    }
}

fn serialize_secret<S: serde::Serializer>(
    secret: &Secret<String>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(secret.expose_secret())
}

/// Interaction history storage.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    /// sqlx connection URL.
    pub database_url: String,
    /// Table holding interactions. Must be a plain SQL identifier.
    pub table: String,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            database_url: "sqlite://parley.db?mode=rwc".into(),
            table: "interactions".into(),
        }
    }
}

/// Outbound reply pipeline tuning.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ReplyConfig {
    /// Soft upper bound on a single outbound message, in characters.
    pub max_chunk_len: usize,
    /// Status polls per chunk before giving up.
    pub max_poll_attempts: u32,
    /// Fixed wait between status polls.
    pub poll_interval_ms: u64,
    /// Extra per-chunk allowance for provider round trips, added to the
    /// polling budget when computing the delivery deadline.
    pub per_chunk_slack_ms: u64,
    /// Record the interaction even when delivery failed.
    pub persist_failed_deliveries: bool,
}

impl Default for ReplyConfig {
    fn default() -> Self {
        Self {
            max_chunk_len: 1600,
            max_poll_attempts: 10,
            poll_interval_ms: 1000,
            per_chunk_slack_ms: 10_000,
            persist_failed_deliveries: false,
        }
    }
}

/// Metrics configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    pub enabled: bool,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}
