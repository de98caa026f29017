use {
    async_trait::async_trait,
    serde::{Deserialize, Serialize},
    std::fmt,
};

use crate::Result;

/// Delivery status reported by the provider for one message.
///
/// Unknown values are preserved in [`MessageStatus::Other`] so a new provider
/// status never breaks parsing; it simply counts as non-terminal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum MessageStatus {
    Queued,
    Accepted,
    Scheduled,
    Sending,
    Sent,
    DeliveryUnknown,
    Delivered,
    Undelivered,
    Failed,
    Read,
    Canceled,
    Other(String),
}

impl MessageStatus {
    /// No further state change is expected.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::DeliveryUnknown | Self::Delivered | Self::Undelivered | Self::Failed | Self::Read
        )
    }

    /// The message reached (or left for) the recipient.
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Sent | Self::Delivered | Self::Read)
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Queued => "queued",
            Self::Accepted => "accepted",
            Self::Scheduled => "scheduled",
            Self::Sending => "sending",
            Self::Sent => "sent",
            Self::DeliveryUnknown => "delivery_unknown",
            Self::Delivered => "delivered",
            Self::Undelivered => "undelivered",
            Self::Failed => "failed",
            Self::Read => "read",
            Self::Canceled => "canceled",
            Self::Other(s) => s,
        }
    }
}

impl From<String> for MessageStatus {
    fn from(value: String) -> Self {
        match value.as_str() {
            "queued" => Self::Queued,
            "accepted" => Self::Accepted,
            "scheduled" => Self::Scheduled,
            "sending" => Self::Sending,
            "sent" => Self::Sent,
            "delivery_unknown" => Self::DeliveryUnknown,
            "delivered" => Self::Delivered,
            "undelivered" => Self::Undelivered,
            "failed" => Self::Failed,
            "read" => Self::Read,
            "canceled" => Self::Canceled,
            _ => Self::Other(value),
        }
    }
}

impl From<&str> for MessageStatus {
    fn from(value: &str) -> Self {
        Self::from(value.to_string())
    }
}

impl From<MessageStatus> for String {
    fn from(value: MessageStatus) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for MessageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A message accepted by the provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmittedMessage {
    /// Provider message identifier, used for status polling.
    pub id: String,
    pub status: MessageStatus,
}

/// Capability the dispatcher needs from a messaging provider.
#[async_trait]
pub trait MessagingProvider: Send + Sync {
    /// Provider identifier for logs (e.g. "twilio").
    fn name(&self) -> &str;

    /// Send one message. Addresses are passed through as-is, including any
    /// channel prefix such as `whatsapp:`.
    async fn submit(&self, to: &str, from: &str, body: &str) -> Result<SubmittedMessage>;

    /// Refresh the status of a previously submitted message.
    async fn fetch(&self, id: &str) -> Result<MessageStatus>;
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, rstest::rstest};

    #[rstest]
    #[case("queued", false, false)]
    #[case("sending", false, false)]
    #[case("sent", false, true)]
    #[case("delivery_unknown", true, false)]
    #[case("delivered", true, true)]
    #[case("undelivered", true, false)]
    #[case("failed", true, false)]
    #[case("read", true, true)]
    #[case("partially_delivered", false, false)]
    fn status_classification(#[case] raw: &str, #[case] terminal: bool, #[case] success: bool) {
        let status = MessageStatus::from(raw);
        assert_eq!(status.is_terminal(), terminal, "{raw} terminal");
        assert_eq!(status.is_success(), success, "{raw} success");
        assert_eq!(status.as_str(), raw);
    }

    #[test]
    fn unknown_status_deserializes_as_other() {
        let status: MessageStatus = serde_json::from_str(r#""receiving""#).unwrap();
        assert_eq!(status, MessageStatus::Other("receiving".into()));
        assert_eq!(serde_json::to_string(&status).unwrap(), r#""receiving""#);
    }
}
