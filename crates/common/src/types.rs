use serde::{Deserialize, Serialize};

/// Inbound message as extracted by the transport layer.
///
/// Every field is optional: the webhook may omit any of them and the reply
/// pipeline decides what to do with a partial message.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InboundMessage {
    /// Sender phone number without any channel prefix (e.g. `+15551230000`).
    pub phone: Option<String>,
    pub body: Option<String>,
    /// Display name reported by the provider, if any.
    pub name: Option<String>,
}

impl InboundMessage {
    /// Build a message from raw transport fields.
    ///
    /// Blank values count as absent. `channel_prefix` (e.g. `whatsapp:`) is
    /// stripped from the sender address when present.
    #[must_use]
    pub fn from_fields(
        from: Option<&str>,
        body: Option<&str>,
        name: Option<&str>,
        channel_prefix: &str,
    ) -> Self {
        let phone = non_blank(from).map(|from| {
            let bare = if channel_prefix.is_empty() {
                from
            } else {
                from.strip_prefix(channel_prefix).unwrap_or(from)
            };
            bare.trim().to_string()
        });
        Self {
            phone: phone.filter(|p| !p.is_empty()),
            body: non_blank(body).map(str::to_string),
            name: non_blank(name).map(|n| n.trim().to_string()),
        }
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

/// One completed exchange with a sender, keyed by `(phone, timestamp)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Interaction {
    pub phone: String,
    /// Sortable creation time in [`Interaction::TIMESTAMP_FORMAT`].
    pub timestamp: String,
    /// Display name; empty when the provider did not report one.
    #[serde(default)]
    pub name: String,
    pub received_message: Option<String>,
    pub sent_message: String,
}

impl Interaction {
    /// Timestamp layout used for the sort key.
    ///
    /// Fixed-width UTC with millisecond precision so lexical order matches
    /// chronological order.
    pub const TIMESTAMP_FORMAT: &'static str = "%Y-%m-%dT%H:%M:%S%.3fZ";
}
