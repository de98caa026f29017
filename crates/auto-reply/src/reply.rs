//! Reply text: personalized replies and fixed diagnostics.

use parley_common::types::InboundMessage;

/// Acknowledgment returned to the caller when a reply could not be delivered.
/// Provider details stay in the logs.
pub const GENERIC_FAILURE_ACK: &str = "Reply could not be delivered";

/// Which required inbound fields were missing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseFailure {
    Phone,
    Body,
    Both,
}

impl ParseFailure {
    /// Borrow the sender phone and body, or report which is missing.
    pub fn required_fields(message: &InboundMessage) -> Result<(&str, &str), Self> {
        match (message.phone.as_deref(), message.body.as_deref()) {
            (Some(phone), Some(body)) => Ok((phone, body)),
            (None, Some(_)) => Err(Self::Phone),
            (Some(_), None) => Err(Self::Body),
            (None, None) => Err(Self::Both),
        }
    }

    /// Fixed text sent back for this failure.
    #[must_use]
    pub fn diagnostic(self) -> &'static str {
        match self {
            Self::Phone => "Phone not parsed successfully",
            Self::Body => "Body not parsed successfully",
            Self::Both => "Phone and body not parsed successfully",
        }
    }
}

/// Compose the reply for the `interaction_number`th exchange with a sender.
#[must_use]
pub fn compose_reply(name: Option<&str>, body: &str, interaction_number: usize) -> String {
    let greeting = match name {
        Some(name) if !name.is_empty() => format!("Hello {name}!"),
        _ => "Hello!".to_string(),
    };
    format!(
        "{greeting} You said: \"{body}\". This is your #{interaction_number} interaction with us."
    )
}
