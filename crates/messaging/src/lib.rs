//! Outbound messaging providers.
//!
//! The reply pipeline only sees [`MessagingProvider`]: submit a message, then
//! fetch its delivery status by id. [`twilio::TwilioClient`] talks to the
//! Twilio Messages REST API (SMS and WhatsApp share it);
//! [`scripted::ScriptedProvider`] replays canned statuses for tests.

pub mod error;
pub mod provider;
pub mod scripted;
pub mod twilio;

pub use {
    error::{Error, Result},
    provider::{MessageStatus, MessagingProvider, SubmittedMessage},
    scripted::ScriptedProvider,
    twilio::TwilioClient,
};
