//! Outbound reply pipeline.
//!
//! Flow: inbound message → history lookup → compose reply → split into
//! chunks → deliver chunks one by one, confirming each → record the
//! interaction.

pub mod chunk;
pub mod dispatch;
pub mod error;
pub mod orchestrator;
pub mod reply;

pub use {
    dispatch::{DeliveryFailure, DeliveryOutcome, DispatchConfig, Dispatcher, FailureKind},
    error::{Error, Result},
    orchestrator::{ReplyOrchestrator, ReplyOutcome, ReplySettings, ReplyStatus},
    reply::{GENERIC_FAILURE_ACK, ParseFailure, compose_reply},
};
