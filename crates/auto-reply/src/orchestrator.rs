//! Per-request reply pipeline: history lookup, compose, chunk, dispatch, persist.

use std::sync::Arc;

use {
    chrono::Utc,
    parley_common::types::{InboundMessage, Interaction},
    parley_config::ParleyConfig,
    parley_history::HistoryStore,
    serde::Serialize,
    tracing::{error, info, warn},
};

#[cfg(feature = "metrics")]
use parley_metrics::{auto_reply as auto_reply_metrics, counter, histogram, labels};

use crate::{
    Result, chunk,
    dispatch::{DeliveryFailure, DeliveryOutcome, DispatchConfig, Dispatcher},
    reply::{GENERIC_FAILURE_ACK, ParseFailure, compose_reply},
};

/// Addressing and policy knobs for [`ReplyOrchestrator`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplySettings {
    /// Sender number replies go out from, without channel prefix.
    pub from_number: String,
    /// Prepended to both addresses on the outbound side.
    pub channel_prefix: String,
    pub max_chunk_len: usize,
    /// Record the interaction even when delivery failed.
    pub persist_failed_deliveries: bool,
}

impl ReplySettings {
    #[must_use]
    pub fn from_config(config: &ParleyConfig) -> Self {
        Self {
            from_number: config.provider.from_number.clone(),
            channel_prefix: config.provider.channel_prefix.clone(),
            max_chunk_len: config.reply.max_chunk_len,
            persist_failed_deliveries: config.reply.persist_failed_deliveries,
        }
    }

    fn address(&self, number: &str) -> String {
        format!("{}{number}", self.channel_prefix)
    }
}

/// Final state of one inbound request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplyStatus {
    /// Every chunk was confirmed by the provider.
    Delivered,
    /// A chunk failed; the rest were never sent.
    DeliveryFailed,
    /// Sender or body was missing; only a diagnostic was produced.
    ParseFailed,
}

/// What happened to an inbound message, as plain data for the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplyOutcome {
    /// Composed reply, or the diagnostic text on parse failure.
    pub reply: String,
    pub status: ReplyStatus,
    /// Chunks the reply was split into. Zero for parse failures.
    pub chunks: usize,
    pub persisted: bool,
    pub failure: Option<DeliveryFailure>,
}

impl ReplyOutcome {
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status == ReplyStatus::Delivered
    }

    /// Text safe to show the sender: the reply or diagnostic, or a generic
    /// acknowledgment when delivery failed.
    #[must_use]
    pub fn acknowledgment(&self) -> &str {
        match self.status {
            ReplyStatus::Delivered | ReplyStatus::ParseFailed => &self.reply,
            ReplyStatus::DeliveryFailed => GENERIC_FAILURE_ACK,
        }
    }
}

/// Runs one inbound message through the reply pipeline.
///
/// Shared across requests; holds no per-request state.
#[derive(Clone)]
pub struct ReplyOrchestrator {
    history: Arc<dyn HistoryStore>,
    dispatcher: Dispatcher,
    settings: ReplySettings,
}

impl ReplyOrchestrator {
    pub fn new(history: Arc<dyn HistoryStore>, dispatcher: Dispatcher, settings: ReplySettings) -> Self {
        Self {
            history,
            dispatcher,
            settings,
        }
    }

    /// Wire an orchestrator from loaded config.
    pub fn from_config(
        config: &ParleyConfig,
        history: Arc<dyn HistoryStore>,
        provider: Arc<dyn parley_messaging::MessagingProvider>,
    ) -> Self {
        let dispatcher = Dispatcher::new(provider, DispatchConfig::from(&config.reply));
        Self::new(history, dispatcher, ReplySettings::from_config(config))
    }

    #[must_use]
    pub fn settings(&self) -> &ReplySettings {
        &self.settings
    }

    /// Handle one inbound message end to end.
    ///
    /// Parse failures and delivery failures are reported in the outcome.
    /// History store failures are returned as errors: before dispatch they
    /// prevent the reply, after dispatch the reply has already gone out but
    /// the interaction is lost.
    pub async fn handle(&self, message: &InboundMessage) -> Result<ReplyOutcome> {
        #[cfg(feature = "metrics")]
        let started = std::time::Instant::now();
        #[cfg(feature = "metrics")]
        counter!(auto_reply_metrics::MESSAGES_RECEIVED_TOTAL).increment(1);

        let received_at = parley_history::format_timestamp(Utc::now());

        let (phone, body) = match ParseFailure::required_fields(message) {
            Ok(fields) => fields,
            Err(failure) => {
                warn!(
                    phone = message.phone.as_deref().unwrap_or(""),
                    has_body = message.body.is_some(),
                    diagnostic = failure.diagnostic(),
                    "inbound message missing required fields"
                );
                #[cfg(feature = "metrics")]
                counter!(auto_reply_metrics::PARSE_FAILURES_TOTAL).increment(1);
                return Ok(ReplyOutcome {
                    reply: failure.diagnostic().to_string(),
                    status: ReplyStatus::ParseFailed,
                    chunks: 0,
                    persisted: false,
                    failure: None,
                });
            },
        };

        let prior = self.history.query_by_phone(phone).await?.len();
        let reply = compose_reply(message.name.as_deref(), body, prior + 1);
        let chunks = chunk::split(&reply, self.settings.max_chunk_len)?;
        #[cfg(feature = "metrics")]
        histogram!(auto_reply_metrics::CHUNKS_PER_REPLY).record(chunks.len() as f64);

        let outcome = self
            .dispatcher
            .deliver(
                &chunks,
                &self.settings.address(phone),
                &self.settings.address(&self.settings.from_number),
            )
            .await;
        let (status, failure) = match outcome {
            DeliveryOutcome::Success { .. } => (ReplyStatus::Delivered, None),
            DeliveryOutcome::Failed { reason, .. } => (ReplyStatus::DeliveryFailed, Some(reason)),
        };

        let persist =
            status == ReplyStatus::Delivered || self.settings.persist_failed_deliveries;
        if persist {
            let interaction = Interaction {
                phone: phone.to_string(),
                timestamp: received_at,
                name: message.name.clone().unwrap_or_default(),
                received_message: Some(body.to_string()),
                sent_message: reply.clone(),
            };
            if let Err(e) = self.history.append(&interaction).await {
                error!(
                    phone,
                    timestamp = %interaction.timestamp,
                    operation = "append",
                    error = %e,
                    "reply dispatched but interaction was not recorded"
                );
                return Err(e.into());
            }
        }

        info!(
            phone,
            interaction = prior + 1,
            chunks = chunks.len(),
            status = ?status,
            persisted = persist,
            "inbound message handled"
        );
        #[cfg(feature = "metrics")]
        {
            let label = match status {
                ReplyStatus::Delivered => "delivered",
                _ => "failed",
            };
            histogram!(
                auto_reply_metrics::PROCESSING_DURATION_SECONDS,
                labels::STATUS => label
            )
            .record(started.elapsed().as_secs_f64());
        }

        Ok(ReplyOutcome {
            reply,
            status,
            chunks: chunks.len(),
            persisted: persist,
            failure,
        })
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {
        super::*,
        parley_history::InMemoryHistoryStore,
        parley_messaging::{MessageStatus, ScriptedProvider},
        std::time::Duration,
    };

    fn settings() -> ReplySettings {
        ReplySettings {
            from_number: "+14155238886".into(),
            channel_prefix: "whatsapp:".into(),
            max_chunk_len: 1600,
            persist_failed_deliveries: false,
        }
    }

    fn orchestrator(
        history: &Arc<InMemoryHistoryStore>,
        provider: &Arc<ScriptedProvider>,
        settings: ReplySettings,
    ) -> ReplyOrchestrator {
        let dispatcher = Dispatcher::new(provider.clone(), DispatchConfig {
            max_poll_attempts: 3,
            poll_interval: Duration::ZERO,
            per_chunk_slack: Duration::ZERO,
        });
        ReplyOrchestrator::new(history.clone(), dispatcher, settings)
    }

    fn inbound(phone: &str, body: &str) -> InboundMessage {
        InboundMessage {
            phone: Some(phone.into()),
            body: Some(body.into()),
            name: Some("Amanda".into()),
        }
    }

    #[tokio::test]
    async fn addresses_carry_channel_prefix() {
        let history = Arc::new(InMemoryHistoryStore::default());
        let provider = Arc::new(ScriptedProvider::delivering());
        orchestrator(&history, &provider, settings())
            .handle(&inbound("+15551230000", "Hi"))
            .await
            .unwrap();

        let sent = provider.submitted();
        assert_eq!(sent[0].to, "whatsapp:+15551230000");
        assert_eq!(sent[0].from, "whatsapp:+14155238886");
    }

    #[tokio::test]
    async fn persisted_record_holds_both_texts() {
        let history = Arc::new(InMemoryHistoryStore::default());
        let provider = Arc::new(ScriptedProvider::delivering());
        let outcome = orchestrator(&history, &provider, settings())
            .handle(&inbound("+15551230000", "Hello World!"))
            .await
            .unwrap();

        let stored = history.query_by_phone("+15551230000").await.unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].name, "Amanda");
        assert_eq!(stored[0].received_message.as_deref(), Some("Hello World!"));
        assert_eq!(stored[0].sent_message, outcome.reply);
        assert_eq!(stored[0].timestamp.len(), "2024-12-19T20:43:36.000Z".len());
    }

    #[tokio::test]
    async fn failed_delivery_is_not_persisted_by_default() {
        let history = Arc::new(InMemoryHistoryStore::default());
        let provider = Arc::new(ScriptedProvider::with_default_script(vec![
            MessageStatus::Queued,
            MessageStatus::Undelivered,
        ]));
        let outcome = orchestrator(&history, &provider, settings())
            .handle(&inbound("+15551230000", "Hi"))
            .await
            .unwrap();

        assert_eq!(outcome.status, ReplyStatus::DeliveryFailed);
        assert_eq!(outcome.acknowledgment(), GENERIC_FAILURE_ACK);
        assert!(!outcome.persisted);
        assert!(outcome.failure.is_some());
        assert!(history.is_empty());
    }

    #[tokio::test]
    async fn failed_delivery_persisted_when_enabled() {
        let history = Arc::new(InMemoryHistoryStore::default());
        let provider = Arc::new(ScriptedProvider::with_default_script(vec![
            MessageStatus::Failed,
        ]));
        let settings = ReplySettings {
            persist_failed_deliveries: true,
            ..settings()
        };
        let outcome = orchestrator(&history, &provider, settings)
            .handle(&inbound("+15551230000", "Hi"))
            .await
            .unwrap();

        assert_eq!(outcome.status, ReplyStatus::DeliveryFailed);
        assert!(outcome.persisted);
        assert_eq!(history.len(), 1);
    }

    #[tokio::test]
    async fn delivered_acknowledgment_is_the_reply() {
        let history = Arc::new(InMemoryHistoryStore::default());
        let provider = Arc::new(ScriptedProvider::delivering());
        let outcome = orchestrator(&history, &provider, settings())
            .handle(&inbound("+15551230000", "Hi"))
            .await
            .unwrap();
        assert!(outcome.is_success());
        assert_eq!(outcome.acknowledgment(), outcome.reply);
    }
}
