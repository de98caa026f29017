//! Sequential chunk delivery with bounded status polling.

use std::{fmt, sync::Arc, time::Duration};

use {
    chrono::Utc,
    parley_common::time::saturating_millis,
    parley_config::ReplyConfig,
    parley_messaging::{MessageStatus, MessagingProvider},
    tracing::{debug, info, warn},
};

#[cfg(feature = "metrics")]
use parley_metrics::{counter, dispatch as dispatch_metrics, histogram, labels};

/// Polling and deadline settings for [`Dispatcher`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchConfig {
    /// Status fetches per chunk before giving up on a terminal status.
    pub max_poll_attempts: u32,
    /// Fixed wait before each status fetch.
    pub poll_interval: Duration,
    /// Per-chunk allowance for provider round trips on top of polling time.
    pub per_chunk_slack: Duration,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self::from(&ReplyConfig::default())
    }
}

impl From<&ReplyConfig> for DispatchConfig {
    fn from(config: &ReplyConfig) -> Self {
        Self {
            max_poll_attempts: config.max_poll_attempts,
            poll_interval: Duration::from_millis(config.poll_interval_ms),
            per_chunk_slack: Duration::from_millis(config.per_chunk_slack_ms),
        }
    }
}

impl DispatchConfig {
    /// Wall-clock budget for delivering `chunks` chunks, or `None` when the
    /// config allows no time at all (immediate polling in tests).
    #[must_use]
    pub fn deadline(&self, chunks: usize) -> Option<Duration> {
        let per_chunk = self
            .poll_interval
            .saturating_mul(self.max_poll_attempts)
            .saturating_add(self.per_chunk_slack);
        let chunks = u32::try_from(chunks).unwrap_or(u32::MAX);
        let total = per_chunk.saturating_mul(chunks);
        (!total.is_zero()).then_some(total)
    }
}

/// Why a chunk was not delivered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureKind {
    /// The provider reported a terminal non-success status.
    Undelivered,
    /// Polling ran out before a terminal status and the last one was not a
    /// success.
    PollExhausted,
    /// Submit or fetch failed at the transport/API level.
    Provider(String),
    /// The whole delivery ran past its deadline.
    DeadlineExceeded,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Undelivered => f.write_str("undelivered"),
            Self::PollExhausted => f.write_str("status polling exhausted"),
            Self::Provider(e) => write!(f, "provider error: {e}"),
            Self::DeadlineExceeded => f.write_str("delivery deadline exceeded"),
        }
    }
}

impl FailureKind {
    #[cfg_attr(not(feature = "metrics"), allow(dead_code))]
    fn label(&self) -> &'static str {
        match self {
            Self::Undelivered => "undelivered",
            Self::PollExhausted => "poll_exhausted",
            Self::Provider(_) => "provider",
            Self::DeadlineExceeded => "deadline",
        }
    }
}

/// Context for the first chunk that failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryFailure {
    /// Zero-based position of the failed chunk.
    pub chunk_index: usize,
    /// Provider message id, absent when submit itself failed.
    pub message_id: Option<String>,
    pub last_status: Option<MessageStatus>,
    pub kind: FailureKind,
    /// When the failure was detected.
    pub at: String,
}

impl fmt::Display for DeliveryFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "chunk {} {}", self.chunk_index, self.kind)?;
        if let Some(id) = &self.message_id {
            write!(f, " (message {id}")?;
            if let Some(status) = &self.last_status {
                write!(f, ", status {status}")?;
            }
            f.write_str(")")?;
        }
        write!(f, " at {}", self.at)
    }
}

/// Result of delivering a reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryOutcome {
    /// Every chunk reached a success status.
    Success { message_ids: Vec<String> },
    /// Delivery stopped at the first failed chunk; later chunks were never
    /// submitted.
    Failed {
        reason: DeliveryFailure,
        /// Chunks confirmed before the failure.
        delivered: usize,
    },
}

impl DeliveryOutcome {
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }
}

/// Progress shared with the deadline wrapper so a timeout can still report
/// which chunk it interrupted.
#[derive(Default)]
struct Progress {
    delivered: Vec<String>,
    chunk_index: usize,
    message_id: Option<String>,
    last_status: Option<MessageStatus>,
}

impl Progress {
    fn failure(&self, kind: FailureKind) -> DeliveryFailure {
        DeliveryFailure {
            chunk_index: self.chunk_index,
            message_id: self.message_id.clone(),
            last_status: self.last_status.clone(),
            kind,
            at: parley_history::format_timestamp(Utc::now()),
        }
    }
}

/// Sends chunks one at a time, confirming each before the next.
#[derive(Clone)]
pub struct Dispatcher {
    provider: Arc<dyn MessagingProvider>,
    config: DispatchConfig,
}

impl Dispatcher {
    pub fn new(provider: Arc<dyn MessagingProvider>, config: DispatchConfig) -> Self {
        Self { provider, config }
    }

    #[must_use]
    pub fn config(&self) -> &DispatchConfig {
        &self.config
    }

    /// Deliver `chunks` in order from `sender` to `recipient`.
    ///
    /// Stops at the first chunk whose final status is not `sent`,
    /// `delivered` or `read`. A failed chunk is never resubmitted.
    pub async fn deliver(&self, chunks: &[String], recipient: &str, sender: &str) -> DeliveryOutcome {
        let mut progress = Progress::default();

        let result = match self.config.deadline(chunks.len()) {
            Some(limit) => {
                let timed =
                    tokio::time::timeout(limit, self.run(chunks, recipient, sender, &mut progress))
                        .await;
                match timed {
                    Ok(result) => result,
                    Err(_) => {
                        warn!(
                            recipient,
                            deadline_ms = saturating_millis(limit),
                            chunk = progress.chunk_index,
                            "reply delivery exceeded its deadline"
                        );
                        Err(FailureKind::DeadlineExceeded)
                    },
                }
            },
            None => self.run(chunks, recipient, sender, &mut progress).await,
        };

        match result {
            Ok(()) => DeliveryOutcome::Success {
                message_ids: progress.delivered,
            },
            Err(kind) => {
                let reason = progress.failure(kind);
                warn!(
                    recipient,
                    provider = self.provider.name(),
                    chunk = reason.chunk_index,
                    total = chunks.len(),
                    message_id = reason.message_id.as_deref().unwrap_or(""),
                    status = reason.last_status.as_ref().map_or("", MessageStatus::as_str),
                    timestamp = %reason.at,
                    reason = %reason.kind,
                    "chunk not delivered, aborting remaining chunks"
                );
                #[cfg(feature = "metrics")]
                counter!(
                    dispatch_metrics::DELIVERY_FAILURES_TOTAL,
                    labels::REASON => reason.kind.label()
                )
                .increment(1);
                DeliveryOutcome::Failed {
                    delivered: progress.delivered.len(),
                    reason,
                }
            },
        }
    }

    async fn run(
        &self,
        chunks: &[String],
        recipient: &str,
        sender: &str,
        progress: &mut Progress,
    ) -> Result<(), FailureKind> {
        for (index, chunk) in chunks.iter().enumerate() {
            progress.chunk_index = index;
            progress.message_id = None;
            progress.last_status = None;

            let id = self.deliver_chunk(chunk, recipient, sender, progress).await?;
            info!(
                recipient,
                chunk = index,
                total = chunks.len(),
                message_id = %id,
                "chunk delivered"
            );
            progress.delivered.push(id);
        }
        Ok(())
    }

    async fn deliver_chunk(
        &self,
        chunk: &str,
        recipient: &str,
        sender: &str,
        progress: &mut Progress,
    ) -> Result<String, FailureKind> {
        #[cfg(feature = "metrics")]
        let started = tokio::time::Instant::now();
        let submitted = self
            .provider
            .submit(recipient, sender, chunk)
            .await
            .map_err(|e| FailureKind::Provider(e.to_string()))?;
        #[cfg(feature = "metrics")]
        counter!(dispatch_metrics::CHUNKS_SUBMITTED_TOTAL).increment(1);

        let id = submitted.id;
        let mut status = submitted.status;
        progress.message_id = Some(id.clone());
        progress.last_status = Some(status.clone());

        let mut attempts = 0;
        while !status.is_terminal() && attempts < self.config.max_poll_attempts {
            if !self.config.poll_interval.is_zero() {
                tokio::time::sleep(self.config.poll_interval).await;
            }
            attempts += 1;
            status = self
                .provider
                .fetch(&id)
                .await
                .map_err(|e| FailureKind::Provider(e.to_string()))?;
            #[cfg(feature = "metrics")]
            counter!(dispatch_metrics::STATUS_POLLS_TOTAL).increment(1);
            debug!(message_id = %id, attempt = attempts, %status, "polled chunk status");
            progress.last_status = Some(status.clone());
        }

        #[cfg(feature = "metrics")]
        histogram!(
            dispatch_metrics::CHUNK_DURATION_SECONDS,
            labels::STATUS => status.as_str().to_string()
        )
        .record(started.elapsed().as_secs_f64());

        if status.is_success() {
            Ok(id)
        } else if status.is_terminal() {
            Err(FailureKind::Undelivered)
        } else {
            Err(FailureKind::PollExhausted)
        }
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {
        super::*,
        async_trait::async_trait,
        parley_messaging::{MessageStatus::*, ScriptedProvider, SubmittedMessage},
        tokio::time::Instant,
    };

    /// Accepts instantly but takes `delay` to answer each status fetch.
    struct SlowFetchProvider {
        delay: Duration,
    }

    #[async_trait]
    impl MessagingProvider for SlowFetchProvider {
        fn name(&self) -> &str {
            "slow"
        }

        async fn submit(
            &self,
            _to: &str,
            _from: &str,
            _body: &str,
        ) -> parley_messaging::Result<SubmittedMessage> {
            Ok(SubmittedMessage {
                id: "SM-slow".into(),
                status: Queued,
            })
        }

        async fn fetch(&self, _id: &str) -> parley_messaging::Result<MessageStatus> {
            tokio::time::sleep(self.delay).await;
            Ok(Sending)
        }
    }

    fn instant_config() -> DispatchConfig {
        DispatchConfig {
            max_poll_attempts: 10,
            poll_interval: Duration::ZERO,
            per_chunk_slack: Duration::ZERO,
        }
    }

    fn chunks(n: usize) -> Vec<String> {
        (1..=n).map(|i| format!("Part {i}.")).collect()
    }

    fn dispatcher(provider: &Arc<ScriptedProvider>) -> Dispatcher {
        Dispatcher::new(provider.clone(), instant_config())
    }

    #[tokio::test]
    async fn delivers_all_chunks_in_order() {
        let provider = Arc::new(ScriptedProvider::delivering());
        let outcome = dispatcher(&provider)
            .deliver(&chunks(3), "whatsapp:+1", "whatsapp:+2")
            .await;

        assert_eq!(outcome, DeliveryOutcome::Success {
            message_ids: vec!["SM0001".into(), "SM0002".into(), "SM0003".into()],
        });
        let bodies: Vec<_> = provider.submitted().into_iter().map(|m| m.body).collect();
        assert_eq!(bodies, chunks(3));
        assert!(provider.submitted().iter().all(|m| m.to == "whatsapp:+1"));
    }

    #[tokio::test]
    async fn failed_second_chunk_stops_third() {
        let provider = Arc::new(
            ScriptedProvider::delivering()
                .then(vec![Queued, Delivered])
                .then(vec![Queued, Sending, Failed]),
        );
        let outcome = dispatcher(&provider).deliver(&chunks(3), "to", "from").await;

        let DeliveryOutcome::Failed { reason, delivered } = outcome else {
            panic!("expected failure");
        };
        assert_eq!(delivered, 1);
        assert_eq!(reason.chunk_index, 1);
        assert_eq!(reason.message_id.as_deref(), Some("SM0002"));
        assert_eq!(reason.last_status, Some(Failed));
        assert_eq!(reason.kind, FailureKind::Undelivered);
        assert_eq!(provider.submit_count(), 2);
    }

    #[tokio::test]
    async fn terminal_status_on_submit_skips_polling() {
        let provider = Arc::new(ScriptedProvider::with_default_script(vec![Delivered]));
        let outcome = dispatcher(&provider).deliver(&chunks(2), "to", "from").await;

        assert!(outcome.is_success());
        assert_eq!(provider.fetch_count(), 0);
    }

    #[tokio::test]
    async fn sent_after_exhausted_polls_counts_as_success() {
        let provider = Arc::new(ScriptedProvider::with_default_script(vec![Queued, Sent]));
        let outcome = dispatcher(&provider).deliver(&chunks(1), "to", "from").await;

        assert!(outcome.is_success());
        assert_eq!(provider.fetch_count(), 10);
    }

    #[tokio::test]
    async fn stuck_in_queue_is_poll_exhausted() {
        let provider = Arc::new(ScriptedProvider::with_default_script(vec![Queued]));
        let config = DispatchConfig {
            max_poll_attempts: 4,
            ..instant_config()
        };
        let outcome = Dispatcher::new(provider.clone(), config)
            .deliver(&chunks(2), "to", "from")
            .await;

        let DeliveryOutcome::Failed { reason, .. } = outcome else {
            panic!("expected failure");
        };
        assert_eq!(reason.kind, FailureKind::PollExhausted);
        assert_eq!(provider.fetch_count(), 4);
        assert_eq!(provider.submit_count(), 1);
    }

    #[tokio::test]
    async fn delivery_unknown_is_failure() {
        let provider = Arc::new(ScriptedProvider::with_default_script(vec![
            Queued,
            DeliveryUnknown,
        ]));
        let outcome = dispatcher(&provider).deliver(&chunks(1), "to", "from").await;
        assert!(!outcome.is_success());
        assert_eq!(provider.fetch_count(), 1);
    }

    #[tokio::test]
    async fn submit_error_is_provider_failure() {
        let provider = Arc::new(ScriptedProvider::delivering().failing_submit_at(1));
        let outcome = dispatcher(&provider).deliver(&chunks(2), "to", "from").await;

        let DeliveryOutcome::Failed { reason, delivered } = outcome else {
            panic!("expected failure");
        };
        assert_eq!(delivered, 0);
        assert_eq!(reason.message_id, None);
        assert!(matches!(reason.kind, FailureKind::Provider(_)));
        assert_eq!(provider.submit_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn polls_wait_between_fetches() {
        let provider = Arc::new(ScriptedProvider::with_default_script(vec![
            Queued, Sending, Delivered,
        ]));
        let config = DispatchConfig {
            max_poll_attempts: 10,
            poll_interval: Duration::from_secs(1),
            per_chunk_slack: Duration::from_secs(5),
        };
        let started = Instant::now();
        let outcome = Dispatcher::new(provider.clone(), config)
            .deliver(&chunks(1), "to", "from")
            .await;

        assert!(outcome.is_success());
        assert_eq!(started.elapsed(), Duration::from_secs(2));
    }

    #[tokio::test(start_paused = true)]
    async fn deadline_aborts_slow_delivery() {
        let provider = Arc::new(SlowFetchProvider {
            delay: Duration::from_secs(5),
        });
        let config = DispatchConfig {
            max_poll_attempts: 10,
            poll_interval: Duration::from_secs(1),
            per_chunk_slack: Duration::ZERO,
        };
        let started = Instant::now();
        let outcome = Dispatcher::new(provider, config)
            .deliver(&chunks(1), "to", "from")
            .await;

        let DeliveryOutcome::Failed { reason, delivered } = outcome else {
            panic!("expected failure");
        };
        assert_eq!(delivered, 0);
        assert_eq!(reason.kind, FailureKind::DeadlineExceeded);
        assert_eq!(reason.message_id.as_deref(), Some("SM-slow"));
        assert_eq!(reason.last_status, Some(Sending));
        assert_eq!(started.elapsed(), Duration::from_secs(10));
    }

    #[test]
    fn deadline_scales_with_chunks() {
        let config = DispatchConfig {
            max_poll_attempts: 10,
            poll_interval: Duration::from_millis(500),
            per_chunk_slack: Duration::from_secs(2),
        };
        assert_eq!(config.deadline(3), Some(Duration::from_secs(21)));
        assert_eq!(instant_config().deadline(3), None);
    }

    #[test]
    fn failure_display_includes_context() {
        let failure = DeliveryFailure {
            chunk_index: 1,
            message_id: Some("SM42".into()),
            last_status: Some(Undelivered),
            kind: FailureKind::Undelivered,
            at: "2024-12-19T20:43:36.000Z".into(),
        };
        assert_eq!(
            failure.to_string(),
            "chunk 1 undelivered (message SM42, status undelivered) at 2024-12-19T20:43:36.000Z"
        );
    }
}
