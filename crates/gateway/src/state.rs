use std::sync::Arc;

use parley_auto_reply::ReplyOrchestrator;

#[cfg(feature = "metrics")]
use parley_metrics::MetricsHandle;

/// Shared state handed to every request handler.
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<ReplyOrchestrator>,
    /// Prefix stripped from inbound `From` addresses, e.g. `whatsapp:`.
    pub channel_prefix: String,
    pub version: &'static str,
    #[cfg(feature = "metrics")]
    pub metrics_handle: Option<MetricsHandle>,
}

impl AppState {
    pub fn new(orchestrator: Arc<ReplyOrchestrator>, channel_prefix: impl Into<String>) -> Self {
        Self {
            orchestrator,
            channel_prefix: channel_prefix.into(),
            version: env!("CARGO_PKG_VERSION"),
            #[cfg(feature = "metrics")]
            metrics_handle: None,
        }
    }

    #[cfg(feature = "metrics")]
    #[must_use]
    pub fn with_metrics(mut self, handle: MetricsHandle) -> Self {
        self.metrics_handle = Some(handle);
        self
    }
}
