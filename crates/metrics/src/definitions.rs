//! Metric name and label definitions.
//!
//! Centralizing names keeps the recording sites and dashboards in agreement.

/// HTTP surface of the gateway
pub mod http {
    /// Total HTTP requests handled
    pub const REQUESTS_TOTAL: &str = "parley_http_requests_total";
    /// HTTP request duration in seconds
    pub const REQUEST_DURATION_SECONDS: &str = "parley_http_request_duration_seconds";
    /// Requests currently being processed
    pub const REQUESTS_IN_FLIGHT: &str = "parley_http_requests_in_flight";
}

/// Inbound webhook and reply orchestration
pub mod auto_reply {
    /// Total inbound messages handed to the orchestrator
    pub const MESSAGES_RECEIVED_TOTAL: &str = "parley_auto_reply_messages_received_total";
    /// Inbound messages missing a sender or body
    pub const PARSE_FAILURES_TOTAL: &str = "parley_auto_reply_parse_failures_total";
    /// End-to-end handling duration in seconds
    pub const PROCESSING_DURATION_SECONDS: &str = "parley_auto_reply_processing_duration_seconds";
    /// Chunks produced per composed reply
    pub const CHUNKS_PER_REPLY: &str = "parley_auto_reply_chunks_per_reply";
}

/// Outbound chunk dispatch
pub mod dispatch {
    /// Chunks submitted to the provider
    pub const CHUNKS_SUBMITTED_TOTAL: &str = "parley_dispatch_chunks_submitted_total";
    /// Status polls issued to the provider
    pub const STATUS_POLLS_TOTAL: &str = "parley_dispatch_status_polls_total";
    /// Replies aborted because a chunk was not delivered
    pub const DELIVERY_FAILURES_TOTAL: &str = "parley_dispatch_delivery_failures_total";
    /// Time from submit to terminal status for one chunk, in seconds
    pub const CHUNK_DURATION_SECONDS: &str = "parley_dispatch_chunk_duration_seconds";
}

/// Interaction history store
pub mod history {
    /// Store operations by operation name
    pub const OPERATIONS_TOTAL: &str = "parley_history_operations_total";
    /// Failed store operations by operation name
    pub const ERRORS_TOTAL: &str = "parley_history_errors_total";
}

/// Common label keys
pub mod labels {
    pub const ENDPOINT: &str = "endpoint";
    pub const METHOD: &str = "method";
    pub const OPERATION: &str = "operation";
    pub const STATUS: &str = "status";
    pub const REASON: &str = "reason";
}

/// Standard histogram buckets for different metric types
pub mod buckets {
    use once_cell::sync::Lazy;

    /// Request handling buckets (in seconds)
    /// Covers 1ms to 60s
    pub static REQUEST_DURATION: Lazy<Vec<f64>> = Lazy::new(|| {
        vec![
            0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0,
        ]
    });

    /// Chunk delivery buckets (in seconds)
    /// Status polling can take several poll intervals
    pub static CHUNK_DURATION: Lazy<Vec<f64>> =
        Lazy::new(|| vec![0.1, 0.25, 0.5, 1.0, 2.0, 5.0, 10.0, 20.0, 30.0, 60.0]);

    /// Chunks per reply
    pub static CHUNK_COUNT: Lazy<Vec<f64>> =
        Lazy::new(|| vec![1.0, 2.0, 3.0, 4.0, 5.0, 8.0, 13.0]);
}
