//! Metrics recorder initialization.

use tracing::info;

use crate::Result;

/// Handle to the installed recorder.
#[derive(Clone)]
pub struct MetricsHandle {
    #[cfg(feature = "prometheus")]
    prometheus_handle: Option<metrics_exporter_prometheus::PrometheusHandle>,
}

impl MetricsHandle {
    /// Render metrics in Prometheus text format.
    ///
    /// Empty when collection is disabled or the exporter is not compiled in.
    #[must_use]
    pub fn render(&self) -> String {
        #[cfg(feature = "prometheus")]
        {
            self.prometheus_handle
                .as_ref()
                .map(|h| h.render())
                .unwrap_or_default()
        }
        #[cfg(not(feature = "prometheus"))]
        {
            String::new()
        }
    }
}

/// Configuration for the metrics system.
#[derive(Debug, Clone, Default)]
pub struct MetricsRecorderConfig {
    pub enabled: bool,
    /// Labels added to every metric (e.g. deployment name)
    pub global_labels: Vec<(String, String)>,
}

/// Initialize the metrics system. Call once at startup.
///
/// Without the `prometheus` feature (or with `enabled = false`) no recorder is
/// installed and the facade macros are no-ops.
pub fn init_metrics(config: MetricsRecorderConfig) -> Result<MetricsHandle> {
    if !config.enabled {
        info!("metrics collection is disabled");
        return Ok(MetricsHandle {
            #[cfg(feature = "prometheus")]
            prometheus_handle: None,
        });
    }

    #[cfg(feature = "prometheus")]
    {
        let handle = init_prometheus(config)?;
        info!("prometheus metrics exporter initialized");
        Ok(MetricsHandle {
            prometheus_handle: Some(handle),
        })
    }

    #[cfg(not(feature = "prometheus"))]
    {
        let _ = config;
        info!("metrics feature not enabled at compile time");
        Ok(MetricsHandle {})
    }
}

#[cfg(feature = "prometheus")]
fn init_prometheus(
    config: MetricsRecorderConfig,
) -> Result<metrics_exporter_prometheus::PrometheusHandle> {
    use {
        crate::{auto_reply, buckets, dispatch, http},
        metrics_exporter_prometheus::{Matcher, PrometheusBuilder},
    };

    let mut builder = PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Full(http::REQUEST_DURATION_SECONDS.to_string()),
            &buckets::REQUEST_DURATION,
        )?
        .set_buckets_for_metric(
            Matcher::Full(auto_reply::PROCESSING_DURATION_SECONDS.to_string()),
            &buckets::REQUEST_DURATION,
        )?
        .set_buckets_for_metric(
            Matcher::Full(dispatch::CHUNK_DURATION_SECONDS.to_string()),
            &buckets::CHUNK_DURATION,
        )?
        .set_buckets_for_metric(
            Matcher::Full(auto_reply::CHUNKS_PER_REPLY.to_string()),
            &buckets::CHUNK_COUNT,
        )?;

    for (key, value) in config.global_labels {
        builder = builder.add_global_label(key, value);
    }

    // install_recorder() registers globally without spawning an HTTP listener;
    // the gateway serves the rendered text itself.
    Ok(builder.install_recorder()?)
}
