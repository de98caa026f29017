use std::{net::SocketAddr, sync::Arc};

use {
    axum::{
        Router,
        extract::State,
        response::{Html, IntoResponse, Json},
        routing::{get, post},
    },
    parley_auto_reply::ReplyOrchestrator,
    parley_config::{ParleyConfig, Severity},
    parley_history::{HistoryStore, SqliteHistoryStore},
    parley_messaging::TwilioClient,
    tower_http::{
        cors::{Any, CorsLayer},
        trace::TraceLayer,
    },
    tracing::{info, warn},
};

use crate::{state::AppState, webhook::whatsapp_webhook_handler};

const HOME_PAGE: &str = r#"<!doctype html>
<html lang="en">
<head><meta charset="utf-8"><title>parley</title></head>
<body>
<h1>parley</h1>
<p>Auto-reply gateway. Point your WhatsApp sandbox webhook at <code>POST /api/whatsapp</code>.</p>
</body>
</html>
"#;

/// Build the gateway router (shared between production startup and tests).
pub fn build_gateway_app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let router = Router::new()
        .route("/", get(home_handler))
        .route("/health", get(health_handler))
        .route("/api/whatsapp", post(whatsapp_webhook_handler));

    #[cfg(feature = "prometheus")]
    let router = router.route(
        "/metrics",
        get(crate::metrics_routes::prometheus_metrics_handler),
    );

    #[cfg(feature = "metrics")]
    let router = router.route_layer(axum::middleware::from_fn(
        crate::metrics_middleware::http_metrics_middleware,
    ));

    router
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Wire the store, provider and reply pipeline from `config`.
pub async fn build_state(config: &ParleyConfig) -> anyhow::Result<AppState> {
    let store =
        SqliteHistoryStore::connect(&config.history.database_url, &config.history.table).await?;
    store.ensure_schema().await?;

    let provider = TwilioClient::from_config(&config.provider)?;
    let orchestrator = ReplyOrchestrator::from_config(config, Arc::new(store), Arc::new(provider));
    let state = AppState::new(Arc::new(orchestrator), config.provider.channel_prefix.clone());

    #[cfg(feature = "metrics")]
    let state = {
        let handle = parley_metrics::init_metrics(parley_metrics::MetricsRecorderConfig {
            enabled: config.metrics.enabled,
            global_labels: Vec::new(),
        })?;
        state.with_metrics(handle)
    };

    Ok(state)
}

/// Start the HTTP server and run until Ctrl-C.
pub async fn start_gateway(bind: &str, port: u16, config: ParleyConfig) -> anyhow::Result<()> {
    let diagnostics = parley_config::validate(&config).into_result()?;
    for d in diagnostics.iter().filter(|d| d.severity == Severity::Warning) {
        warn!(path = d.path, "{}", d.message);
    }

    let app = build_gateway_app(build_state(&config).await?);

    let addr: SocketAddr = format!("{bind}:{port}").parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, version = env!("CARGO_PKG_VERSION"), "parley gateway listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("parley gateway stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}

// ── Handlers ─────────────────────────────────────────────────────────────────

async fn home_handler() -> Html<&'static str> {
    Html(HOME_PAGE)
}

async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "version": state.version,
    }))
}
