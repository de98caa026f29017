//! HTTP gateway: receives provider webhooks and hands them to the reply
//! pipeline.

#[cfg(feature = "metrics")]
pub mod metrics_middleware;
#[cfg(feature = "prometheus")]
pub mod metrics_routes;
pub mod server;
pub mod state;
pub mod webhook;

pub use {
    server::{build_gateway_app, start_gateway},
    state::AppState,
};
