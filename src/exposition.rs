//! Metrics exposition: a small HTTP server answering `GET /metrics`.

use std::net::SocketAddr;

use axum::extract::State;
use axum::routing::get;
use axum::Router;
use prometheus::{Encoder, TextEncoder};
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::{error, info};

use crate::metrics::Metrics;

/// Serve the metrics page until the shutdown signal fires.
///
/// A bind failure here is logged but not fatal: the decision service keeps
/// running without its metrics page.
pub async fn run(addr: SocketAddr, metrics: Metrics, mut shutdown: watch::Receiver<bool>) {
    let listener = match TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(err) => {
            error!(%addr, error = %err, "metrics server failed to bind");
            return;
        }
    };
    match listener.local_addr() {
        Ok(local) => info!(addr = %local, "metrics listening"),
        Err(_) => info!(%addr, "metrics listening"),
    }

    let app = Router::new().route("/metrics", get(render)).with_state(metrics);
    let served = axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = shutdown.changed().await;
        })
        .await;
    if let Err(err) = served {
        error!(error = %err, "metrics server error");
    }
    info!("metrics server closed");
}

/// Render the registry in the prometheus text format.
async fn render(State(metrics): State<Metrics>) -> String {
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    if let Err(err) = encoder.encode(&metrics.registry().gather(), &mut buffer) {
        error!(error = %err, "failed to encode metrics");
        return String::new();
    }
    String::from_utf8_lossy(&buffer).into_owned()
}
