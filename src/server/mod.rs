pub mod api;

use axum::{routing::get, Router};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;
use tracing::info;

pub use api::{StatusResponse, StatusState};

pub fn router(state: Arc<StatusState>) -> Router {
    Router::new()
        .route("/health", get(api::health_check))
        .route("/status", get(api::get_status))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the status HTTP server; returns once `shutdown` is cancelled.
pub async fn start_server(
    listen_addr: SocketAddr,
    state: Arc<StatusState>,
    shutdown: CancellationToken,
) -> Result<(), std::io::Error> {
    let listener = TcpListener::bind(listen_addr).await?;
    info!(addr = %listen_addr, "Starting status HTTP server");
    serve(listener, state, shutdown).await
}

pub async fn serve(
    listener: TcpListener,
    state: Arc<StatusState>,
    shutdown: CancellationToken,
) -> Result<(), std::io::Error> {
    axum::serve(listener, router(state))
        .with_graceful_shutdown(async move {
            shutdown.cancelled().await;
            info!("Status server shutting down");
        })
        .await
}
