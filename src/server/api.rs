use crate::scheduler::{SchedulerStatus, SharedStatus};
use axum::{extract::State, Json};
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;

/// Shared state for the status API
pub struct StatusState {
    pub collector_id: String,
    pub version: String,
    pub start_time: Instant,
    pub scheduler: SharedStatus,
}

impl StatusState {
    pub fn new(scheduler: SharedStatus) -> Self {
        let collector_id = hostname::get()
            .ok()
            .and_then(|h| h.to_str().map(|s| s.to_string()))
            .unwrap_or_else(|| "logbridge".to_string());

        Self {
            collector_id,
            version: env!("CARGO_PKG_VERSION").to_string(),
            start_time: Instant::now(),
            scheduler,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub collector_id: String,
    pub version: String,
    pub uptime_seconds: u64,
    #[serde(flatten)]
    pub scheduler: SchedulerStatus,
}

/// GET /health
pub async fn health_check() -> &'static str {
    "OK"
}

/// GET /status
pub async fn get_status(State(state): State<Arc<StatusState>>) -> Json<StatusResponse> {
    let scheduler = state.scheduler.read().await.clone();

    Json(StatusResponse {
        collector_id: state.collector_id.clone(),
        version: state.version.clone(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
        scheduler,
    })
}
