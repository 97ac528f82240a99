#![allow(dead_code)]

//! Helpers shared by the integration tests: a scripted HTTP server standing in
//! for the audit-log API or the log listener, and an in-memory sink.

use async_trait::async_trait;
use axum::extract::{RawQuery, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Router;
use logbridge::config::types::{ApiConfig, RetryConfig};
use logbridge::sink::{Sink, SinkError};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const SAMPLE_RESPONSE: &str = r#"{"status":"ok","next":"","data":{"rec1":{"Time":"2024-06-01 10:00:00","Username":"alice","IP_Address":"1.2.3.4","Action":"login","Data":""}}}"#;

pub const EMPTY_RESPONSE: &str = r#"{"status":"OK","next":"","data":[]}"#;

#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub path: String,
    pub query: Option<String>,
    pub content_type: Option<String>,
    pub body: String,
}

struct MockState {
    responses: Vec<(u16, String)>,
    delay: Duration,
    hits: AtomicUsize,
    requests: Mutex<Vec<RecordedRequest>>,
}

/// Scripted HTTP server. Responses are served in order and the last one
/// repeats for every further request.
pub struct MockServer {
    pub base_url: String,
    state: Arc<MockState>,
}

impl MockServer {
    pub async fn start(responses: Vec<(u16, &str)>) -> Self {
        Self::start_with_delay(responses, Duration::ZERO).await
    }

    pub async fn start_with_delay(responses: Vec<(u16, &str)>, delay: Duration) -> Self {
        assert!(!responses.is_empty(), "mock server needs at least one response");

        let state = Arc::new(MockState {
            responses: responses
                .into_iter()
                .map(|(status, body)| (status, body.to_string()))
                .collect(),
            delay,
            hits: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
        });

        let app = Router::new().fallback(handle).with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url: format!("http://{}", addr),
            state,
        }
    }

    pub fn api_url(&self) -> String {
        format!("{}/enterpriseapi.php", self.base_url)
    }

    pub fn hits(&self) -> usize {
        self.state.hits.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.state.requests.lock().unwrap().clone()
    }

    pub fn request_json(&self, index: usize) -> serde_json::Value {
        serde_json::from_str(&self.requests()[index].body).unwrap()
    }
}

async fn handle(
    State(state): State<Arc<MockState>>,
    RawQuery(query): RawQuery,
    uri: axum::http::Uri,
    headers: HeaderMap,
    body: String,
) -> (StatusCode, String) {
    let hit = state.hits.fetch_add(1, Ordering::SeqCst);

    state.requests.lock().unwrap().push(RecordedRequest {
        path: uri.path().to_string(),
        query,
        content_type: headers
            .get(axum::http::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.to_string()),
        body,
    });

    if !state.delay.is_zero() {
        tokio::time::sleep(state.delay).await;
    }

    let (status, body) = &state.responses[hit.min(state.responses.len() - 1)];
    (StatusCode::from_u16(*status).unwrap(), body.clone())
}

/// API config pointing at `url` with millisecond backoff so tests stay fast.
pub fn api_config(url: &str) -> ApiConfig {
    ApiConfig {
        url: url.to_string(),
        account_id: 8771,
        credential: "test-provhash".to_string(),
        request_timeout: Duration::from_secs(5),
        retry: RetryConfig {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(1),
            max_backoff: Duration::from_millis(5),
        },
    }
}

/// Sink that keeps every accepted payload and rejects events whose JSON
/// contains `reject_marker`.
#[derive(Default)]
pub struct MemorySink {
    pub reject_marker: Option<String>,
    accepted: Mutex<Vec<Vec<u8>>>,
    flushes: AtomicUsize,
}

impl MemorySink {
    pub fn rejecting(marker: &str) -> Self {
        Self {
            reject_marker: Some(marker.to_string()),
            ..Default::default()
        }
    }

    pub fn events(&self) -> Vec<serde_json::Value> {
        self.accepted
            .lock()
            .unwrap()
            .iter()
            .map(|payload| serde_json::from_slice(payload).unwrap())
            .collect()
    }

    pub fn flushes(&self) -> usize {
        self.flushes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Sink for MemorySink {
    async fn send(&self, payload: Vec<u8>) -> Result<(), SinkError> {
        if let Some(marker) = &self.reject_marker {
            if String::from_utf8_lossy(&payload).contains(marker.as_str()) {
                return Err(SinkError::QueueFull);
            }
        }
        self.accepted.lock().unwrap().push(payload);
        Ok(())
    }

    async fn flush(&self) -> Result<(), SinkError> {
        self.flushes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
