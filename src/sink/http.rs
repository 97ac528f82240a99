//! Buffered sink that ships newline-delimited JSON to a bulk log listener.
//!
//! Events are queued on a bounded channel and drained by a background task,
//! either when the drain timer fires or when a batch fills up. A full queue
//! makes `send` wait, so a large cycle is paced by the listener instead of
//! losing events. Each batch is
//! POSTed to `{url}/?token=..&type=..`; 5xx and network failures are retried
//! with backoff, after which the batch is dropped and logged.

use super::{Sink, SinkError};
use crate::config::types::SinkConfig;
use async_trait::async_trait;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, warn};

/// Largest number of events shipped in one request.
pub const MAX_BATCH_EVENTS: usize = 1000;

const SHIP_RETRY_COUNT: u32 = 3;
const SHIP_INITIAL_BACKOFF: Duration = Duration::from_millis(200);

enum SinkCommand {
    Event(Vec<u8>),
    Flush(oneshot::Sender<()>),
}

pub struct HttpSink {
    tx: mpsc::Sender<SinkCommand>,
    enqueue_timeout: Duration,
}

impl HttpSink {
    /// Build the sink and start its drain task. Must be called inside a tokio runtime.
    pub fn new(config: &SinkConfig) -> Result<Self, SinkError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;

        let shipper = Shipper {
            client,
            endpoint: format!("{}/", config.url.trim_end_matches('/')),
            token: config.token.clone(),
            log_type: config.log_type.clone(),
        };

        let (tx, rx) = mpsc::channel(config.queue_capacity.max(1));
        tokio::spawn(run_drain(rx, shipper, config.drain_duration));

        Ok(Self {
            tx,
            enqueue_timeout: config.enqueue_timeout,
        })
    }
}

#[async_trait]
impl Sink for HttpSink {
    async fn send(&self, payload: Vec<u8>) -> Result<(), SinkError> {
        // Waiting for space holds the adapter back while the drain task ships
        let enqueue = self.tx.send(SinkCommand::Event(payload));
        match tokio::time::timeout(self.enqueue_timeout, enqueue).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(_)) => Err(SinkError::Closed),
            Err(_) => Err(SinkError::QueueFull),
        }
    }

    async fn flush(&self) -> Result<(), SinkError> {
        let (done_tx, done_rx) = oneshot::channel();
        self.tx
            .send(SinkCommand::Flush(done_tx))
            .await
            .map_err(|_| SinkError::Closed)?;
        done_rx.await.map_err(|_| SinkError::Closed)
    }
}

struct Shipper {
    client: reqwest::Client,
    endpoint: String,
    token: String,
    log_type: String,
}

impl Shipper {
    async fn ship(&self, batch: Vec<Vec<u8>>) {
        if batch.is_empty() {
            return;
        }

        let count = batch.len();
        let mut body = Vec::with_capacity(batch.iter().map(|e| e.len() + 1).sum());
        for event in batch {
            body.extend_from_slice(&event);
            body.push(b'\n');
        }

        let mut backoff = SHIP_INITIAL_BACKOFF;
        let mut attempts = 0;
        loop {
            attempts += 1;
            match self.post(body.clone()).await {
                Ok(()) => {
                    debug!(events = count, attempts, "Shipped batch to listener");
                    return;
                }
                Err(e) if attempts < SHIP_RETRY_COUNT && is_transient(&e) => {
                    warn!(
                        attempt = attempts,
                        backoff_ms = backoff.as_millis() as u64,
                        error = %e,
                        "Listener request failed, retrying"
                    );
                    tokio::time::sleep(backoff).await;
                    backoff *= 2;
                }
                Err(e) => {
                    error!(events = count, attempts, error = %e, "Dropping batch after failed delivery");
                    return;
                }
            }
        }
    }

    async fn post(&self, body: Vec<u8>) -> Result<(), SinkError> {
        let response = self
            .client
            .post(&self.endpoint)
            .query(&[("token", self.token.as_str()), ("type", self.log_type.as_str())])
            .header(reqwest::header::CONTENT_TYPE, "text/plain")
            .body(body)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(SinkError::Status {
                status: response.status().as_u16(),
                message: response.text().await.unwrap_or_default(),
            });
        }

        Ok(())
    }
}

fn is_transient(error: &SinkError) -> bool {
    match error {
        SinkError::Http(_) => true,
        SinkError::Status { status, .. } => (500..=599).contains(status),
        _ => false,
    }
}

async fn run_drain(
    mut rx: mpsc::Receiver<SinkCommand>,
    shipper: Shipper,
    drain_duration: Duration,
) {
    let mut pending: Vec<Vec<u8>> = Vec::new();
    // First drain one full period after start rather than immediately
    let start = tokio::time::Instant::now() + drain_duration;
    let mut ticker = tokio::time::interval_at(start, drain_duration);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            command = rx.recv() => match command {
                Some(SinkCommand::Event(payload)) => {
                    pending.push(payload);
                    if pending.len() >= MAX_BATCH_EVENTS {
                        shipper.ship(std::mem::take(&mut pending)).await;
                    }
                }
                Some(SinkCommand::Flush(done)) => {
                    shipper.ship(std::mem::take(&mut pending)).await;
                    let _ = done.send(());
                }
                None => {
                    shipper.ship(std::mem::take(&mut pending)).await;
                    debug!("Sink queue closed, drain task exiting");
                    break;
                }
            },
            _ = ticker.tick() => {
                shipper.ship(std::mem::take(&mut pending)).await;
            }
        }
    }
}
