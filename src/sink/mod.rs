pub mod adapter;
pub mod http;

use async_trait::async_trait;
use thiserror::Error;

pub use adapter::{DeliveryAdapter, DeliveryReport};
pub use http::{HttpSink, MAX_BATCH_EVENTS};

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("sink queue stayed full, event not accepted")]
    QueueFull,

    #[error("sink is closed")]
    Closed,

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("listener returned error status {status}: {message}")]
    Status { status: u16, message: String },
}

/// Destination for serialized events.
///
/// The sink owns buffering, batching and retries. Callers hand over one
/// event at a time and only learn whether it was accepted.
#[async_trait]
pub trait Sink: Send + Sync {
    async fn send(&self, payload: Vec<u8>) -> Result<(), SinkError>;

    /// Push out anything buffered. Called on shutdown.
    async fn flush(&self) -> Result<(), SinkError> {
        Ok(())
    }
}
