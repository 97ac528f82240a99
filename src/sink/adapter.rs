use super::{Sink, SinkError};
use crate::normalize::NormalizedEvent;
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::error;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryReport {
    pub attempted: usize,
    pub delivered: usize,
    pub failed: usize,
}

impl DeliveryReport {
    pub fn all_delivered(&self) -> bool {
        self.failed == 0
    }
}

/// Hands normalized events to a [`Sink`] with bounded fan-out.
#[derive(Clone)]
pub struct DeliveryAdapter {
    sink: Arc<dyn Sink>,
    concurrency: usize,
}

impl DeliveryAdapter {
    pub fn new(sink: Arc<dyn Sink>, concurrency: usize) -> Self {
        Self {
            sink,
            concurrency: concurrency.max(1),
        }
    }

    /// Send every event and wait for all sends to settle.
    ///
    /// A failed event is logged and counted; it never stops the others.
    pub async fn deliver(&self, events: &[NormalizedEvent]) -> DeliveryReport {
        let outcomes: Vec<bool> = stream::iter(events)
            .map(|event| self.deliver_one(event))
            .buffer_unordered(self.concurrency)
            .boxed()
            .collect()
            .await;

        let delivered = outcomes.iter().filter(|ok| **ok).count();
        DeliveryReport {
            attempted: outcomes.len(),
            delivered,
            failed: outcomes.len() - delivered,
        }
    }

    pub async fn flush(&self) -> Result<(), SinkError> {
        self.sink.flush().await
    }

    async fn deliver_one(&self, event: &NormalizedEvent) -> bool {
        let payload = match event.to_json() {
            Ok(payload) => payload,
            Err(e) => {
                error!(event = %event.name, error = %e, "error serializing audit event");
                return false;
            }
        };

        match self.sink.send(payload).await {
            Ok(()) => true,
            Err(e) => {
                error!(event = %event.name, error = %e, "error sending audit event to sink");
                false
            }
        }
    }
}
