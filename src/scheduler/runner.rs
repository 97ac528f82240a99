use crate::checkpoint::{CheckpointStore, Watermark};
use crate::config::types::{AdvancePolicy, Config};
use crate::fetch::{FetchError, FetchWindow, LogFetcher};
use crate::normalize::normalize_all;
use crate::scheduler::status::{CyclePhase, CycleReport, SchedulerStatus, SharedStatus};
use crate::sink::{DeliveryAdapter, DeliveryReport};
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, info_span, warn, Instrument};
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum CycleError {
    #[error("fetch failed: {0}")]
    Fetch(#[from] FetchError),

    #[error("cycle exceeded deadline of {}s", .0.as_secs())]
    DeadlineExceeded(Duration),
}

#[derive(Debug, Clone)]
pub struct SchedulerSettings {
    pub interval: Duration,
    pub cycle_timeout: Duration,
    pub advance: AdvancePolicy,
}

impl SchedulerSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            interval: config.poll_interval(),
            cycle_timeout: config.cycle_timeout,
            advance: config.checkpoint.advance,
        }
    }
}

struct Collected {
    records_fetched: usize,
    next_cursor: Option<String>,
    delivery: DeliveryReport,
}

/// Drives fetch → normalize → deliver → checkpoint, one cycle at a time.
///
/// Cycles never overlap: `run` sleeps the full interval after each cycle, and
/// every cycle needs `&mut self`. This is also what makes the scheduler the
/// single writer of the checkpoint store.
pub struct Scheduler {
    fetcher: LogFetcher,
    adapter: DeliveryAdapter,
    store: Arc<dyn CheckpointStore>,
    settings: SchedulerSettings,
    watermark: Watermark,
    status: SharedStatus,
}

impl Scheduler {
    pub fn new(
        fetcher: LogFetcher,
        adapter: DeliveryAdapter,
        store: Arc<dyn CheckpointStore>,
        settings: SchedulerSettings,
        watermark: Watermark,
    ) -> Self {
        Self {
            fetcher,
            adapter,
            store,
            settings,
            watermark,
            status: Arc::new(RwLock::new(SchedulerStatus::new(watermark))),
        }
    }

    pub fn watermark(&self) -> Watermark {
        self.watermark
    }

    pub fn settings(&self) -> &SchedulerSettings {
        &self.settings
    }

    pub fn status(&self) -> SharedStatus {
        Arc::clone(&self.status)
    }

    /// Loop until `shutdown` fires. A running cycle is always allowed to
    /// finish; cancellation only cuts the sleep between cycles short.
    pub async fn run(mut self, shutdown: CancellationToken) {
        info!(
            interval_secs = self.settings.interval.as_secs(),
            watermark = %self.watermark,
            "Scheduler started"
        );

        while !shutdown.is_cancelled() {
            // Outcome is logged and recorded in the status by run_once
            let _ = self.run_once().await;

            debug!(
                "Finished collecting. Collector will run in {} seconds",
                self.settings.interval.as_secs()
            );

            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = tokio::time::sleep(self.settings.interval) => {}
            }
        }

        if let Err(e) = self.adapter.flush().await {
            warn!(error = %e, "Failed to flush sink on shutdown");
        }
        info!(watermark = %self.watermark, "Scheduler stopped");
    }

    /// Run a single cycle and record its outcome.
    pub async fn run_once(&mut self) -> Result<CycleReport, CycleError> {
        let cycle_id = Uuid::new_v4();
        let span = info_span!("cycle", %cycle_id);

        let result = self.run_cycle(cycle_id).instrument(span.clone()).await;
        self.record_outcome(&result).instrument(span).await;
        result
    }

    async fn run_cycle(&mut self, cycle_id: Uuid) -> Result<CycleReport, CycleError> {
        let started = Instant::now();
        let now = Watermark::now();

        if self.watermark > now {
            warn!(
                watermark = %self.watermark,
                now = %now,
                "Watermark is ahead of the clock, using an empty window"
            );
        }
        let window = FetchWindow::new(self.watermark, now);

        let deadline = self.settings.cycle_timeout;
        let collected = match tokio::time::timeout(deadline, self.collect(&window)).await {
            Ok(result) => result?,
            Err(_) => return Err(CycleError::DeadlineExceeded(deadline)),
        };

        let checkpoint_saved = self.checkpoint(window.to, &collected.delivery).await;

        Ok(CycleReport {
            cycle_id,
            window,
            records_fetched: collected.records_fetched,
            delivery: collected.delivery,
            checkpoint_saved,
            next_cursor: collected.next_cursor,
            elapsed_ms: started.elapsed().as_millis() as u64,
        })
    }

    async fn collect(&self, window: &FetchWindow) -> Result<Collected, FetchError> {
        self.enter(CyclePhase::Fetching).await;
        let fetched = self.fetcher.fetch(window).await?;
        let records_fetched = fetched.records.len();

        self.enter(CyclePhase::Normalizing).await;
        let events = normalize_all(fetched.records);

        self.enter(CyclePhase::Delivering).await;
        let delivery = self.adapter.deliver(&events).await;

        Ok(Collected {
            records_fetched,
            next_cursor: fetched.next_cursor,
            delivery,
        })
    }

    /// Advance the watermark to `to` and try to persist it.
    ///
    /// A failed save is logged only; the in-memory watermark still advances and
    /// the next cycle persists a newer value.
    async fn checkpoint(&mut self, to: Watermark, delivery: &DeliveryReport) -> bool {
        if self.settings.advance == AdvancePolicy::AllDelivered && !delivery.all_delivered() {
            warn!(
                failed = delivery.failed,
                watermark = %self.watermark,
                "Holding watermark back, some events were not delivered"
            );
            return false;
        }

        self.enter(CyclePhase::Checkpointing).await;
        self.watermark = to;
        self.status.write().await.watermark = to;

        match self.store.save(to).await {
            Ok(()) => true,
            Err(e) => {
                error!(error = %e, watermark = %to, "Failed to persist checkpoint");
                false
            }
        }
    }

    async fn enter(&self, phase: CyclePhase) {
        self.status.write().await.phase = phase;
        debug!(phase = %phase, "Cycle phase");
    }

    async fn record_outcome(&self, result: &Result<CycleReport, CycleError>) {
        let mut status = self.status.write().await;
        status.phase = CyclePhase::Idle;

        match result {
            Ok(report) => {
                status.cycles_completed += 1;
                status.last_cycle = Some(report.clone());
                info!(
                    from = %report.window.from,
                    to = %report.window.to,
                    records = report.records_fetched,
                    delivered = report.delivery.delivered,
                    failed = report.delivery.failed,
                    elapsed_ms = report.elapsed_ms,
                    "Cycle completed"
                );
            }
            Err(e) => {
                status.cycles_failed += 1;
                status.last_error = Some(e.to_string());
                error!(error = %e, watermark = %self.watermark, "Cycle failed");
            }
        }
    }
}
