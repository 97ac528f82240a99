mod common;

use async_trait::async_trait;
use chrono::Utc;
use common::{api_config, MemorySink, MockServer, EMPTY_RESPONSE, SAMPLE_RESPONSE};
use logbridge::checkpoint::{CheckpointError, CheckpointStore, FileCheckpointStore, Watermark};
use logbridge::config::AdvancePolicy;
use logbridge::fetch::LogFetcher;
use logbridge::scheduler::{CycleError, CyclePhase, Scheduler, SchedulerSettings};
use logbridge::sink::DeliveryAdapter;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

fn an_hour_ago() -> Watermark {
    Watermark::from_datetime(Utc::now() - chrono::Duration::hours(1))
}

fn settings(advance: AdvancePolicy) -> SchedulerSettings {
    SchedulerSettings {
        interval: Duration::from_secs(3600),
        cycle_timeout: Duration::from_secs(10),
        advance,
    }
}

struct Harness {
    server: MockServer,
    sink: Arc<MemorySink>,
    store: Arc<FileCheckpointStore>,
    scheduler: Scheduler,
    initial: Watermark,
    _dir: TempDir,
}

async fn harness(server: MockServer, sink: MemorySink, settings: SchedulerSettings) -> Harness {
    harness_from(server, sink, settings, an_hour_ago()).await
}

async fn harness_from(
    server: MockServer,
    sink: MemorySink,
    settings: SchedulerSettings,
    initial: Watermark,
) -> Harness {
    let dir = TempDir::new().unwrap();
    let store = Arc::new(FileCheckpointStore::new(dir.path().join("last_time.txt")));
    let sink = Arc::new(sink);

    let fetcher = LogFetcher::new(&api_config(&server.api_url())).unwrap();
    let adapter = DeliveryAdapter::new(sink.clone(), 4);
    let scheduler = Scheduler::new(fetcher, adapter, store.clone(), settings, initial);

    Harness {
        server,
        sink,
        store,
        scheduler,
        initial,
        _dir: dir,
    }
}

#[tokio::test]
async fn test_cycle_end_to_end() {
    let server = MockServer::start(vec![(200, SAMPLE_RESPONSE)]).await;
    let mut h = harness(server, MemorySink::default(), settings(AdvancePolicy::Always)).await;

    let report = h.scheduler.run_once().await.unwrap();

    assert_eq!(report.window.from, h.initial);
    assert_eq!(report.records_fetched, 1);
    assert_eq!(report.delivery.delivered, 1);
    assert!(report.checkpoint_saved);

    let events = h.sink.events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0]["name"], "rec1");
    assert_eq!(events[0]["timestamp"], "2024-06-01T10:00:00.000Z");
    assert_eq!(events[0]["username"], "alice");

    // The query and the checkpoint both use the `now` captured at cycle start
    let request = h.server.request_json(0);
    assert_eq!(request["data"]["to"], report.window.to.to_string());
    assert_eq!(h.store.load().await.unwrap(), Some(report.window.to));
    assert_eq!(h.scheduler.watermark(), report.window.to);

    let status = h.scheduler.status().read().await.clone();
    assert_eq!(status.phase, CyclePhase::Idle);
    assert_eq!(status.cycles_completed, 1);
    assert_eq!(status.watermark, report.window.to);
}

#[tokio::test]
async fn test_next_cycle_starts_from_previous_now() {
    let server = MockServer::start(vec![(200, EMPTY_RESPONSE)]).await;
    let mut h = harness(server, MemorySink::default(), settings(AdvancePolicy::Always)).await;

    let first = h.scheduler.run_once().await.unwrap();
    let second = h.scheduler.run_once().await.unwrap();

    assert_eq!(second.window.from, first.window.to);
    assert!(second.window.from <= second.window.to);
}

#[tokio::test]
async fn test_zero_records_still_advances_watermark() {
    let server = MockServer::start(vec![(200, EMPTY_RESPONSE)]).await;
    let mut h = harness(server, MemorySink::default(), settings(AdvancePolicy::Always)).await;

    let report = h.scheduler.run_once().await.unwrap();

    assert_eq!(report.records_fetched, 0);
    assert!(h.sink.events().is_empty());
    assert_eq!(h.store.load().await.unwrap(), Some(report.window.to));
    assert!(h.scheduler.watermark() > h.initial);
}

#[tokio::test]
async fn test_future_watermark_skips_fetch_and_resets_to_now() {
    let server = MockServer::start(vec![(200, SAMPLE_RESPONSE)]).await;
    let ahead = Watermark::from_datetime(Utc::now() + chrono::Duration::hours(1));
    let mut h = harness_from(
        server,
        MemorySink::default(),
        settings(AdvancePolicy::Always),
        ahead,
    )
    .await;

    let report = h.scheduler.run_once().await.unwrap();

    assert_eq!(h.server.hits(), 0);
    assert_eq!(report.records_fetched, 0);
    assert_eq!(report.window.from, report.window.to);
    assert!(report.window.to < ahead);

    // The clock wins: the watermark is pulled back to the cycle's `now`
    assert_eq!(h.scheduler.watermark(), report.window.to);
    assert_eq!(h.store.load().await.unwrap(), Some(report.window.to));
}

#[tokio::test]
async fn test_permanent_failure_leaves_watermark_unchanged() {
    let server = MockServer::start(vec![(400, "bad request")]).await;
    let mut h = harness(server, MemorySink::default(), settings(AdvancePolicy::Always)).await;

    let result = h.scheduler.run_once().await;

    assert!(matches!(result, Err(CycleError::Fetch(_))));
    assert_eq!(h.server.hits(), 1);
    assert_eq!(h.scheduler.watermark(), h.initial);
    assert!(h.store.load().await.unwrap().is_none());

    let status = h.scheduler.status().read().await.clone();
    assert_eq!(status.cycles_failed, 1);
    assert_eq!(status.phase, CyclePhase::Idle);
    assert!(status.last_error.unwrap().contains("statuscode: 400"));
}

#[tokio::test]
async fn test_repeated_503_fresh_retry_count_per_cycle() {
    let server = MockServer::start(vec![(503, "unavailable")]).await;
    let mut h = harness(server, MemorySink::default(), settings(AdvancePolicy::Always)).await;

    assert!(h.scheduler.run_once().await.is_err());
    assert_eq!(h.server.hits(), 3);
    assert!(h.store.load().await.unwrap().is_none());

    assert!(h.scheduler.run_once().await.is_err());
    assert_eq!(h.server.hits(), 6);
    assert_eq!(h.scheduler.watermark(), h.initial);
    assert_eq!(h.scheduler.status().read().await.cycles_failed, 2);
}

const TWO_RECORDS: &str = r#"{"status":"OK","next":"","data":{
    "good":{"Time":"2024-06-01 10:00:00","Username":"alice","IP_Address":"1.2.3.4","Action":"login","Data":""},
    "poison":{"Time":"2024-06-01 10:00:01","Username":"mallory","IP_Address":"6.6.6.6","Action":"login","Data":""}
}}"#;

#[tokio::test]
async fn test_partial_delivery_advances_by_default() {
    let server = MockServer::start(vec![(200, TWO_RECORDS)]).await;
    let mut h = harness(server, MemorySink::rejecting("poison"), settings(AdvancePolicy::Always)).await;

    let report = h.scheduler.run_once().await.unwrap();

    assert_eq!(report.delivery.attempted, 2);
    assert_eq!(report.delivery.delivered, 1);
    assert_eq!(report.delivery.failed, 1);
    assert!(report.checkpoint_saved);
    assert_eq!(h.sink.events()[0]["name"], "good");
    assert_eq!(h.store.load().await.unwrap(), Some(report.window.to));
}

#[tokio::test]
async fn test_all_delivered_policy_holds_watermark() {
    let server = MockServer::start(vec![(200, TWO_RECORDS)]).await;
    let mut h = harness(
        server,
        MemorySink::rejecting("poison"),
        settings(AdvancePolicy::AllDelivered),
    )
    .await;

    let report = h.scheduler.run_once().await.unwrap();

    assert_eq!(report.delivery.failed, 1);
    assert!(!report.checkpoint_saved);
    assert_eq!(h.scheduler.watermark(), h.initial);
    assert!(h.store.load().await.unwrap().is_none());
}

struct BrokenStore;

#[async_trait]
impl CheckpointStore for BrokenStore {
    async fn load(&self) -> Result<Option<Watermark>, CheckpointError> {
        Ok(None)
    }

    async fn save(&self, _watermark: Watermark) -> Result<(), CheckpointError> {
        Err(CheckpointError::Io {
            path: PathBuf::from("/read-only/last_time.txt"),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only"),
        })
    }
}

#[tokio::test]
async fn test_checkpoint_save_failure_is_not_fatal() {
    let server = MockServer::start(vec![(200, SAMPLE_RESPONSE)]).await;
    let sink = Arc::new(MemorySink::default());
    let initial = an_hour_ago();

    let mut scheduler = Scheduler::new(
        LogFetcher::new(&api_config(&server.api_url())).unwrap(),
        DeliveryAdapter::new(sink.clone(), 4),
        Arc::new(BrokenStore),
        settings(AdvancePolicy::Always),
        initial,
    );

    let report = scheduler.run_once().await.unwrap();

    assert!(!report.checkpoint_saved);
    assert_eq!(sink.events().len(), 1);
    // The in-memory watermark still moves; the next cycle persists a newer one
    assert_eq!(scheduler.watermark(), report.window.to);
}

#[tokio::test]
async fn test_cycle_deadline_abandons_cycle() {
    let server =
        MockServer::start_with_delay(vec![(200, SAMPLE_RESPONSE)], Duration::from_secs(2)).await;
    let mut h = harness(
        server,
        MemorySink::default(),
        SchedulerSettings {
            interval: Duration::from_secs(3600),
            cycle_timeout: Duration::from_millis(200),
            advance: AdvancePolicy::Always,
        },
    )
    .await;

    let result = h.scheduler.run_once().await;

    assert!(matches!(result, Err(CycleError::DeadlineExceeded(_))));
    assert!(h.sink.events().is_empty());
    assert_eq!(h.scheduler.watermark(), h.initial);
    assert!(h.store.load().await.unwrap().is_none());
    assert_eq!(h.scheduler.status().read().await.phase, CyclePhase::Idle);
}

#[tokio::test]
async fn test_run_loop_stops_on_cancel_and_flushes() {
    let server = MockServer::start(vec![(200, SAMPLE_RESPONSE)]).await;
    let h = harness(server, MemorySink::default(), settings(AdvancePolicy::Always)).await;

    let status = h.scheduler.status();
    let shutdown = CancellationToken::new();
    let handle = tokio::spawn(h.scheduler.run(shutdown.clone()));

    // Wait for the first cycle to finish, then interrupt the long sleep
    tokio::time::timeout(Duration::from_secs(5), async {
        while status.read().await.cycles_completed < 1 {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .unwrap();

    shutdown.cancel();
    tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .unwrap()
        .unwrap();

    // Only one cycle ran: the loop sleeps the full interval between cycles
    assert_eq!(h.server.hits(), 1);
    assert_eq!(h.sink.events().len(), 1);
    assert_eq!(h.sink.flushes(), 1);
    assert!(h.store.load().await.unwrap().is_some());
}
