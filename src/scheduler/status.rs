use crate::checkpoint::Watermark;
use crate::fetch::FetchWindow;
use crate::sink::DeliveryReport;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Where the scheduler currently is within a cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CyclePhase {
    Idle,
    Fetching,
    Normalizing,
    Delivering,
    Checkpointing,
}

impl fmt::Display for CyclePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CyclePhase::Idle => "idle",
            CyclePhase::Fetching => "fetching",
            CyclePhase::Normalizing => "normalizing",
            CyclePhase::Delivering => "delivering",
            CyclePhase::Checkpointing => "checkpointing",
        };
        f.write_str(name)
    }
}

/// Summary of one completed cycle.
#[derive(Debug, Clone, Serialize)]
pub struct CycleReport {
    pub cycle_id: Uuid,
    pub window: FetchWindow,
    pub records_fetched: usize,
    pub delivery: DeliveryReport,
    /// True when the new watermark reached durable storage.
    pub checkpoint_saved: bool,
    pub next_cursor: Option<String>,
    pub elapsed_ms: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct SchedulerStatus {
    pub phase: CyclePhase,
    pub watermark: Watermark,
    pub cycles_completed: u64,
    pub cycles_failed: u64,
    pub last_cycle: Option<CycleReport>,
    pub last_error: Option<String>,
}

impl SchedulerStatus {
    pub fn new(watermark: Watermark) -> Self {
        Self {
            phase: CyclePhase::Idle,
            watermark,
            cycles_completed: 0,
            cycles_failed: 0,
            last_cycle: None,
            last_error: None,
        }
    }
}

/// Status shared between the scheduler (writer) and the status server (readers).
pub type SharedStatus = Arc<RwLock<SchedulerStatus>>;
