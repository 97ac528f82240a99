pub mod runner;
pub mod status;

pub use runner::{CycleError, Scheduler, SchedulerSettings};
pub use status::{CyclePhase, CycleReport, SchedulerStatus, SharedStatus};
