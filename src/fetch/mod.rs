pub mod client;
pub mod error;
pub mod retry;
pub mod types;

pub use client::LogFetcher;
pub use error::{FetchError, MAX_ERROR_BODY_CHARS};
pub use retry::RetryPolicy;
pub use types::{ApiResponse, FetchWindow, FetchedLogs, RawLogRecord, ReportingRequest};
