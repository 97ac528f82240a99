use crate::checkpoint::Watermark;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_API_URL: &str = "https://lastpass.com/enterpriseapi.php";
pub const DEFAULT_SINK_URL: &str = "https://listener.logz.io:8071";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Seconds between cycles. Left loosely typed so that a bad value can fall
    /// back to the default instead of failing the whole file.
    #[serde(default)]
    pub interval: Option<IntervalSetting>,
    #[serde(default = "default_cycle_timeout", with = "humantime_serde")]
    pub cycle_timeout: Duration,
    pub api: ApiConfig,
    pub sink: SinkConfig,
    #[serde(default)]
    pub checkpoint: CheckpointConfig,
    #[serde(default)]
    pub status: Option<StatusConfig>,
}

fn default_cycle_timeout() -> Duration {
    Duration::from_secs(300)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum IntervalSetting {
    Seconds(i64),
    Other(serde_yaml::Value),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_api_url")]
    pub url: String,
    pub account_id: u64,
    #[serde(default)]
    pub credential: String,
    #[serde(default = "default_request_timeout", with = "humantime_serde")]
    pub request_timeout: Duration,
    #[serde(default)]
    pub retry: RetryConfig,
}

fn default_api_url() -> String {
    DEFAULT_API_URL.to_string()
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(30)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_initial_backoff", with = "humantime_serde")]
    pub initial_backoff: Duration,
    #[serde(default = "default_max_backoff", with = "humantime_serde")]
    pub max_backoff: Duration,
}

fn default_max_attempts() -> u32 {
    3
}

fn default_initial_backoff() -> Duration {
    Duration::from_millis(100)
}

fn default_max_backoff() -> Duration {
    Duration::from_secs(10)
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_backoff: default_initial_backoff(),
            max_backoff: default_max_backoff(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SinkConfig {
    #[serde(default = "default_sink_url")]
    pub url: String,
    #[serde(default)]
    pub token: String,
    #[serde(default = "default_log_type")]
    pub log_type: String,
    #[serde(default = "default_drain_duration", with = "humantime_serde")]
    pub drain_duration: Duration,
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
    /// How long `send` waits for queue space before giving up on an event.
    #[serde(default = "default_enqueue_timeout", with = "humantime_serde")]
    pub enqueue_timeout: Duration,
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
}

fn default_sink_url() -> String {
    DEFAULT_SINK_URL.to_string()
}

fn default_log_type() -> String {
    "lastpass".to_string()
}

fn default_drain_duration() -> Duration {
    Duration::from_secs(5)
}

fn default_queue_capacity() -> usize {
    10000
}

fn default_enqueue_timeout() -> Duration {
    Duration::from_secs(60)
}

fn default_concurrency() -> usize {
    8
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckpointConfig {
    #[serde(default = "default_checkpoint_path")]
    pub path: PathBuf,
    /// Initial watermark used when no checkpoint has been stored yet.
    #[serde(default)]
    pub start_from: Option<Watermark>,
    #[serde(default)]
    pub advance: AdvancePolicy,
}

fn default_checkpoint_path() -> PathBuf {
    PathBuf::from("last_time.txt")
}

impl Default for CheckpointConfig {
    fn default() -> Self {
        Self {
            path: default_checkpoint_path(),
            start_from: None,
            advance: AdvancePolicy::default(),
        }
    }
}

/// When a completed cycle is allowed to move the watermark forward.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdvancePolicy {
    /// Advance after every completed cycle, even if some events failed to deliver.
    #[default]
    Always,
    /// Hold the watermark back whenever any event in the cycle failed to deliver.
    AllDelivered,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusConfig {
    pub listen: String,
}
