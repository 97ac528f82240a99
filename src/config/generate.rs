pub fn generate_starter_config() -> String {
    r#"# =============================================================================
# LOGBRIDGE CONFIGURATION
# =============================================================================
# logbridge polls the audit-log reporting API for records newer than the last
# stored watermark, normalizes them and ships them to a log listener.
#
# Config file locations (in order of precedence):
#   1. Path specified via --config argument
#   2. ~/.config/logbridge/config.yml
#   3. /etc/logbridge/config.yml
#
# Any value may reference an environment variable with $env{NAME}.

# Seconds to sleep between collection cycles. Non-numeric or non-positive
# values fall back to 5.
interval: 5

# Upper bound on one fetch-and-deliver pass. A cycle that runs longer is
# abandoned and does not move the watermark.
cycle_timeout: 5m

# =============================================================================
# AUDIT-LOG API
# =============================================================================
api:
  url: https://lastpass.com/enterpriseapi.php
  account_id: $env{CUSTOMER_ID}
  credential: $env{LASTPASS_KEY}
  # Timeout for a single HTTP attempt
  request_timeout: 30s
  # Only 5xx responses are retried; everything else fails the cycle at once
  retry:
    max_attempts: 3
    initial_backoff: 100ms
    max_backoff: 10s

# =============================================================================
# LOG LISTENER
# =============================================================================
sink:
  url: https://listener.logz.io:8071
  token: $env{LOGZIO_TOKEN}
  log_type: lastpass
  # Longest time an event waits in the internal buffer before being shipped
  drain_duration: 5s
  queue_capacity: 10000
  # A full queue makes delivery wait for the listener; an event still waiting
  # after this long counts as failed
  enqueue_timeout: 60s
  # Number of events handed to the buffer concurrently
  concurrency: 8

# =============================================================================
# CHECKPOINT
# =============================================================================
checkpoint:
  path: ~/.local/state/logbridge/last_time.txt
  # Initial watermark when no checkpoint exists yet (defaults to start time)
  # start_from: "2024-01-01 00:00:00"
  # 'always' advances after every completed cycle; 'all_delivered' holds the
  # watermark back when any event failed to reach the listener
  advance: always

# =============================================================================
# STATUS (optional)
# =============================================================================
# status:
#   listen: 127.0.0.1:7110
"#
    .to_string()
}
