use super::error::{body_excerpt, FetchError};
use super::retry::RetryPolicy;
use super::types::{ApiResponse, FetchWindow, FetchedLogs, ReportingRequest};
use crate::config::types::ApiConfig;
use std::fmt;
use tracing::{debug, warn};

pub type Result<T> = std::result::Result<T, FetchError>;

/// HTTP client for the audit-log reporting endpoint.
#[derive(Clone)]
pub struct LogFetcher {
    client: reqwest::Client,
    url: String,
    account_id: u64,
    credential: String,
    retry: RetryPolicy,
}

impl fmt::Debug for LogFetcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LogFetcher")
            .field("url", &self.url)
            .field("account_id", &self.account_id)
            .field("retry", &self.retry)
            .finish_non_exhaustive()
    }
}

impl LogFetcher {
    pub fn new(config: &ApiConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;

        Ok(Self {
            client,
            url: config.url.clone(),
            account_id: config.account_id,
            credential: config.credential.clone(),
            retry: RetryPolicy::from(&config.retry),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Fetch every record in `window`.
    ///
    /// 5xx answers are retried with backoff; any other failure is returned as
    /// soon as it happens. Records from a failed attempt are never returned.
    pub async fn fetch(&self, window: &FetchWindow) -> Result<FetchedLogs> {
        if window.is_empty() {
            debug!(from = %window.from, "Empty window, skipping request");
            return Ok(FetchedLogs::default());
        }

        let body = ReportingRequest::new(self.account_id, &self.credential, window);
        let body = &body;

        let (response, attempts) = self
            .retry
            .run(|attempt| self.fetch_once(body, attempt))
            .await?;

        let next_cursor = Some(response.next).filter(|next| !next.is_empty());
        if let Some(next) = &next_cursor {
            warn!(
                next = %next,
                "Response has more pages; only the first page is collected"
            );
        }

        debug!(
            from = %window.from,
            to = %window.to,
            records = response.data.len(),
            attempts,
            "Fetched audit records"
        );

        Ok(FetchedLogs {
            records: response.data,
            next_cursor,
            attempts,
        })
    }

    async fn fetch_once(&self, body: &ReportingRequest<'_>, attempt: u32) -> Result<ApiResponse> {
        debug!(url = %self.url, attempt, "Requesting audit records");

        let response = self.client.post(&self.url).json(body).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
                body: body_excerpt(&response.text().await.unwrap_or_default()),
            });
        }

        let bytes = response.bytes().await?;
        let parsed: ApiResponse = serde_json::from_slice(&bytes)?;

        if parsed.is_failure() {
            return Err(FetchError::Api(format!(
                "status {}: {}",
                parsed.status,
                body_excerpt(&String::from_utf8_lossy(&bytes))
            )));
        }

        Ok(parsed)
    }
}
