use thiserror::Error;

/// Longest slice of a response body carried in an error message.
pub const MAX_ERROR_BODY_CHARS: usize = 256;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("ERROR: statuscode: {status}, body: {body}")]
    Status { status: u16, body: String },

    #[error("malformed response body: {0}")]
    Json(#[from] serde_json::Error),

    #[error("API reported failure: {0}")]
    Api(String),

    #[error("giving up after {attempts} attempts: {last}")]
    RetriesExhausted {
        attempts: u32,
        #[source]
        last: Box<FetchError>,
    },
}

impl FetchError {
    /// HTTP status carried by this error, if the server answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            FetchError::Status { status, .. } => Some(*status),
            FetchError::RetriesExhausted { last, .. } => last.status(),
            _ => None,
        }
    }

    /// Only server-side (5xx) failures are worth another attempt.
    pub fn is_retryable(&self) -> bool {
        matches!(self, FetchError::Status { status, .. } if (500..=599).contains(status))
    }
}

/// Cuts `body` down to [`MAX_ERROR_BODY_CHARS`] characters for error text,
/// which ends up in logs and in the status endpoint.
pub fn body_excerpt(body: &str) -> String {
    let trimmed = body.trim();
    match trimmed.char_indices().nth(MAX_ERROR_BODY_CHARS) {
        Some((cut, _)) => format!("{}... ({} bytes total)", &trimmed[..cut], trimmed.len()),
        None => trimmed.to_string(),
    }
}
