use super::watermark::{Watermark, WatermarkParseError};
use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, error, info};

#[derive(Debug, Error)]
pub enum CheckpointError {
    #[error("checkpoint I/O error on '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("corrupt checkpoint: {0}")]
    Corrupt(#[from] WatermarkParseError),
}

pub type Result<T> = std::result::Result<T, CheckpointError>;

/// Durable home of the watermark.
///
/// Implementations are not required to tolerate concurrent writers: the
/// scheduler is the only caller and never overlaps cycles.
#[async_trait]
pub trait CheckpointStore: Send + Sync {
    /// Returns `None` when nothing has been persisted yet.
    async fn load(&self) -> Result<Option<Watermark>>;

    async fn save(&self, watermark: Watermark) -> Result<()>;
}

/// Keeps the watermark as a single line of text in a file.
#[derive(Debug, Clone)]
pub struct FileCheckpointStore {
    path: PathBuf,
}

impl FileCheckpointStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "checkpoint".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    fn io_error(&self, source: std::io::Error) -> CheckpointError {
        CheckpointError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

#[async_trait]
impl CheckpointStore for FileCheckpointStore {
    async fn load(&self) -> Result<Option<Watermark>> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(self.io_error(e)),
        };

        if content.trim().is_empty() {
            return Ok(None);
        }

        Ok(Some(content.parse()?))
    }

    async fn save(&self, watermark: Watermark) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .map_err(|e| self.io_error(e))?;
            }
        }

        // Write-then-rename so a crash never leaves a half-written value behind
        let temp_path = self.temp_path();
        tokio::fs::write(&temp_path, watermark.to_string())
            .await
            .map_err(|e| self.io_error(e))?;
        tokio::fs::rename(&temp_path, &self.path)
            .await
            .map_err(|e| self.io_error(e))?;

        debug!(path = %self.path.display(), watermark = %watermark, "Checkpoint saved");
        Ok(())
    }
}

/// Loads the stored watermark, falling back to `fallback` on a cold start.
///
/// A checkpoint that cannot be read is reported and treated like a cold start
/// rather than stopping the process.
pub async fn load_or_default(store: &dyn CheckpointStore, fallback: Watermark) -> Watermark {
    match store.load().await {
        Ok(Some(watermark)) => {
            info!(watermark = %watermark, "Resuming from stored checkpoint");
            watermark
        }
        Ok(None) => {
            info!(watermark = %fallback, "No checkpoint found, starting fresh");
            fallback
        }
        Err(e) => {
            error!(error = %e, watermark = %fallback, "Failed to load checkpoint, starting fresh");
            fallback
        }
    }
}
