// crates/store/src/processor.rs
//! The file-processing collaborator.

use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::ProcessingError;

/// Processes the file a job points at.
///
/// Implementations run on a background task with no registry lock held, and
/// should return [`ProcessingError::Cancelled`] promptly once `cancel` fires.
#[async_trait]
pub trait FileProcessor: Send + Sync + 'static {
    async fn process_file(
        &self,
        file_path: &str,
        cancel: CancellationToken,
    ) -> Result<Vec<String>, ProcessingError>;
}

/// Stand-in processor: waits for a fixed delay, then yields fixed results.
#[derive(Debug, Clone)]
pub struct SimulatedFileProcessor {
    delay: Duration,
    results: Vec<String>,
}

impl SimulatedFileProcessor {
    pub const DEFAULT_DELAY: Duration = Duration::from_millis(500);

    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            results: vec!["test1".to_string(), "test2".to_string()],
        }
    }

    pub fn with_results<I, S>(mut self, results: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.results = results.into_iter().map(Into::into).collect();
        self
    }
}

impl Default for SimulatedFileProcessor {
    fn default() -> Self {
        Self::new(Self::DEFAULT_DELAY)
    }
}

#[async_trait]
impl FileProcessor for SimulatedFileProcessor {
    async fn process_file(
        &self,
        file_path: &str,
        cancel: CancellationToken,
    ) -> Result<Vec<String>, ProcessingError> {
        tracing::debug!(file_path, delay_ms = self.delay.as_millis() as u64, "Simulating file processing");
        tokio::select! {
            _ = cancel.cancelled() => Err(ProcessingError::Cancelled {
                path: file_path.to_string(),
            }),
            _ = tokio::time::sleep(self.delay) => Ok(self.results.clone()),
        }
    }
}
