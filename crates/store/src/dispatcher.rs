// crates/store/src/dispatcher.rs
//! Fire-and-forget runner for file processing.

use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use crate::processor::FileProcessor;
use crate::types::JobId;

/// Runs the file processor for started jobs on background tasks.
///
/// Each dispatch spawns one tokio task holding a child of the dispatcher's
/// cancellation token. On success the task invokes the completion
/// continuation exactly once; on failure or cancellation the continuation is
/// never invoked and the failure is only logged.
pub struct BackgroundDispatcher {
    processor: Arc<dyn FileProcessor>,
    shutdown: CancellationToken,
    tracker: TaskTracker,
}

impl BackgroundDispatcher {
    pub fn new(processor: Arc<dyn FileProcessor>) -> Self {
        Self {
            processor,
            shutdown: CancellationToken::new(),
            tracker: TaskTracker::new(),
        }
    }

    /// Spawn processing for `file_path`. Returns immediately.
    ///
    /// Must be called from within a tokio runtime.
    pub fn dispatch<F, Fut>(&self, job_id: JobId, file_path: String, on_complete: F)
    where
        F: FnOnce(Vec<String>) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let processor = Arc::clone(&self.processor);
        let cancel = self.shutdown.child_token();

        self.tracker.spawn(async move {
            let started = Instant::now();
            match processor.process_file(&file_path, cancel).await {
                Ok(results) => {
                    tracing::debug!(
                        job_id = %job_id,
                        result_count = results.len(),
                        duration_ms = started.elapsed().as_millis() as u64,
                        "File processing finished"
                    );
                    on_complete(results).await;
                }
                Err(e) => {
                    let reason = if e.is_cancelled() { "cancelled" } else { "failed" };
                    metrics::counter!("job_processing_failures_total", "reason" => reason)
                        .increment(1);
                    // The job stays in Processing; callers only see this via polling.
                    tracing::warn!(
                        job_id = %job_id,
                        file_path = %file_path,
                        reason,
                        error = %e,
                        "File processing did not complete; job left in Processing"
                    );
                }
            }
        });
    }

    /// Number of dispatched tasks still running.
    pub fn in_flight(&self) -> usize {
        self.tracker.len()
    }

    /// Wait until every task dispatched so far has finished.
    ///
    /// After [`shutdown`](Self::shutdown) the tracker stays closed.
    pub async fn drain(&self) {
        self.tracker.close();
        self.tracker.wait().await;
        if !self.shutdown.is_cancelled() {
            self.tracker.reopen();
        }
    }

    /// Cancel all in-flight processing and wait for the tasks to end.
    ///
    /// Anything dispatched afterwards starts out cancelled.
    pub async fn shutdown(&self) {
        self.shutdown.cancel();
        self.tracker.close();
        self.tracker.wait().await;
        tracing::info!("Background dispatcher stopped");
    }

    pub fn is_shut_down(&self) -> bool {
        self.shutdown.is_cancelled()
    }
}
