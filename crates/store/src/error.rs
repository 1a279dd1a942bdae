// crates/store/src/error.rs
use std::time::Duration;

use thiserror::Error;

use crate::lock::LockMode;
use crate::types::{JobId, JobStatus};

/// The lock could not be acquired within its bounded wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("Timed out after {timeout:?} waiting for {mode} lock")]
pub struct LockTimeout {
    pub mode: LockMode,
    pub timeout: Duration,
}

/// Errors returned by [`crate::JobStore`] operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("Job not found: {0}")]
    JobNotFound(JobId),

    #[error("Job already exists: {0}")]
    DuplicateJob(JobId),

    /// The status index has no bucket for a status the identity index claims.
    /// The registry is in an invalid state for this job.
    #[error("Status index corrupt: job {id} has status {status} but its bucket is missing or inconsistent")]
    StatusIndexCorrupt { id: JobId, status: JobStatus },

    #[error("Invalid status transition for job {id}: {from} -> {to}")]
    InvalidTransition {
        id: JobId,
        from: JobStatus,
        to: JobStatus,
    },

    #[error(transparent)]
    LockTimeout(#[from] LockTimeout),
}

impl StoreError {
    /// Whether the caller may retry the same call unchanged.
    pub fn is_retryable(&self) -> bool {
        matches!(self, StoreError::LockTimeout(_))
    }
}

/// Failure of the opaque file-processing operation.
///
/// Never rolls the job back: a job whose processing fails stays in
/// `Processing`.
#[derive(Debug, Error)]
pub enum ProcessingError {
    #[error("Processing of {path} was cancelled")]
    Cancelled { path: String },

    #[error("Processing of {path} failed: {message}")]
    Failed { path: String, message: String },
}

impl ProcessingError {
    pub fn failed(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Failed {
            path: path.into(),
            message: message.into(),
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, ProcessingError::Cancelled { .. })
    }
}

pub type StoreResult<T> = Result<T, StoreError>;
