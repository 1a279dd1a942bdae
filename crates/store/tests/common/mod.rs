//! Test processors shared by the store integration tests.
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use datajobs_store::{FileProcessor, JobStore, ProcessingError, StoreConfig};
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;

/// Holds every processing call until the test releases it.
pub struct GatedProcessor {
    gate: Semaphore,
    calls: AtomicUsize,
    results: Vec<String>,
}

impl GatedProcessor {
    pub fn new(results: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            gate: Semaphore::new(0),
            calls: AtomicUsize::new(0),
            results: results.iter().map(|s| s.to_string()).collect(),
        })
    }

    /// Let `n` pending (or future) calls finish.
    pub fn release(&self, n: usize) {
        self.gate.add_permits(n);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl FileProcessor for GatedProcessor {
    async fn process_file(
        &self,
        file_path: &str,
        cancel: CancellationToken,
    ) -> Result<Vec<String>, ProcessingError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::select! {
            _ = cancel.cancelled() => Err(ProcessingError::Cancelled { path: file_path.to_string() }),
            permit = self.gate.acquire() => {
                permit.map_err(|e| ProcessingError::failed(file_path, e.to_string()))?.forget();
                Ok(self.results.clone())
            }
        }
    }
}

/// Holds each call until its own file path is released, then returns the
/// path as the only result.
#[derive(Default)]
pub struct PathGatedProcessor {
    gates: Mutex<HashMap<String, Arc<Semaphore>>>,
}

impl PathGatedProcessor {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn gate(&self, file_path: &str) -> Arc<Semaphore> {
        let mut gates = self.gates.lock().unwrap();
        gates
            .entry(file_path.to_string())
            .or_insert_with(|| Arc::new(Semaphore::new(0)))
            .clone()
    }

    pub fn release(&self, file_path: &str) {
        self.gate(file_path).add_permits(1);
    }
}

#[async_trait]
impl FileProcessor for PathGatedProcessor {
    async fn process_file(
        &self,
        file_path: &str,
        cancel: CancellationToken,
    ) -> Result<Vec<String>, ProcessingError> {
        let gate = self.gate(file_path);
        tokio::select! {
            _ = cancel.cancelled() => Err(ProcessingError::Cancelled { path: file_path.to_string() }),
            permit = gate.acquire() => {
                permit.map_err(|e| ProcessingError::failed(file_path, e.to_string()))?.forget();
                Ok(vec![file_path.to_string()])
            }
        }
    }
}

/// Fails every call.
pub struct FailingProcessor;

#[async_trait]
impl FileProcessor for FailingProcessor {
    async fn process_file(
        &self,
        file_path: &str,
        _cancel: CancellationToken,
    ) -> Result<Vec<String>, ProcessingError> {
        Err(ProcessingError::failed(file_path, "corrupt input"))
    }
}

pub fn store_with(processor: Arc<dyn FileProcessor>) -> Arc<JobStore> {
    JobStore::new(processor, StoreConfig::with_lock_timeout(Duration::from_secs(2)))
}
