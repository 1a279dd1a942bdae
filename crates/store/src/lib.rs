// crates/store/src/lib.rs
//! Concurrent in-memory registry for data-processing jobs.
//!
//! Provides:
//! - `JobStore` - registry indexed by id and by status, with the
//!   New → Processing → Completed transition protocol
//! - `LockCoordinator` - bounded-wait reader/writer lock with scoped guards
//! - `BackgroundDispatcher` - runs file processing off the request path
//! - `FileProcessor` - the processing collaborator, plus a simulated one

pub mod config;
pub mod dispatcher;
pub mod error;
pub mod lock;
pub mod processor;
pub mod store;
pub mod types;

pub use config::StoreConfig;
pub use dispatcher::BackgroundDispatcher;
pub use error::{LockTimeout, ProcessingError, StoreError, StoreResult};
pub use lock::{ExclusiveGuard, LockCoordinator, LockMode, SharedGuard};
pub use processor::{FileProcessor, SimulatedFileProcessor};
pub use store::{JobCounts, JobStore};
pub use types::{Job, JobId, JobStatus, Link, ParseStatusError};
