// crates/store/src/lock.rs
//! Bounded-wait reader/writer lock with scoped guards.
//!
//! [`LockCoordinator`] wraps a `tokio::sync::RwLock` and gives up after a
//! caller-supplied timeout instead of waiting forever. Guards release the lock
//! when dropped, so every exit path (early `?` returns, panics unwinding
//! through the task) gives the lock back.
//!
//! The lock is not re-entrant. A task that already holds a guard must not
//! call `acquire_*` on the same coordinator again: the second call waits
//! behind the first and fails with [`LockTimeout`].

use std::fmt;
use std::ops::{Deref, DerefMut};
use std::time::{Duration, Instant};

use tokio::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::error::LockTimeout;

/// Which side of the lock a guard holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LockMode {
    Shared,
    Exclusive,
}

impl LockMode {
    pub fn as_str(self) -> &'static str {
        match self {
            LockMode::Shared => "shared",
            LockMode::Exclusive => "exclusive",
        }
    }
}

impl fmt::Display for LockMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reader/writer lock whose acquisitions fail after a bounded wait.
pub struct LockCoordinator<T> {
    lock: RwLock<T>,
}

impl<T> LockCoordinator<T> {
    pub fn new(value: T) -> Self {
        Self {
            lock: RwLock::new(value),
        }
    }

    /// Acquire shared access. Any number of shared holders may coexist.
    pub async fn acquire_shared(&self, timeout: Duration) -> Result<SharedGuard<'_, T>, LockTimeout> {
        match tokio::time::timeout(timeout, self.lock.read()).await {
            Ok(guard) => Ok(SharedGuard {
                guard,
                acquired_at: Instant::now(),
            }),
            Err(_) => Err(timed_out(LockMode::Shared, timeout)),
        }
    }

    /// Acquire exclusive access, excluding all shared and exclusive holders.
    pub async fn acquire_exclusive(
        &self,
        timeout: Duration,
    ) -> Result<ExclusiveGuard<'_, T>, LockTimeout> {
        // A timed-out acquire drops the pending future, which leaves the
        // lock's wait queue without taking any permits.
        match tokio::time::timeout(timeout, self.lock.write()).await {
            Ok(guard) => Ok(ExclusiveGuard {
                guard,
                acquired_at: Instant::now(),
            }),
            Err(_) => Err(timed_out(LockMode::Exclusive, timeout)),
        }
    }
}

fn timed_out(mode: LockMode, timeout: Duration) -> LockTimeout {
    metrics::counter!("job_store_lock_timeouts_total", "mode" => mode.as_str()).increment(1);
    tracing::warn!(mode = %mode, timeout_ms = timeout.as_millis() as u64, "Lock acquisition timed out");
    LockTimeout { mode, timeout }
}

fn record_hold(mode: LockMode, acquired_at: Instant) {
    metrics::histogram!("job_store_lock_hold_seconds", "mode" => mode.as_str())
        .record(acquired_at.elapsed().as_secs_f64());
}

/// Scoped shared access. Released on drop.
pub struct SharedGuard<'a, T> {
    guard: RwLockReadGuard<'a, T>,
    acquired_at: Instant,
}

impl<T> Deref for SharedGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.guard
    }
}

impl<T> Drop for SharedGuard<'_, T> {
    fn drop(&mut self) {
        record_hold(LockMode::Shared, self.acquired_at);
    }
}

/// Scoped exclusive access. Released on drop.
pub struct ExclusiveGuard<'a, T> {
    guard: RwLockWriteGuard<'a, T>,
    acquired_at: Instant,
}

impl<T> Deref for ExclusiveGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.guard
    }
}

impl<T> DerefMut for ExclusiveGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        &mut self.guard
    }
}

impl<T> Drop for ExclusiveGuard<'_, T> {
    fn drop(&mut self) {
        record_hold(LockMode::Exclusive, self.acquired_at);
    }
}
