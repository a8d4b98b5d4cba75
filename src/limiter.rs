//! Sliding-window admission control.
//!
//! Two windows of equal width: one global, one per operation. Admission
//! records a timestamp in both; denial computes how long until the oldest
//! timestamp leaves the violating window. The limiter never touches
//! storage.

use std::collections::{HashMap, VecDeque};
use std::time::{Duration, Instant};

use crate::error::MemoryError;

/// Width of both sliding windows.
pub const WINDOW: Duration = Duration::from_secs(60);
/// Cap across all operations within one window.
pub const GLOBAL_CAP: usize = 300;
/// Denials always report at least this much wait.
pub const MIN_RETRY_AFTER_MS: u64 = 1000;
/// How often the cooperative cleanup task prunes stale timestamps.
pub const CLEANUP_INTERVAL: Duration = Duration::from_secs(300);

/// Per-operation cap within one window.
pub fn operation_cap(operation: &str) -> usize {
    match operation {
        "remember" | "save_to_layer" => 60,
        "recall" => 120,
        "query_layer" => 100,
        "get_status" | "get_stats" => 30,
        _ => 60,
    }
}

pub struct RateLimiter {
    window: Duration,
    global_cap: usize,
    global: VecDeque<Instant>,
    per_op: HashMap<String, VecDeque<Instant>>,
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(WINDOW, GLOBAL_CAP)
    }
}

impl RateLimiter {
    pub fn new(window: Duration, global_cap: usize) -> Self {
        Self {
            window,
            global_cap,
            global: VecDeque::new(),
            per_op: HashMap::new(),
        }
    }

    /// Admit or deny a request for `operation` at the current instant.
    pub fn check(&mut self, operation: &str) -> Result<(), MemoryError> {
        self.check_at(operation, Instant::now())
    }

    fn check_at(&mut self, operation: &str, now: Instant) -> Result<(), MemoryError> {
        let window = self.window;
        prune(&mut self.global, now, window);
        let op_window = self.per_op.entry(operation.to_string()).or_default();
        prune(op_window, now, window);

        if self.global.len() >= self.global_cap {
            let retry = retry_after_ms(self.global.front(), now, window);
            return Err(denied(operation, retry));
        }
        if op_window.len() >= operation_cap(operation) {
            let retry = retry_after_ms(op_window.front(), now, window);
            return Err(denied(operation, retry));
        }

        self.global.push_back(now);
        op_window.push_back(now);
        Ok(())
    }

    /// Drop timestamps that fell out of the window; bounds memory between
    /// bursts. Run from the cooperative cleanup timer.
    pub fn cleanup(&mut self) {
        let now = Instant::now();
        let window = self.window;
        prune(&mut self.global, now, window);
        for queue in self.per_op.values_mut() {
            prune(queue, now, window);
        }
        self.per_op.retain(|_, queue| !queue.is_empty());
    }
}

fn prune(queue: &mut VecDeque<Instant>, now: Instant, window: Duration) {
    while let Some(front) = queue.front() {
        if now.duration_since(*front) > window {
            queue.pop_front();
        } else {
            break;
        }
    }
}

fn retry_after_ms(oldest: Option<&Instant>, now: Instant, window: Duration) -> u64 {
    let remaining = oldest
        .map(|oldest| (*oldest + window).saturating_duration_since(now))
        .unwrap_or(window);
    (remaining.as_millis() as u64).max(MIN_RETRY_AFTER_MS)
}

fn denied(operation: &str, retry_after_ms: u64) -> MemoryError {
    MemoryError::RateLimited {
        operation: operation.to_string(),
        retry_after_ms,
    }
}
