//! Time source for window and expiry calculations.
//!
//! # Responsibilities
//! - Supply monotonic time to the rate limiter and CSRF token service
//! - Allow tests to control time deterministically
//!
//! # Design Decisions
//! - Monotonic `Instant`, never wall-clock: window math must not jump
//!   backwards on NTP adjustments
//! - Injected as `Arc<dyn Clock>` so production and tests share one code path

use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Trait for supplying the current monotonic time.
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

/// Production clock backed by `Instant::now()`.
#[derive(Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Manually advanced clock for tests.
///
/// Starts at an arbitrary base instant; `advance` moves time forward.
#[derive(Debug)]
pub struct ManualClock {
    base: Instant,
    offset: Mutex<Duration>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            base: Instant::now(),
            offset: Mutex::new(Duration::ZERO),
        }
    }

    /// Move the clock forward by `delta`.
    pub fn advance(&self, delta: Duration) {
        let mut offset = self.offset.lock().expect("manual clock mutex poisoned");
        *offset += delta;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        let offset = self.offset.lock().expect("manual clock mutex poisoned");
        self.base + *offset
    }
}
