//! Fixed-window rate limiting.
//!
//! # Responsibilities
//! - Track request counts per identity (IP, or IP + operation name)
//! - Answer allow/deny with remaining quota and reset time
//! - Sweep stale windows on a background interval
//!
//! # Design Decisions
//! - Fixed window, not sliding: a window boundary permits up to 2x the
//!   nominal limit in a burst. Accepted trade-off; callers that need strict
//!   pacing should use a tighter limit.
//! - Sharded concurrent map (`DashMap`): the entry API holds the shard lock
//!   across the check-and-increment, so concurrent requests for one identity
//!   cannot race past the limit.
//! - State is process-local. Horizontally scaled deployments enforce the
//!   limit per process; a shared store can replace the map behind `check`
//!   without changing the contract.

use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::clock::Clock;
use crate::lifecycle::Shutdown;
use crate::observability::metrics;

/// Outcome of a rate-limit check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitDecision {
    pub allowed: bool,
    /// The configured limit the identity was checked against.
    pub limit: u32,
    /// Requests left in the current window (0 when denied).
    pub remaining: u32,
    /// Time until the current window resets.
    pub reset_in: Duration,
}

impl RateLimitDecision {
    /// Seconds until the window resets, rounded up so a `Retry-After` of
    /// this many seconds always lands in the next window.
    pub fn reset_secs(&self) -> u64 {
        let secs = self.reset_in.as_secs();
        if self.reset_in.subsec_nanos() > 0 {
            secs + 1
        } else {
            secs.max(1)
        }
    }
}

/// Per-identity counter for the current window.
#[derive(Debug)]
struct WindowEntry {
    count: u32,
    window_reset_at: Instant,
}

/// In-memory fixed-window rate limiter.
///
/// Limit and window parameters are supplied per call; route-specific policy
/// lives in the pipeline, not here.
pub struct RateLimiter {
    entries: DashMap<String, WindowEntry>,
    clock: Arc<dyn Clock>,
}

impl RateLimiter {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: DashMap::new(),
            clock,
        }
    }

    /// Record one request for `identity` and decide whether it is allowed.
    ///
    /// Never fails: an exhausted limit is a normal denied decision, not an
    /// error.
    pub fn check(&self, identity: &str, limit: u32, window: Duration) -> RateLimitDecision {
        let now = self.clock.now();

        // The entry guard holds the shard lock for this key, making the
        // reset-check-increment sequence atomic per identity.
        let mut entry = self
            .entries
            .entry(identity.to_string())
            .or_insert_with(|| WindowEntry {
                count: 0,
                window_reset_at: now + window,
            });

        if now >= entry.window_reset_at {
            entry.count = 0;
            entry.window_reset_at = now + window;
        }

        entry.count += 1;
        let reset_in = entry.window_reset_at.saturating_duration_since(now);

        if entry.count > limit {
            RateLimitDecision {
                allowed: false,
                limit,
                remaining: 0,
                reset_in,
            }
        } else {
            RateLimitDecision {
                allowed: true,
                limit,
                remaining: limit - entry.count,
                reset_in,
            }
        }
    }

    /// Remove entries whose window has already expired.
    ///
    /// Returns the number of entries removed.
    pub fn sweep(&self) -> usize {
        let now = self.clock.now();
        let before = self.entries.len();
        self.entries.retain(|_, entry| now <= entry.window_reset_at);
        before - self.entries.len()
    }

    /// Number of identities currently tracked.
    pub fn tracked(&self) -> usize {
        self.entries.len()
    }

    /// Spawn the background sweep task.
    ///
    /// The task ticks on `interval` and exits when the shutdown signal fires.
    pub fn spawn_sweeper(self: Arc<Self>, interval: Duration, shutdown: &Shutdown) -> JoinHandle<()> {
        let mut rx = shutdown.subscribe();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let removed = self.sweep();
                        if removed > 0 {
                            tracing::debug!(removed, tracked = self.tracked(), "Swept stale rate-limit windows");
                            metrics::record_swept("rate_limit", removed as u64);
                        }
                    }
                    _ = rx.recv() => {
                        tracing::debug!("Rate-limit sweeper stopping");
                        break;
                    }
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;

    fn limiter() -> (Arc<ManualClock>, RateLimiter) {
        let clock = Arc::new(ManualClock::new());
        let limiter = RateLimiter::new(clock.clone());
        (clock, limiter)
    }

    #[test]
    fn allows_up_to_limit_then_denies() {
        let (_clock, limiter) = limiter();
        let window = Duration::from_secs(900);

        for i in 0..20 {
            let d = limiter.check("1.2.3.4:signin", 20, window);
            assert!(d.allowed, "request {} should be allowed", i + 1);
            assert_eq!(d.remaining, 19 - i);
        }

        let d = limiter.check("1.2.3.4:signin", 20, window);
        assert!(!d.allowed);
        assert_eq!(d.remaining, 0);
        assert!(d.reset_secs() > 0);
    }

    #[test]
    fn window_boundary_starts_fresh() {
        let (clock, limiter) = limiter();
        let window = Duration::from_secs(60);

        for _ in 0..3 {
            limiter.check("ip", 3, window);
        }
        assert!(!limiter.check("ip", 3, window).allowed);

        // Just past the reset boundary: fresh window.
        clock.advance(Duration::from_secs(61));
        let d = limiter.check("ip", 3, window);
        assert!(d.allowed);
        assert_eq!(d.remaining, 2);
    }

    #[test]
    fn identities_are_independent() {
        let (_clock, limiter) = limiter();
        let window = Duration::from_secs(60);

        limiter.check("a", 1, window);
        assert!(!limiter.check("a", 1, window).allowed);
        assert!(limiter.check("b", 1, window).allowed);
    }

    #[test]
    fn sweep_removes_only_expired_windows() {
        let (clock, limiter) = limiter();

        limiter.check("short", 5, Duration::from_secs(10));
        limiter.check("long", 5, Duration::from_secs(120));
        assert_eq!(limiter.tracked(), 2);

        clock.advance(Duration::from_secs(30));
        assert_eq!(limiter.sweep(), 1);
        assert_eq!(limiter.tracked(), 1);

        // The surviving window still has its count.
        let d = limiter.check("long", 5, Duration::from_secs(120));
        assert_eq!(d.remaining, 3);
    }

    #[test]
    fn concurrent_checks_never_exceed_limit() {
        let clock = Arc::new(ManualClock::new());
        let limiter = Arc::new(RateLimiter::new(clock));
        let limit = 50u32;

        let handles: Vec<_> = (0..100)
            .map(|_| {
                let limiter = limiter.clone();
                std::thread::spawn(move || {
                    limiter
                        .check("contended", limit, Duration::from_secs(60))
                        .allowed
                })
            })
            .collect();

        let allowed = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|allowed| *allowed)
            .count();
        assert_eq!(allowed, limit as usize);
    }

    #[test]
    fn reset_secs_rounds_up() {
        let d = RateLimitDecision {
            allowed: false,
            limit: 10,
            remaining: 0,
            reset_in: Duration::from_millis(1500),
        };
        assert_eq!(d.reset_secs(), 2);
    }
}
