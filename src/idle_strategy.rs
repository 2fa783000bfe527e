//! Idle strategies applied between successive `do_work` calls on an agent
//! runner, so a conductor with nothing to do doesn't spin a core at 100%.
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::thread;
use std::time::Duration;

/// Strategy for idling a thread when its last unit of work reported nothing done
pub trait IdleStrategy: Send + Sync {
    /// Called after each `do_work`. `work_count` is the amount of work
    /// performed in the preceding call; zero means nothing was done.
    fn idle(&self, work_count: i32);

    /// Reset any accumulated backoff state. Called whenever work is found
    /// again after a period of idling.
    fn reset(&self) {}
}

/// Idle strategy that spins briefly, then yields the thread, then sleeps for
/// progressively longer (capped) intervals the longer no work is found.
/// Tracks how many consecutive idle calls it has seen so the park duration
/// can double on every call past the spin/yield phases, capped at
/// `max_park_nanos`.
pub struct BackoffIdleStrategy {
    max_spins: u32,
    max_yields: u32,
    min_park_nanos: u64,
    max_park_nanos: u64,
    idle_count: AtomicU32,
    park_nanos: AtomicU64,
}

impl BackoffIdleStrategy {
    /// Build a new backoff idle strategy from its spin/yield/park parameters
    pub fn new(max_spins: u32, max_yields: u32, min_park_nanos: u64, max_park_nanos: u64) -> Self {
        BackoffIdleStrategy {
            max_spins,
            max_yields,
            min_park_nanos,
            max_park_nanos,
            idle_count: AtomicU32::new(0),
            park_nanos: AtomicU64::new(min_park_nanos),
        }
    }
}

impl Default for BackoffIdleStrategy {
    fn default() -> Self {
        BackoffIdleStrategy::new(10, 10, 1_000, 1_000_000)
    }
}

impl IdleStrategy for BackoffIdleStrategy {
    fn idle(&self, work_count: i32) {
        if work_count > 0 {
            self.reset();
            return;
        }

        let count = self.idle_count.fetch_add(1, Ordering::Relaxed);

        if count < self.max_spins {
            std::hint::spin_loop();
            return;
        }
        if count < self.max_spins + self.max_yields {
            thread::yield_now();
            return;
        }

        let park = self.park_nanos.load(Ordering::Relaxed);
        thread::sleep(Duration::from_nanos(park));
        self.park_nanos.store((park * 2).min(self.max_park_nanos), Ordering::Relaxed);
    }

    fn reset(&self) {
        self.idle_count.store(0, Ordering::Relaxed);
        self.park_nanos.store(self.min_park_nanos, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn idle_with_work_returns_immediately() {
        let strategy = BackoffIdleStrategy::default();
        strategy.idle(1);
    }

    #[test]
    fn idle_with_no_work_does_not_panic() {
        let strategy = BackoffIdleStrategy::new(1, 1, 1, 1000);
        strategy.idle(0);
    }
}
