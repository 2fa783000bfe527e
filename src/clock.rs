//! Clock abstractions used by the conductor's timeout checks.
//!
//! Kept as traits (rather than calling `SystemTime`/`Instant` directly) so
//! tests can advance time deterministically instead of racing real wall-clock
//! ticks, the same way buffer access is kept behind the `AtomicBuffer` trait
//! instead of calling `memmap` directly everywhere.

use std::time::{SystemTime, UNIX_EPOCH};

/// Monotonic nanosecond clock, used for all internal timeout arithmetic.
pub trait NanoClock: Send + Sync {
    /// Current time in nanoseconds, from an arbitrary but monotonically
    /// increasing origin.
    fn nanos(&self) -> i64;
}

/// Wall-clock millisecond clock, used only to compare against the driver's
/// published keepalive timestamp (which is itself wall-clock).
pub trait EpochClock: Send + Sync {
    /// Current time in milliseconds since the Unix epoch.
    fn epoch_millis(&self) -> i64;
}

/// Default `NanoClock` backed by `std::time::Instant`.
#[derive(Default, Clone, Copy)]
pub struct SystemNanoClock;

impl NanoClock for SystemNanoClock {
    fn nanos(&self) -> i64 {
        // `Instant` has no fixed epoch, but this crate only ever compares two
        // `nanos()` readings against each other, never against a literal.
        use std::sync::OnceLock;
        use std::time::Instant;
        static ORIGIN: OnceLock<Instant> = OnceLock::new();
        let origin = *ORIGIN.get_or_init(Instant::now);
        origin.elapsed().as_nanos() as i64
    }
}

/// Default `EpochClock` backed by `std::time::SystemTime`.
#[derive(Default, Clone, Copy)]
pub struct SystemEpochClock;

impl EpochClock for SystemEpochClock {
    fn epoch_millis(&self) -> i64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("system clock is before the Unix epoch")
            .as_millis() as i64
    }
}

/// A clock that only advances when told to, so conductor timeout tests don't
/// race real wall-clock time. Implements both clock traits over the same
/// counter; a given test only ever uses one trait or the other, never both
/// at once, so sharing the representation is harmless.
#[cfg(test)]
pub struct ManualClock(std::sync::atomic::AtomicI64);

#[cfg(test)]
impl ManualClock {
    pub fn new(start: i64) -> std::sync::Arc<Self> {
        std::sync::Arc::new(ManualClock(std::sync::atomic::AtomicI64::new(start)))
    }

    pub fn advance(&self, delta: i64) {
        self.0.fetch_add(delta, std::sync::atomic::Ordering::SeqCst);
    }
}

#[cfg(test)]
impl NanoClock for ManualClock {
    fn nanos(&self) -> i64 {
        self.0.load(std::sync::atomic::Ordering::SeqCst)
    }
}

#[cfg(test)]
impl EpochClock for ManualClock {
    fn epoch_millis(&self) -> i64 {
        self.0.load(std::sync::atomic::Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nano_clock_is_monotonic() {
        let clock = SystemNanoClock;
        let a = clock.nanos();
        let b = clock.nanos();
        assert!(b >= a);
    }

    #[test]
    fn epoch_clock_is_plausible() {
        let clock = SystemEpochClock;
        // Any time after 2020-01-01 in milliseconds.
        assert!(clock.epoch_millis() > 1_577_836_800_000);
    }
}
