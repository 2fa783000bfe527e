//! Handle to a driver-allocated counter.
use crate::client_conductor::ConductorOps;
use crate::error::Result;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

struct CounterInner {
    registration_id: i64,
    counter_id: i32,
    is_closed: AtomicBool,
    conductor: Weak<dyn ConductorOps>,
}

/// A counter registered with the media driver's counters manager
#[derive(Clone)]
pub struct Counter(Arc<CounterInner>);

impl Counter {
    pub(crate) fn new(registration_id: i64, counter_id: i32, conductor: Weak<dyn ConductorOps>) -> Self {
        Counter(Arc::new(CounterInner {
            registration_id,
            counter_id,
            is_closed: AtomicBool::new(false),
            conductor,
        }))
    }

    /// Registration id assigned to this counter by the driver proxy
    pub fn registration_id(&self) -> i64 {
        self.0.registration_id
    }

    /// Driver-assigned counter identifier
    pub fn counter_id(&self) -> i32 {
        self.0.counter_id
    }

    /// Whether this counter has been released
    pub fn is_closed(&self) -> bool {
        self.0.is_closed.load(Ordering::Acquire)
    }

    /// Release this counter. A no-op if already closed.
    pub fn close(&self) -> Result<()> {
        if self.0.is_closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        if let Some(conductor) = self.0.conductor.upgrade() {
            conductor.release_counter(self.0.registration_id)?;
        }
        Ok(())
    }

    /// Mark this counter closed without a driver round trip, used when the
    /// conductor force-closes every registered resource.
    pub(crate) fn force_close(&self) {
        self.0.is_closed.store(true, Ordering::Release);
    }
}
