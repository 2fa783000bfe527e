//! Flyweight for `OnNewCounter`, `OnAvailableCounter` and `OnUnavailableCounter`
//! responses. All three share an `i64` followed by an `i32` layout; only the
//! meaning of the leading field changes with the response kind, so both
//! accessors are exposed over the same field.
use crate::command::flyweight::Flyweight;
use crate::concurrent::AtomicBuffer;

/// Response reporting a counter was added, or became available/unavailable
#[repr(C, packed(4))]
pub struct CounterUpdateDefn {
    id: i64,
    counter_id: i32,
}

impl<A> Flyweight<A, CounterUpdateDefn>
where
    A: AtomicBuffer,
{
    /// Correlation id of the addCounter command, valid for `OnNewCounter`
    pub fn correlation_id(&self) -> i64 {
        self.get_struct().id
    }

    /// Registration id of the counter, valid for `OnAvailableCounter` /
    /// `OnUnavailableCounter`
    pub fn registration_id(&self) -> i64 {
        self.get_struct().id
    }

    /// Driver-assigned counter identifier
    pub fn counter_id(&self) -> i32 {
        self.get_struct().counter_id
    }
}
