//! Flyweight for `OnNewSubscription` responses.
use crate::command::flyweight::Flyweight;
use crate::concurrent::AtomicBuffer;

/// Response sent once a subscription has been successfully registered with the driver
#[repr(C, packed(4))]
pub struct SubscriptionReadyDefn {
    correlation_id: i64,
    channel_status_indicator_id: i32,
}

impl<A> Flyweight<A, SubscriptionReadyDefn>
where
    A: AtomicBuffer,
{
    /// Correlation id of the addSubscription command
    pub fn correlation_id(&self) -> i64 {
        self.get_struct().correlation_id
    }

    /// Counter id tracking the channel endpoint's status
    pub fn channel_status_indicator_id(&self) -> i32 {
        self.get_struct().channel_status_indicator_id
    }
}
