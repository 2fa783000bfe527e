//! Flyweight for commands that remove a previously registered resource by its
//! registration id: removePublication, removeSubscription, removeCounter.
use crate::command::correlated_message::CorrelatedMessageDefn;
use crate::command::flyweight::Flyweight;
use crate::concurrent::AtomicBuffer;

/// Control message to remove a previously registered resource
///
/// ```text
///  0                   1                   2                   3
///  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |                         Client ID                             |
/// |                                                               |
/// +---------------------------------------------------------------+
/// |                       Correlation ID                          |
/// |                                                               |
/// +---------------------------------------------------------------+
/// |                       Registration ID                         |
/// |                                                               |
/// +---------------------------------------------------------------+
/// ```
#[repr(C, packed(4))]
pub struct RemoveMessageDefn {
    correlated_message: CorrelatedMessageDefn,
    registration_id: i64,
}

impl<A> Flyweight<A, RemoveMessageDefn>
where
    A: AtomicBuffer,
{
    /// Retrieve the client identifier associated with this message
    pub fn client_id(&self) -> i64 {
        self.get_struct().correlated_message.client_id
    }

    /// Set the client identifier for this message
    pub fn put_client_id(&mut self, value: i64) -> &mut Self {
        self.get_struct_mut().correlated_message.client_id = value;
        self
    }

    /// Retrieve the correlation identifier associated with this message
    pub fn correlation_id(&self) -> i64 {
        self.get_struct().correlated_message.correlation_id
    }

    /// Set the correlation identifier for this message
    pub fn put_correlation_id(&mut self, value: i64) -> &mut Self {
        self.get_struct_mut().correlated_message.correlation_id = value;
        self
    }

    /// Retrieve the registration id of the resource to remove
    pub fn registration_id(&self) -> i64 {
        self.get_struct().registration_id
    }

    /// Set the registration id of the resource to remove
    pub fn put_registration_id(&mut self, value: i64) -> &mut Self {
        self.get_struct_mut().registration_id = value;
        self
    }
}

#[cfg(test)]
mod tests {
    use crate::command::flyweight::Flyweight;
    use crate::command::remove_message::RemoveMessageDefn;

    #[test]
    fn round_trips_ids() {
        let buffer = vec![0u8; 64];
        let mut msg = Flyweight::new::<RemoveMessageDefn>(buffer, 0).unwrap();

        msg.put_client_id(1).put_correlation_id(2).put_registration_id(99);

        assert_eq!(msg.client_id(), 1);
        assert_eq!(msg.correlation_id(), 2);
        assert_eq!(msg.registration_id(), 99);
    }
}
