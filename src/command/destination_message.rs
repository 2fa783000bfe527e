//! Flyweight implementation for the addDestination, removeDestination, addRcvDestination
//! and removeRcvDestination commands. All four share the same wire layout; only the
//! `ClientCommand` tag differs and whether `registration_id` refers to a publication
//! or a subscription.
use crate::command::correlated_message::CorrelatedMessageDefn;
use crate::command::flyweight::Flyweight;
use crate::concurrent::AtomicBuffer;
use crate::error::Result;
use crate::util::IndexT;
use std::mem::size_of;

/// Control message to add or remove a manual destination on a publication or
/// subscription's underlying channel endpoint
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
/// |                       Channel Length                          |
/// +---------------------------------------------------------------+
/// |                          Channel                             ...
///...                                                              |
/// +---------------------------------------------------------------+
/// ```
#[repr(C, packed(4))]
pub struct DestinationMessageDefn {
    correlated_message: CorrelatedMessageDefn,
    registration_id: i64,
    channel_length: i32,
}

const CHANNEL_LENGTH_OFFSET: IndexT = (size_of::<CorrelatedMessageDefn>() + size_of::<i64>()) as IndexT;

impl<A> Flyweight<A, DestinationMessageDefn>
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

    /// Retrieve the correlation identifier associated with this message.
    /// Will uniquely identify a command and response pair.
    pub fn correlation_id(&self) -> i64 {
        self.get_struct().correlated_message.correlation_id
    }

    /// Set the correlation identifier for this message
    pub fn put_correlation_id(&mut self, value: i64) -> &mut Self {
        self.get_struct_mut().correlated_message.correlation_id = value;
        self
    }

    /// Retrieve the registration id of the publication or subscription this
    /// destination command applies to
    pub fn registration_id(&self) -> i64 {
        self.get_struct().registration_id
    }

    /// Set the registration id of the publication or subscription this
    /// destination command applies to
    pub fn put_registration_id(&mut self, value: i64) -> &mut Self {
        self.get_struct_mut().registration_id = value;
        self
    }

    /// Retrieve the destination channel
    pub fn channel(&self) -> Result<&str> {
        self.string_get(CHANNEL_LENGTH_OFFSET)
    }

    /// Set the destination channel
    pub fn put_channel(&mut self, value: &str) -> Result<&mut Self> {
        self.string_put(CHANNEL_LENGTH_OFFSET, value).map(|_| self)
    }

    /// Get the total byte length of this destination command
    pub fn length(&self) -> IndexT {
        size_of::<DestinationMessageDefn>() as IndexT + self.get_struct().channel_length
    }
}

#[cfg(test)]
mod tests {
    use crate::command::destination_message::DestinationMessageDefn;
    use crate::command::flyweight::Flyweight;

    #[test]
    fn round_trips_channel_and_ids() {
        let buffer = vec![0u8; 512];
        let mut msg = Flyweight::new::<DestinationMessageDefn>(buffer, 0).unwrap();

        msg.put_client_id(1).put_correlation_id(2).put_registration_id(99);
        msg.put_channel("aeron:udp?endpoint=localhost:40124").unwrap();

        assert_eq!(msg.client_id(), 1);
        assert_eq!(msg.correlation_id(), 2);
        assert_eq!(msg.registration_id(), 99);
        assert_eq!(msg.channel().unwrap(), "aeron:udp?endpoint=localhost:40124");
    }
}
