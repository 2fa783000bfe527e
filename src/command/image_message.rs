//! Flyweight for `OnUnavailableImage` responses.
use crate::command::flyweight::Flyweight;
use crate::concurrent::AtomicBuffer;
use crate::error::Result;
use crate::util::IndexT;
use std::mem::size_of;

/// Response sent when an image is no longer available on a subscription
#[repr(C, packed(4))]
pub struct ImageMessageDefn {
    correlation_id: i64,
    subscription_registration_id: i64,
    stream_id: i32,
    channel_length: i32,
}

const CHANNEL_LENGTH_OFFSET: IndexT = (size_of::<i64>() * 2 + size_of::<i32>()) as IndexT;

impl<A> Flyweight<A, ImageMessageDefn>
where
    A: AtomicBuffer,
{
    /// Correlation id originally assigned when the image became available,
    /// or `-1` if this image was never reported as available
    pub fn correlation_id(&self) -> i64 {
        self.get_struct().correlation_id
    }

    /// Registration id of the subscription that owned this image
    pub fn subscription_registration_id(&self) -> i64 {
        self.get_struct().subscription_registration_id
    }

    /// Stream identifier of the image
    pub fn stream_id(&self) -> i32 {
        self.get_struct().stream_id
    }

    /// Channel the image was received on. Not consumed by the conductor but kept
    /// for wire fidelity with the driver's broadcast.
    pub fn channel(&self) -> Result<&str> {
        self.string_get(CHANNEL_LENGTH_OFFSET)
    }
}

#[cfg(test)]
mod tests {
    use crate::command::flyweight::Flyweight;
    use crate::command::image_message::ImageMessageDefn;
    use crate::concurrent::AtomicBuffer;

    #[test]
    fn decodes_fields_written_by_driver() {
        let mut buffer = vec![0u8; 128];
        buffer.put_i64(0, 7).unwrap();
        buffer.put_i64(8, 3).unwrap();
        buffer.put_i32(16, 1001).unwrap();
        buffer.put_string(20, "aeron:udp?endpoint=localhost:40123").unwrap();

        let msg = Flyweight::new::<ImageMessageDefn>(buffer, 0).unwrap();
        assert_eq!(msg.correlation_id(), 7);
        assert_eq!(msg.subscription_registration_id(), 3);
        assert_eq!(msg.stream_id(), 1001);
        assert_eq!(msg.channel().unwrap(), "aeron:udp?endpoint=localhost:40123");
    }
}
