//! Flyweight for `OnAvailableImage` responses.
use crate::command::flyweight::Flyweight;
use crate::concurrent::AtomicBuffer;
use crate::error::Result;
use crate::util::IndexT;
use std::mem::size_of;

/// Response sent when a new image becomes available on an existing subscription
#[repr(C, packed(4))]
pub struct ImageBuffersReadyDefn {
    correlation_id: i64,
    session_id: i32,
    stream_id: i32,
    subscriber_position_id: i32,
    subscription_registration_id: i64,
    log_file_name_length: i32,
}

const LOG_FILE_NAME_LENGTH_OFFSET: IndexT =
    (size_of::<i64>() + size_of::<i32>() * 3 + size_of::<i64>()) as IndexT;

impl<A> Flyweight<A, ImageBuffersReadyDefn>
where
    A: AtomicBuffer,
{
    /// Correlation id of the addSubscription command that is gaining this image,
    /// or `-1` if the image appeared on an already-registered subscription
    pub fn correlation_id(&self) -> i64 {
        self.get_struct().correlation_id
    }

    /// Session identifier of the publisher owning this image
    pub fn session_id(&self) -> i32 {
        self.get_struct().session_id
    }

    /// Stream identifier of the image
    pub fn stream_id(&self) -> i32 {
        self.get_struct().stream_id
    }

    /// Counter id tracking the subscriber's consumption position for this image
    pub fn subscriber_position_id(&self) -> i32 {
        self.get_struct().subscriber_position_id
    }

    /// Registration id of the subscription this image belongs to
    pub fn subscription_registration_id(&self) -> i64 {
        self.get_struct().subscription_registration_id
    }

    /// Name of the memory-mapped log file backing this image's term buffers
    pub fn log_file_name(&self) -> Result<&str> {
        self.string_get(LOG_FILE_NAME_LENGTH_OFFSET)
    }

    /// Human readable identity of the image's source, trailing the log file name
    pub fn source_identity(&self) -> Result<&str> {
        let log_file_name = self.log_file_name()?;
        let source_identity_offset =
            LOG_FILE_NAME_LENGTH_OFFSET + size_of::<i32>() as IndexT + log_file_name.len() as IndexT;
        self.string_get(source_identity_offset)
    }
}

#[cfg(test)]
mod tests {
    use crate::command::flyweight::Flyweight;
    use crate::command::image_buffers_ready::ImageBuffersReadyDefn;
    use crate::concurrent::AtomicBuffer;

    #[test]
    fn decodes_fields_written_by_driver() {
        let mut buffer = vec![0u8; 256];
        buffer.put_i64(0, 7).unwrap();
        buffer.put_i32(8, 11).unwrap();
        buffer.put_i32(12, 1001).unwrap();
        buffer.put_i32(16, 4).unwrap();
        buffer.put_i64(20, 3).unwrap();
        let log_name = "/dev/shm/aeron/1001-11.logbuffer";
        let written = buffer.put_string(28, log_name).unwrap();
        buffer
            .put_string(28 + 4 + written, "udp://127.0.0.1:40123")
            .unwrap();

        let msg = Flyweight::new::<ImageBuffersReadyDefn>(buffer, 0).unwrap();
        assert_eq!(msg.correlation_id(), 7);
        assert_eq!(msg.session_id(), 11);
        assert_eq!(msg.stream_id(), 1001);
        assert_eq!(msg.subscriber_position_id(), 4);
        assert_eq!(msg.subscription_registration_id(), 3);
        assert_eq!(msg.log_file_name().unwrap(), log_name);
        assert_eq!(msg.source_identity().unwrap(), "udp://127.0.0.1:40123");
    }
}
