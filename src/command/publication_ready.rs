//! Flyweight for `OnNewPublication` / `OnNewExclusivePublication` responses.
//! Both events carry an identical layout; only the `DriverResponse` tag differs.
use crate::command::flyweight::Flyweight;
use crate::concurrent::AtomicBuffer;
use crate::error::Result;
use crate::util::IndexT;
use std::mem::size_of;

/// Response sent once a publication has been successfully registered with the driver
#[repr(C, packed(4))]
pub struct PublicationBuffersReadyDefn {
    correlation_id: i64,
    registration_id: i64,
    stream_id: i32,
    session_id: i32,
    publication_limit_counter_id: i32,
    channel_status_indicator_id: i32,
    log_file_name_length: i32,
}

const LOG_FILE_NAME_LENGTH_OFFSET: IndexT =
    (size_of::<i64>() * 2 + size_of::<i32>() * 4) as IndexT;

impl<A> Flyweight<A, PublicationBuffersReadyDefn>
where
    A: AtomicBuffer,
{
    /// Correlation id of the addPublication / addExclusivePublication command
    pub fn correlation_id(&self) -> i64 {
        self.get_struct().correlation_id
    }

    /// Registration id of the resulting publication. Distinct from `correlation_id`
    /// when a concurrent publication request is folded into an existing one.
    pub fn registration_id(&self) -> i64 {
        self.get_struct().registration_id
    }

    /// Stream identifier the publication was registered against
    pub fn stream_id(&self) -> i32 {
        self.get_struct().stream_id
    }

    /// Session identifier assigned by the driver
    pub fn session_id(&self) -> i32 {
        self.get_struct().session_id
    }

    /// Counter id tracking the publication's position limit
    pub fn publication_limit_counter_id(&self) -> i32 {
        self.get_struct().publication_limit_counter_id
    }

    /// Counter id tracking the channel endpoint's status
    pub fn channel_status_indicator_id(&self) -> i32 {
        self.get_struct().channel_status_indicator_id
    }

    /// Name of the memory-mapped log file backing this publication's term buffers
    pub fn log_file_name(&self) -> Result<&str> {
        self.string_get(LOG_FILE_NAME_LENGTH_OFFSET)
    }
}

#[cfg(test)]
mod tests {
    use crate::command::flyweight::Flyweight;
    use crate::command::publication_ready::PublicationBuffersReadyDefn;
    use crate::concurrent::AtomicBuffer;

    #[test]
    fn decodes_fields_written_by_driver() {
        let mut buffer = vec![0u8; 256];
        buffer.put_i64(0, 10).unwrap();
        buffer.put_i64(8, 10).unwrap();
        buffer.put_i32(16, 1001).unwrap();
        buffer.put_i32(20, 2).unwrap();
        buffer.put_i32(24, 5).unwrap();
        buffer.put_i32(28, 6).unwrap();
        buffer.put_string(32, "/dev/shm/aeron/1001-2.logbuffer").unwrap();

        let msg = Flyweight::new::<PublicationBuffersReadyDefn>(buffer, 0).unwrap();
        assert_eq!(msg.correlation_id(), 10);
        assert_eq!(msg.registration_id(), 10);
        assert_eq!(msg.stream_id(), 1001);
        assert_eq!(msg.session_id(), 2);
        assert_eq!(msg.publication_limit_counter_id(), 5);
        assert_eq!(msg.channel_status_indicator_id(), 6);
        assert_eq!(msg.log_file_name().unwrap(), "/dev/shm/aeron/1001-2.logbuffer");
    }
}
