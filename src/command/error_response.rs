//! Flyweight for `OnError` responses broadcast by the media driver.
use crate::command::flyweight::Flyweight;
use crate::concurrent::AtomicBuffer;
use crate::error::Result;
use crate::util::IndexT;
use std::mem::size_of;

/// Error response sent in reply to a failed command, or as an asynchronous
/// channel endpoint error notification
#[repr(C, packed(4))]
pub struct ErrorResponseDefn {
    offending_command_correlation_id: i64,
    error_code: i32,
    error_message_length: i32,
}

const ERROR_MESSAGE_LENGTH_OFFSET: IndexT = (size_of::<i64>() + size_of::<i32>()) as IndexT;

impl<A> Flyweight<A, ErrorResponseDefn>
where
    A: AtomicBuffer,
{
    /// Correlation id of the command that provoked this error, or `-1` if this
    /// is an asynchronous notification not tied to a specific command
    pub fn offending_command_correlation_id(&self) -> i64 {
        self.get_struct().offending_command_correlation_id
    }

    /// Driver-assigned error code
    pub fn error_code(&self) -> i32 {
        self.get_struct().error_code
    }

    /// Human readable error message
    pub fn error_message(&self) -> Result<&str> {
        self.string_get(ERROR_MESSAGE_LENGTH_OFFSET)
    }
}

#[cfg(test)]
mod tests {
    use crate::command::error_response::ErrorResponseDefn;
    use crate::command::flyweight::Flyweight;
    use crate::concurrent::AtomicBuffer;

    #[test]
    fn decodes_fields_written_by_driver() {
        let mut buffer = vec![0u8; 256];
        buffer.put_i64(0, 42).unwrap();
        buffer.put_i32(8, 7).unwrap();
        buffer.put_string(12, "channel endpoint unreachable").unwrap();

        let msg = Flyweight::new::<ErrorResponseDefn>(buffer, 0).unwrap();
        assert_eq!(msg.offending_command_correlation_id(), 42);
        assert_eq!(msg.error_code(), 7);
        assert_eq!(msg.error_message().unwrap(), "channel endpoint unreachable");
    }
}
