//! Flyweight implementation for the addCounter command.
use crate::command::correlated_message::CorrelatedMessageDefn;
use crate::command::flyweight::Flyweight;
use crate::concurrent::AtomicBuffer;
use crate::error::Result;
use crate::util::IndexT;
use std::mem::size_of;

/// Control message to add a counter
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
/// |                          Type ID                              |
/// +---------------------------------------------------------------+
/// |                          Key Length                           |
/// +---------------------------------------------------------------+
/// |                          Key Blob                            ...
///...                                                              |
/// +---------------------------------------------------------------+
/// |                         Label Length                          |
/// +---------------------------------------------------------------+
/// |                          Label                               ...
///...                                                              |
/// +---------------------------------------------------------------+
/// ```
#[repr(C, packed(4))]
pub struct CounterMessageDefn {
    correlated_message: CorrelatedMessageDefn,
    type_id: i32,
    key_length: i32,
}

const KEY_LENGTH_OFFSET: IndexT = (size_of::<CorrelatedMessageDefn>() + size_of::<i32>()) as IndexT;

impl<A> Flyweight<A, CounterMessageDefn>
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

    /// Retrieve the counter type identifier
    pub fn type_id(&self) -> i32 {
        self.get_struct().type_id
    }

    /// Set the counter type identifier
    pub fn put_type_id(&mut self, value: i32) -> &mut Self {
        self.get_struct_mut().type_id = value;
        self
    }

    /// Retrieve the key blob for this counter. Empty when the counter was
    /// registered without a key.
    pub fn key(&self) -> Result<&[u8]> {
        let key_length = self.get_struct().key_length as usize;
        let bytes = self.bytes_at(KEY_LENGTH_OFFSET + size_of::<i32>() as IndexT)?;
        Ok(&bytes[..key_length])
    }

    /// Set the key blob for this counter
    pub fn put_key(&mut self, key: &[u8]) -> Result<&mut Self> {
        self.get_struct_mut().key_length = key.len() as i32;
        let key_offset = KEY_LENGTH_OFFSET + size_of::<i32>() as IndexT;
        self.put_slice_at(key_offset, key)?;
        Ok(self)
    }

    /// Retrieve the human readable label for this counter
    pub fn label(&self) -> Result<&str> {
        self.string_get(self.label_length_offset())
    }

    /// Set the human readable label for this counter
    pub fn put_label(&mut self, value: &str) -> Result<&mut Self> {
        let offset = self.label_length_offset();
        self.string_put(offset, value)?;
        Ok(self)
    }

    /// Get the total byte length of this counter command
    pub fn length(&self) -> Result<IndexT> {
        let label_len_offset = self.label_length_offset();
        let label = self.string_get(label_len_offset)?;
        Ok(label_len_offset + size_of::<i32>() as IndexT + label.len() as IndexT)
    }

    fn label_length_offset(&self) -> IndexT {
        KEY_LENGTH_OFFSET + size_of::<i32>() as IndexT + self.get_struct().key_length
    }
}

#[cfg(test)]
mod tests {
    use crate::command::counter_message::CounterMessageDefn;
    use crate::command::flyweight::Flyweight;

    #[test]
    fn round_trips_key_and_label() {
        let buffer = vec![0u8; 512];
        let mut msg = Flyweight::new::<CounterMessageDefn>(buffer, 0).unwrap();

        msg.put_client_id(1).put_correlation_id(2).put_type_id(101);
        msg.put_key(&[1, 2, 3, 4]).unwrap();
        msg.put_label("my-counter").unwrap();

        assert_eq!(msg.type_id(), 101);
        assert_eq!(msg.key().unwrap(), &[1, 2, 3, 4]);
        assert_eq!(msg.label().unwrap(), "my-counter");
    }

    #[test]
    fn round_trips_empty_key() {
        let buffer = vec![0u8; 512];
        let mut msg = Flyweight::new::<CounterMessageDefn>(buffer, 0).unwrap();

        msg.put_client_id(1).put_correlation_id(2).put_type_id(5);
        msg.put_key(&[]).unwrap();
        msg.put_label("no-key").unwrap();

        assert_eq!(msg.key().unwrap(), &[] as &[u8]);
        assert_eq!(msg.label().unwrap(), "no-key");
    }
}
