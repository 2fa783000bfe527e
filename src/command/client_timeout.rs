//! Flyweight for `OnClientTimeout` responses, pushed by the driver when it has
//! evicted a client for stale keepalives.
use crate::command::flyweight::Flyweight;
use crate::concurrent::AtomicBuffer;

/// Notification that the driver has evicted a client
#[repr(C, packed(4))]
pub struct ClientTimeoutDefn {
    client_id: i64,
}

impl<A> Flyweight<A, ClientTimeoutDefn>
where
    A: AtomicBuffer,
{
    /// Identifier of the client the driver has evicted
    pub fn client_id(&self) -> i64 {
        self.get_struct().client_id
    }
}

#[cfg(test)]
mod tests {
    use crate::command::client_timeout::ClientTimeoutDefn;
    use crate::command::flyweight::Flyweight;
    use crate::concurrent::AtomicBuffer;

    #[test]
    fn decodes_client_id() {
        let mut buffer = vec![0u8; 32];
        buffer.put_i64(0, 55).unwrap();

        let msg = Flyweight::new::<ClientTimeoutDefn>(buffer, 0).unwrap();
        assert_eq!(msg.client_id(), 55);
    }
}
