//! Decodes messages broadcast by the media driver and dispatches them to a
//! [`DriverListener`] implementation. The client conductor is the only listener
//! in this crate, but the adapter is generic so tests can intercept events.
use crate::command::client_timeout::ClientTimeoutDefn;
use crate::command::counter_update::CounterUpdateDefn;
use crate::command::error_response::ErrorResponseDefn;
use crate::command::flyweight::Flyweight;
use crate::command::image_buffers_ready::ImageBuffersReadyDefn;
use crate::command::image_message::ImageMessageDefn;
use crate::command::publication_ready::PublicationBuffersReadyDefn;
use crate::command::subscription_ready::SubscriptionReadyDefn;
use crate::concurrent::broadcast::CopyBroadcastReceiver;
use crate::concurrent::AtomicBuffer;
use crate::control_protocol::DriverResponse;
use crate::error::Result;
use std::convert::TryFrom;

/// Sentinel correlation id meaning "no client call is currently awaiting a response"
pub const NO_CORRELATION_ID: i64 = -1;

/// Callback surface invoked once per event decoded off the to-clients broadcast buffer.
pub trait DriverListener {
    /// An error response tied to `offending_command_correlation_id`, or an
    /// asynchronous channel endpoint error when that id is `-1`.
    fn on_error(&mut self, correlation_id: i64, error_code: i32, message: &str);
    /// A new publication's buffers are ready.
    fn on_new_publication(
        &mut self,
        correlation_id: i64,
        registration_id: i64,
        stream_id: i32,
        session_id: i32,
        publication_limit_counter_id: i32,
        channel_status_indicator_id: i32,
        log_file_name: &str,
    );
    /// A new exclusive publication's buffers are ready.
    fn on_new_exclusive_publication(
        &mut self,
        correlation_id: i64,
        registration_id: i64,
        stream_id: i32,
        session_id: i32,
        publication_limit_counter_id: i32,
        channel_status_indicator_id: i32,
        log_file_name: &str,
    );
    /// A new subscription is ready, carrying its channel-status counter id.
    fn on_new_subscription(&mut self, correlation_id: i64, channel_status_indicator_id: i32);
    /// A new image is available on an existing subscription.
    fn on_available_image(
        &mut self,
        correlation_id: i64,
        session_id: i32,
        stream_id: i32,
        subscriber_position_id: i32,
        subscription_registration_id: i64,
        log_file_name: &str,
        source_identity: &str,
    );
    /// An image is no longer available.
    fn on_unavailable_image(&mut self, correlation_id: i64, subscription_registration_id: i64, stream_id: i32);
    /// A new counter is ready.
    fn on_new_counter(&mut self, correlation_id: i64, counter_id: i32);
    /// A counter has become available.
    fn on_available_counter(&mut self, registration_id: i64, counter_id: i32);
    /// A counter is no longer available.
    fn on_unavailable_counter(&mut self, registration_id: i64, counter_id: i32);
    /// The driver has evicted a client.
    fn on_client_timeout(&mut self, client_id: i64);
}

/// Decodes the raw broadcast stream and dispatches to a [`DriverListener`].
pub struct DriverListenerAdapter<A>
where
    A: AtomicBuffer,
{
    receiver: CopyBroadcastReceiver<A>,
    last_received_correlation_id: i64,
}

impl<A> DriverListenerAdapter<A>
where
    A: AtomicBuffer,
{
    /// Build a new adapter over the given broadcast receiver
    pub fn new(receiver: CopyBroadcastReceiver<A>) -> Self {
        DriverListenerAdapter {
            receiver,
            last_received_correlation_id: NO_CORRELATION_ID,
        }
    }

    /// Correlation id of the last event this adapter observed. Used by the
    /// conductor's await loop to detect when its own request has been answered.
    pub fn last_received_correlation_id(&self) -> i64 {
        self.last_received_correlation_id
    }

    /// Poll the broadcast buffer once, dispatching at most one event to `listener`.
    /// Returns the number of events processed (0 or 1).
    pub fn receive_message<L>(&mut self, listener: &mut L) -> Result<i32>
    where
        L: DriverListener,
    {
        let mut last_correlation_id = self.last_received_correlation_id;
        let mut dispatch_result: Result<()> = Ok(());

        let count = self.receiver.receive(|msg_type_id, buffer| {
            let result = Self::dispatch(msg_type_id, buffer, listener, &mut last_correlation_id);
            if let Err(e) = result {
                dispatch_result = Err(e);
            }
        })?;

        self.last_received_correlation_id = last_correlation_id;
        dispatch_result?;
        Ok(count)
    }

    fn dispatch<L>(msg_type_id: i32, buffer: &[u8], listener: &mut L, last_correlation_id: &mut i64) -> Result<()>
    where
        L: DriverListener,
    {
        let response = match DriverResponse::try_from(msg_type_id) {
            Ok(r) => r,
            Err(_) => return Ok(()),
        };

        match response {
            DriverResponse::OnError => {
                let msg = Flyweight::new::<ErrorResponseDefn>(buffer, 0)?;
                let correlation_id = msg.offending_command_correlation_id();
                *last_correlation_id = correlation_id;
                listener.on_error(correlation_id, msg.error_code(), msg.error_message()?);
            }
            DriverResponse::OnPublicationReady => {
                let msg = Flyweight::new::<PublicationBuffersReadyDefn>(buffer, 0)?;
                *last_correlation_id = msg.correlation_id();
                listener.on_new_publication(
                    msg.correlation_id(),
                    msg.registration_id(),
                    msg.stream_id(),
                    msg.session_id(),
                    msg.publication_limit_counter_id(),
                    msg.channel_status_indicator_id(),
                    msg.log_file_name()?,
                );
            }
            DriverResponse::OnExclusivePublicationReady => {
                let msg = Flyweight::new::<PublicationBuffersReadyDefn>(buffer, 0)?;
                *last_correlation_id = msg.correlation_id();
                listener.on_new_exclusive_publication(
                    msg.correlation_id(),
                    msg.registration_id(),
                    msg.stream_id(),
                    msg.session_id(),
                    msg.publication_limit_counter_id(),
                    msg.channel_status_indicator_id(),
                    msg.log_file_name()?,
                );
            }
            DriverResponse::OnSubscriptionReady => {
                let msg = Flyweight::new::<SubscriptionReadyDefn>(buffer, 0)?;
                *last_correlation_id = msg.correlation_id();
                listener.on_new_subscription(msg.correlation_id(), msg.channel_status_indicator_id());
            }
            DriverResponse::OnAvailableImage => {
                let msg = Flyweight::new::<ImageBuffersReadyDefn>(buffer, 0)?;
                *last_correlation_id = msg.correlation_id();
                listener.on_available_image(
                    msg.correlation_id(),
                    msg.session_id(),
                    msg.stream_id(),
                    msg.subscriber_position_id(),
                    msg.subscription_registration_id(),
                    msg.log_file_name()?,
                    msg.source_identity()?,
                );
            }
            DriverResponse::OnUnavailableImage => {
                let msg = Flyweight::new::<ImageMessageDefn>(buffer, 0)?;
                *last_correlation_id = msg.correlation_id();
                listener.on_unavailable_image(msg.correlation_id(), msg.subscription_registration_id(), msg.stream_id());
            }
            DriverResponse::OnCounterReady => {
                let msg = Flyweight::new::<CounterUpdateDefn>(buffer, 0)?;
                *last_correlation_id = msg.correlation_id();
                listener.on_new_counter(msg.correlation_id(), msg.counter_id());
            }
            DriverResponse::OnAvailableCounter => {
                let msg = Flyweight::new::<CounterUpdateDefn>(buffer, 0)?;
                listener.on_available_counter(msg.registration_id(), msg.counter_id());
            }
            DriverResponse::OnUnavailableCounter => {
                let msg = Flyweight::new::<CounterUpdateDefn>(buffer, 0)?;
                listener.on_unavailable_counter(msg.registration_id(), msg.counter_id());
            }
            DriverResponse::OnClientTimeout => {
                let msg = Flyweight::new::<ClientTimeoutDefn>(buffer, 0)?;
                listener.on_client_timeout(msg.client_id());
            }
            DriverResponse::OnOperationSuccess => {
                let msg = Flyweight::new::<crate::command::correlated_message::CorrelatedMessageDefn>(buffer, 0)?;
                *last_correlation_id = msg.correlation_id();
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::concurrent::broadcast::{buffer_descriptor, record_descriptor, BroadcastReceiver};
    use crate::util::bit::align;
    use crate::util::IndexT;

    const BUFFER_SIZE: usize = 1024 + buffer_descriptor::TRAILER_LENGTH as usize;

    #[derive(Default)]
    struct RecordingListener {
        errors: Vec<(i64, i32, String)>,
        client_timeouts: Vec<i64>,
    }

    impl DriverListener for RecordingListener {
        fn on_error(&mut self, correlation_id: i64, error_code: i32, message: &str) {
            self.errors.push((correlation_id, error_code, message.to_string()));
        }
        fn on_new_publication(&mut self, _: i64, _: i64, _: i32, _: i32, _: i32, _: i32, _: &str) {}
        fn on_new_exclusive_publication(&mut self, _: i64, _: i64, _: i32, _: i32, _: i32, _: i32, _: &str) {}
        fn on_new_subscription(&mut self, _: i64, _: i32) {}
        fn on_available_image(&mut self, _: i64, _: i32, _: i32, _: i32, _: i64, _: &str, _: &str) {}
        fn on_unavailable_image(&mut self, _: i64, _: i64, _: i32) {}
        fn on_new_counter(&mut self, _: i64, _: i32) {}
        fn on_available_counter(&mut self, _: i64, _: i32) {}
        fn on_unavailable_counter(&mut self, _: i64, _: i32) {}
        fn on_client_timeout(&mut self, client_id: i64) {
            self.client_timeouts.push(client_id);
        }
    }

    fn write_record(buf: &mut [u8], offset: IndexT, msg_type_id: i32, payload: &[u8]) -> IndexT {
        let record_len = record_descriptor::HEADER_LENGTH + payload.len() as IndexT;
        buf.put_i32(record_descriptor::type_offset(offset), msg_type_id).unwrap();
        buf.put_slice(record_descriptor::msg_offset(offset), payload, 0, payload.len() as IndexT)
            .unwrap();
        buf.put_i32_ordered(record_descriptor::length_offset(offset), record_len).unwrap();
        align(record_len as usize, record_descriptor::RECORD_ALIGNMENT as usize) as IndexT
    }

    #[test]
    fn dispatches_on_error_and_records_correlation_id() {
        let mut storage = vec![0u8; BUFFER_SIZE];
        let capacity = (BUFFER_SIZE - buffer_descriptor::TRAILER_LENGTH as usize) as IndexT;

        let mut payload = vec![0u8; 64];
        payload.put_i64(0, 11).unwrap();
        payload.put_i32(8, 3).unwrap();
        let written = payload.put_string(12, "bad channel").unwrap();
        payload.truncate((12 + written) as usize);

        let advance = write_record(&mut storage[..], 0, DriverResponse::OnError as i32, &payload);
        storage
            .put_i64_ordered(capacity + buffer_descriptor::TAIL_COUNTER_OFFSET, advance as i64)
            .unwrap();
        storage
            .put_i64_ordered(capacity + buffer_descriptor::TAIL_INTENT_COUNTER_OFFSET, advance as i64)
            .unwrap();

        let receiver = BroadcastReceiver::new(storage).unwrap();
        let mut adapter = DriverListenerAdapter::new(CopyBroadcastReceiver::new(receiver));
        let mut listener = RecordingListener::default();

        let count = adapter.receive_message(&mut listener).unwrap();
        assert_eq!(count, 1);
        assert_eq!(listener.errors, vec![(11, 3, "bad channel".to_string())]);
        assert_eq!(adapter.last_received_correlation_id(), 11);
    }

    #[test]
    fn dispatches_client_timeout() {
        let mut storage = vec![0u8; BUFFER_SIZE];
        let capacity = (BUFFER_SIZE - buffer_descriptor::TRAILER_LENGTH as usize) as IndexT;

        let mut payload = vec![0u8; 16];
        payload.put_i64(0, 42).unwrap();

        let advance = write_record(&mut storage[..], 0, DriverResponse::OnClientTimeout as i32, &payload[..8]);
        storage
            .put_i64_ordered(capacity + buffer_descriptor::TAIL_COUNTER_OFFSET, advance as i64)
            .unwrap();
        storage
            .put_i64_ordered(capacity + buffer_descriptor::TAIL_INTENT_COUNTER_OFFSET, advance as i64)
            .unwrap();

        let receiver = BroadcastReceiver::new(storage).unwrap();
        let mut adapter = DriverListenerAdapter::new(CopyBroadcastReceiver::new(receiver));
        let mut listener = RecordingListener::default();

        adapter.receive_message(&mut listener).unwrap();
        assert_eq!(listener.client_timeouts, vec![42]);
    }
}
