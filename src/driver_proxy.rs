//! High level API for issuing commands to the media driver over the to-driver
//! ring buffer.
use crate::command::correlated_message::CorrelatedMessageDefn;
use crate::command::counter_message::CounterMessageDefn;
use crate::command::destination_message::DestinationMessageDefn;
use crate::command::flyweight::Flyweight;
use crate::command::publication_message::PublicationMessageDefn;
use crate::command::remove_message::RemoveMessageDefn;
use crate::command::subscription_message::SubscriptionMessageDefn;
use crate::concurrent::ring_buffer::ManyToOneRingBuffer;
use crate::concurrent::AtomicBuffer;
use crate::control_protocol::ClientCommand;
use crate::error::{AeronError, Result};
use crate::util::IndexT;

/// High level interface for issuing commands to a media driver over its
/// to-driver ring buffer. Every method writes one command and returns the
/// correlation id the conductor should await a response for.
pub struct DriverProxy<A>
where
    A: AtomicBuffer,
{
    to_driver: ManyToOneRingBuffer<A>,
    client_id: i64,
}

const COMMAND_BUFFER_SIZE: usize = 512;

impl<A> DriverProxy<A>
where
    A: AtomicBuffer,
{
    /// Initialize a new driver proxy from the shared to-driver ring buffer
    pub fn new(to_driver: ManyToOneRingBuffer<A>) -> Self {
        let client_id = to_driver.next_correlation_id();
        DriverProxy { to_driver, client_id }
    }

    /// Retrieve the timestamp of the most recent driver heartbeat. Values are
    /// milliseconds past 1 Jan 1970, UTC.
    pub fn time_of_last_driver_keepalive_ms(&self) -> i64 {
        self.to_driver.consumer_heartbeat_time()
    }

    /// Get the client identifier associated with this proxy, derived from this
    /// proxy's initial correlation id
    pub fn client_id(&self) -> i64 {
        self.client_id
    }

    /// Request the driver to create a new shared publication
    pub fn add_publication(&mut self, channel: &str, stream_id: i32) -> Result<i64> {
        let correlation_id = self.to_driver.next_correlation_id();
        self.write_command_to_driver(|buffer, length| {
            let mut request = Flyweight::new::<PublicationMessageDefn>(buffer, 0).unwrap();
            request
                .put_client_id(self.client_id)
                .put_correlation_id(correlation_id)
                .put_stream_id(stream_id);
            request.put_channel(channel).unwrap();
            *length = request.length();
            ClientCommand::AddPublication
        })?;
        Ok(correlation_id)
    }

    /// Request the driver to create a new exclusive publication
    pub fn add_exclusive_publication(&mut self, channel: &str, stream_id: i32) -> Result<i64> {
        let correlation_id = self.to_driver.next_correlation_id();
        self.write_command_to_driver(|buffer, length| {
            let mut request = Flyweight::new::<PublicationMessageDefn>(buffer, 0).unwrap();
            request
                .put_client_id(self.client_id)
                .put_correlation_id(correlation_id)
                .put_stream_id(stream_id);
            request.put_channel(channel).unwrap();
            *length = request.length();
            ClientCommand::AddExclusivePublication
        })?;
        Ok(correlation_id)
    }

    /// Request the driver to remove a previously added publication
    pub fn remove_publication(&mut self, registration_id: i64) -> Result<i64> {
        self.write_correlated_command(registration_id, ClientCommand::RemovePublication)
    }

    /// Request the driver to create a new subscription
    pub fn add_subscription(&mut self, channel: &str, stream_id: i32) -> Result<i64> {
        let correlation_id = self.to_driver.next_correlation_id();
        self.write_command_to_driver(|buffer, length| {
            let mut request = Flyweight::new::<SubscriptionMessageDefn>(buffer, 0).unwrap();
            request
                .put_client_id(self.client_id)
                .put_correlation_id(correlation_id)
                .put_registration_correlation_id(-1)
                .put_stream_id(stream_id);
            request.put_channel(channel).unwrap();
            *length = request.length();
            ClientCommand::AddSubscription
        })?;
        Ok(correlation_id)
    }

    /// Request the driver to remove a previously added subscription
    pub fn remove_subscription(&mut self, registration_id: i64) -> Result<i64> {
        self.write_correlated_command(registration_id, ClientCommand::RemoveSubscription)
    }

    /// Add a manual destination to an existing publication's channel endpoint
    pub fn add_destination(&mut self, registration_id: i64, endpoint_channel: &str) -> Result<i64> {
        self.write_destination_command(registration_id, endpoint_channel, ClientCommand::AddDestination)
    }

    /// Remove a manual destination from an existing publication's channel endpoint
    pub fn remove_destination(&mut self, registration_id: i64, endpoint_channel: &str) -> Result<i64> {
        self.write_destination_command(registration_id, endpoint_channel, ClientCommand::RemoveDestination)
    }

    /// Add a manual receive destination to an existing subscription's channel endpoint
    pub fn add_rcv_destination(&mut self, registration_id: i64, endpoint_channel: &str) -> Result<i64> {
        self.write_destination_command(registration_id, endpoint_channel, ClientCommand::AddRcvDestination)
    }

    /// Remove a manual receive destination from an existing subscription's channel endpoint
    pub fn remove_rcv_destination(&mut self, registration_id: i64, endpoint_channel: &str) -> Result<i64> {
        self.write_destination_command(registration_id, endpoint_channel, ClientCommand::RemoveRcvDestination)
    }

    /// Request the driver to add a counter with an explicit key and label
    pub fn add_counter(&mut self, type_id: i32, key: &[u8], label: &str) -> Result<i64> {
        let correlation_id = self.to_driver.next_correlation_id();
        self.write_command_to_driver(|buffer, length| {
            let mut request = Flyweight::new::<CounterMessageDefn>(buffer, 0).unwrap();
            request
                .put_client_id(self.client_id)
                .put_correlation_id(correlation_id)
                .put_type_id(type_id);
            request.put_key(key).unwrap();
            request.put_label(label).unwrap();
            // UNWRAP: flyweight was constructed over a buffer large enough for the header
            *length = request.length().unwrap();
            ClientCommand::AddCounter
        })?;
        Ok(correlation_id)
    }

    /// Request the driver to add a counter with no key, only a label
    pub fn add_counter_with_label(&mut self, type_id: i32, label: &str) -> Result<i64> {
        self.add_counter(type_id, &[], label)
    }

    /// Request the driver to remove a previously added counter
    pub fn remove_counter(&mut self, registration_id: i64) -> Result<i64> {
        self.write_correlated_command(registration_id, ClientCommand::RemoveCounter)
    }

    /// Send a keepalive to the driver on behalf of this client
    pub fn send_client_keepalive(&mut self) -> Result<()> {
        self.write_command_to_driver(|buffer, length| {
            let mut request = Flyweight::new::<CorrelatedMessageDefn>(buffer, 0).unwrap();
            request.put_client_id(self.client_id).put_correlation_id(0);
            *length = std::mem::size_of::<CorrelatedMessageDefn>() as IndexT;
            ClientCommand::ClientKeepalive
        })
    }

    /// Inform the driver this client is closing
    pub fn client_close(&mut self) -> Result<()> {
        self.write_command_to_driver(|buffer, length| {
            let mut request = Flyweight::new::<CorrelatedMessageDefn>(buffer, 0).unwrap();
            request.put_client_id(self.client_id).put_correlation_id(0);
            *length = std::mem::size_of::<CorrelatedMessageDefn>() as IndexT;
            ClientCommand::ClientClose
        })
    }

    fn write_correlated_command(&mut self, registration_id: i64, command: ClientCommand) -> Result<i64> {
        let correlation_id = self.to_driver.next_correlation_id();
        self.write_command_to_driver(|buffer, length| {
            let mut request = Flyweight::new::<RemoveMessageDefn>(buffer, 0).unwrap();
            request
                .put_client_id(self.client_id)
                .put_correlation_id(correlation_id)
                .put_registration_id(registration_id);
            *length = std::mem::size_of::<RemoveMessageDefn>() as IndexT;
            command
        })?;
        Ok(correlation_id)
    }

    fn write_destination_command(
        &mut self,
        registration_id: i64,
        endpoint_channel: &str,
        command: ClientCommand,
    ) -> Result<i64> {
        let correlation_id = self.to_driver.next_correlation_id();
        self.write_command_to_driver(|buffer, length| {
            let mut request = Flyweight::new::<DestinationMessageDefn>(buffer, 0).unwrap();
            request
                .put_client_id(self.client_id)
                .put_correlation_id(correlation_id)
                .put_registration_id(registration_id);
            request.put_channel(endpoint_channel).unwrap();
            *length = request.length();
            command
        })?;
        Ok(correlation_id)
    }

    fn write_command_to_driver<F>(&mut self, filler: F) -> Result<()>
    where
        F: FnOnce(&mut [u8], &mut IndexT) -> ClientCommand,
    {
        let mut buffer = &mut [0u8; COMMAND_BUFFER_SIZE][..];
        let mut length = buffer.len() as IndexT;
        let msg_type_id = filler(&mut buffer, &mut length);

        if !self.to_driver.write(msg_type_id as i32, &buffer, 0, length)? {
            Err(AeronError::IllegalState("to-driver ring buffer has no space available".into()))
        } else {
            Ok(())
        }
    }
}
