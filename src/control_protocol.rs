//! Command and response type identifiers exchanged with the media driver over
//! the to-driver ring buffer and to-clients broadcast buffer.
use std::convert::TryFrom;

/// Commands sent from clients to the media driver
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientCommand {
    /// Add a publication
    AddPublication = 0x01,
    /// Remove a publication
    RemovePublication = 0x02,
    /// Add an exclusive publication
    AddExclusivePublication = 0x03,
    /// Add a subscription
    AddSubscription = 0x04,
    /// Remove a subscription
    RemoveSubscription = 0x05,
    /// Keepalive from a client
    ClientKeepalive = 0x06,
    /// Add a manual destination to an existing publication
    AddDestination = 0x07,
    /// Remove a manual destination from an existing publication
    RemoveDestination = 0x08,
    /// Add a counter to the counters manager
    AddCounter = 0x09,
    /// Remove a counter from the counters manager
    RemoveCounter = 0x0A,
    /// Close indication from a client
    ClientClose = 0x0B,
    /// Add a manual receive destination for an existing subscription
    AddRcvDestination = 0x0C,
    /// Remove a manual receive destination from an existing subscription
    RemoveRcvDestination = 0x0D,
    /// Request the driver to terminate
    TerminateDriver = 0x0E,
}

impl TryFrom<i32> for ClientCommand {
    type Error = ();

    fn try_from(val: i32) -> Result<ClientCommand, ()> {
        match val {
            v if v == ClientCommand::AddPublication as i32 => Ok(ClientCommand::AddPublication),
            v if v == ClientCommand::RemovePublication as i32 => Ok(ClientCommand::RemovePublication),
            v if v == ClientCommand::AddExclusivePublication as i32 => Ok(ClientCommand::AddExclusivePublication),
            v if v == ClientCommand::AddSubscription as i32 => Ok(ClientCommand::AddSubscription),
            v if v == ClientCommand::RemoveSubscription as i32 => Ok(ClientCommand::RemoveSubscription),
            v if v == ClientCommand::ClientKeepalive as i32 => Ok(ClientCommand::ClientKeepalive),
            v if v == ClientCommand::AddDestination as i32 => Ok(ClientCommand::AddDestination),
            v if v == ClientCommand::RemoveDestination as i32 => Ok(ClientCommand::RemoveDestination),
            v if v == ClientCommand::AddCounter as i32 => Ok(ClientCommand::AddCounter),
            v if v == ClientCommand::RemoveCounter as i32 => Ok(ClientCommand::RemoveCounter),
            v if v == ClientCommand::ClientClose as i32 => Ok(ClientCommand::ClientClose),
            v if v == ClientCommand::AddRcvDestination as i32 => Ok(ClientCommand::AddRcvDestination),
            v if v == ClientCommand::RemoveRcvDestination as i32 => Ok(ClientCommand::RemoveRcvDestination),
            v if v == ClientCommand::TerminateDriver as i32 => Ok(ClientCommand::TerminateDriver),
            _ => Err(()),
        }
    }
}

/// Responses broadcast by the media driver to clients
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverResponse {
    /// Error response as a result of attempting to process a client command
    OnError = 0x0F01,
    /// A subscribed image's buffers are available
    OnAvailableImage = 0x0F02,
    /// New publication buffers are ready
    OnPublicationReady = 0x0F03,
    /// A command requiring no data response has succeeded
    OnOperationSuccess = 0x0F04,
    /// Inform the client of timeout and removal of an inactive image
    OnUnavailableImage = 0x0F05,
    /// New exclusive publication buffers are ready
    OnExclusivePublicationReady = 0x0F06,
    /// A new subscription is ready
    OnSubscriptionReady = 0x0F07,
    /// A new counter is ready
    OnCounterReady = 0x0F08,
    /// Inform clients of an available counter
    OnAvailableCounter = 0x0F09,
    /// Inform clients of removal of a counter
    OnUnavailableCounter = 0x0F0A,
    /// Inform the client that the driver has evicted it for a stale keepalive
    OnClientTimeout = 0x0F0B,
}

impl TryFrom<i32> for DriverResponse {
    type Error = ();

    fn try_from(val: i32) -> Result<DriverResponse, ()> {
        match val {
            v if v == DriverResponse::OnError as i32 => Ok(DriverResponse::OnError),
            v if v == DriverResponse::OnAvailableImage as i32 => Ok(DriverResponse::OnAvailableImage),
            v if v == DriverResponse::OnPublicationReady as i32 => Ok(DriverResponse::OnPublicationReady),
            v if v == DriverResponse::OnOperationSuccess as i32 => Ok(DriverResponse::OnOperationSuccess),
            v if v == DriverResponse::OnUnavailableImage as i32 => Ok(DriverResponse::OnUnavailableImage),
            v if v == DriverResponse::OnExclusivePublicationReady as i32 => {
                Ok(DriverResponse::OnExclusivePublicationReady)
            }
            v if v == DriverResponse::OnSubscriptionReady as i32 => Ok(DriverResponse::OnSubscriptionReady),
            v if v == DriverResponse::OnCounterReady as i32 => Ok(DriverResponse::OnCounterReady),
            v if v == DriverResponse::OnAvailableCounter as i32 => Ok(DriverResponse::OnAvailableCounter),
            v if v == DriverResponse::OnUnavailableCounter as i32 => Ok(DriverResponse::OnUnavailableCounter),
            v if v == DriverResponse::OnClientTimeout as i32 => Ok(DriverResponse::OnClientTimeout),
            _ => Err(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_command_round_trips_through_wire_value() {
        let value = ClientCommand::AddSubscription as i32;
        assert_eq!(ClientCommand::try_from(value), Ok(ClientCommand::AddSubscription));
    }

    #[test]
    fn unknown_command_value_is_rejected() {
        assert_eq!(ClientCommand::try_from(-1), Err(()));
    }

    #[test]
    fn driver_response_round_trips_through_wire_value() {
        let value = DriverResponse::OnClientTimeout as i32;
        assert_eq!(DriverResponse::try_from(value), Ok(DriverResponse::OnClientTimeout));
    }
}
