//! A per-source read position under a subscription, created when the driver
//! reports `OnAvailableImage` and removed on `OnUnavailableImage`.

/// A single publisher's image within a subscription. Term-buffer framing
/// (fragment assembly, padding) is not modeled here; the conductor only ever
/// constructs, shares, and releases these handles.
#[derive(Clone)]
pub struct Image {
    correlation_id: i64,
    session_id: i32,
    stream_id: i32,
    subscriber_position_id: i32,
    subscription_registration_id: i64,
    log_file_name: String,
    source_identity: String,
}

impl Image {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        correlation_id: i64,
        session_id: i32,
        stream_id: i32,
        subscriber_position_id: i32,
        subscription_registration_id: i64,
        log_file_name: String,
        source_identity: String,
    ) -> Self {
        Image {
            correlation_id,
            session_id,
            stream_id,
            subscriber_position_id,
            subscription_registration_id,
            log_file_name,
            source_identity,
        }
    }

    /// Correlation id this image was registered under (the registration id
    /// it is tracked by in the log-buffers registry)
    pub fn correlation_id(&self) -> i64 {
        self.correlation_id
    }

    /// Session id of the publisher owning this image
    pub fn session_id(&self) -> i32 {
        self.session_id
    }

    /// Stream id of the image
    pub fn stream_id(&self) -> i32 {
        self.stream_id
    }

    /// Counter id tracking the subscriber's consumption position
    pub fn subscriber_position_id(&self) -> i32 {
        self.subscriber_position_id
    }

    /// Registration id of the subscription this image belongs to
    pub fn subscription_registration_id(&self) -> i64 {
        self.subscription_registration_id
    }

    /// Name of the memory-mapped log file backing this image's term buffers
    pub fn log_file_name(&self) -> &str {
        &self.log_file_name
    }

    /// Human readable identity of the image's source
    pub fn source_identity(&self) -> &str {
        &self.source_identity
    }
}
