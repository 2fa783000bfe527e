//! Handles to publications registered with the media driver.
use crate::client_conductor::ConductorOps;
use crate::error::Result;
use crate::log_buffers::LogBuffers;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

struct PublicationCore {
    channel: String,
    stream_id: i32,
    session_id: i32,
    publication_limit_counter_id: i32,
    channel_status_indicator_id: i32,
    registration_id: i64,
    log_buffers: Arc<LogBuffers>,
    is_closed: AtomicBool,
    conductor: Weak<dyn ConductorOps>,
}

#[allow(clippy::too_many_arguments)]
fn new_core(
    channel: String,
    stream_id: i32,
    session_id: i32,
    publication_limit_counter_id: i32,
    channel_status_indicator_id: i32,
    registration_id: i64,
    log_buffers: Arc<LogBuffers>,
    conductor: Weak<dyn ConductorOps>,
) -> Arc<PublicationCore> {
    Arc::new(PublicationCore {
        channel,
        stream_id,
        session_id,
        publication_limit_counter_id,
        channel_status_indicator_id,
        registration_id,
        log_buffers,
        is_closed: AtomicBool::new(false),
        conductor,
    })
}

macro_rules! publication_handle {
    ($name:ident, $release:ident) => {
        /// Handle to a publication registered with the media driver
        #[derive(Clone)]
        pub struct $name(Arc<PublicationCore>);

        impl $name {
            #[allow(clippy::too_many_arguments)]
            pub(crate) fn new(
                channel: String,
                stream_id: i32,
                session_id: i32,
                publication_limit_counter_id: i32,
                channel_status_indicator_id: i32,
                registration_id: i64,
                log_buffers: Arc<LogBuffers>,
                conductor: Weak<dyn ConductorOps>,
            ) -> Self {
                $name(new_core(
                    channel,
                    stream_id,
                    session_id,
                    publication_limit_counter_id,
                    channel_status_indicator_id,
                    registration_id,
                    log_buffers,
                    conductor,
                ))
            }

            /// Channel URI this publication was registered against
            pub fn channel(&self) -> &str {
                &self.0.channel
            }

            /// Stream id this publication was registered against
            pub fn stream_id(&self) -> i32 {
                self.0.stream_id
            }

            /// Session id assigned by the driver
            pub fn session_id(&self) -> i32 {
                self.0.session_id
            }

            /// Counter id tracking this publication's position limit
            pub fn publication_limit_counter_id(&self) -> i32 {
                self.0.publication_limit_counter_id
            }

            /// Counter id tracking the channel endpoint's status
            pub fn channel_status_indicator_id(&self) -> i32 {
                self.0.channel_status_indicator_id
            }

            /// Registration id assigned by the driver proxy. Stable for this
            /// handle's lifetime; this crate does not implement rebind, so it
            /// is also the original registration id.
            pub fn registration_id(&self) -> i64 {
                self.0.registration_id
            }

            /// The memory-mapped log file backing this publication's term buffers
            pub fn log_buffers(&self) -> &Arc<LogBuffers> {
                &self.0.log_buffers
            }

            /// Whether this publication has been released
            pub fn is_closed(&self) -> bool {
                self.0.is_closed.load(Ordering::Acquire)
            }

            /// Release this publication. A no-op if already closed.
            pub fn close(&self) -> Result<()> {
                if self.0.is_closed.swap(true, Ordering::AcqRel) {
                    return Ok(());
                }
                if let Some(conductor) = self.0.conductor.upgrade() {
                    conductor.$release(self.0.registration_id)?;
                }
                Ok(())
            }

            /// Mark this publication closed without a driver round trip, used
            /// when the conductor force-closes every registered resource.
            pub(crate) fn force_close(&self) {
                self.0.is_closed.store(true, Ordering::Release);
            }
        }
    };
}

publication_handle!(Publication, release_publication);
publication_handle!(ExclusivePublication, release_publication);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::log_buffers::LogBuffers;
    use tempfile::NamedTempFile;

    fn dangling_log_buffers() -> Arc<LogBuffers> {
        let file = NamedTempFile::new().unwrap();
        file.as_file().set_len(4096).unwrap();
        Arc::new(LogBuffers::map(file.path().to_str().unwrap()).unwrap())
    }

    fn no_conductor() -> Weak<dyn ConductorOps> {
        Weak::<crate::client_conductor::ClientConductor<Vec<u8>>>::new()
    }

    #[test]
    fn getters_reflect_construction_arguments() {
        let pub_ = Publication::new(
            "aeron:udp?endpoint=localhost:40123".to_string(),
            10,
            0x11111111,
            3,
            5,
            7,
            dangling_log_buffers(),
            no_conductor(),
        );

        assert_eq!(pub_.channel(), "aeron:udp?endpoint=localhost:40123");
        assert_eq!(pub_.stream_id(), 10);
        assert_eq!(pub_.session_id(), 0x11111111);
        assert_eq!(pub_.publication_limit_counter_id(), 3);
        assert_eq!(pub_.channel_status_indicator_id(), 5);
        assert_eq!(pub_.registration_id(), 7);
        assert!(!pub_.is_closed());
    }

    #[test]
    fn close_is_idempotent_with_no_conductor_attached() {
        let pub_ = Publication::new(
            "aeron:ipc".to_string(),
            1,
            1,
            1,
            1,
            1,
            dangling_log_buffers(),
            no_conductor(),
        );

        assert!(!pub_.is_closed());
        pub_.close().unwrap();
        assert!(pub_.is_closed());
        // Second close is a no-op: no conductor to route through, no panic.
        pub_.close().unwrap();
        assert!(pub_.is_closed());
    }

    #[test]
    fn force_close_marks_closed_without_a_conductor_round_trip() {
        let pub_ = ExclusivePublication::new(
            "aeron:ipc".to_string(),
            1,
            1,
            1,
            1,
            1,
            dangling_log_buffers(),
            no_conductor(),
        );

        pub_.force_close();
        assert!(pub_.is_closed());
    }
}
