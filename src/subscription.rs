//! Handle to a subscription registered with the media driver.
use crate::client_conductor::ConductorOps;
use crate::context::{AvailableImageHandler, UnavailableImageHandler};
use crate::error::Result;
use crate::image::Image;
use std::sync::atomic::{AtomicBool, AtomicI32, Ordering};
use std::sync::{Arc, Weak};

struct SubscriptionState {
    registration_id: i64,
    channel: String,
    stream_id: i32,
    channel_status_indicator_id: AtomicI32,
    images: parking_lot::Mutex<Vec<Image>>,
    available_image_handler: Option<AvailableImageHandler>,
    unavailable_image_handler: Option<UnavailableImageHandler>,
    is_closed: AtomicBool,
    conductor: Weak<dyn ConductorOps>,
}

const UNALLOCATED_STATUS_ID: i32 = -1;

/// A subscription registered with the media driver, tracking the set of
/// images (per-publisher read positions) currently active on it
#[derive(Clone)]
pub struct Subscription(Arc<SubscriptionState>);

impl Subscription {
    pub(crate) fn new(
        registration_id: i64,
        channel: String,
        stream_id: i32,
        available_image_handler: Option<AvailableImageHandler>,
        unavailable_image_handler: Option<UnavailableImageHandler>,
        conductor: Weak<dyn ConductorOps>,
    ) -> Self {
        Subscription(Arc::new(SubscriptionState {
            registration_id,
            channel,
            stream_id,
            channel_status_indicator_id: AtomicI32::new(UNALLOCATED_STATUS_ID),
            images: parking_lot::Mutex::new(Vec::new()),
            available_image_handler,
            unavailable_image_handler,
            is_closed: AtomicBool::new(false),
            conductor,
        }))
    }

    /// Registration id assigned by the driver proxy
    pub fn registration_id(&self) -> i64 {
        self.0.registration_id
    }

    /// Channel URI this subscription was registered against
    pub fn channel(&self) -> &str {
        &self.0.channel
    }

    /// Stream id this subscription was registered against
    pub fn stream_id(&self) -> i32 {
        self.0.stream_id
    }

    /// Counter id tracking the channel endpoint's status, or `-1` if the
    /// driver has not yet acknowledged this subscription
    pub fn channel_status_indicator_id(&self) -> i32 {
        self.0.channel_status_indicator_id.load(Ordering::Acquire)
    }

    pub(crate) fn set_channel_status_indicator_id(&self, value: i32) {
        self.0.channel_status_indicator_id.store(value, Ordering::Release);
    }

    /// Snapshot of images currently active on this subscription
    pub fn images(&self) -> Vec<Image> {
        self.0.images.lock().clone()
    }

    /// Whether this subscription currently has the image with `correlation_id`
    pub fn has_image(&self, correlation_id: i64) -> bool {
        self.0.images.lock().iter().any(|i| i.correlation_id() == correlation_id)
    }

    pub(crate) fn available_image_handler(&self) -> Option<&AvailableImageHandler> {
        self.0.available_image_handler.as_ref()
    }

    pub(crate) fn unavailable_image_handler(&self) -> Option<&UnavailableImageHandler> {
        self.0.unavailable_image_handler.as_ref()
    }

    pub(crate) fn add_image(&self, image: Image) {
        self.0.images.lock().push(image);
    }

    /// Remove and return the image with `correlation_id`, if present
    pub(crate) fn remove_image(&self, correlation_id: i64) -> Option<Image> {
        let mut images = self.0.images.lock();
        let pos = images.iter().position(|i| i.correlation_id() == correlation_id)?;
        Some(images.remove(pos))
    }

    pub(crate) fn take_images(&self) -> Vec<Image> {
        std::mem::take(&mut *self.0.images.lock())
    }

    /// Whether this subscription has been released
    pub fn is_closed(&self) -> bool {
        self.0.is_closed.load(Ordering::Acquire)
    }

    /// Release this subscription. A no-op if already closed.
    pub fn close(&self) -> Result<()> {
        if self.0.is_closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        if let Some(conductor) = self.0.conductor.upgrade() {
            conductor.release_subscription(self.0.registration_id)?;
        }
        Ok(())
    }

    /// Mark this subscription closed without a driver round trip, used when
    /// the conductor force-closes every registered resource.
    pub(crate) fn force_close(&self) {
        self.0.is_closed.store(true, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::Image;

    fn no_conductor() -> Weak<dyn ConductorOps> {
        Weak::<crate::client_conductor::ClientConductor<Vec<u8>>>::new()
    }

    fn image(correlation_id: i64) -> Image {
        Image::new(correlation_id, 0x11111111, 10, 3, 20, "/tmp/log-A".to_string(), "127.0.0.1:40456".to_string())
    }

    #[test]
    fn channel_status_id_starts_unallocated() {
        let sub = Subscription::new(20, "aeron:ipc".to_string(), 3, None, None, no_conductor());
        assert_eq!(sub.channel_status_indicator_id(), UNALLOCATED_STATUS_ID);
        sub.set_channel_status_indicator_id(6);
        assert_eq!(sub.channel_status_indicator_id(), 6);
    }

    #[test]
    fn images_are_tracked_by_correlation_id() {
        let sub = Subscription::new(20, "aeron:ipc".to_string(), 3, None, None, no_conductor());
        assert!(sub.images().is_empty());

        sub.add_image(image(30));
        sub.add_image(image(31));
        assert!(sub.has_image(30));
        assert!(sub.has_image(31));
        assert!(!sub.has_image(32));
        assert_eq!(sub.images().len(), 2);

        let removed = sub.remove_image(30).unwrap();
        assert_eq!(removed.correlation_id(), 30);
        assert!(!sub.has_image(30));
        assert!(sub.remove_image(30).is_none());
    }

    #[test]
    fn take_images_drains_the_list() {
        let sub = Subscription::new(20, "aeron:ipc".to_string(), 3, None, None, no_conductor());
        sub.add_image(image(30));
        sub.add_image(image(31));

        let taken = sub.take_images();
        assert_eq!(taken.len(), 2);
        assert!(sub.images().is_empty());
    }

    #[test]
    fn close_is_idempotent_with_no_conductor_attached() {
        let sub = Subscription::new(20, "aeron:ipc".to_string(), 3, None, None, no_conductor());
        sub.close().unwrap();
        assert!(sub.is_closed());
        sub.close().unwrap();
        assert!(sub.is_closed());
    }

    #[test]
    fn force_close_marks_closed_without_a_conductor_round_trip() {
        let sub = Subscription::new(20, "aeron:ipc".to_string(), 3, None, None, no_conductor());
        sub.force_close();
        assert!(sub.is_closed());
    }
}
