//! Process-wide configuration surface for connecting to a media driver:
//! timeouts, clocks, callbacks, and the Aeron directory.
use crate::clock::{EpochClock, NanoClock, SystemEpochClock, SystemNanoClock};
use crate::error::{AeronError, Result};
use crate::idle_strategy::{BackoffIdleStrategy, IdleStrategy};
use crate::log_buffers::LogBuffers;
use std::path::PathBuf;
use std::sync::Arc;

/// Maps a log file path to a mapped [`LogBuffers`] handle
pub type LogBuffersFactory = Arc<dyn Fn(&str) -> Result<LogBuffers> + Send + Sync>;

/// Sink for exceptions the conductor observes but does not propagate to a
/// specific API caller (background service-tick failures, user-callback
/// panics, asynchronous channel-endpoint errors).
pub type ErrorHandler = Arc<dyn Fn(&AeronError) + Send + Sync>;

/// Invoked when a new image becomes available on a subscription
pub type AvailableImageHandler = Arc<dyn Fn(&crate::image::Image) + Send + Sync>;

/// Invoked when an image is no longer available on a subscription
pub type UnavailableImageHandler = Arc<dyn Fn(&crate::image::Image) + Send + Sync>;

/// Invoked when a counter becomes available anywhere in the driver.
/// Carries the counter's registration id and driver-assigned counter id;
/// unlike the upstream API this does not also hand back a counters-reader
/// handle, since this crate does not implement the counters-metadata reader.
pub type AvailableCounterHandler = Arc<dyn Fn(i64, i32) + Send + Sync>;

/// Invoked when a counter is no longer available
pub type UnavailableCounterHandler = Arc<dyn Fn(i64, i32) + Send + Sync>;

const KEEPALIVE_INTERVAL_NS_DEFAULT: i64 = 500_000_000;
const DRIVER_TIMEOUT_MS_DEFAULT: i64 = 10_000;
const INTER_SERVICE_TIMEOUT_NS_DEFAULT: i64 = 10_000_000_000;
const IDLE_SLEEP_NS_DEFAULT: i64 = 1_000_000;
const RESOURCE_LINGER_NS_DEFAULT: i64 = 3_000_000_000;
const RESOURCE_CHECK_INTERVAL_NS_DEFAULT: i64 = 1_000_000_000;

/// Configuration accepted by [`crate::aeron::Aeron::connect`].
pub struct Context {
    pub(crate) aeron_dir: Option<PathBuf>,
    pub(crate) keep_alive_interval_ns: i64,
    pub(crate) driver_timeout_ms: i64,
    pub(crate) inter_service_timeout_ns: i64,
    pub(crate) idle_sleep_ns: i64,
    pub(crate) resource_linger_ns: i64,
    pub(crate) resource_check_interval_ns: i64,
    pub(crate) nano_clock: Arc<dyn NanoClock>,
    pub(crate) epoch_clock: Arc<dyn EpochClock>,
    pub(crate) error_handler: ErrorHandler,
    pub(crate) available_image_handler: Option<AvailableImageHandler>,
    pub(crate) unavailable_image_handler: Option<UnavailableImageHandler>,
    pub(crate) available_counter_handler: Option<AvailableCounterHandler>,
    pub(crate) unavailable_counter_handler: Option<UnavailableCounterHandler>,
    pub(crate) idle_strategy: Arc<dyn IdleStrategy>,
    pub(crate) log_buffers_factory: LogBuffersFactory,
}

impl Context {
    /// Override the Aeron directory. If unset, resolution falls back to
    /// `$AERON_DIR`, then the platform default.
    pub fn set_aeron_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.aeron_dir = Some(dir.into());
        self
    }

    /// Interval between client keepalive commands sent to the driver
    pub fn set_keep_alive_interval_ns(mut self, value: i64) -> Self {
        self.keep_alive_interval_ns = value;
        self
    }

    /// Deadline for a single request/response round trip, and for observing
    /// driver keepalive staleness
    pub fn set_driver_timeout_ms(mut self, value: i64) -> Self {
        self.driver_timeout_ms = value;
        self
    }

    /// Maximum tolerated gap between two successive service ticks
    pub fn set_inter_service_timeout_ns(mut self, value: i64) -> Self {
        self.inter_service_timeout_ns = value;
        self
    }

    /// Throttle applied to the service-tick gate and the await backoff
    pub fn set_idle_sleep_ns(mut self, value: i64) -> Self {
        self.idle_sleep_ns = value;
        self
    }

    /// Grace period between a resource's refcount reaching zero and its
    /// physical reclamation
    pub fn set_resource_linger_ns(mut self, value: i64) -> Self {
        self.resource_linger_ns = value;
        self
    }

    /// Minimum interval between linger-list sweeps
    pub fn set_resource_check_interval_ns(mut self, value: i64) -> Self {
        self.resource_check_interval_ns = value;
        self
    }

    /// Override the monotonic clock used for all internal timeout arithmetic
    pub fn set_nano_clock(mut self, clock: Arc<dyn NanoClock>) -> Self {
        self.nano_clock = clock;
        self
    }

    /// Override the wall-clock used to compare against the driver's
    /// published keepalive timestamp
    pub fn set_epoch_clock(mut self, clock: Arc<dyn EpochClock>) -> Self {
        self.epoch_clock = clock;
        self
    }

    /// Sink for non-fatal exceptions observed off the client API call stack
    pub fn set_error_handler(mut self, handler: ErrorHandler) -> Self {
        self.error_handler = handler;
        self
    }

    /// Default `availableImage` callback applied to subscriptions that don't
    /// supply their own
    pub fn set_available_image_handler(mut self, handler: AvailableImageHandler) -> Self {
        self.available_image_handler = Some(handler);
        self
    }

    /// Default `unavailableImage` callback applied to subscriptions that
    /// don't supply their own
    pub fn set_unavailable_image_handler(mut self, handler: UnavailableImageHandler) -> Self {
        self.unavailable_image_handler = Some(handler);
        self
    }

    /// Process-wide handler invoked when any counter becomes available
    pub fn set_available_counter_handler(mut self, handler: AvailableCounterHandler) -> Self {
        self.available_counter_handler = Some(handler);
        self
    }

    /// Process-wide handler invoked when any counter becomes unavailable
    pub fn set_unavailable_counter_handler(mut self, handler: UnavailableCounterHandler) -> Self {
        self.unavailable_counter_handler = Some(handler);
        self
    }

    /// Override the idle strategy used between service ticks and during await backoff
    pub fn set_idle_strategy(mut self, strategy: Arc<dyn IdleStrategy>) -> Self {
        self.idle_strategy = strategy;
        self
    }

    /// Override how a log file name is turned into a mapped [`LogBuffers`]
    pub fn set_log_buffers_factory(mut self, factory: LogBuffersFactory) -> Self {
        self.log_buffers_factory = factory;
        self
    }

    pub(crate) fn log_buffers_factory(&self) -> &LogBuffersFactory {
        &self.log_buffers_factory
    }

    pub(crate) fn keep_alive_interval_ns(&self) -> i64 {
        self.keep_alive_interval_ns
    }

    pub(crate) fn driver_timeout_ms(&self) -> i64 {
        self.driver_timeout_ms
    }

    pub(crate) fn inter_service_timeout_ns(&self) -> i64 {
        self.inter_service_timeout_ns
    }

    pub(crate) fn idle_sleep_ns(&self) -> i64 {
        self.idle_sleep_ns
    }

    pub(crate) fn resource_linger_ns(&self) -> i64 {
        self.resource_linger_ns
    }

    pub(crate) fn resource_check_interval_ns(&self) -> i64 {
        self.resource_check_interval_ns
    }

    pub(crate) fn nano_clock(&self) -> &Arc<dyn NanoClock> {
        &self.nano_clock
    }

    pub(crate) fn epoch_clock(&self) -> &Arc<dyn EpochClock> {
        &self.epoch_clock
    }

    pub(crate) fn error_handler(&self) -> &ErrorHandler {
        &self.error_handler
    }

    pub(crate) fn idle_strategy(&self) -> &Arc<dyn IdleStrategy> {
        &self.idle_strategy
    }

    pub(crate) fn available_image_handler(&self) -> Option<&AvailableImageHandler> {
        self.available_image_handler.as_ref()
    }

    pub(crate) fn unavailable_image_handler(&self) -> Option<&UnavailableImageHandler> {
        self.unavailable_image_handler.as_ref()
    }

    pub(crate) fn available_counter_handler(&self) -> Option<&AvailableCounterHandler> {
        self.available_counter_handler.as_ref()
    }

    pub(crate) fn unavailable_counter_handler(&self) -> Option<&UnavailableCounterHandler> {
        self.unavailable_counter_handler.as_ref()
    }

    /// Resolve the Aeron directory: explicit override, else `$AERON_DIR`,
    /// else the platform default (`/dev/shm/aeron-$USER` on Linux,
    /// `$TMPDIR/aeron-$USER` elsewhere).
    pub fn resolve_aeron_dir(&self) -> PathBuf {
        if let Some(dir) = &self.aeron_dir {
            return dir.clone();
        }
        if let Ok(dir) = std::env::var("AERON_DIR") {
            return PathBuf::from(dir);
        }

        let user = get_user_name();
        if cfg!(target_os = "linux") {
            PathBuf::from(format!("/dev/shm/aeron-{}", user))
        } else {
            let tmp_dir = std::env::var("TMPDIR").unwrap_or_else(|_| "/tmp".to_string());
            PathBuf::from(format!("{}/aeron-{}", tmp_dir, user))
        }
    }
}

fn get_user_name() -> String {
    for var in &["USER", "USERNAME", "LOGNAME"] {
        if let Ok(name) = std::env::var(var) {
            if !name.is_empty() {
                return name;
            }
        }
    }
    "default".to_string()
}

impl Default for Context {
    fn default() -> Self {
        Context {
            aeron_dir: None,
            keep_alive_interval_ns: KEEPALIVE_INTERVAL_NS_DEFAULT,
            driver_timeout_ms: DRIVER_TIMEOUT_MS_DEFAULT,
            inter_service_timeout_ns: INTER_SERVICE_TIMEOUT_NS_DEFAULT,
            idle_sleep_ns: IDLE_SLEEP_NS_DEFAULT,
            resource_linger_ns: RESOURCE_LINGER_NS_DEFAULT,
            resource_check_interval_ns: RESOURCE_CHECK_INTERVAL_NS_DEFAULT,
            nano_clock: Arc::new(SystemNanoClock),
            epoch_clock: Arc::new(SystemEpochClock),
            error_handler: Arc::new(|e| log::warn!("unhandled conductor error: {}", e)),
            available_image_handler: None,
            unavailable_image_handler: None,
            available_counter_handler: None,
            unavailable_counter_handler: None,
            idle_strategy: Arc::new(BackoffIdleStrategy::default()),
            log_buffers_factory: Arc::new(|path| LogBuffers::map(path)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_explicit_override_first() {
        let ctx = Context::default().set_aeron_dir("/custom/aeron");
        assert_eq!(ctx.resolve_aeron_dir(), PathBuf::from("/custom/aeron"));
    }

    #[test]
    fn default_timeouts_are_positive() {
        let ctx = Context::default();
        assert!(ctx.keep_alive_interval_ns() > 0);
        assert!(ctx.driver_timeout_ms() > 0);
        assert!(ctx.inter_service_timeout_ns() > 0);
        assert!(ctx.resource_linger_ns() > 0);
    }
}
