//! The client conductor: single-lock-serialized coordination point between
//! application threads (`add*`/`release*` calls) and the media driver
//! (correlated responses, pushed events, liveness).
use crate::context::{AvailableImageHandler, Context, ErrorHandler, UnavailableImageHandler};
use crate::counter::Counter;
use crate::driver_listener_adapter::{DriverListener, DriverListenerAdapter, NO_CORRELATION_ID};
use crate::driver_proxy::DriverProxy;
use crate::error::{AeronError, Result};
use crate::image::Image;
use crate::log_buffers::LogBuffers;
use crate::publication::{ExclusivePublication, Publication};
use crate::subscription::Subscription;
use crate::concurrent::AtomicBuffer;
use std::collections::HashMap;
use std::sync::{Arc, Weak};
use std::time::Duration;

/// Maximum length, in bytes, of a counter key
pub const MAX_KEY_LENGTH: usize = 128;
/// Maximum length, in bytes, of a counter label
pub const MAX_LABEL_LENGTH: usize = 380;

/// Back-reference handed to `Publication`/`Subscription`/`Counter` so they
/// can route `close()` back through the conductor without being generic over
/// its buffer type.
pub(crate) trait ConductorOps: Send + Sync {
    fn release_publication(&self, registration_id: i64) -> Result<()>;
    fn release_subscription(&self, registration_id: i64) -> Result<()>;
    fn release_counter(&self, registration_id: i64) -> Result<()>;
}

enum RegisteredResource {
    Publication(Publication),
    ExclusivePublication(ExclusivePublication),
    Subscription(Subscription),
    Counter(Counter),
}

struct LogBufferEntry {
    buffers: Arc<LogBuffers>,
    refcount: i64,
}

struct LingerEntry {
    buffers: Arc<LogBuffers>,
    time_of_last_state_change_ns: i64,
}

struct Registry {
    resources: HashMap<i64, RegisteredResource>,
    log_buffers: HashMap<i64, LogBufferEntry>,
    lingering: Vec<LingerEntry>,
    /// Single slot for the channel of the in-flight `add*Publication` call.
    /// Sound only because the conductor lock is held across the whole await.
    stashed_channel: Option<String>,
    /// Registration failure latched by `OnError`, consumed by the await loop
    /// for the correlation id it names.
    driver_exception: Option<AeronError>,
    /// Fatal condition observed from a listener callback (`OnClientTimeout`),
    /// which cannot itself return a `Result`.
    pending_fatal: Option<AeronError>,
    conductor_ops: Weak<dyn ConductorOps>,
}

fn acquire_log_buffers(registry: &mut Registry, context: &Context, registration_id: i64, file_name: &str) -> Result<Arc<LogBuffers>> {
    if let Some(entry) = registry.log_buffers.get_mut(&registration_id) {
        entry.refcount += 1;
        return Ok(entry.buffers.clone());
    }
    let buffers = Arc::new((context.log_buffers_factory())(file_name)?);
    registry.log_buffers.insert(registration_id, LogBufferEntry { buffers: buffers.clone(), refcount: 1 });
    Ok(buffers)
}

fn release_log_buffers(registry: &mut Registry, registration_id: i64, now: i64) {
    let empty = if let Some(entry) = registry.log_buffers.get_mut(&registration_id) {
        entry.refcount -= 1;
        entry.refcount <= 0
    } else {
        false
    };
    if empty {
        if let Some(removed) = registry.log_buffers.remove(&registration_id) {
            registry.lingering.push(LingerEntry {
                buffers: removed.buffers,
                time_of_last_state_change_ns: now,
            });
        }
    }
}

fn invoke_callback<F: FnOnce()>(error_handler: &ErrorHandler, f: F) {
    if let Err(payload) = std::panic::catch_unwind(std::panic::AssertUnwindSafe(f)) {
        let message = if let Some(s) = payload.downcast_ref::<&str>() {
            s.to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "user callback panicked".to_string()
        };
        error_handler(&AeronError::Unexpected(message));
    }
}

/// Temporary `DriverListener` impl over a disjoint borrow of the conductor's
/// locked state, constructed fresh for each `poll_driver_events` call.
struct RegistryListener<'a> {
    registry: &'a mut Registry,
    context: &'a Context,
    client_id: i64,
}

impl<'a> RegistryListener<'a> {
    #[allow(clippy::too_many_arguments)]
    fn new_publication(
        &mut self,
        correlation_id: i64,
        registration_id: i64,
        stream_id: i32,
        session_id: i32,
        publication_limit_counter_id: i32,
        channel_status_indicator_id: i32,
        log_file_name: &str,
        exclusive: bool,
    ) {
        let channel = self.registry.stashed_channel.clone().unwrap_or_default();
        let buffers = match acquire_log_buffers(self.registry, self.context, registration_id, log_file_name) {
            Ok(b) => b,
            Err(e) => {
                (self.context.error_handler())(&e);
                return;
            }
        };
        let conductor = self.registry.conductor_ops.clone();
        if exclusive {
            let publication = ExclusivePublication::new(
                channel,
                stream_id,
                session_id,
                publication_limit_counter_id,
                channel_status_indicator_id,
                registration_id,
                buffers,
                conductor,
            );
            self.registry.resources.insert(correlation_id, RegisteredResource::ExclusivePublication(publication));
        } else {
            let publication = Publication::new(
                channel,
                stream_id,
                session_id,
                publication_limit_counter_id,
                channel_status_indicator_id,
                registration_id,
                buffers,
                conductor,
            );
            self.registry.resources.insert(correlation_id, RegisteredResource::Publication(publication));
        }
    }
}

impl<'a> DriverListener for RegistryListener<'a> {
    fn on_error(&mut self, correlation_id: i64, error_code: i32, message: &str) {
        if correlation_id == NO_CORRELATION_ID {
            let status_indicator_id = error_code;
            for resource in self.registry.resources.values() {
                let matches = match resource {
                    RegisteredResource::Publication(p) => p.channel_status_indicator_id() == status_indicator_id,
                    RegisteredResource::ExclusivePublication(p) => p.channel_status_indicator_id() == status_indicator_id,
                    RegisteredResource::Subscription(s) => s.channel_status_indicator_id() == status_indicator_id,
                    RegisteredResource::Counter(_) => false,
                };
                if matches {
                    (self.context.error_handler())(&AeronError::ChannelEndpointError {
                        status_indicator_id,
                        message: message.to_string(),
                    });
                }
            }
        } else {
            self.registry.driver_exception = Some(AeronError::RegistrationFailure {
                correlation_id,
                code: error_code,
                message: message.to_string(),
            });
        }
    }

    fn on_new_publication(
        &mut self,
        correlation_id: i64,
        registration_id: i64,
        stream_id: i32,
        session_id: i32,
        publication_limit_counter_id: i32,
        channel_status_indicator_id: i32,
        log_file_name: &str,
    ) {
        self.new_publication(
            correlation_id,
            registration_id,
            stream_id,
            session_id,
            publication_limit_counter_id,
            channel_status_indicator_id,
            log_file_name,
            false,
        );
    }

    fn on_new_exclusive_publication(
        &mut self,
        correlation_id: i64,
        registration_id: i64,
        stream_id: i32,
        session_id: i32,
        publication_limit_counter_id: i32,
        channel_status_indicator_id: i32,
        log_file_name: &str,
    ) {
        self.new_publication(
            correlation_id,
            registration_id,
            stream_id,
            session_id,
            publication_limit_counter_id,
            channel_status_indicator_id,
            log_file_name,
            true,
        );
    }

    fn on_new_subscription(&mut self, correlation_id: i64, channel_status_indicator_id: i32) {
        if let Some(RegisteredResource::Subscription(s)) = self.registry.resources.get(&correlation_id) {
            s.set_channel_status_indicator_id(channel_status_indicator_id);
        }
    }

    fn on_available_image(
        &mut self,
        correlation_id: i64,
        session_id: i32,
        stream_id: i32,
        subscriber_position_id: i32,
        subscription_registration_id: i64,
        log_file_name: &str,
        source_identity: &str,
    ) {
        let subscription = match self.registry.resources.get(&subscription_registration_id) {
            Some(RegisteredResource::Subscription(s)) => s.clone(),
            _ => return,
        };
        if subscription.has_image(correlation_id) {
            return;
        }
        if let Err(e) = acquire_log_buffers(self.registry, self.context, correlation_id, log_file_name) {
            (self.context.error_handler())(&e);
            return;
        }

        let image = Image::new(
            correlation_id,
            session_id,
            stream_id,
            subscriber_position_id,
            subscription_registration_id,
            log_file_name.to_string(),
            source_identity.to_string(),
        );

        if let Some(handler) = subscription.available_image_handler() {
            let handler = handler.clone();
            let image_for_cb = image.clone();
            invoke_callback(self.context.error_handler(), move || handler(&image_for_cb));
        }
        subscription.add_image(image);
    }

    fn on_unavailable_image(&mut self, correlation_id: i64, subscription_registration_id: i64, _stream_id: i32) {
        let subscription = match self.registry.resources.get(&subscription_registration_id) {
            Some(RegisteredResource::Subscription(s)) => s.clone(),
            _ => return,
        };
        if let Some(image) = subscription.remove_image(correlation_id) {
            if let Some(handler) = subscription.unavailable_image_handler() {
                let handler = handler.clone();
                let image_for_cb = image.clone();
                invoke_callback(self.context.error_handler(), move || handler(&image_for_cb));
            }
            let now = self.context.nano_clock().nanos();
            release_log_buffers(self.registry, correlation_id, now);
        }
    }

    fn on_new_counter(&mut self, correlation_id: i64, counter_id: i32) {
        let counter = Counter::new(correlation_id, counter_id, self.registry.conductor_ops.clone());
        self.registry.resources.insert(correlation_id, RegisteredResource::Counter(counter));
        if let Some(handler) = self.context.available_counter_handler() {
            let handler = handler.clone();
            invoke_callback(self.context.error_handler(), move || handler(correlation_id, counter_id));
        }
    }

    fn on_available_counter(&mut self, registration_id: i64, counter_id: i32) {
        if let Some(handler) = self.context.available_counter_handler() {
            let handler = handler.clone();
            invoke_callback(self.context.error_handler(), move || handler(registration_id, counter_id));
        }
    }

    fn on_unavailable_counter(&mut self, registration_id: i64, counter_id: i32) {
        if let Some(handler) = self.context.unavailable_counter_handler() {
            let handler = handler.clone();
            invoke_callback(self.context.error_handler(), move || handler(registration_id, counter_id));
        }
    }

    fn on_client_timeout(&mut self, client_id: i64) {
        if client_id == self.client_id {
            self.registry.pending_fatal = Some(AeronError::DriverTimeout("driver evicted this client (OnClientTimeout)".into()));
        }
    }
}

struct ConductorState<A>
where
    A: AtomicBuffer,
{
    driver_proxy: DriverProxy<A>,
    adapter: DriverListenerAdapter<A>,
    registry: Registry,
    time_of_last_service_ns: i64,
    time_of_last_keep_alive_ns: i64,
    time_of_last_resources_check_ns: i64,
    is_closed: bool,
}

/// Single-lock-serialized coordination point between application threads and
/// the media driver. Application threads call the `add*`/`release*` methods;
/// an external agent runner calls `do_work` to drive timeouts and dispatch
/// pushed driver events.
pub struct ClientConductor<A>
where
    A: AtomicBuffer + Send + 'static,
{
    client_id: i64,
    context: Arc<Context>,
    state: parking_lot::Mutex<ConductorState<A>>,
}

impl<A> ClientConductor<A>
where
    A: AtomicBuffer + Send + 'static,
{
    pub(crate) fn new(client_id: i64, context: Arc<Context>, driver_proxy: DriverProxy<A>, adapter: DriverListenerAdapter<A>) -> Arc<Self> {
        Arc::new_cyclic(|weak: &Weak<ClientConductor<A>>| {
            let now = context.nano_clock().nanos();
            ClientConductor {
                client_id,
                context,
                state: parking_lot::Mutex::new(ConductorState {
                    driver_proxy,
                    adapter,
                    registry: Registry {
                        resources: HashMap::new(),
                        log_buffers: HashMap::new(),
                        lingering: Vec::new(),
                        stashed_channel: None,
                        driver_exception: None,
                        pending_fatal: None,
                        conductor_ops: weak.clone(),
                    },
                    time_of_last_service_ns: now,
                    time_of_last_keep_alive_ns: now,
                    time_of_last_resources_check_ns: now,
                    is_closed: false,
                }),
            }
        })
    }

    /// Client id assigned by the driver proxy's first correlation id
    pub fn client_id(&self) -> i64 {
        self.client_id
    }

    /// Register a new shared publication, blocking until the driver
    /// acknowledges it or the driver timeout elapses.
    pub fn add_publication(&self, channel: &str, stream_id: i32) -> Result<Publication> {
        let mut guard = self.state.lock();
        let state = &mut *guard;
        if state.is_closed {
            return Err(AeronError::ClientClosed);
        }
        state.registry.stashed_channel = Some(channel.to_string());
        let correlation_id = state.driver_proxy.add_publication(channel, stream_id)?;
        let result = self.await_response(state, correlation_id);
        state.registry.stashed_channel = None;
        result?;
        match state.registry.resources.get(&correlation_id) {
            Some(RegisteredResource::Publication(p)) => Ok(p.clone()),
            _ => Err(AeronError::Unexpected("publication missing after successful registration".into())),
        }
    }

    /// Register a new exclusive publication
    pub fn add_exclusive_publication(&self, channel: &str, stream_id: i32) -> Result<ExclusivePublication> {
        let mut guard = self.state.lock();
        let state = &mut *guard;
        if state.is_closed {
            return Err(AeronError::ClientClosed);
        }
        state.registry.stashed_channel = Some(channel.to_string());
        let correlation_id = state.driver_proxy.add_exclusive_publication(channel, stream_id)?;
        let result = self.await_response(state, correlation_id);
        state.registry.stashed_channel = None;
        result?;
        match state.registry.resources.get(&correlation_id) {
            Some(RegisteredResource::ExclusivePublication(p)) => Ok(p.clone()),
            _ => Err(AeronError::Unexpected("publication missing after successful registration".into())),
        }
    }

    /// Register a new subscription. The returned handle is inserted into the
    /// registry before the await begins; if the await times out, the
    /// subscription remains registered and usable for a later
    /// `release_subscription`.
    pub fn add_subscription(
        &self,
        channel: &str,
        stream_id: i32,
        available_image_handler: Option<AvailableImageHandler>,
        unavailable_image_handler: Option<UnavailableImageHandler>,
    ) -> Result<Subscription> {
        let mut guard = self.state.lock();
        let state = &mut *guard;
        if state.is_closed {
            return Err(AeronError::ClientClosed);
        }
        let correlation_id = state.driver_proxy.add_subscription(channel, stream_id)?;
        let resolved_available = available_image_handler.or_else(|| self.context.available_image_handler().cloned());
        let resolved_unavailable = unavailable_image_handler.or_else(|| self.context.unavailable_image_handler().cloned());
        let subscription = Subscription::new(
            correlation_id,
            channel.to_string(),
            stream_id,
            resolved_available,
            resolved_unavailable,
            state.registry.conductor_ops.clone(),
        );
        state.registry.resources.insert(correlation_id, RegisteredResource::Subscription(subscription.clone()));
        self.await_response(state, correlation_id)?;
        Ok(subscription)
    }

    /// Register a counter with an explicit key and label
    pub fn add_counter(&self, type_id: i32, key: &[u8], label: &str) -> Result<Counter> {
        if key.len() > MAX_KEY_LENGTH {
            return Err(AeronError::InvalidArgument(format!("counter key length {} exceeds max {}", key.len(), MAX_KEY_LENGTH)));
        }
        if label.len() > MAX_LABEL_LENGTH {
            return Err(AeronError::InvalidArgument(format!(
                "counter label length {} exceeds max {}",
                label.len(),
                MAX_LABEL_LENGTH
            )));
        }
        let mut guard = self.state.lock();
        let state = &mut *guard;
        if state.is_closed {
            return Err(AeronError::ClientClosed);
        }
        let correlation_id = state.driver_proxy.add_counter(type_id, key, label)?;
        self.await_response(state, correlation_id)?;
        match state.registry.resources.get(&correlation_id) {
            Some(RegisteredResource::Counter(c)) => Ok(c.clone()),
            _ => Err(AeronError::Unexpected("counter missing after successful registration".into())),
        }
    }

    /// Register a counter with no key, only a label
    pub fn add_counter_with_label(&self, type_id: i32, label: &str) -> Result<Counter> {
        self.add_counter(type_id, &[], label)
    }

    /// Add a manual destination to an existing publication's channel endpoint
    pub fn add_destination(&self, registration_id: i64, endpoint_channel: &str) -> Result<()> {
        let mut guard = self.state.lock();
        let state = &mut *guard;
        if state.is_closed {
            return Err(AeronError::ClientClosed);
        }
        let correlation_id = state.driver_proxy.add_destination(registration_id, endpoint_channel)?;
        self.await_response(state, correlation_id)
    }

    /// Remove a manual destination from an existing publication's channel endpoint
    pub fn remove_destination(&self, registration_id: i64, endpoint_channel: &str) -> Result<()> {
        let mut guard = self.state.lock();
        let state = &mut *guard;
        if state.is_closed {
            return Err(AeronError::ClientClosed);
        }
        let correlation_id = state.driver_proxy.remove_destination(registration_id, endpoint_channel)?;
        self.await_response(state, correlation_id)
    }

    /// Add a manual receive destination to an existing subscription's channel endpoint
    pub fn add_rcv_destination(&self, registration_id: i64, endpoint_channel: &str) -> Result<()> {
        let mut guard = self.state.lock();
        let state = &mut *guard;
        if state.is_closed {
            return Err(AeronError::ClientClosed);
        }
        let correlation_id = state.driver_proxy.add_rcv_destination(registration_id, endpoint_channel)?;
        self.await_response(state, correlation_id)
    }

    /// Remove a manual receive destination from an existing subscription's channel endpoint
    pub fn remove_rcv_destination(&self, registration_id: i64, endpoint_channel: &str) -> Result<()> {
        let mut guard = self.state.lock();
        let state = &mut *guard;
        if state.is_closed {
            return Err(AeronError::ClientClosed);
        }
        let correlation_id = state.driver_proxy.remove_rcv_destination(registration_id, endpoint_channel)?;
        self.await_response(state, correlation_id)
    }

    /// Driven by an external agent runner. Tries the lock non-blockingly;
    /// returns `Ok(0)` immediately if another caller currently holds it.
    pub fn do_work(&self) -> Result<i32> {
        match self.state.try_lock() {
            Some(mut guard) => {
                let state = &mut *guard;
                if state.is_closed {
                    return Err(AeronError::ClientClosed);
                }
                self.service(state, NO_CORRELATION_ID)
            }
            None => Ok(0),
        }
    }

    /// Tear down the conductor: force-close every registered resource,
    /// notify the driver once, and reclaim every lingering log buffer
    /// unconditionally. A no-op if already closed.
    pub fn close(&self) -> Result<()> {
        let mut guard = self.state.lock();
        self.close_locked(&mut guard);
        Ok(())
    }

    fn service(&self, state: &mut ConductorState<A>, correlation_id: i64) -> Result<i32> {
        self.run_timeout_checks(state)?;

        let processed = match self.poll_driver_events(state) {
            Ok(n) => n,
            Err(e) => {
                (self.context.error_handler())(&e);
                if correlation_id != NO_CORRELATION_ID {
                    return Err(e);
                }
                0
            }
        };

        if let Some(fatal) = state.registry.pending_fatal.take() {
            log::error!("conductor closing on fatal event: {}", fatal);
            self.close_locked(state);
            return Err(fatal);
        }

        Ok(processed)
    }

    fn poll_driver_events(&self, state: &mut ConductorState<A>) -> Result<i32> {
        let ConductorState { adapter, registry, .. } = state;
        let mut listener = RegistryListener {
            registry,
            context: &self.context,
            client_id: self.client_id,
        };
        adapter.receive_message(&mut listener)
    }

    fn await_response(&self, state: &mut ConductorState<A>, correlation_id: i64) -> Result<()> {
        state.registry.driver_exception = None;
        let deadline_ns = self.context.nano_clock().nanos() + self.context.driver_timeout_ms() * 1_000_000;

        loop {
            self.context.idle_strategy().idle(0);
            self.service(state, correlation_id)?;

            if state.adapter.last_received_correlation_id() == correlation_id {
                if let Some(e) = state.registry.driver_exception.take() {
                    return Err(e);
                }
                return Ok(());
            }

            if self.context.nano_clock().nanos() > deadline_ns {
                return Err(AeronError::DriverTimeout(format!("no response received for correlation id {}", correlation_id)));
            }
        }
    }

    fn run_timeout_checks(&self, state: &mut ConductorState<A>) -> Result<()> {
        let now = self.context.nano_clock().nanos();

        if now - state.time_of_last_service_ns <= self.context.idle_sleep_ns() {
            return Ok(());
        }

        if now - state.time_of_last_service_ns > self.context.inter_service_timeout_ns() {
            log::error!("conductor service timeout exceeded");
            self.close_locked(state);
            return Err(AeronError::ConductorServiceTimeout);
        }

        if now - state.time_of_last_keep_alive_ns > self.context.keep_alive_interval_ns() {
            let last_driver_keepalive_ms = state.driver_proxy.time_of_last_driver_keepalive_ms();
            let epoch_now = self.context.epoch_clock().epoch_millis();
            if epoch_now > last_driver_keepalive_ms + self.context.driver_timeout_ms() {
                log::error!("driver keepalive is stale");
                self.close_locked(state);
                return Err(AeronError::DriverTimeout("driver keepalive is stale".into()));
            }
            state.driver_proxy.send_client_keepalive()?;
            state.time_of_last_keep_alive_ns = now;
        }

        self.sweep_lingering(state, now);

        state.time_of_last_service_ns = now;
        Ok(())
    }

    fn sweep_lingering(&self, state: &mut ConductorState<A>, now: i64) {
        if now - state.time_of_last_resources_check_ns <= self.context.resource_check_interval_ns() {
            return;
        }
        state.time_of_last_resources_check_ns = now;
        let linger_ns = self.context.resource_linger_ns();
        Self::sweep_lingering_where(&mut state.registry, self.context.error_handler(), |age| age > linger_ns, now);
    }

    fn sweep_lingering_where<F: Fn(i64) -> bool>(registry: &mut Registry, error_handler: &ErrorHandler, should_delete: F, now: i64) {
        let mut i = registry.lingering.len();
        while i > 0 {
            i -= 1;
            let age = now - registry.lingering[i].time_of_last_state_change_ns;
            if should_delete(age) {
                let entry = registry.lingering.swap_remove(i);
                match Arc::try_unwrap(entry.buffers) {
                    Ok(buffers) => {
                        if let Err(e) = buffers.delete() {
                            error_handler(&e);
                        }
                    }
                    Err(arc) => registry.lingering.push(LingerEntry {
                        buffers: arc,
                        time_of_last_state_change_ns: entry.time_of_last_state_change_ns,
                    }),
                }
            }
        }
    }

    fn force_close_all(registry: &mut Registry, now: i64) {
        for (_, resource) in registry.resources.drain() {
            match resource {
                RegisteredResource::Publication(p) => {
                    p.force_close();
                    release_log_buffers(registry, p.registration_id(), now);
                }
                RegisteredResource::ExclusivePublication(p) => {
                    p.force_close();
                    release_log_buffers(registry, p.registration_id(), now);
                }
                RegisteredResource::Subscription(s) => {
                    s.force_close();
                    for image in s.take_images() {
                        release_log_buffers(registry, image.correlation_id(), now);
                    }
                }
                RegisteredResource::Counter(c) => c.force_close(),
            }
        }
    }

    fn close_locked(&self, state: &mut ConductorState<A>) {
        if state.is_closed {
            return;
        }
        state.is_closed = true;

        let now = self.context.nano_clock().nanos();
        let before = state.registry.lingering.len();
        Self::force_close_all(&mut state.registry, now);
        if state.registry.lingering.len() > before {
            std::thread::sleep(Duration::from_millis(1));
        }

        if let Err(e) = state.driver_proxy.client_close() {
            log::debug!("client_close command not sent: {}", e);
        }

        Self::sweep_lingering_where(&mut state.registry, self.context.error_handler(), |_| true, now);
    }
}

impl<A> ConductorOps for ClientConductor<A>
where
    A: AtomicBuffer + Send + 'static,
{
    fn release_publication(&self, registration_id: i64) -> Result<()> {
        let mut guard = self.state.lock();
        let state = &mut *guard;
        if state.is_closed {
            return Ok(());
        }
        let now = self.context.nano_clock().nanos();
        match state.registry.resources.remove(&registration_id) {
            Some(RegisteredResource::Publication(_)) | Some(RegisteredResource::ExclusivePublication(_)) => {
                release_log_buffers(&mut state.registry, registration_id, now);
            }
            Some(other) => {
                state.registry.resources.insert(registration_id, other);
                return Ok(());
            }
            None => return Ok(()),
        }
        let correlation_id = state.driver_proxy.remove_publication(registration_id)?;
        self.await_response(state, correlation_id)
    }

    fn release_subscription(&self, registration_id: i64) -> Result<()> {
        let mut guard = self.state.lock();
        let state = &mut *guard;
        if state.is_closed {
            return Ok(());
        }
        let subscription = match state.registry.resources.remove(&registration_id) {
            Some(RegisteredResource::Subscription(s)) => s,
            Some(other) => {
                state.registry.resources.insert(registration_id, other);
                return Ok(());
            }
            None => return Ok(()),
        };
        let now = self.context.nano_clock().nanos();
        for image in subscription.take_images() {
            release_log_buffers(&mut state.registry, image.correlation_id(), now);
        }
        let correlation_id = state.driver_proxy.remove_subscription(registration_id)?;
        self.await_response(state, correlation_id)
    }

    fn release_counter(&self, registration_id: i64) -> Result<()> {
        let mut guard = self.state.lock();
        let state = &mut *guard;
        if state.is_closed {
            return Ok(());
        }
        match state.registry.resources.remove(&registration_id) {
            Some(RegisteredResource::Counter(c)) => c.force_close(),
            Some(other) => {
                state.registry.resources.insert(registration_id, other);
                return Ok(());
            }
            None => return Ok(()),
        }
        let correlation_id = state.driver_proxy.remove_counter(registration_id)?;
        self.await_response(state, correlation_id)
    }
}

#[cfg(test)]
impl<A> ClientConductor<A>
where
    A: AtomicBuffer + Send + 'static,
{
    fn resource_count(&self) -> usize {
        self.state.lock().registry.resources.len()
    }

    fn log_buffer_count(&self) -> usize {
        self.state.lock().registry.log_buffers.len()
    }

    fn lingering_count(&self) -> usize {
        self.state.lock().registry.lingering.len()
    }

    fn is_closed(&self) -> bool {
        self.state.lock().is_closed
    }
}

/// Exercises the conductor through the same two shared-memory buffers a real
/// media driver would use, with a [`FakeDriver`] standing in for the driver:
/// it drains commands off the to-driver ring buffer on its own thread and
/// broadcasts responses back, exactly the protocol `DriverProxy` and
/// `DriverListenerAdapter` are written against.
#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::concurrent::broadcast::{
        buffer_descriptor as bcast_buffer_descriptor, record_descriptor as bcast_record_descriptor, BroadcastReceiver, CopyBroadcastReceiver,
    };
    use crate::concurrent::ring_buffer::{buffer_descriptor as ring_buffer_descriptor, ManyToOneRingBuffer};
    use crate::control_protocol::{ClientCommand, DriverResponse};
    use crate::util::bit::align;
    use std::cell::UnsafeCell;
    use std::convert::TryFrom;
    use std::ops::{Deref, DerefMut};
    use std::thread;
    use std::time::Duration;
    use tempfile::NamedTempFile;

    const TO_DRIVER_CAPACITY: usize = 4096;
    const TO_DRIVER_SIZE: usize = TO_DRIVER_CAPACITY + ring_buffer_descriptor::TRAILER_LENGTH as usize;
    const TO_CLIENTS_CAPACITY: usize = 4096;
    const TO_CLIENTS_SIZE: usize = TO_CLIENTS_CAPACITY + bcast_buffer_descriptor::TRAILER_LENGTH as usize;

    /// Two handles over one heap allocation, aliased without synchronization
    /// other than the atomic/volatile operations `AtomicBuffer` already uses.
    /// This is exactly the contract a real `MmapMut` gives two processes
    /// mapping the same file; `Arc<UnsafeCell<_>>` is the in-process stand-in.
    struct SharedBuffer(Arc<UnsafeCell<Vec<u8>>>);

    impl SharedBuffer {
        fn new(size: usize) -> Self {
            SharedBuffer(Arc::new(UnsafeCell::new(vec![0u8; size])))
        }
    }

    impl Clone for SharedBuffer {
        fn clone(&self) -> Self {
            SharedBuffer(self.0.clone())
        }
    }

    // SAFETY: every field the ring buffer / broadcast buffer protocols touch
    // concurrently is accessed through atomic or volatile operations.
    unsafe impl Send for SharedBuffer {}
    unsafe impl Sync for SharedBuffer {}

    impl Deref for SharedBuffer {
        type Target = [u8];
        fn deref(&self) -> &[u8] {
            unsafe { (*self.0.get()).as_slice() }
        }
    }

    impl DerefMut for SharedBuffer {
        fn deref_mut(&mut self) -> &mut [u8] {
            unsafe { (*self.0.get()).as_mut_slice() }
        }
    }

    impl AtomicBuffer for SharedBuffer {}

    /// Plays the media driver's role in a test: drains commands off the
    /// to-driver ring buffer and appends response records to the to-clients
    /// broadcast buffer.
    struct FakeDriver {
        to_driver: ManyToOneRingBuffer<SharedBuffer>,
        to_clients: SharedBuffer,
        next_broadcast_offset: i32,
    }

    impl FakeDriver {
        fn new(to_driver: SharedBuffer, to_clients: SharedBuffer) -> Self {
            FakeDriver {
                to_driver: ManyToOneRingBuffer::new(to_driver).unwrap(),
                to_clients,
                next_broadcast_offset: 0,
            }
        }

        /// Drain whatever commands are currently available, returning each
        /// as `(msg_type_id, correlation_id)`. Every command this crate's
        /// `DriverProxy` writes carries its correlation id as the first
        /// field, so the fake driver never needs to know the full layout.
        fn drain_commands(&mut self) -> Vec<(i32, i64)> {
            let mut seen = Vec::new();
            self.to_driver
                .read(|msg_type_id, body| {
                    let correlation_id = body.get_i64(0).unwrap_or(-1);
                    seen.push((msg_type_id, correlation_id));
                })
                .unwrap();
            seen
        }

        /// Block until at least one command is available and return the first.
        fn wait_for_command(&mut self) -> (i32, i64) {
            loop {
                let mut commands = self.drain_commands();
                if !commands.is_empty() {
                    return commands.remove(0);
                }
                thread::sleep(Duration::from_millis(1));
            }
        }

        fn broadcast(&mut self, response: DriverResponse, payload: &[u8]) {
            let record_len = bcast_record_descriptor::HEADER_LENGTH + payload.len() as i32;
            let aligned = align(record_len as usize, bcast_record_descriptor::RECORD_ALIGNMENT as usize) as i32;
            let offset = self.next_broadcast_offset;
            assert!(
                offset + aligned <= TO_CLIENTS_CAPACITY as i32,
                "test broadcast buffer exhausted; widen TO_CLIENTS_CAPACITY"
            );

            self.to_clients.put_i32(bcast_record_descriptor::type_offset(offset), response as i32).unwrap();
            self.to_clients
                .put_slice(bcast_record_descriptor::msg_offset(offset), payload, 0, payload.len() as i32)
                .unwrap();
            self.to_clients
                .put_i32_ordered(bcast_record_descriptor::length_offset(offset), record_len)
                .unwrap();

            self.next_broadcast_offset = offset + aligned;
            let advance = self.next_broadcast_offset as i64;
            self.to_clients
                .put_i64_ordered(TO_CLIENTS_CAPACITY as i32 + bcast_buffer_descriptor::TAIL_COUNTER_OFFSET, advance)
                .unwrap();
            self.to_clients
                .put_i64_ordered(TO_CLIENTS_CAPACITY as i32 + bcast_buffer_descriptor::TAIL_INTENT_COUNTER_OFFSET, advance)
                .unwrap();
        }

        fn send_on_error(&mut self, correlation_id: i64, error_code: i32, message: &str) {
            let mut payload = vec![0u8; 16 + message.len()];
            payload.put_i64(0, correlation_id).unwrap();
            payload.put_i32(8, error_code).unwrap();
            let written = payload.put_string(12, message).unwrap();
            payload.truncate((12 + written) as usize);
            self.broadcast(DriverResponse::OnError, &payload);
        }

        #[allow(clippy::too_many_arguments)]
        fn send_publication_ready(
            &mut self,
            response: DriverResponse,
            correlation_id: i64,
            registration_id: i64,
            stream_id: i32,
            session_id: i32,
            publication_limit_counter_id: i32,
            channel_status_indicator_id: i32,
            log_file_name: &str,
        ) {
            let mut payload = vec![0u8; 36 + log_file_name.len()];
            payload.put_i64(0, correlation_id).unwrap();
            payload.put_i64(8, registration_id).unwrap();
            payload.put_i32(16, stream_id).unwrap();
            payload.put_i32(20, session_id).unwrap();
            payload.put_i32(24, publication_limit_counter_id).unwrap();
            payload.put_i32(28, channel_status_indicator_id).unwrap();
            let written = payload.put_string(32, log_file_name).unwrap();
            payload.truncate((32 + written) as usize);
            self.broadcast(response, &payload);
        }

        fn send_subscription_ready(&mut self, correlation_id: i64, channel_status_indicator_id: i32) {
            let mut payload = vec![0u8; 16];
            payload.put_i64(0, correlation_id).unwrap();
            payload.put_i32(8, channel_status_indicator_id).unwrap();
            self.broadcast(DriverResponse::OnSubscriptionReady, &payload);
        }

        #[allow(clippy::too_many_arguments)]
        fn send_available_image(
            &mut self,
            correlation_id: i64,
            session_id: i32,
            stream_id: i32,
            subscriber_position_id: i32,
            subscription_registration_id: i64,
            log_file_name: &str,
            source_identity: &str,
        ) {
            let mut payload = vec![0u8; 32 + log_file_name.len() + source_identity.len()];
            payload.put_i64(0, correlation_id).unwrap();
            payload.put_i32(8, session_id).unwrap();
            payload.put_i32(12, stream_id).unwrap();
            payload.put_i32(16, subscriber_position_id).unwrap();
            payload.put_i64(20, subscription_registration_id).unwrap();
            let written = payload.put_string(28, log_file_name).unwrap();
            let written2 = payload.put_string(28 + written, source_identity).unwrap();
            payload.truncate((28 + written + written2) as usize);
            self.broadcast(DriverResponse::OnAvailableImage, &payload);
        }

        fn send_unavailable_image(&mut self, correlation_id: i64, subscription_registration_id: i64, stream_id: i32) {
            let channel = "aeron:udp?endpoint=localhost:40123";
            let mut payload = vec![0u8; 24 + channel.len()];
            payload.put_i64(0, correlation_id).unwrap();
            payload.put_i64(8, subscription_registration_id).unwrap();
            payload.put_i32(16, stream_id).unwrap();
            let written = payload.put_string(20, channel).unwrap();
            payload.truncate((20 + written) as usize);
            self.broadcast(DriverResponse::OnUnavailableImage, &payload);
        }

        fn send_operation_success(&mut self, correlation_id: i64) {
            let mut payload = vec![0u8; 8];
            payload.put_i64(0, correlation_id).unwrap();
            self.broadcast(DriverResponse::OnOperationSuccess, &payload);
        }
    }

    /// Builds a `ClientConductor` wired to a fresh pair of shared buffers, and
    /// a `FakeDriver` over handles to the same memory.
    fn new_harness(context: Context) -> (Arc<ClientConductor<SharedBuffer>>, FakeDriver) {
        let to_driver_buf = SharedBuffer::new(TO_DRIVER_SIZE);
        let to_clients_buf = SharedBuffer::new(TO_CLIENTS_SIZE);

        let to_driver = ManyToOneRingBuffer::new(to_driver_buf.clone()).unwrap();
        let driver_proxy = DriverProxy::new(to_driver);
        let client_id = driver_proxy.client_id();

        let receiver = BroadcastReceiver::new(to_clients_buf.clone()).unwrap();
        let adapter = DriverListenerAdapter::new(CopyBroadcastReceiver::new(receiver));

        let conductor = ClientConductor::new(client_id, Arc::new(context), driver_proxy, adapter);
        let fake_driver = FakeDriver::new(to_driver_buf, to_clients_buf);
        (conductor, fake_driver)
    }

    /// A real, empty-but-mapped log file a `LogBuffers::map` call can open.
    fn temp_log_file() -> (NamedTempFile, String) {
        let file = NamedTempFile::new().unwrap();
        file.as_file().set_len(4096).unwrap();
        let path = file.path().to_str().unwrap().to_string();
        (file, path)
    }

    fn fast_timeouts() -> Context {
        Context::default().set_driver_timeout_ms(2_000).set_idle_sleep_ns(0)
    }

    /// Lets `RUST_LOG=debug cargo test` surface the conductor's own
    /// `log::error!`/`log::debug!` call sites around the fatal-timeout tests.
    fn init_test_logging() {
        let _ = env_logger::try_init();
    }

    #[test]
    fn happy_add_and_release_publication() {
        init_test_logging();
        let (_log_file, log_path) = temp_log_file();
        let (conductor, mut driver) = new_harness(fast_timeouts());

        let responder = thread::spawn(move || {
            let (msg_type, correlation_id) = driver.wait_for_command();
            assert_eq!(ClientCommand::try_from(msg_type), Ok(ClientCommand::AddPublication));
            driver.send_publication_ready(
                DriverResponse::OnPublicationReady,
                correlation_id,
                correlation_id,
                10,
                0x11111111,
                3,
                5,
                &log_path,
            );

            let (msg_type, remove_correlation_id) = driver.wait_for_command();
            assert_eq!(ClientCommand::try_from(msg_type), Ok(ClientCommand::RemovePublication));
            driver.send_operation_success(remove_correlation_id);
        });

        let publication = conductor.add_publication("aeron:udp?endpoint=localhost:40123", 10).unwrap();
        assert_eq!(publication.stream_id(), 10);
        assert_eq!(publication.session_id(), 0x11111111);
        assert_eq!(publication.channel_status_indicator_id(), 5);
        assert_eq!(conductor.resource_count(), 1);
        assert_eq!(conductor.log_buffer_count(), 1);

        publication.close().unwrap();
        assert_eq!(conductor.resource_count(), 0);
        // the log buffers outlive the publication during the linger window
        assert_eq!(conductor.lingering_count(), 1);

        // releasing twice is a no-op; no second remove command is ever sent
        publication.close().unwrap();

        responder.join().unwrap();
    }

    #[test]
    fn driver_timeout_on_add_subscription_leaves_it_registered() {
        let context = Context::default().set_driver_timeout_ms(50).set_idle_sleep_ns(0);
        let (conductor, _driver) = new_harness(context);

        // the fake driver never responds; the call must time out
        let result = conductor.add_subscription("aeron:ipc", 3, None, None);
        assert!(matches!(result, Err(AeronError::DriverTimeout(_))));

        // per the documented open question, the pre-inserted subscription is
        // left registered rather than rolled back
        assert_eq!(conductor.resource_count(), 1);
    }

    #[test]
    fn use_after_close_is_rejected() {
        let (conductor, _driver) = new_harness(fast_timeouts());
        conductor.close().unwrap();
        assert!(conductor.is_closed());

        let result = conductor.add_publication("aeron:ipc", 1);
        assert!(matches!(result, Err(AeronError::ClientClosed)));
    }

    #[test]
    fn close_twice_tears_down_exactly_once() {
        let (conductor, _driver) = new_harness(fast_timeouts());
        conductor.close().unwrap();
        conductor.close().unwrap();
        assert!(conductor.is_closed());
    }

    #[test]
    fn counter_key_too_long_is_rejected_before_any_command_is_sent() {
        let (conductor, mut driver) = new_harness(fast_timeouts());
        let oversized_key = vec![0u8; MAX_KEY_LENGTH + 1];

        let result = conductor.add_counter(7, &oversized_key, "a label");
        assert!(matches!(result, Err(AeronError::InvalidArgument(_))));
        assert!(driver.drain_commands().is_empty());
    }

    #[test]
    fn channel_endpoint_error_is_reported_without_removing_resources() {
        let (pub_log, pub_log_path) = temp_log_file();
        let (sub_log, sub_log_path) = temp_log_file();
        let _keep_alive = (&pub_log, &sub_log);

        let errors: Arc<parking_lot::Mutex<Vec<AeronError>>> = Arc::new(parking_lot::Mutex::new(Vec::new()));
        let errors_for_handler = errors.clone();
        let context = fast_timeouts().set_error_handler(Arc::new(move |e| errors_for_handler.lock().push(e.clone())));
        let (conductor, mut driver) = new_harness(context);

        let responder = thread::spawn(move || {
            let (_, correlation_id) = driver.wait_for_command();
            driver.send_publication_ready(DriverResponse::OnPublicationReady, correlation_id, correlation_id, 10, 1, 3, 5, &pub_log_path);
            driver
        });
        let publication = conductor.add_publication("aeron:udp?endpoint=localhost:40123", 10).unwrap();
        let mut driver = responder.join().unwrap();

        let responder = thread::spawn(move || {
            let (_, correlation_id) = driver.wait_for_command();
            driver.send_subscription_ready(correlation_id, 6);
            driver
        });
        let subscription = conductor.add_subscription("aeron:ipc", 3, None, None).unwrap();
        let mut driver = responder.join().unwrap();

        driver.send_on_error(-1, 5, "bind failed");
        // drive one service tick so the conductor observes the broadcast event
        conductor.do_work().unwrap();

        assert_eq!(conductor.resource_count(), 2);
        assert!(!publication.is_closed());
        assert!(!subscription.is_closed());

        let seen = errors.lock();
        assert_eq!(seen.len(), 1);
        match &seen[0] {
            AeronError::ChannelEndpointError { status_indicator_id, message } => {
                assert_eq!(*status_indicator_id, 5);
                assert_eq!(message, "bind failed");
            }
            other => panic!("expected a channel endpoint error, got {:?}", other),
        }
    }

    #[test]
    fn driver_keepalive_staleness_is_fatal() {
        init_test_logging();
        let epoch = ManualClock::new(0);
        let nano = ManualClock::new(0);
        let context = Context::default()
            .set_driver_timeout_ms(500)
            .set_keep_alive_interval_ns(0)
            .set_idle_sleep_ns(0)
            .set_epoch_clock(epoch.clone())
            .set_nano_clock(nano.clone());
        let (conductor, _driver) = new_harness(context);

        // a fresh ring buffer reports a keepalive of 0ms; push the wall clock
        // past the driver timeout without the (nonexistent) driver updating it
        epoch.advance(600);
        nano.advance(1);

        let result = conductor.do_work();
        assert!(matches!(result, Err(AeronError::DriverTimeout(_))));
        assert!(conductor.is_closed());
    }

    #[test]
    fn inter_service_timeout_force_closes_and_is_fatal() {
        init_test_logging();
        let nano = ManualClock::new(0);
        let context = Context::default()
            .set_inter_service_timeout_ns(100)
            .set_idle_sleep_ns(0)
            .set_nano_clock(nano.clone());
        let (conductor, mut driver) = new_harness(context);

        let (pub_log, pub_log_path) = temp_log_file();
        let _keep_alive = &pub_log;
        let responder = thread::spawn(move || {
            let (_, correlation_id) = driver.wait_for_command();
            driver.send_publication_ready(DriverResponse::OnPublicationReady, correlation_id, correlation_id, 10, 1, 3, 5, &pub_log_path);
        });
        let publication = conductor.add_publication("aeron:udp?endpoint=localhost:40123", 10).unwrap();
        responder.join().unwrap();

        nano.advance(200);
        let result = conductor.do_work();
        assert!(matches!(result, Err(AeronError::ConductorServiceTimeout)));
        assert!(conductor.is_closed());
        // force-close dropped the registry without a remove round trip
        assert_eq!(conductor.resource_count(), 0);
        assert!(publication.is_closed());
    }

    #[test]
    fn shared_log_buffers_are_tracked_per_image_registration_id() {
        let (log_a, log_a_path) = temp_log_file();
        let _keep_alive = &log_a;
        let context = fast_timeouts();
        let (conductor, mut driver) = new_harness(context);

        let responder = thread::spawn(move || {
            let (_, correlation_id) = driver.wait_for_command();
            driver.send_subscription_ready(correlation_id, 9);
            driver
        });
        let subscription = conductor.add_subscription("aeron:ipc", 3, None, None).unwrap();
        let mut driver = responder.join().unwrap();

        // two images on the same subscription share one file name but are
        // each tracked under their own image correlation id
        driver.send_available_image(30, 11, 3, 4, subscription.registration_id(), &log_a_path, "udp://a");
        driver.send_available_image(31, 12, 3, 5, subscription.registration_id(), &log_a_path, "udp://b");
        conductor.do_work().unwrap();
        conductor.do_work().unwrap();

        assert_eq!(subscription.images().len(), 2);
        assert_eq!(conductor.log_buffer_count(), 2);

        driver.send_unavailable_image(30, subscription.registration_id(), 3);
        conductor.do_work().unwrap();
        assert_eq!(subscription.images().len(), 1);
        assert_eq!(conductor.log_buffer_count(), 1);
        assert_eq!(conductor.lingering_count(), 1);

        driver.send_unavailable_image(31, subscription.registration_id(), 3);
        conductor.do_work().unwrap();
        assert_eq!(subscription.images().len(), 0);
        assert_eq!(conductor.log_buffer_count(), 0);
        assert_eq!(conductor.lingering_count(), 2);
    }

    #[test]
    fn registration_failure_is_surfaced_to_the_caller() {
        let (conductor, mut driver) = new_harness(fast_timeouts());

        let responder = thread::spawn(move || {
            let (_, correlation_id) = driver.wait_for_command();
            driver.send_on_error(correlation_id, 11, "invalid channel");
        });

        let result = conductor.add_publication("not a channel", 10);
        responder.join().unwrap();

        match result {
            Err(AeronError::RegistrationFailure { code, message, .. }) => {
                assert_eq!(code, 11);
                assert_eq!(message, "invalid channel");
            }
            other => panic!("expected a registration failure, got {:?}", other),
        }
        // the failed registration never occupied a registry slot
        assert_eq!(conductor.resource_count(), 0);
    }
}
