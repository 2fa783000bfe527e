//! Top level client handle: connects to a running media driver's CnC file
//! and exposes the registration API backed by a [`ClientConductor`].
use crate::client_conductor::ClientConductor;
use crate::cnc_descriptor::{CncMetadataDefn, CNC_FILE, CNC_VERSION, META_DATA_LENGTH};
use crate::command::flyweight::Flyweight;
use crate::concurrent::broadcast::{BroadcastReceiver, CopyBroadcastReceiver};
use crate::concurrent::ring_buffer::ManyToOneRingBuffer;
use crate::context::{AvailableImageHandler, Context, UnavailableImageHandler};
use crate::counter::Counter;
use crate::driver_listener_adapter::DriverListenerAdapter;
use crate::driver_proxy::DriverProxy;
use crate::error::{AeronError, Result};
use crate::publication::{ExclusivePublication, Publication};
use crate::subscription::Subscription;
use memmap::MmapOptions;
use std::fs::OpenOptions;
use std::sync::Arc;

/// A connected Aeron client. Wraps a [`ClientConductor`] mapped over a
/// running media driver's command-and-control file.
pub struct Aeron {
    conductor: Arc<ClientConductor<memmap::MmapMut>>,
    context: Arc<Context>,
}

impl Aeron {
    /// Connect to the media driver described by `context`. Opens and
    /// validates the driver's CnC file, maps its to-driver and to-clients
    /// regions as two independent mappings over the same file, and
    /// constructs a conductor ready for `do_work`/`add*` calls.
    pub fn connect(context: Context) -> Result<Self> {
        let context = Arc::new(context);
        let aeron_dir = context.resolve_aeron_dir();
        let cnc_path = aeron_dir.join(CNC_FILE);

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(&cnc_path)
            .map_err(|_| AeronError::DriverNotRunning(aeron_dir.display().to_string()))?;

        let file_len = file.metadata()?.len();
        if file_len < META_DATA_LENGTH as u64 {
            return Err(AeronError::DriverNotRunning(aeron_dir.display().to_string()));
        }

        let (to_driver_len, to_clients_len, cnc_version) = {
            let header_mmap = unsafe { MmapOptions::new().len(META_DATA_LENGTH).map_mut(&file)? };
            let header = Flyweight::new::<CncMetadataDefn>(header_mmap, 0)?;
            (header.to_driver_buffer_length(), header.to_clients_buffer_length(), header.cnc_version())
        };

        if cnc_version != CNC_VERSION {
            return Err(AeronError::IncompatibleCncVersion {
                found: cnc_version,
                expected: CNC_VERSION,
            });
        }
        if to_driver_len <= 0 || to_clients_len <= 0 {
            return Err(AeronError::DriverNotRunning(aeron_dir.display().to_string()));
        }

        let to_driver_mmap = unsafe {
            MmapOptions::new()
                .offset(META_DATA_LENGTH as u64)
                .len(to_driver_len as usize)
                .map_mut(&file)?
        };
        let to_clients_mmap = unsafe {
            MmapOptions::new()
                .offset(META_DATA_LENGTH as u64 + to_driver_len as u64)
                .len(to_clients_len as usize)
                .map_mut(&file)?
        };

        let to_driver = ManyToOneRingBuffer::new(to_driver_mmap)?;
        let driver_proxy = DriverProxy::new(to_driver);
        let client_id = driver_proxy.client_id();

        let receiver = BroadcastReceiver::new(to_clients_mmap)?;
        let adapter = DriverListenerAdapter::new(CopyBroadcastReceiver::new(receiver));

        let conductor = ClientConductor::new(client_id, context.clone(), driver_proxy, adapter);

        log::info!("connected to media driver at {}", aeron_dir.display());
        Ok(Aeron { conductor, context })
    }

    /// Client id assigned by the driver's correlation id sequence
    pub fn client_id(&self) -> i64 {
        self.conductor.client_id()
    }

    /// Configuration this client was connected with
    pub fn context(&self) -> &Arc<Context> {
        &self.context
    }

    /// The underlying conductor, for use with an [`crate::agent_runner::AgentRunner`]
    pub fn conductor(&self) -> &Arc<ClientConductor<memmap::MmapMut>> {
        &self.conductor
    }

    /// Register a new shared publication
    pub fn add_publication(&self, channel: &str, stream_id: i32) -> Result<Publication> {
        self.conductor.add_publication(channel, stream_id)
    }

    /// Register a new exclusive publication
    pub fn add_exclusive_publication(&self, channel: &str, stream_id: i32) -> Result<ExclusivePublication> {
        self.conductor.add_exclusive_publication(channel, stream_id)
    }

    /// Register a new subscription
    pub fn add_subscription(
        &self,
        channel: &str,
        stream_id: i32,
        available_image_handler: Option<AvailableImageHandler>,
        unavailable_image_handler: Option<UnavailableImageHandler>,
    ) -> Result<Subscription> {
        self.conductor.add_subscription(channel, stream_id, available_image_handler, unavailable_image_handler)
    }

    /// Register a counter with an explicit key and label
    pub fn add_counter(&self, type_id: i32, key: &[u8], label: &str) -> Result<Counter> {
        self.conductor.add_counter(type_id, key, label)
    }

    /// Register a counter with no key, only a label
    pub fn add_counter_with_label(&self, type_id: i32, label: &str) -> Result<Counter> {
        self.conductor.add_counter_with_label(type_id, label)
    }

    /// Add a manual destination to an existing publication's channel endpoint
    pub fn add_destination(&self, registration_id: i64, endpoint_channel: &str) -> Result<()> {
        self.conductor.add_destination(registration_id, endpoint_channel)
    }

    /// Remove a manual destination from an existing publication's channel endpoint
    pub fn remove_destination(&self, registration_id: i64, endpoint_channel: &str) -> Result<()> {
        self.conductor.remove_destination(registration_id, endpoint_channel)
    }

    /// Add a manual receive destination to an existing subscription's channel endpoint
    pub fn add_rcv_destination(&self, registration_id: i64, endpoint_channel: &str) -> Result<()> {
        self.conductor.add_rcv_destination(registration_id, endpoint_channel)
    }

    /// Remove a manual receive destination from an existing subscription's channel endpoint
    pub fn remove_rcv_destination(&self, registration_id: i64, endpoint_channel: &str) -> Result<()> {
        self.conductor.remove_rcv_destination(registration_id, endpoint_channel)
    }

    /// Drive one tick of conductor work: timeout checks and pending driver events
    pub fn do_work(&self) -> Result<i32> {
        self.conductor.do_work()
    }

    /// Tear down this client: force-close every resource and notify the driver once
    pub fn close(&self) -> Result<()> {
        self.conductor.close()
    }
}

impl Drop for Aeron {
    fn drop(&mut self) {
        if let Err(e) = self.conductor.close() {
            log::warn!("error while closing Aeron client conductor on drop: {}", e);
        }
    }
}
