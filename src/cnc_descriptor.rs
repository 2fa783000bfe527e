//! Description of the command-and-control (CnC) file used to bootstrap a
//! connection to the media driver.
//!
//! File layout:
//!
//! ```text
//! +-----------------------------+
//! |          Meta Data          |
//! +-----------------------------+
//! |      to-driver Buffer       |
//! +-----------------------------+
//! |      to-clients Buffer      |
//! +-----------------------------+
//! ```
//!
//! Only the regions a client conductor actually touches (the metadata header
//! and the two ring/broadcast buffers) are modeled here; counters and the
//! error log are out of scope.
use crate::command::flyweight::Flyweight;
use crate::concurrent::AtomicBuffer;
use crate::util::bit;
use std::mem::size_of;

/// Header at the start of the CnC file.
///
/// ```text
///  0                   1                   2                   3
///  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |                      Aeron CnC Version                        |
/// +---------------------------------------------------------------+
/// |                   to-driver buffer length                     |
/// +---------------------------------------------------------------+
/// |                  to-clients buffer length                     |
/// +---------------------------------------------------------------+
/// |                   Client Liveness Timeout                     |
/// |                                                               |
/// +---------------------------------------------------------------+
/// |                    Driver Start Timestamp                     |
/// |                                                               |
/// +---------------------------------------------------------------+
/// ```
#[repr(C, packed(4))]
pub struct CncMetadataDefn {
    cnc_version: i32,
    to_driver_buffer_length: i32,
    to_clients_buffer_length: i32,
    client_liveness_timeout_ns: i64,
    start_timestamp_ms: i64,
}

impl<A> Flyweight<A, CncMetadataDefn>
where
    A: AtomicBuffer,
{
    /// CnC file format version this header claims to speak
    pub fn cnc_version(&self) -> i32 {
        self.get_struct().cnc_version
    }

    /// Set the CnC file format version
    pub fn put_cnc_version(&mut self, value: i32) -> &mut Self {
        self.get_struct_mut().cnc_version = value;
        self
    }

    /// Size in bytes of the to-driver ring buffer, trailer included
    pub fn to_driver_buffer_length(&self) -> i32 {
        self.get_struct().to_driver_buffer_length
    }

    /// Set the size in bytes of the to-driver ring buffer
    pub fn put_to_driver_buffer_length(&mut self, value: i32) -> &mut Self {
        self.get_struct_mut().to_driver_buffer_length = value;
        self
    }

    /// Size in bytes of the to-clients broadcast buffer, trailer included
    pub fn to_clients_buffer_length(&self) -> i32 {
        self.get_struct().to_clients_buffer_length
    }

    /// Set the size in bytes of the to-clients broadcast buffer
    pub fn put_to_clients_buffer_length(&mut self, value: i32) -> &mut Self {
        self.get_struct_mut().to_clients_buffer_length = value;
        self
    }

    /// Maximum duration, in nanoseconds, the driver will tolerate not hearing
    /// a keepalive from this client before evicting it
    pub fn client_liveness_timeout_ns(&self) -> i64 {
        self.get_struct().client_liveness_timeout_ns
    }

    /// Set the client liveness timeout
    pub fn put_client_liveness_timeout_ns(&mut self, value: i64) -> &mut Self {
        self.get_struct_mut().client_liveness_timeout_ns = value;
        self
    }

    /// Wall-clock timestamp, in milliseconds, at which the driver started
    pub fn start_timestamp_ms(&self) -> i64 {
        self.get_struct().start_timestamp_ms
    }

    /// Set the driver start timestamp
    pub fn put_start_timestamp_ms(&mut self, value: i64) -> &mut Self {
        self.get_struct_mut().start_timestamp_ms = value;
        self
    }
}

/// Length of the metadata block at the head of the CnC file. Not equivalent
/// to `size_of::<CncMetadataDefn>()`; the header is padded out to a cache-line
/// aligned boundary so the buffers that follow it start on their own lines.
pub const META_DATA_LENGTH: usize = bit::align(size_of::<CncMetadataDefn>(), bit::CACHE_LINE_LENGTH * 2);

/// CnC file format version this crate speaks. Bump whenever the metadata
/// header or buffer framing changes in an incompatible way.
pub const CNC_VERSION: i32 = 1;

/// Filename of the CnC file inside an Aeron media driver directory
pub const CNC_FILE: &str = "cnc.dat";
