//! Client conductor for a shared-memory messaging client.
//!
//! An out-of-process media driver owns the network and disk I/O; this crate
//! is the client-side half, responsible for issuing control commands to the
//! driver over a shared-memory command-and-control file, correlating its
//! asynchronous responses, and managing the reference-counted lifecycle of
//! the memory-mapped log buffers the data plane reads and writes directly.
//!
//! [`aeron::Aeron::connect`] is the entry point. Everything returned from it
//! (`Publication`, `ExclusivePublication`, `Subscription`, `Counter`) is a
//! cheap `Clone`-able handle backed by a weak reference to the conductor;
//! dropping every handle does not release a resource, calling `close()` does.
pub mod aeron;
pub mod agent_runner;
pub mod client_conductor;
pub mod clock;
pub mod cnc_descriptor;
pub mod command;
pub mod concurrent;
pub mod context;
pub mod control_protocol;
pub mod counter;
pub mod driver_listener_adapter;
pub mod driver_proxy;
pub mod error;
pub mod idle_strategy;
pub mod image;
pub mod log_buffers;
pub mod publication;
pub mod subscription;
pub mod util;

pub use aeron::Aeron;
pub use agent_runner::{Agent, AgentRunner};
pub use context::Context;
pub use counter::Counter;
pub use error::{AeronError, Result};
pub use idle_strategy::{BackoffIdleStrategy, IdleStrategy};
pub use image::Image;
pub use log_buffers::LogBuffers;
pub use publication::{ExclusivePublication, Publication};
pub use subscription::Subscription;
