//! Error taxonomy for the Aeron client conductor.
//!
//! Every fallible operation in this crate returns [`Result<T>`] over the one
//! [`AeronError`] enum, rather than a per-module error type, so callers never
//! need `From` conversions at module boundaries.

use thiserror::Error;

/// Result type for operations in the Aeron client
pub type Result<T> = ::std::result::Result<T, AeronError>;

/// Error types from operations in the Aeron client.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum AeronError {
    /// Indication that an argument provided is an illegal value
    #[error("illegal argument")]
    IllegalArgument,

    /// Indication that a memory access would exceed the allowable bounds
    #[error("out of bounds")]
    OutOfBounds,

    /// Indication that a buffer operation could not complete because of space constraints
    #[error("insufficient capacity")]
    InsufficientCapacity,

    /// Indication that we have reached an invalid state and can't continue processing
    #[error("illegal state: {0}")]
    IllegalState(String),

    /// Operation attempted on a conductor that has already been closed.
    #[error("client conductor is closed")]
    ClientClosed,

    /// A key or label supplied to `add_counter` exceeded the driver's bound.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The media driver rejected a specific correlation id.
    #[error("registration failed for correlation id {correlation_id}: driver error {code}: {message}")]
    RegistrationFailure {
        /// Correlation id the driver rejected.
        correlation_id: i64,
        /// Driver-supplied error code.
        code: i32,
        /// Driver-supplied human readable message.
        message: String,
    },

    /// No response was received from the media driver within the configured timeout,
    /// or the driver's keepalive has gone stale, or the driver reported this client
    /// as timed out.
    #[error("driver timeout: {0}")]
    DriverTimeout(String),

    /// The gap between two successive service ticks exceeded `interServiceTimeoutNs`.
    /// Always fatal to the conductor that observes it.
    #[error("conductor service timeout exceeded")]
    ConductorServiceTimeout,

    /// Asynchronous notification of a problem with a specific channel endpoint.
    /// Never fatal; the affected resource is left registered.
    #[error("channel endpoint error on status indicator {status_indicator_id}: {message}")]
    ChannelEndpointError {
        /// The channel-status counter id the error was reported against.
        status_indicator_id: i32,
        /// Driver-supplied human readable message.
        message: String,
    },

    /// A user-supplied callback panicked or returned an error. Never fatal.
    #[error("unexpected error in user callback: {0}")]
    Unexpected(String),

    /// No CnC file was found (or it was empty/stale) in the Aeron directory at connect time.
    #[error("media driver is not running in directory {0}")]
    DriverNotRunning(String),

    /// The CnC file's version does not match the version this crate speaks.
    #[error("incompatible CnC version: found {found}, expected {expected}")]
    IncompatibleCncVersion {
        /// Version found in the CnC file.
        found: i32,
        /// Version this crate was built against.
        expected: i32,
    },

    /// Underlying I/O failure (opening or mapping a file).
    #[error("I/O error: {0}")]
    Io(String),
}

impl From<std::io::Error> for AeronError {
    fn from(e: std::io::Error) -> Self {
        AeronError::Io(e.to_string())
    }
}

// NOTE: `DriverTimeout` is raised from two call sites with different fatality.
// An `awaitResponse` timeout on a single `add*`/`release*` call leaves the
// conductor running; a liveness-check timeout (stale driver keepalive, or an
// `OnClientTimeout` naming this client) always closes the conductor first.
// Fatality is therefore a property of the call site, not of the error value,
// so it is not encoded on `AeronError` itself: the conductor always calls
// `close()` before returning a fatal `DriverTimeout`/`ConductorServiceTimeout`.
