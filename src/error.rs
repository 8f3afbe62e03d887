//! Error taxonomy for the three places this crate returns a typed failure:
//! startup (bind/listen/connect setup), framing (a session's protocol
//! contract was violated), and fatal reactor failures.
//!
//! Transient I/O conditions and peer-closed aren't represented as error
//! variants here; they are `io::ErrorKind` matches handled inline in the
//! reactor's read and write pumps.

use thiserror::Error;

/// Failure during `start_listen` or `start_connect`. Returned to the caller
/// with no side effects — no handle is registered.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to listen: {0}")]
    Listen(#[source] std::io::Error),

    #[error("failed to connect to {addr}: {source}")]
    Connect {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to set non-blocking mode: {0}")]
    NonBlocking(#[source] std::io::Error),

    #[error("failed to register with the readiness facility: {0}")]
    Registration(#[source] std::io::Error),

    #[error("invalid address {0}")]
    InvalidAddress(String),
}

/// A session's framing or application contract was violated. Logged, and
/// the owning connection is torn down; never surfaced to the peer.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("body size {size} exceeds maximum {max}")]
    BodyTooLarge { size: usize, max: usize },

    #[error("malformed header")]
    MalformedHeader,

    #[error("header exceeded maximum size {max} without a delimiter")]
    HeaderTooLarge { max: usize },

    #[error("could not parse request")]
    UnparseableRequest,
}

/// A readiness-facility catastrophe or allocation failure. Terminates
/// `Reactor::run`; the caller decides what to do next.
#[derive(Debug, Error)]
pub enum FatalError {
    #[error("readiness facility wait failed: {0}")]
    PollFailed(#[source] std::io::Error),

    #[error("allocation failure: {0}")]
    Allocation(String),
}
