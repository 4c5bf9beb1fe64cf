//! Session layer of the vaclink relay client.
//!
//! Owns the I/O: the relay HTTP client, the broker subscriber and the
//! pending-command registry, tied together by an explicit [`Session`] value
//! with an open/close lifecycle. The two outputs of a session are a stream
//! of normalized events and a stream of [`ErrorNotice`] items.

pub mod pending;
pub mod relay;
pub mod session;
pub mod subscriber;

pub use pending::PendingCommands;
pub use relay::{RelayClient, WireEnvelope};
pub use session::{CommandTicket, Session, SessionConfig};
pub use subscriber::Subscriber;

use vaclink_protocol::ClassifiedError;

/// Item on the session's error stream.
///
/// Vendor conditions arrive classified; connection problems are recoverable
/// signals a supervising component reacts to, never panics.
#[derive(Debug, Clone)]
pub enum ErrorNotice {
    /// A vendor error code, classified per the firmware contract.
    Vendor(ClassifiedError),
    /// Broker offline, disconnect or connection failure.
    Broker(String),
    /// Network-level failure reaching the relay.
    Network(String),
}
