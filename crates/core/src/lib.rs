//! Core types for the vaclink relay client.
//!
//! This crate defines the foundational abstractions shared by the protocol
//! and session crates: the unified error taxonomy, the normalized event
//! model and the typed broadcast streams the session publishes on.

pub mod bus;
pub mod error;
pub mod event;

pub use bus::{Bus, BusReceiver, DEFAULT_CHANNEL_CAPACITY};
pub use error::{Error, Result};
pub use event::{Event, UNKNOWN_EVENT};
