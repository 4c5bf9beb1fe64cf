//! Wire-protocol translation layer for the vaclink relay client.
//!
//! This crate is pure protocol: it knows how to describe a command, how to
//! serialize it for either device generation, how to normalize anything the
//! cloud sends back and how to classify vendor error codes. It performs no
//! I/O; the session crate wires it to the relay and the broker.

pub mod builders;
pub mod codec;
pub mod command;
pub mod constants;
pub mod device;
pub mod errors;

pub use builders::{CleanAction, CleanMode, CleanSpeed, MoveAction};
pub use codec::{codec_for, JsonCodec, WireCodec, XmlCodec};
pub use command::{next_request_id, Command};
pub use device::{AccountRegion, AuthContext, DeviceDescriptor, DeviceGeneration, PayloadFormat};
pub use errors::{ClassifiedError, ErrorClassifier, FamilyPredicate, Outcome};
