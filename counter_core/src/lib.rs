#![forbid(unsafe_code)]

//! Persistent Counter: portable core.
//!
//! Owns the message types that cross the core/shell boundary, their
//! protobuf wire format, and the byte-level `CoreBoundary` the shell calls.
//! The counter state machine in `app` is reached only through `Core`; the
//! shell only ever sees encoded frames.

/// Wire schema v1. Changing field numbers or tags requires v2.
pub const SCHEMA_VERSION: u32 = 1;

pub mod domain;
pub mod proto_types;
pub mod error;
pub mod codec;
pub mod app;
pub mod bridge;

pub use bridge::{Core, CoreBoundary};
pub use codec::{decode, encode, WireMessage};
pub use domain::{DatabaseOperation, DatabaseOutput, EffectRequest, Event, ViewModel};
pub use error::{CodecError, ProtocolError};
