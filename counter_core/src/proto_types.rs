//! Hand-written protobuf types for the boundary wire format.
//!
//! Uses prost derive macros for encode/decode without prost-build.
//! Field numbers and enumeration values are the cross-language contract:
//! never renumber, only append.

use prost::Message;

// ── Frame ──────────────────────────────────────────────────────

/// Outer envelope of every buffer crossing the boundary.
#[derive(Clone, PartialEq, Message)]
pub struct ProtoFrame {
    #[prost(uint32, tag = "1")]
    pub schema_version: u32,
    #[prost(oneof = "FrameBody", tags = "2, 3, 4, 5")]
    pub body: Option<FrameBody>,
}

#[derive(Clone, PartialEq, prost::Oneof)]
pub enum FrameBody {
    #[prost(message, tag = "2")]
    Event(ProtoEvent),
    #[prost(message, tag = "3")]
    View(ProtoViewModel),
    #[prost(message, tag = "4")]
    Requests(ProtoRequestBatch),
    #[prost(message, tag = "5")]
    Request(ProtoEffectRequest),
}

impl FrameBody {
    pub fn message_name(&self) -> &'static str {
        match self {
            FrameBody::Event(_) => "Event",
            FrameBody::View(_) => "ViewModel",
            FrameBody::Requests(_) => "RequestBatch",
            FrameBody::Request(_) => "EffectRequest",
        }
    }
}

// ── Event ──────────────────────────────────────────────────────

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, prost::Enumeration)]
#[repr(i32)]
pub enum EventKind {
    Unspecified = 0,
    Initialize = 1,
    Increment = 2,
    Decrement = 3,
    Reset = 4,
    DatabaseResponse = 5,
}

#[derive(Clone, PartialEq, Message)]
pub struct ProtoEvent {
    #[prost(enumeration = "EventKind", tag = "1")]
    pub kind: i32,
    #[prost(message, optional, tag = "2")]
    pub database_output: Option<ProtoDatabaseOutput>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, prost::Enumeration)]
#[repr(i32)]
pub enum OutputKind {
    Unspecified = 0,
    Succeeded = 1,
    Failed = 2,
    Counter = 3,
}

#[derive(Clone, PartialEq, Message)]
pub struct ProtoDatabaseOutput {
    #[prost(enumeration = "OutputKind", tag = "1")]
    pub kind: i32,
    #[prost(int64, tag = "2")]
    pub counter: i64,
    #[prost(string, tag = "3")]
    pub error: String,
}

// ── View ───────────────────────────────────────────────────────

#[derive(Clone, PartialEq, Message)]
pub struct ProtoViewModel {
    #[prost(string, tag = "1")]
    pub count: String,
    #[prost(string, tag = "2")]
    pub message: String,
}

// ── Effect Requests ────────────────────────────────────────────

#[derive(Clone, PartialEq, Message)]
pub struct ProtoRequestBatch {
    #[prost(message, repeated, tag = "1")]
    pub requests: Vec<ProtoEffectRequest>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, prost::Enumeration)]
#[repr(i32)]
pub enum EffectKind {
    Unspecified = 0,
    Render = 1,
    Database = 2,
}

#[derive(Clone, PartialEq, Message)]
pub struct ProtoEffectRequest {
    #[prost(enumeration = "EffectKind", tag = "1")]
    pub kind: i32,
    #[prost(message, optional, tag = "2")]
    pub database: Option<ProtoDatabaseOperation>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, prost::Enumeration)]
#[repr(i32)]
pub enum OperationKind {
    Unspecified = 0,
    FetchCounter = 1,
    UpdateCounter = 2,
}

#[derive(Clone, PartialEq, Message)]
pub struct ProtoDatabaseOperation {
    #[prost(enumeration = "OperationKind", tag = "1")]
    pub kind: i32,
    #[prost(int64, tag = "2")]
    pub value: i64,
}
