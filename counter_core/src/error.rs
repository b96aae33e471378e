//! Boundary error taxonomy shared by both sides of the wire.

use thiserror::Error;

/// Bytes that could not be turned back into a typed message.
///
/// Always fatal to the dispatch call that produced the bytes; a decoder
/// never substitutes a default value for unreadable input.
#[derive(Debug, Error)]
pub enum CodecError {
    /// Protobuf-level failure: truncated buffer, invalid wire type or tag.
    #[error("malformed frame: {source}")]
    Malformed {
        #[source]
        source: prost::DecodeError,
    },

    /// Frame was written by an incompatible schema (0 means no header).
    #[error("schema version mismatch: expected {expected}, found {found}")]
    VersionMismatch { expected: u32, found: u32 },

    #[error("{message} is missing required field `{field}`")]
    MissingField {
        message: &'static str,
        field: &'static str,
    },

    /// Well-formed frame carrying a different message type.
    #[error("expected a {expected} frame, found {found}")]
    UnexpectedMessage {
        expected: &'static str,
        found: &'static str,
    },

    /// Tag value outside the closed variant set.
    #[error("unknown {message} variant tag {tag}")]
    UnknownVariant { message: &'static str, tag: i32 },
}

impl From<prost::DecodeError> for CodecError {
    fn from(source: prost::DecodeError) -> Self {
        CodecError::Malformed { source }
    }
}

/// Violation of the core/shell calling contract.
///
/// Signals a programming or versioning bug on one side of the boundary.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// The core could not read the event bytes it was handed.
    #[error("core rejected undecodable event: {0}")]
    UndecodableEvent(#[source] CodecError),

    /// The event decoded structurally but names a variant the core does not know.
    #[error("core does not recognise {message} tag {tag}")]
    UnrecognizedEvent { message: &'static str, tag: i32 },

    /// The core asked for an effect this shell cannot execute.
    #[error("shell does not recognise {message} tag {tag}")]
    UnrecognizedEffect { message: &'static str, tag: i32 },

    /// A dispatch was attempted while a previous batch was still draining.
    #[error("dispatch issued while the loop was draining a batch")]
    NotIdle,
}

impl ProtocolError {
    /// Classify a codec failure raised while the core decoded an event.
    pub fn from_event_codec(err: CodecError) -> Self {
        match err {
            CodecError::UnknownVariant { message, tag } => {
                ProtocolError::UnrecognizedEvent { message, tag }
            }
            other => ProtocolError::UndecodableEvent(other),
        }
    }
}
