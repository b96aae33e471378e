//! Wire Codec: deterministic boundary encoder/decoder.
//!
//! Pure codec layer. No side-effects, no timestamps.
//!
//! Every buffer is a single `ProtoFrame` carrying `SCHEMA_VERSION` and one
//! typed body. Encoding is deterministic: prost writes fields in tag order
//! and omits default scalars, so equal values always yield equal bytes.
//! Decoding is strict: wrong version, missing payloads, mismatched message
//! types and unknown variant tags are all `CodecError`s.

use prost::Message;

use crate::domain::{DatabaseOperation, DatabaseOutput, EffectRequest, Event, ViewModel};
use crate::error::CodecError;
use crate::proto_types::*;
use crate::SCHEMA_VERSION;

/// A message type that can travel across the boundary inside a frame.
pub trait WireMessage: Sized {
    /// Name used in error reports.
    const NAME: &'static str;

    fn to_body(&self) -> FrameBody;

    fn from_body(body: FrameBody) -> Result<Self, CodecError>;
}

// ---------------------------------------------------------------------------
// Entry points
// ---------------------------------------------------------------------------

/// Encode a message into a versioned frame.
pub fn encode<T: WireMessage>(value: &T) -> Vec<u8> {
    ProtoFrame {
        schema_version: SCHEMA_VERSION,
        body: Some(value.to_body()),
    }
    .encode_to_vec()
}

/// Decode a versioned frame into a message of type `T`.
pub fn decode<T: WireMessage>(bytes: &[u8]) -> Result<T, CodecError> {
    let frame = ProtoFrame::decode(bytes)?;
    if frame.schema_version != SCHEMA_VERSION {
        return Err(CodecError::VersionMismatch {
            expected: SCHEMA_VERSION,
            found: frame.schema_version,
        });
    }
    let body = frame.body.ok_or(CodecError::MissingField {
        message: "Frame",
        field: "body",
    })?;
    T::from_body(body)
}

fn unexpected(expected: &'static str, found: &FrameBody) -> CodecError {
    CodecError::UnexpectedMessage {
        expected,
        found: found.message_name(),
    }
}

fn unknown(message: &'static str, tag: i32) -> CodecError {
    CodecError::UnknownVariant { message, tag }
}

// ---------------------------------------------------------------------------
// Event
// ---------------------------------------------------------------------------

impl WireMessage for Event {
    const NAME: &'static str = "Event";

    fn to_body(&self) -> FrameBody {
        let (kind, database_output) = match self {
            Event::Initialize => (EventKind::Initialize, None),
            Event::Increment => (EventKind::Increment, None),
            Event::Decrement => (EventKind::Decrement, None),
            Event::Reset => (EventKind::Reset, None),
            Event::DatabaseResponse(output) => {
                (EventKind::DatabaseResponse, Some(output_to_proto(output)))
            }
        };
        FrameBody::Event(ProtoEvent {
            kind: kind as i32,
            database_output,
        })
    }

    fn from_body(body: FrameBody) -> Result<Self, CodecError> {
        let proto = match body {
            FrameBody::Event(proto) => proto,
            other => return Err(unexpected(Self::NAME, &other)),
        };
        let kind = EventKind::try_from(proto.kind).map_err(|_| unknown("Event", proto.kind))?;
        match kind {
            EventKind::Unspecified => Err(unknown("Event", proto.kind)),
            EventKind::Initialize => Ok(Event::Initialize),
            EventKind::Increment => Ok(Event::Increment),
            EventKind::Decrement => Ok(Event::Decrement),
            EventKind::Reset => Ok(Event::Reset),
            EventKind::DatabaseResponse => {
                let output = proto.database_output.ok_or(CodecError::MissingField {
                    message: "Event",
                    field: "database_output",
                })?;
                Ok(Event::DatabaseResponse(output_from_proto(output)?))
            }
        }
    }
}

fn output_to_proto(output: &DatabaseOutput) -> ProtoDatabaseOutput {
    match output {
        DatabaseOutput::Succeeded => ProtoDatabaseOutput {
            kind: OutputKind::Succeeded as i32,
            ..Default::default()
        },
        DatabaseOutput::Failed(error) => ProtoDatabaseOutput {
            kind: OutputKind::Failed as i32,
            error: error.clone(),
            ..Default::default()
        },
        DatabaseOutput::Counter(counter) => ProtoDatabaseOutput {
            kind: OutputKind::Counter as i32,
            counter: *counter,
            ..Default::default()
        },
    }
}

fn output_from_proto(proto: ProtoDatabaseOutput) -> Result<DatabaseOutput, CodecError> {
    let kind = OutputKind::try_from(proto.kind)
        .map_err(|_| unknown("DatabaseOutput", proto.kind))?;
    match kind {
        OutputKind::Unspecified => Err(unknown("DatabaseOutput", proto.kind)),
        OutputKind::Succeeded => Ok(DatabaseOutput::Succeeded),
        OutputKind::Failed => Ok(DatabaseOutput::Failed(proto.error)),
        OutputKind::Counter => Ok(DatabaseOutput::Counter(proto.counter)),
    }
}

// ---------------------------------------------------------------------------
// ViewModel
// ---------------------------------------------------------------------------

impl WireMessage for ViewModel {
    const NAME: &'static str = "ViewModel";

    fn to_body(&self) -> FrameBody {
        FrameBody::View(ProtoViewModel {
            count: self.count.clone(),
            message: self.message.clone(),
        })
    }

    fn from_body(body: FrameBody) -> Result<Self, CodecError> {
        match body {
            FrameBody::View(proto) => Ok(ViewModel {
                count: proto.count,
                message: proto.message,
            }),
            other => Err(unexpected(Self::NAME, &other)),
        }
    }
}

// ---------------------------------------------------------------------------
// Effect requests
// ---------------------------------------------------------------------------

impl WireMessage for EffectRequest {
    const NAME: &'static str = "EffectRequest";

    fn to_body(&self) -> FrameBody {
        FrameBody::Request(request_to_proto(self))
    }

    fn from_body(body: FrameBody) -> Result<Self, CodecError> {
        match body {
            FrameBody::Request(proto) => request_from_proto(proto),
            other => Err(unexpected(Self::NAME, &other)),
        }
    }
}

/// The ordered batch returned by one dispatch call.
impl WireMessage for Vec<EffectRequest> {
    const NAME: &'static str = "RequestBatch";

    fn to_body(&self) -> FrameBody {
        FrameBody::Requests(ProtoRequestBatch {
            requests: self.iter().map(request_to_proto).collect(),
        })
    }

    fn from_body(body: FrameBody) -> Result<Self, CodecError> {
        match body {
            FrameBody::Requests(batch) => batch
                .requests
                .into_iter()
                .map(request_from_proto)
                .collect(),
            other => Err(unexpected(Self::NAME, &other)),
        }
    }
}

fn request_to_proto(request: &EffectRequest) -> ProtoEffectRequest {
    match request {
        EffectRequest::Render => ProtoEffectRequest {
            kind: EffectKind::Render as i32,
            database: None,
        },
        EffectRequest::Database(operation) => {
            let (kind, value) = match operation {
                DatabaseOperation::FetchCounter => (OperationKind::FetchCounter, 0),
                DatabaseOperation::UpdateCounter(value) => (OperationKind::UpdateCounter, *value),
            };
            ProtoEffectRequest {
                kind: EffectKind::Database as i32,
                database: Some(ProtoDatabaseOperation {
                    kind: kind as i32,
                    value,
                }),
            }
        }
    }
}

fn request_from_proto(proto: ProtoEffectRequest) -> Result<EffectRequest, CodecError> {
    let kind = EffectKind::try_from(proto.kind)
        .map_err(|_| unknown("EffectRequest", proto.kind))?;
    match kind {
        EffectKind::Unspecified => Err(unknown("EffectRequest", proto.kind)),
        EffectKind::Render => Ok(EffectRequest::Render),
        EffectKind::Database => {
            let operation = proto.database.ok_or(CodecError::MissingField {
                message: "EffectRequest",
                field: "database",
            })?;
            let op_kind = OperationKind::try_from(operation.kind)
                .map_err(|_| unknown("DatabaseOperation", operation.kind))?;
            match op_kind {
                OperationKind::Unspecified => Err(unknown("DatabaseOperation", operation.kind)),
                OperationKind::FetchCounter => {
                    Ok(EffectRequest::Database(DatabaseOperation::FetchCounter))
                }
                OperationKind::UpdateCounter => Ok(EffectRequest::Database(
                    DatabaseOperation::UpdateCounter(operation.value),
                )),
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    // ── Golden bytes: the frame layout is the contract ──────────────

    #[test]
    fn increment_event_matches_golden_bytes() {
        let bytes = encode(&Event::Increment);
        assert_eq!(bytes, vec![0x08, 0x01, 0x12, 0x02, 0x08, 0x02]);
    }

    #[test]
    fn render_batch_matches_golden_bytes() {
        let bytes = encode(&vec![EffectRequest::Render]);
        assert_eq!(bytes, vec![0x08, 0x01, 0x22, 0x04, 0x0a, 0x02, 0x08, 0x01]);
    }

    #[test]
    fn database_response_matches_golden_bytes() {
        let bytes = encode(&Event::DatabaseResponse(DatabaseOutput::Counter(3)));
        assert_eq!(
            bytes,
            vec![0x08, 0x01, 0x12, 0x08, 0x08, 0x05, 0x12, 0x04, 0x08, 0x03, 0x10, 0x03]
        );
    }

    #[test]
    fn empty_batch_is_still_a_requests_frame() {
        let bytes = encode(&Vec::<EffectRequest>::new());
        assert_eq!(bytes, vec![0x08, 0x01, 0x22, 0x00]);
        let decoded: Vec<EffectRequest> = decode(&bytes).unwrap();
        assert!(decoded.is_empty());
    }

    // ── Determinism ─────────────────────────────────────────────────

    #[test]
    fn equal_values_encode_identically() {
        let batch = vec![
            EffectRequest::Database(DatabaseOperation::UpdateCounter(-7)),
            EffectRequest::Render,
        ];
        assert_eq!(encode(&batch), encode(&batch.clone()));
    }

    #[test]
    fn batch_order_is_preserved() {
        let batch = vec![
            EffectRequest::Database(DatabaseOperation::UpdateCounter(1)),
            EffectRequest::Render,
            EffectRequest::Database(DatabaseOperation::FetchCounter),
        ];
        let decoded: Vec<EffectRequest> = decode(&encode(&batch)).unwrap();
        assert_eq!(decoded, batch);
    }

    // ── Malformed input ─────────────────────────────────────────────

    #[test]
    fn truncated_buffer_is_malformed() {
        let bytes = encode(&Event::Increment);
        let result = decode::<Event>(&bytes[..bytes.len() - 1]);
        match result {
            Err(CodecError::Malformed { .. }) => {}
            other => panic!("Expected Malformed, got: {:?}", other),
        }
    }

    #[test]
    fn invalid_wire_type_is_malformed() {
        // Field 1 with wire type 7, which does not exist.
        let result = decode::<Event>(&[0x0f, 0x01]);
        assert!(matches!(result, Err(CodecError::Malformed { .. })));
    }

    #[test]
    fn empty_buffer_is_version_mismatch() {
        match decode::<ViewModel>(&[]) {
            Err(CodecError::VersionMismatch { expected, found }) => {
                assert_eq!(expected, SCHEMA_VERSION);
                assert_eq!(found, 0);
            }
            other => panic!("Expected VersionMismatch, got: {:?}", other),
        }
    }

    #[test]
    fn future_schema_version_is_rejected() {
        let bytes = [0x08, 0x02, 0x12, 0x02, 0x08, 0x02];
        assert!(matches!(
            decode::<Event>(&bytes),
            Err(CodecError::VersionMismatch { found: 2, .. })
        ));
    }

    #[test]
    fn frame_without_body_is_missing_field() {
        assert!(matches!(
            decode::<Event>(&[0x08, 0x01]),
            Err(CodecError::MissingField { field: "body", .. })
        ));
    }

    #[test]
    fn view_frame_is_not_an_event() {
        let bytes = encode(&ViewModel::default());
        match decode::<Event>(&bytes) {
            Err(CodecError::UnexpectedMessage { expected, found }) => {
                assert_eq!(expected, "Event");
                assert_eq!(found, "ViewModel");
            }
            other => panic!("Expected UnexpectedMessage, got: {:?}", other),
        }
    }

    // ── Variant tags ────────────────────────────────────────────────

    #[test]
    fn unknown_effect_kind_reports_tag() {
        let frame = ProtoFrame {
            schema_version: SCHEMA_VERSION,
            body: Some(FrameBody::Requests(ProtoRequestBatch {
                requests: vec![ProtoEffectRequest {
                    kind: 99,
                    database: None,
                }],
            })),
        };
        let result = decode::<Vec<EffectRequest>>(&frame.encode_to_vec());
        match result {
            Err(CodecError::UnknownVariant { message, tag }) => {
                assert_eq!(message, "EffectRequest");
                assert_eq!(tag, 99);
            }
            other => panic!("Expected UnknownVariant, got: {:?}", other),
        }
    }

    #[test]
    fn unspecified_event_kind_is_not_defaulted() {
        let frame = ProtoFrame {
            schema_version: SCHEMA_VERSION,
            body: Some(FrameBody::Event(ProtoEvent::default())),
        };
        assert!(matches!(
            decode::<Event>(&frame.encode_to_vec()),
            Err(CodecError::UnknownVariant { tag: 0, .. })
        ));
    }

    #[test]
    fn database_request_without_operation_is_missing_field() {
        let frame = ProtoFrame {
            schema_version: SCHEMA_VERSION,
            body: Some(FrameBody::Request(ProtoEffectRequest {
                kind: EffectKind::Database as i32,
                database: None,
            })),
        };
        assert!(matches!(
            decode::<EffectRequest>(&frame.encode_to_vec()),
            Err(CodecError::MissingField { field: "database", .. })
        ));
    }

    #[test]
    fn failed_output_keeps_its_message() {
        let event = Event::DatabaseResponse(DatabaseOutput::Failed("disk full".to_string()));
        let decoded: Event = decode(&encode(&event)).unwrap();
        assert_eq!(decoded, event);
    }
}
