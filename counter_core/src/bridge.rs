//! Core Boundary: the opaque byte-level surface of the core.
//!
//! The shell talks to the core only through `CoreBoundary`. Both calls are
//! synchronous and never block on I/O; anything the core needs from the
//! outside world comes back as an effect request in the returned batch.

use tracing::debug;

use crate::app::{Counter, Model};
use crate::codec;
use crate::domain::{EffectRequest, Event};
use crate::error::ProtocolError;

/// Byte-level entry points exposed by a portable core.
///
/// Implementations are stateful and not internally synchronized; callers
/// must hold exclusive access for the duration of each call.
pub trait CoreBoundary {
    /// Feed one encoded `Event`; returns an encoded ordered batch of
    /// `EffectRequest`s.
    fn process_event(&mut self, event: &[u8]) -> Result<Vec<u8>, ProtocolError>;

    /// Encoded snapshot of the current `ViewModel`.
    fn view(&self) -> Vec<u8>;
}

/// The reference counter core behind the boundary.
#[derive(Debug, Default)]
pub struct Core {
    app: Counter,
    model: Model,
    processed: u64,
}

impl Core {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of events accepted so far.
    pub fn processed(&self) -> u64 {
        self.processed
    }

    fn apply(&mut self, event: Event) -> Vec<EffectRequest> {
        self.processed += 1;
        debug!(event = event.name(), sequence = self.processed, "core processing event");
        self.app.update(event, &mut self.model)
    }
}

impl CoreBoundary for Core {
    fn process_event(&mut self, event: &[u8]) -> Result<Vec<u8>, ProtocolError> {
        let event: Event = codec::decode(event).map_err(ProtocolError::from_event_codec)?;
        let effects = self.apply(event);
        Ok(codec::encode(&effects))
    }

    fn view(&self) -> Vec<u8> {
        codec::encode(&self.app.view(&self.model))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{DatabaseOperation, ViewModel};
    use crate::error::CodecError;

    #[test]
    fn initial_view_shows_zero() {
        let core = Core::new();
        let view: ViewModel = codec::decode(&core.view()).unwrap();
        assert_eq!(view.count, "Count is: 0");
        assert_eq!(view.message, "");
    }

    #[test]
    fn increment_returns_encoded_batch() {
        let mut core = Core::new();
        let response = core.process_event(&codec::encode(&Event::Increment)).unwrap();
        let batch: Vec<EffectRequest> = codec::decode(&response).unwrap();
        assert_eq!(
            batch,
            vec![
                EffectRequest::Database(DatabaseOperation::UpdateCounter(1)),
                EffectRequest::Render,
            ]
        );
        assert_eq!(core.processed(), 1);
    }

    #[test]
    fn garbage_event_is_protocol_error() {
        let mut core = Core::new();
        match core.process_event(&[0xff, 0xff, 0xff]) {
            Err(ProtocolError::UndecodableEvent(CodecError::Malformed { .. })) => {}
            other => panic!("Expected UndecodableEvent, got: {:?}", other),
        }
        assert_eq!(core.processed(), 0, "rejected events must not touch state");
    }

    #[test]
    fn unknown_event_tag_is_unrecognized() {
        let mut core = Core::new();
        // Frame v1 carrying an Event with kind = 42.
        let bytes = [0x08, 0x01, 0x12, 0x02, 0x08, 0x2a];
        match core.process_event(&bytes) {
            Err(ProtocolError::UnrecognizedEvent { message, tag }) => {
                assert_eq!(message, "Event");
                assert_eq!(tag, 42);
            }
            other => panic!("Expected UnrecognizedEvent, got: {:?}", other),
        }
    }

    #[test]
    fn view_frame_is_rejected_as_event() {
        let mut core = Core::new();
        let bytes = codec::encode(&ViewModel::default());
        assert!(matches!(
            core.process_event(&bytes),
            Err(ProtocolError::UndecodableEvent(CodecError::UnexpectedMessage { .. }))
        ));
    }
}
