//! Dispatch Loop: the shell-resident controller around the core.
//!
//! Two states:
//!   Idle     --issue(event)-->  Draining   encode, call core, decode batch
//!   Draining --executeNext-->   Draining   run the next request, in order
//!   Draining --batchEmpty-->    Idle
//!
//! Rules:
//!   - One batch at a time. Follow-up events and events posted while a
//!     batch drains are queued FIFO and issued only after it drains.
//!   - A codec or protocol failure aborts the current dispatch call and
//!     leaves the loop Idle; events already queued stay queued.
//!   - The core is only ever called from the thread that owns the loop.

use std::collections::{BTreeSet, VecDeque};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::{debug, error, warn};

use counter_core::{
    codec, CodecError, CoreBoundary, DatabaseOutput, EffectRequest, Event, ProtocolError,
    ViewModel,
};

use crate::config::ShellConfig;
use crate::error::ShellError;
use crate::executor::{EffectExecutor, Inbound, Outcome};
use crate::storage::{self, CounterStore};
use crate::view::{SubscriptionId, ViewCell, ViewObserver};

/// Message carried by the failure event synthesized for an abandoned effect.
pub const TIMEOUT_MESSAGE: &str = "storage operation timed out";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Idle,
    Draining,
}

/// Cloneable, `Send` handle for posting events from observers or other
/// threads. Posted events are queued, never dispatched inline.
#[derive(Debug, Clone)]
pub struct ShellHandle {
    inbox: UnboundedSender<Inbound>,
}

impl ShellHandle {
    pub fn post(&self, event: Event) -> Result<(), ShellError> {
        self.inbox
            .send(Inbound::Posted(event))
            .map_err(|_| ShellError::Closed)
    }
}

pub struct DispatchLoop<C: CoreBoundary> {
    core: C,
    executor: EffectExecutor,
    view: ViewCell,
    state: LoopState,
    queue: VecDeque<Event>,
    inbox_tx: UnboundedSender<Inbound>,
    inbox_rx: UnboundedReceiver<Inbound>,
    outstanding: BTreeSet<u64>,
    settle_timeout: Duration,
    dispatched: u64,
}

impl<C: CoreBoundary> DispatchLoop<C> {
    /// Wrap `core`, pulling its initial view.
    pub fn new(
        core: C,
        store: Arc<dyn CounterStore>,
        config: &ShellConfig,
    ) -> Result<Self, ShellError> {
        config.validate()?;
        let initial: ViewModel = codec::decode(&core.view())?;
        let (inbox_tx, inbox_rx) = mpsc::unbounded_channel();
        let executor = EffectExecutor::new(
            store,
            &config.storage.counter,
            &config.effects,
            inbox_tx.clone(),
        )?;

        Ok(Self {
            core,
            executor,
            view: ViewCell::new(initial),
            state: LoopState::Idle,
            queue: VecDeque::new(),
            inbox_tx,
            inbox_rx,
            outstanding: BTreeSet::new(),
            settle_timeout: config.effects.settle_timeout(),
            dispatched: 0,
        })
    }

    /// Open the store selected by `config.storage`, then wrap `core`.
    pub fn from_config(core: C, config: &ShellConfig) -> Result<Self, ShellError> {
        let store = storage::open_store(&config.storage)?;
        Self::new(core, store, config)
    }

    // -- Accessors --

    pub fn state(&self) -> LoopState {
        self.state
    }

    /// The single current view snapshot.
    pub fn view(&self) -> &ViewModel {
        self.view.current()
    }

    /// Events waiting to be dispatched.
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// Background effects whose completion has not arrived yet.
    pub fn in_flight(&self) -> usize {
        self.outstanding.len()
    }

    /// Events handed to the core so far.
    pub fn dispatched(&self) -> u64 {
        self.dispatched
    }

    /// Render publishes so far.
    pub fn publishes(&self) -> u64 {
        self.view.publishes()
    }

    pub fn core(&self) -> &C {
        &self.core
    }

    pub fn handle(&self) -> ShellHandle {
        ShellHandle {
            inbox: self.inbox_tx.clone(),
        }
    }

    pub fn subscribe(&mut self, observer: impl ViewObserver + 'static) -> SubscriptionId {
        self.view.subscribe(observer)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.view.unsubscribe(id)
    }

    // -- Driving the loop --

    /// Queue `event` and run until the queue is empty.
    pub fn issue(&mut self, event: Event) -> Result<(), ShellError> {
        self.queue.push_back(event);
        self.run()
    }

    /// Collect posted events and completions without blocking, then run.
    pub fn pump(&mut self) -> Result<(), ShellError> {
        self.run()
    }

    /// Run until nothing is queued and no background effect is in flight.
    ///
    /// Waits at most `effects.settle_timeout_ms` in total. Effects still
    /// outstanding at the deadline are abandoned: each gets a
    /// `DatabaseResponse(Failed(TIMEOUT_MESSAGE))` and its late completion
    /// is discarded.
    pub fn settle(&mut self) -> Result<(), ShellError> {
        self.run()?;
        let deadline = Instant::now() + self.settle_timeout;
        while !self.outstanding.is_empty() {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match self.executor.wait(&mut self.inbox_rx, remaining) {
                Some(inbound) => self.accept(inbound),
                None => self.abandon_outstanding(),
            }
            self.run()?;
        }
        Ok(())
    }

    fn run(&mut self) -> Result<(), ShellError> {
        self.collect_inbox();
        while let Some(event) = self.queue.pop_front() {
            self.dispatch(event)?;
            self.collect_inbox();
        }
        Ok(())
    }

    fn collect_inbox(&mut self) {
        while let Ok(inbound) = self.inbox_rx.try_recv() {
            self.accept(inbound);
        }
    }

    fn accept(&mut self, inbound: Inbound) {
        match inbound {
            Inbound::Posted(event) => self.queue.push_back(event),
            Inbound::Completed { ticket, event } => {
                if self.outstanding.remove(&ticket) {
                    self.queue.push_back(event);
                } else {
                    warn!(ticket, "discarding completion of abandoned effect");
                }
            }
        }
    }

    fn abandon_outstanding(&mut self) {
        for ticket in std::mem::take(&mut self.outstanding) {
            warn!(ticket, timeout = ?self.settle_timeout, "abandoning storage effect");
            self.queue.push_back(Event::DatabaseResponse(DatabaseOutput::Failed(
                TIMEOUT_MESSAGE.to_string(),
            )));
        }
    }

    /// Idle → Draining → Idle for one event.
    fn dispatch(&mut self, event: Event) -> Result<(), ShellError> {
        // `&mut self` already rules out re-entry; this guards the state field.
        if self.state != LoopState::Idle {
            return Err(ProtocolError::NotIdle.into());
        }

        self.dispatched += 1;
        let sequence = self.dispatched;
        debug!(sequence, event = event.name(), "dispatching event");

        let response = self
            .core
            .process_event(&codec::encode(&event))
            .map_err(|err| {
                error!(sequence, error = %err, "core rejected event");
                ShellError::from(err)
            })?;
        let batch = decode_batch(&response).map_err(|err| {
            error!(sequence, error = %err, "unreadable effect batch");
            err
        })?;

        self.state = LoopState::Draining;
        let drained = self.drain(sequence, batch);
        self.state = LoopState::Idle;
        drained
    }

    fn drain(&mut self, sequence: u64, batch: Vec<EffectRequest>) -> Result<(), ShellError> {
        let mut follow_ups = Vec::new();
        let mut result = Ok(());

        for (index, request) in batch.into_iter().enumerate() {
            debug!(sequence, index, effect = request.name(), "executing effect");
            match self.executor.execute(request, &self.core, &mut self.view) {
                Ok(Outcome::Completed) => {}
                Ok(Outcome::FollowUp(event)) => follow_ups.push(event),
                Ok(Outcome::Pending(ticket)) => {
                    self.outstanding.insert(ticket);
                }
                Err(err) => {
                    error!(sequence, index, error = %err, "effect aborted the batch");
                    result = Err(err);
                    break;
                }
            }
        }

        // Outcomes of effects that already ran are real; keep them.
        self.queue.extend(follow_ups);
        result
    }
}

/// Decode a batch, classifying unknown effect tags as protocol skew.
fn decode_batch(bytes: &[u8]) -> Result<Vec<EffectRequest>, ShellError> {
    codec::decode(bytes).map_err(|err| match err {
        CodecError::UnknownVariant { message, tag } => {
            ProtocolError::UnrecognizedEffect { message, tag }.into()
        }
        other => ShellError::Codec(other),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use counter_core::Core;
    use crate::error::StorageError;
    use crate::storage::MemoryStore;

    fn shell() -> (DispatchLoop<Core>, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        let shell = DispatchLoop::new(Core::new(), store.clone(), &ShellConfig::default()).unwrap();
        (shell, store)
    }

    #[test]
    fn starts_idle_with_initial_view() {
        let (shell, _) = shell();
        assert_eq!(shell.state(), LoopState::Idle);
        assert_eq!(shell.view().count, "Count is: 0");
        assert_eq!(shell.dispatched(), 0);
    }

    #[test]
    fn follow_up_is_dispatched_after_batch() {
        let (mut shell, store) = shell();
        shell.issue(Event::Increment).unwrap();

        // Increment, then the storage follow-up.
        assert_eq!(shell.dispatched(), 2);
        assert_eq!(shell.pending(), 0);
        assert_eq!(store.get("app"), Some(1));
        assert_eq!(shell.view().count, "Count is: 1");
    }

    #[test]
    fn posted_event_is_queued_until_pumped() {
        let (mut shell, _) = shell();
        shell.handle().post(Event::Increment).unwrap();
        assert_eq!(shell.dispatched(), 0);

        shell.pump().unwrap();
        assert_eq!(shell.view().count, "Count is: 1");
    }

    #[test]
    fn dispatch_while_draining_is_not_idle() {
        let (mut shell, _) = shell();
        shell.state = LoopState::Draining;

        let result = shell.dispatch(Event::Increment);

        assert!(matches!(
            result,
            Err(ShellError::Protocol(ProtocolError::NotIdle))
        ));
        assert_eq!(shell.dispatched(), 0);
    }

    #[test]
    fn invalid_config_is_rejected() {
        let mut config = ShellConfig::default();
        config.effects.worker_threads = 0;
        let result = DispatchLoop::new(Core::new(), Arc::new(MemoryStore::new()), &config);
        assert!(matches!(result, Err(ShellError::Config(_))));
    }

    #[test]
    fn from_config_opens_configured_store() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = ShellConfig::default();
        config.storage.path = Some(dir.path().join("counter.json"));

        let mut shell = DispatchLoop::from_config(Core::new(), &config).unwrap();
        shell.issue(Event::Increment).unwrap();

        assert!(dir.path().join("counter.json").exists());
    }

    #[test]
    fn unopenable_store_is_storage_error() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, b"not a directory").unwrap();
        let mut config = ShellConfig::default();
        config.storage.path = Some(blocker.join("counter.json"));

        let result = DispatchLoop::from_config(Core::new(), &config);

        assert!(
            matches!(result, Err(ShellError::Storage(StorageError::Io { .. }))),
            "got {:?}",
            result.err()
        );
    }

    #[test]
    fn unknown_tag_is_protocol_skew() {
        // Frame v1, RequestBatch with one request of kind 7.
        let bytes = [0x08, 0x01, 0x22, 0x04, 0x0a, 0x02, 0x08, 0x07];
        match decode_batch(&bytes) {
            Err(ShellError::Protocol(ProtocolError::UnrecognizedEffect { tag, .. })) => {
                assert_eq!(tag, 7)
            }
            other => panic!("Expected UnrecognizedEffect, got: {:?}", other),
        }
    }
}
