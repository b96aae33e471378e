//! Effect Executor: one handler per effect-request variant.
//!
//! - `Render`:   re-pull the view through the boundary and publish it.
//! - `Database`: run the storage operation and turn its outcome, success
//!               or failure, into a `DatabaseResponse` follow-up event.
//!
//! In background mode storage operations are handed to a single ordered
//! worker on a tokio runtime, so they complete in the order the core asked
//! for them. Their outcomes come back through the loop's inbox; the core is
//! never touched from a worker thread.

use std::sync::Arc;
use std::time::Duration;

use tokio::runtime::Runtime;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::{debug, warn};

use counter_core::{codec, CoreBoundary, DatabaseOperation, DatabaseOutput, EffectRequest, Event, ViewModel};

use crate::config::{EffectMode, EffectsConfig};
use crate::error::ShellError;
use crate::storage::CounterStore;
use crate::view::ViewCell;

/// What executing one request produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Nothing further to report.
    Completed,
    /// An event to issue once the current batch has drained.
    FollowUp(Event),
    /// Running in the background; completion arrives in the inbox.
    Pending(u64),
}

/// Messages delivered to the loop from outside its own call stack.
#[derive(Debug)]
pub(crate) enum Inbound {
    /// An event posted through a `ShellHandle`.
    Posted(Event),
    /// A background effect finished.
    Completed { ticket: u64, event: Event },
}

struct Job {
    ticket: u64,
    operation: DatabaseOperation,
}

enum Mode {
    Inline,
    Background {
        runtime: Runtime,
        jobs: UnboundedSender<Job>,
    },
}

pub struct EffectExecutor {
    store: Arc<dyn CounterStore>,
    counter: String,
    mode: Mode,
    next_ticket: u64,
}

impl EffectExecutor {
    pub(crate) fn new(
        store: Arc<dyn CounterStore>,
        counter: &str,
        config: &EffectsConfig,
        inbox: UnboundedSender<Inbound>,
    ) -> Result<Self, ShellError> {
        let mode = match config.mode {
            EffectMode::Inline => Mode::Inline,
            EffectMode::Background => {
                let runtime = tokio::runtime::Builder::new_multi_thread()
                    .worker_threads(config.worker_threads)
                    .thread_name("counter-effects")
                    .enable_time()
                    .build()
                    .map_err(ShellError::Runtime)?;
                let (jobs, queue) = mpsc::unbounded_channel();
                runtime.spawn(run_worker(queue, Arc::clone(&store), counter.to_string(), inbox));
                Mode::Background { runtime, jobs }
            }
        };

        Ok(Self {
            store,
            counter: counter.to_string(),
            mode,
            next_ticket: 0,
        })
    }

    /// Execute one request to completion (or hand it off, in background mode).
    pub(crate) fn execute<C: CoreBoundary>(
        &mut self,
        request: EffectRequest,
        core: &C,
        view: &mut ViewCell,
    ) -> Result<Outcome, ShellError> {
        match request {
            EffectRequest::Render => {
                let snapshot: ViewModel = codec::decode(&core.view())?;
                view.publish(snapshot);
                Ok(Outcome::Completed)
            }
            EffectRequest::Database(operation) => self.database(operation),
        }
    }

    fn database(&mut self, operation: DatabaseOperation) -> Result<Outcome, ShellError> {
        match &self.mode {
            Mode::Inline => {
                let output = run_operation(self.store.as_ref(), &self.counter, operation);
                Ok(Outcome::FollowUp(Event::DatabaseResponse(output)))
            }
            Mode::Background { jobs, .. } => {
                self.next_ticket += 1;
                let ticket = self.next_ticket;
                jobs.send(Job { ticket, operation })
                    .map_err(|_| ShellError::Closed)?;
                debug!(ticket, ?operation, "storage operation handed to worker");
                Ok(Outcome::Pending(ticket))
            }
        }
    }

    /// Block the loop thread for at most `timeout` waiting for one inbound
    /// message. Inline mode never has work in flight and only polls.
    pub(crate) fn wait(
        &self,
        inbox: &mut UnboundedReceiver<Inbound>,
        timeout: Duration,
    ) -> Option<Inbound> {
        match &self.mode {
            Mode::Inline => inbox.try_recv().ok(),
            // The timer must be created inside the runtime context.
            Mode::Background { runtime, .. } => runtime
                .block_on(async { tokio::time::timeout(timeout, inbox.recv()).await })
                .ok()
                .flatten(),
        }
    }
}

/// Run one storage operation and map its result onto `DatabaseOutput`.
///
/// Failures become `DatabaseOutput::Failed`, so the core decides what the
/// user sees.
pub fn run_operation(
    store: &dyn CounterStore,
    counter: &str,
    operation: DatabaseOperation,
) -> DatabaseOutput {
    let result = match operation {
        DatabaseOperation::FetchCounter => store.fetch(counter).map(DatabaseOutput::Counter),
        DatabaseOperation::UpdateCounter(value) => store
            .update(counter, value)
            .map(|()| DatabaseOutput::Succeeded),
    };
    result.unwrap_or_else(|err| {
        warn!(counter, ?operation, error = %err, "storage operation failed");
        DatabaseOutput::Failed(err.to_string())
    })
}

async fn run_worker(
    mut queue: UnboundedReceiver<Job>,
    store: Arc<dyn CounterStore>,
    counter: String,
    inbox: UnboundedSender<Inbound>,
) {
    while let Some(job) = queue.recv().await {
        let store = Arc::clone(&store);
        let name = counter.clone();
        let operation = job.operation;
        let output = match tokio::task::spawn_blocking(move || {
            run_operation(store.as_ref(), &name, operation)
        })
        .await
        {
            Ok(output) => output,
            Err(err) => DatabaseOutput::Failed(format!("storage task aborted: {}", err)),
        };

        let completed = Inbound::Completed {
            ticket: job.ticket,
            event: Event::DatabaseResponse(output),
        };
        if inbox.send(completed).is_err() {
            break;
        }
    }
}
