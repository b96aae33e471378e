#![forbid(unsafe_code)]

//! Persistent Counter: shell runtime.
//!
//! Drives the portable core through its byte-level boundary: encodes
//! events, drains the ordered effect batches the core returns, executes
//! each effect, and publishes view snapshots to UI observers.
//!
//! No application logic lives here. Every decision is made by the core;
//! the shell only performs I/O and reports outcomes back as events.

pub mod error;
pub mod config;
pub mod logging;
pub mod view;
pub mod storage;
pub mod executor;
pub mod dispatch;

pub use config::ShellConfig;
pub use dispatch::{DispatchLoop, LoopState, ShellHandle};
pub use error::{ShellError, StorageError};
pub use storage::{CounterStore, FileStore, MemoryStore};
pub use view::{SubscriptionId, ViewObserver};
