//! Shell-side error types.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use counter_core::{CodecError, ProtocolError};

use crate::config::ConfigError;

/// Failure of a storage collaborator.
///
/// Never fatal to the loop: the Database handler turns it into a
/// `DatabaseOutput::Failed` follow-up event.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("could not determine the local data directory")]
    NoDataDir,

    #[error("I/O error on '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("store '{path}' is corrupted: {reason}")]
    Corrupted { path: PathBuf, reason: String },

    #[error("failed to serialize store: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("store lock poisoned")]
    Poisoned,

    /// The backend refused the operation.
    #[error("{0}")]
    Rejected(String),
}

/// Everything that can abort a dispatch call or shell setup.
#[derive(Debug, Error)]
pub enum ShellError {
    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("failed to start the effect runtime: {0}")]
    Runtime(#[source] io::Error),

    #[error("dispatch loop has shut down")]
    Closed,
}
