//! Counter Core: Message Types
//!
//! Pure data exchanged across the core/shell boundary.
//! No behaviour lives here; the wire form is defined in `proto_types`.

use serde::{Deserialize, Serialize};

// ── Events (shell → core) ──────────────────────────────────────────

/// One user- or system-originated intent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Event {
    Initialize,
    Increment,
    Decrement,
    Reset,
    /// Follow-up carrying the outcome of a `Database` effect.
    DatabaseResponse(DatabaseOutput),
}

impl Event {
    /// Short stable name for logs.
    pub fn name(&self) -> &'static str {
        match self {
            Event::Initialize => "initialize",
            Event::Increment => "increment",
            Event::Decrement => "decrement",
            Event::Reset => "reset",
            Event::DatabaseResponse(_) => "database_response",
        }
    }
}

/// Result of a storage operation, reported back to the core.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DatabaseOutput {
    /// The operation succeeded with no return value.
    Succeeded,
    /// The operation failed; carries a human-readable reason.
    Failed(String),
    /// The operation returned the stored counter.
    Counter(i64),
}

// ── Effects (core → shell) ─────────────────────────────────────────

/// A side effect the core asks the shell to perform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum EffectRequest {
    /// Re-pull the view and publish it.
    Render,
    /// Perform a storage operation and report the outcome.
    Database(DatabaseOperation),
}

impl EffectRequest {
    pub fn name(&self) -> &'static str {
        match self {
            EffectRequest::Render => "render",
            EffectRequest::Database(_) => "database",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DatabaseOperation {
    /// Fetches the counter from storage.
    FetchCounter,
    /// Overwrites the stored counter.
    UpdateCounter(i64),
}

// ── View ───────────────────────────────────────────────────────────

/// Snapshot of everything the UI needs to render.
/// Replaced wholesale; never patched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewModel {
    pub count: String,
    pub message: String,
}
