//! Counter Core: Reference Application
//!
//! The state machine behind the boundary. The shell never sees this code;
//! it only exchanges frames with `bridge::Core`.
//!
//! Every update clears the previous error and ends with a `Render`.
//! Count changes are written through to storage optimistically; the
//! storage outcome comes back as `Event::DatabaseResponse`.

use tracing::{debug, info, warn};

use crate::domain::{DatabaseOperation, DatabaseOutput, EffectRequest, Event, ViewModel};

/// Error shown when a step would leave the signed 64-bit range.
pub const OVERFLOW_MESSAGE: &str = "counter overflow";

/// Mutable state owned by the core.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Model {
    pub count: i64,
    pub error: String,
}

#[derive(Debug, Default)]
pub struct Counter;

impl Counter {
    /// Apply `event` to `model` and return the ordered effect batch.
    pub fn update(&self, event: Event, model: &mut Model) -> Vec<EffectRequest> {
        model.error.clear();
        let mut effects = Vec::with_capacity(2);

        match event {
            Event::Initialize => {
                info!("initializing counter from storage");
                effects.push(EffectRequest::Database(DatabaseOperation::FetchCounter));
            }
            Event::Increment => {
                let next = model.count.checked_add(1);
                step(model, next, &mut effects);
            }
            Event::Decrement => {
                let next = model.count.checked_sub(1);
                step(model, next, &mut effects);
            }
            Event::Reset => {
                model.count = 0;
                effects.push(write_through(model.count));
            }
            Event::DatabaseResponse(output) => match output {
                DatabaseOutput::Succeeded => debug!("storage operation succeeded"),
                DatabaseOutput::Counter(counter) => model.count = counter,
                DatabaseOutput::Failed(error) => model.error = error,
            },
        }

        effects.push(EffectRequest::Render);
        effects
    }

    pub fn view(&self, model: &Model) -> ViewModel {
        ViewModel {
            count: format!("Count is: {}", model.count),
            message: model.error.clone(),
        }
    }
}

/// Adopt `next` and write it through; on overflow keep the count and report it.
fn step(model: &mut Model, next: Option<i64>, effects: &mut Vec<EffectRequest>) {
    match next {
        Some(count) => {
            model.count = count;
            effects.push(write_through(count));
        }
        None => {
            warn!(count = model.count, "counter overflow");
            model.error = OVERFLOW_MESSAGE.to_string();
        }
    }
}

fn write_through(count: i64) -> EffectRequest {
    EffectRequest::Database(DatabaseOperation::UpdateCounter(count))
}
