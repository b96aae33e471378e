//! Cross-toolchain wire fixtures.
//!
//! Prints the canonical frame of every message variant as JSON so a shell
//! built by another toolchain can compare its encoder byte-for-byte.
//!
//!   cargo run -p counter_core > wire_fixtures.json

use counter_core::domain::{DatabaseOperation, DatabaseOutput, EffectRequest, Event, ViewModel};
use counter_core::{codec, SCHEMA_VERSION};

fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

fn fixtures() -> Vec<(&'static str, Vec<u8>)> {
    vec![
        ("event/initialize", codec::encode(&Event::Initialize)),
        ("event/increment", codec::encode(&Event::Increment)),
        ("event/decrement", codec::encode(&Event::Decrement)),
        ("event/reset", codec::encode(&Event::Reset)),
        (
            "event/database_response/succeeded",
            codec::encode(&Event::DatabaseResponse(DatabaseOutput::Succeeded)),
        ),
        (
            "event/database_response/failed",
            codec::encode(&Event::DatabaseResponse(DatabaseOutput::Failed(
                "disk full".to_string(),
            ))),
        ),
        (
            "event/database_response/counter",
            codec::encode(&Event::DatabaseResponse(DatabaseOutput::Counter(-3))),
        ),
        (
            "view/initial",
            codec::encode(&ViewModel {
                count: "Count is: 0".to_string(),
                message: String::new(),
            }),
        ),
        ("request/render", codec::encode(&EffectRequest::Render)),
        (
            "batch/update_then_render",
            codec::encode(&vec![
                EffectRequest::Database(DatabaseOperation::UpdateCounter(1)),
                EffectRequest::Render,
            ]),
        ),
        (
            "batch/fetch_then_render",
            codec::encode(&vec![
                EffectRequest::Database(DatabaseOperation::FetchCounter),
                EffectRequest::Render,
            ]),
        ),
    ]
}

fn main() {
    println!("{{");
    println!("  \"schema_version\": {},", SCHEMA_VERSION);
    println!("  \"frames\": {{");
    let all = fixtures();
    for (i, (name, bytes)) in all.iter().enumerate() {
        let sep = if i + 1 == all.len() { "" } else { "," };
        println!("    \"{}\": \"{}\"{}", name, hex(bytes), sep);
    }
    println!("  }}");
    println!("}}");
}
