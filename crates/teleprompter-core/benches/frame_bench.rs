//! Criterion benchmarks for client frame parsing and envelope encoding.
//!
//! Every remote key press goes through `parse_client_frame`, `into_command`
//! and one `serde_json` serialization before it reaches the window, so these
//! are the per-command costs of the relay.
//!
//! Run with:
//! ```bash
//! cargo bench --package teleprompter-core --bench frame_bench
//! ```

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use serde_json::json;
use teleprompter_core::{parse_client_frame, CommandEvent, RelayNotification};

fn frames() -> Vec<(&'static str, String)> {
    vec![
        (
            "object",
            json!({"event": "command", "data": {"key": "ArrowDown"}}).to_string(),
        ),
        ("array", json!(["command", {"key": "ArrowDown"}]).to_string()),
        (
            "engine_prefixed",
            format!("42{}", json!(["command", {"key": "ArrowDown"}])),
        ),
        (
            "large_payload",
            json!(["command", {
                "key": "text",
                "value": "x".repeat(2048),
                "meta": {"client": "phone", "seq": 991, "flags": [1, 2, 3, 4]}
            }])
            .to_string(),
        ),
    ]
}

fn bench_parse(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse_client_frame");
    for (name, text) in frames() {
        group.bench_with_input(BenchmarkId::from_parameter(name), &text, |b, text| {
            b.iter(|| parse_client_frame(black_box(text)).expect("parse"));
        });
    }
    group.finish();
}

fn bench_forward(c: &mut Criterion) {
    let text = json!(["command", {"key": "ArrowDown", "repeat": false}]).to_string();
    c.bench_function("frame_to_notification_json", |b| {
        b.iter(|| {
            let frame = parse_client_frame(black_box(&text)).expect("parse");
            let event = frame.into_command().expect("command");
            serde_json::to_string(&RelayNotification::command(event)).expect("serialize")
        });
    });

    let event = CommandEvent::from_value(json!({"key": "ArrowDown"})).expect("command");
    c.bench_function("notification_serialize_only", |b| {
        b.iter(|| serde_json::to_string(&RelayNotification::command(black_box(event.clone()))))
    });
}

criterion_group!(benches, bench_parse, bench_forward);
criterion_main!(benches);
