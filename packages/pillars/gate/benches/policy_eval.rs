//! Policy Engine benchmarks.
//!
//! Run with: cargo bench -p agentkern-gate

use agentkern_gate::{defaults, DataType, DlpRule, Severity, TextKind, User};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

fn benchmark_evaluate(c: &mut Criterion) {
    let mut group = c.benchmark_group("policy_evaluate");
    let engine = defaults::seeded_engine().unwrap();
    let user = User::new("bench-agent", "service");

    let inputs = [
        ("clean_query", "select name, email from customers where id = 42"),
        (
            "pii_heavy",
            "customer jane@example.com, ssn 123-45-6789, card 4111111111111111, dob 01/02/1990",
        ),
        ("blocked_query", "DROP TABLE customers; DELETE FROM logs;"),
    ];

    for (label, text) in inputs {
        group.throughput(Throughput::Bytes(text.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(label), &text, |b, text| {
            b.iter(|| engine.evaluate(black_box(&user), black_box(text), TextKind::Query));
        });
    }
    group.finish();
}

fn benchmark_redact(c: &mut Criterion) {
    let engine = agentkern_gate::PolicyEngine::new();
    engine
        .add_dlp_rule(DlpRule::new("dlp-ssn", DataType::Ssn, Severity::Critical))
        .unwrap();
    engine
        .add_dlp_rule(DlpRule::new("dlp-email", DataType::Email, Severity::Low))
        .unwrap();
    let user = User::new("bench-agent", "service");
    let text = "contact jane@example.com, ssn 123-45-6789, again at jane@example.com";

    c.bench_function("redact_sensitive", |b| {
        b.iter(|| engine.redact_sensitive(black_box(&user), black_box(text), TextKind::Response));
    });
}

criterion_group!(benches, benchmark_evaluate, benchmark_redact);
criterion_main!(benches);
