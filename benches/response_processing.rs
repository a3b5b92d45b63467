//! Criterion benchmarks for the binding hot path.
//!
//! Measures response processing (record decomposition with per-field
//! conversion) and a full query invocation against a mock transport, to
//! confirm the binding layer is negligible next to the instrument
//! round-trip.
//!
//! Run with: cargo bench --bench response_processing

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use daq_bindings::adapters::MockAdapter;
use daq_bindings::binding::{BindingTable, Command};
use daq_bindings::processing::{IntoProcessors, Processor};
use daq_bindings::validation::Rule;
use daq_bindings::{Driver, Value};
use std::sync::Arc;
use std::time::Duration;

fn record_processing(c: &mut Criterion) {
    let mut group = c.benchmark_group("record_processing");

    for fields in [3usize, 8, 32] {
        let names: Vec<String> = (1..=fields).map(|i| format!("input {i}")).collect();
        let reply = (1..=fields)
            .map(|i| format!("+{:07.3}", 270.0 + i as f64))
            .collect::<Vec<_>>()
            .join(",");

        let text_only = Processor::record(names.clone()).into_processors();
        let typed = Processor::record(names)
            .fields(std::iter::repeat(Processor::ToReal).take(fields))
            .into_processors();

        group.throughput(Throughput::Elements(fields as u64));
        group.bench_with_input(BenchmarkId::new("text", fields), &reply, |b, reply| {
            b.iter(|| text_only.apply(black_box(Value::from(reply.as_str()))).unwrap());
        });
        group.bench_with_input(BenchmarkId::new("to_real", fields), &reply, |b, reply| {
            b.iter(|| typed.apply(black_box(Value::from(reply.as_str()))).unwrap());
        });
    }

    group.finish();
}

fn query_invocation(c: &mut Criterion) {
    let table = BindingTable::new("LS350")
        .with(
            Command::query("get_pid")
                .params(["output"])
                .validate("output", [Rule::IsInteger, Rule::one_of([1, 2, 3, 4])])
                .process(
                    Processor::record(["P", "I", "D"])
                        .fields([Processor::ToReal, Processor::ToReal, Processor::ToReal]),
                )
                .template("PID? {output}")
                .build()
                .unwrap(),
        )
        .unwrap();

    let (mock, handle) = MockAdapter::pair();
    handle.reply("PID? 1", "+0050.0,+0020.0,+0000.0");
    let mut driver = Driver::with_settle_delay(mock, Arc::new(table), Duration::ZERO);

    c.bench_function("query_get_pid", |b| {
        b.iter(|| {
            driver.query("get_pid", black_box(&[Value::Int(1)])).unwrap();
            handle.clear_calls();
        });
    });
}

criterion_group!(benches, record_processing, query_invocation);
criterion_main!(benches);
