//! Benchmarks for batch partitioning and payload encoding.

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use femtopublish::{Partitioner, PayloadCodec, PayloadFormat, SizeAccounting, TextEncoding};
use serde::Serialize;

#[derive(Serialize)]
struct Sample {
    name: &'static str,
    host: String,
    value: f64,
    tags: Vec<&'static str>,
}

fn samples(count: usize) -> Vec<Sample> {
    (0..count)
        .map(|i| Sample {
            name: "request.latency",
            host: format!("node-{}", i % 32),
            value: i as f64 * 0.25,
            tags: vec!["region:eu", "tier:web"],
        })
        .collect()
}

fn bench_partition(c: &mut Criterion) {
    let records = samples(10_000);
    let mut group = c.benchmark_group("partition");
    for (label, format, accounting) in [
        ("json_per_record", PayloadFormat::Json, SizeAccounting::PerRecord),
        ("json_framed", PayloadFormat::Json, SizeAccounting::Framed),
        ("msgpack_framed", PayloadFormat::MessagePack, SizeAccounting::Framed),
    ] {
        let partitioner = Partitioner::new(
            PayloadCodec::new(format, TextEncoding::default()),
            64 * 1024,
            accounting,
        );
        group.bench_with_input(BenchmarkId::from_parameter(label), &records, |b, records| {
            b.iter(|| {
                let batches = partitioner
                    .partition(black_box(records))
                    .expect("partition");
                black_box(batches.len())
            })
        });
    }
    group.finish();
}

fn bench_encode(c: &mut Criterion) {
    let records = samples(1_000);
    let codec = PayloadCodec::default();
    c.bench_function("encode_batch_json", |b| {
        b.iter(|| black_box(codec.encode_batch(black_box(&records)).expect("encode").len()))
    });
}

criterion_group!(benches, bench_partition, bench_encode);
criterion_main!(benches);
