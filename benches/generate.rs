#![allow(unused)]
extern crate hugeenum;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use hugeenum::{generator::names::autogenerate_names, ClassFile, REGISTRY};
use std::hint::black_box;

/// Generation time of every strategy at a small and at its largest element count
fn bench_generate(c: &mut Criterion) {
    let mut group = c.benchmark_group("generate");
    group.sample_size(10);

    for info in &REGISTRY {
        for count in [1_000, info.max_elements] {
            let names = autogenerate_names(count);
            group.throughput(Throughput::Elements(count as u64));
            group.bench_with_input(BenchmarkId::new(info.id, count), &names, |b, names| {
                b.iter(|| {
                    let class = info
                        .strategy
                        .generate(black_box("bench.Huge"), names)
                        .unwrap();
                    black_box(class)
                });
            });
        }
    }
    group.finish();
}

/// Parsing a generated class back, the path `inspect` and the tests take
fn bench_parse(c: &mut Criterion) {
    let names = autogenerate_names(REGISTRY[2].max_elements);
    let data = REGISTRY[2].strategy.generate("bench.Huge", &names).unwrap();

    println!(
        "Benchmarking class file: {} bytes ({:.2} KB)",
        data.len(),
        data.len() as f64 / 1024.0
    );

    let mut group = c.benchmark_group("parse");
    group.throughput(Throughput::Bytes(data.len() as u64));
    group.bench_function("ClassFile::parse", |b| {
        b.iter(|| {
            let parsed = ClassFile::parse(black_box(&data)).unwrap();
            black_box(parsed)
        });
    });
    group.finish();
}

criterion_group!(benches, bench_generate, bench_parse);
criterion_main!(benches);
