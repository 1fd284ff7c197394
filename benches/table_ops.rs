//! Benchmark suite for shardtable operations.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use shardtable::Table;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// Benchmark insertion of new entries into a table that starts with one bucket.
///
/// Every run grows the bucket array repeatedly, so this includes resize cost.
fn insert_with_growth_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("insert_with_growth");

    for size in [100u64, 1000, 10000].iter() {
        group.throughput(Throughput::Elements(*size));
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, &size| {
            b.iter(|| {
                let table: Table<u64, String> = Table::with_capacity(1).unwrap();
                for i in 0..size {
                    table
                        .insert(black_box(i), black_box(format!("value-{}", i)))
                        .unwrap();
                }
            });
        });
    }
    group.finish();
}

/// Benchmark insertion into a table reserved up front, so no resize happens.
fn insert_reserved_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("insert_reserved");

    for size in [100u64, 1000, 10000].iter() {
        group.throughput(Throughput::Elements(*size));
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, &size| {
            b.iter(|| {
                let table: Table<u64, String> = Table::with_capacity(1).unwrap();
                table.reserve(size as usize).unwrap();
                for i in 0..size {
                    table
                        .insert(black_box(i), black_box(format!("value-{}", i)))
                        .unwrap();
                }
            });
        });
    }
    group.finish();
}

/// Benchmark read operations on a pre-populated table.
fn get_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("get");

    for size in [100u64, 1000, 10000].iter() {
        let table: Table<u64, String> = Table::new().unwrap();
        for i in 0..*size {
            table.insert(i, format!("value-{}", i)).unwrap();
        }

        group.throughput(Throughput::Elements(*size));
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, &size| {
            b.iter(|| {
                for i in 0..size {
                    let _ = table.get_and(&black_box(i), |v| v.len());
                }
            });
        });
    }
    group.finish();
}

/// Benchmark mixed operations.
///
/// Distribution: 33% inserts, 33% gets, 33% removes.
fn mixed_operations_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("mixed_ops");

    for size in [100u64, 1000, 10000].iter() {
        group.throughput(Throughput::Elements(*size));
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, &size| {
            b.iter(|| {
                let table: Table<u64, u64> = Table::new().unwrap();
                for i in 0..size {
                    if i % 3 == 0 {
                        table.insert(black_box(i), black_box(i)).unwrap();
                    } else if i % 3 == 1 {
                        let _ = table.get(&black_box(i - 1));
                    } else {
                        let _ = table.remove(&black_box(i - 2));
                    }
                }
            });
        });
    }
    group.finish();
}

/// Benchmark concurrent inserts of disjoint key ranges from several threads.
fn concurrent_insert_benchmark(c: &mut Criterion) {
    const PER_THREAD: u64 = 10_000;

    let mut group = c.benchmark_group("concurrent_insert");

    for num_threads in [1u64, 2, 4, 8].iter() {
        group.throughput(Throughput::Elements(num_threads * PER_THREAD));
        group.bench_with_input(
            BenchmarkId::from_parameter(num_threads),
            num_threads,
            |b, &num_threads| {
                b.iter(|| {
                    let table: Arc<Table<u64, u64>> = Arc::new(Table::new().unwrap());
                    let threads: Vec<_> = (0..num_threads)
                        .map(|t| {
                            let table = Arc::clone(&table);
                            thread::spawn(move || {
                                for i in (0..PER_THREAD).map(|i| t * PER_THREAD + i) {
                                    table.insert(black_box(i), black_box(i)).unwrap();
                                }
                            })
                        })
                        .collect();
                    threads
                        .into_iter()
                        .for_each(|t| t.join().expect("Thread failed"));
                });
            },
        );
    }
    group.finish();
}

/// Benchmark a full iteration over a pre-populated table.
fn iter_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("iter");

    for size in [100u64, 1000, 10000].iter() {
        let table: Table<u64, u64> = Table::new().unwrap();
        for i in 0..*size {
            table.insert(i, i).unwrap();
        }

        group.throughput(Throughput::Elements(*size));
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, _| {
            b.iter(|| black_box(table.iter().map(|(_, v)| v).sum::<u64>()));
        });
    }
    group.finish();
}

criterion_group! {
    name = benches;
    config = Criterion::default()
        .measurement_time(Duration::from_secs(10))
        .sample_size(100);
    targets = insert_with_growth_benchmark, insert_reserved_benchmark, get_benchmark,
              mixed_operations_benchmark, concurrent_insert_benchmark, iter_benchmark
}

criterion_main!(benches);
