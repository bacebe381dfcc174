//! Throughput of `HashJoinOperator` vs `parallel_factor`, mirroring the
//! host crate's `benches/` convention of sweeping a tuning knob across
//! a fixed workload.

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use std::sync::Arc;
use vectorq::common::config::OperatorOptions;
use vectorq::operators::{HashJoinOperator, Operator};
use vectorq::storage::Table;
use vectorq::types::{Chunk, ColumnArray, Field, LogicalType, Schema};
use vectorq::{LazyTable, OperatorResult};

fn build_fact(rows: usize, dim_rows: i64) -> LazyTable {
    let keys: Vec<i64> = (0..rows as i64).map(|i| i % dim_rows).collect();
    let chunk = Chunk::new(vec![ColumnArray::Int64(keys)]).unwrap();
    let table = Table::new(
        "fact",
        Schema::new(vec![Field::new("dim_id", LogicalType::Int64)]),
        vec![chunk],
    )
    .unwrap();
    LazyTable::from_table(Arc::new(table))
}

fn build_dim(rows: i64) -> LazyTable {
    let keys: Vec<i64> = (0..rows).collect();
    let values: Vec<i64> = (0..rows).map(|k| k * 10).collect();
    let chunk = Chunk::new(vec![ColumnArray::Int64(keys), ColumnArray::Int64(values)]).unwrap();
    let table = Table::new(
        "dim",
        Schema::new(vec![Field::new("id", LogicalType::Int64), Field::new("value", LogicalType::Int64)]),
        vec![chunk],
    )
    .unwrap();
    LazyTable::from_table(Arc::new(table))
}

fn bench_hash_join(c: &mut Criterion) {
    let mut group = c.benchmark_group("hash_join_parallel_factor");
    for &factor in &[0.5, 1.0, 2.0, 4.0] {
        group.bench_with_input(BenchmarkId::from_parameter(factor), &factor, |b, &factor| {
            b.iter_batched(
                || {
                    let input = OperatorResult::new(vec![build_fact(200_000, 1_000), build_dim(1_000)]);
                    let options = OperatorOptions {
                        parallel_factor: factor,
                        ..Default::default()
                    };
                    (input, options)
                },
                |(input, options)| {
                    let mut op = HashJoinOperator::new("fact", "dim_id", "dim", "id", options, num_cpus::get());
                    op.run(input).unwrap()
                },
                criterion::BatchSize::LargeInput,
            );
        });
    }
    group.finish();
}

criterion_group!(benches, bench_hash_join);
criterion_main!(benches);
