//! Throughput of `HashAggregateOperator` vs `parallel_factor`.

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use std::sync::Arc;
use vectorq::common::config::OperatorOptions;
use vectorq::exec::AggregateOp;
use vectorq::operators::{HashAggregateOperator, Operator};
use vectorq::storage::Table;
use vectorq::types::{Chunk, ColumnArray, Field, LogicalType, Schema};
use vectorq::{LazyTable, OperatorResult};

fn build_input(rows: usize, num_groups: i64) -> LazyTable {
    let groups: Vec<i64> = (0..rows as i64).map(|i| i % num_groups).collect();
    let data: Vec<i64> = (0..rows as i64).collect();
    let chunk = Chunk::new(vec![ColumnArray::Int64(groups), ColumnArray::Int64(data)]).unwrap();
    let table = Table::new(
        "t",
        Schema::new(vec![Field::new("group_id", LogicalType::Int64), Field::new("data", LogicalType::Int64)]),
        vec![chunk],
    )
    .unwrap();
    LazyTable::from_table(Arc::new(table))
}

fn bench_hash_aggregate(c: &mut Criterion) {
    let mut group = c.benchmark_group("hash_aggregate_parallel_factor");
    for &factor in &[0.5, 1.0, 2.0, 4.0] {
        group.bench_with_input(BenchmarkId::from_parameter(factor), &factor, |b, &factor| {
            b.iter_batched(
                || {
                    let input = OperatorResult::single(build_input(500_000, 1_000));
                    let options = OperatorOptions {
                        parallel_factor: factor,
                        ..Default::default()
                    };
                    (input, options)
                },
                |(input, options)| {
                    let mut op = HashAggregateOperator::new(
                        "t",
                        vec!["group_id".to_string()],
                        Some("data".to_string()),
                        AggregateOp::Sum,
                        vec![],
                        "agg",
                        options,
                        num_cpus::get(),
                    );
                    op.run(input).unwrap()
                },
                criterion::BatchSize::LargeInput,
            );
        });
    }
    group.finish();
}

criterion_group!(benches, bench_hash_aggregate);
criterion_main!(benches);
