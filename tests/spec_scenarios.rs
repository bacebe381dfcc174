//! End-to-end coverage of the six concrete scenarios the core engine is
//! judged against: a two-way join, a three-way join via the greedy
//! planner, SUM, MEAN, GROUP BY with ORDER BY, and a compound WHERE
//! predicate.

use pretty_assertions::assert_eq;
use std::sync::Arc;
use vectorq::common::config::OperatorOptions;
use vectorq::exec::AggregateOp;
use vectorq::operators::{
    CompareOp, ConnectiveOp, HashAggregateOperator, HashJoinOperator, OrderKey, Operator, Predicate,
    PredicateTree, SelectOperator,
};
use vectorq::planner::{plan_joins, JoinPredicate};
use vectorq::scheduler::Scheduler;
use vectorq::storage::Table;
use vectorq::types::{Chunk, ColumnArray, Field, LogicalType, Scalar, Schema};
use vectorq::{ColumnReference, LazyTable, OperatorResult};

fn int_utf8_table(name: &str, keys: Vec<i64>, data: Vec<&str>) -> LazyTable {
    let mut offsets = vec![0u32];
    let mut bytes = Vec::new();
    for s in &data {
        bytes.extend_from_slice(s.as_bytes());
        offsets.push(bytes.len() as u32);
    }
    let chunk = Chunk::new(vec![
        ColumnArray::Int64(keys),
        ColumnArray::Utf8 { offsets, data: bytes },
    ])
    .unwrap();
    let table = Table::new(
        name,
        Schema::new(vec![Field::new("key", LogicalType::Int64), Field::new("data", LogicalType::Utf8)]),
        vec![chunk],
    )
    .unwrap();
    LazyTable::from_table(Arc::new(table))
}

fn scalars(array: &ColumnArray) -> Vec<Scalar> {
    (0..array.len()).map(|i| array.get_scalar(i)).collect()
}

#[test]
fn scenario_1_two_way_join_preserves_left_order() {
    let r = int_utf8_table("r", vec![0, 1, 2], vec!["R0", "R1", "R2"]);
    let s = int_utf8_table("s", vec![3, 2, 1, 0], vec!["S3", "S2", "S1", "S0"]);

    let mut join = HashJoinOperator::new("r", "key", "s", "key", OperatorOptions::default(), 2);
    let result = join.run(OperatorResult::new(vec![r, s])).unwrap();

    let projections = vec![
        ColumnReference::new("r", "key"),
        ColumnReference::new("r", "data"),
        ColumnReference::new("s", "key"),
        ColumnReference::new("s", "data"),
    ];
    let out = result.materialize(&projections, &[]).unwrap();

    assert_eq!(scalars(out.chunk(0).column(0)), vec![Scalar::Int64(0), Scalar::Int64(1), Scalar::Int64(2)]);
    assert_eq!(
        scalars(out.chunk(0).column(1)),
        vec![Scalar::Utf8("R0".into()), Scalar::Utf8("R1".into()), Scalar::Utf8("R2".into())]
    );
    assert_eq!(scalars(out.chunk(0).column(2)), vec![Scalar::Int64(0), Scalar::Int64(1), Scalar::Int64(2)]);
    assert_eq!(
        scalars(out.chunk(0).column(3)),
        vec![Scalar::Utf8("S0".into()), Scalar::Utf8("S1".into()), Scalar::Utf8("S2".into())]
    );
}

#[test]
fn scenario_2_three_way_join_via_greedy_planner() {
    let r = int_utf8_table("r", vec![0, 1, 2], vec!["R0", "R1", "R2"]);
    let s = int_utf8_table("s", vec![3, 2, 1, 0], vec!["S3", "S2", "S1", "S0"]);
    let t = int_utf8_table("t", vec![0, 1, 2, 3, 4], vec!["T0", "T1", "T2", "T3", "T4"]);

    let predicates = vec![JoinPredicate::new("r", "key", "s", "key"), JoinPredicate::new("r", "key", "t", "key")];
    let (plan, _sink) = plan_joins(vec![r, s, t], predicates, OperatorOptions::default(), 2).unwrap();
    let scheduler = Scheduler::from_system().unwrap();
    let result = plan.join(&scheduler).unwrap();

    let projections = vec![ColumnReference::new("r", "key"), ColumnReference::new("t", "data")];
    let out = result.materialize(&projections, &[]).unwrap();

    assert_eq!(scalars(out.chunk(0).column(0)), vec![Scalar::Int64(0), Scalar::Int64(1), Scalar::Int64(2)]);
    assert_eq!(
        scalars(out.chunk(0).column(1)),
        vec![Scalar::Utf8("T0".into()), Scalar::Utf8("T1".into()), Scalar::Utf8("T2".into())]
    );
}

fn group_table() -> LazyTable {
    // i in 0..=5: group = R{i/2}, data = 10*i.
    let groups = ["R0", "R0", "R1", "R1", "R2", "R2"];
    let mut offsets = vec![0u32];
    let mut bytes = Vec::new();
    for g in &groups {
        bytes.extend_from_slice(g.as_bytes());
        offsets.push(bytes.len() as u32);
    }
    let data: Vec<i64> = (0..6).map(|i| 10 * i).collect();
    let chunk = Chunk::new(vec![ColumnArray::Utf8 { offsets, data: bytes }, ColumnArray::Int64(data)]).unwrap();
    let table = Table::new(
        "r",
        Schema::new(vec![Field::new("group", LogicalType::Utf8), Field::new("data", LogicalType::Int64)]),
        vec![chunk],
    )
    .unwrap();
    LazyTable::from_table(Arc::new(table))
}

#[test]
fn scenario_3_sum() {
    let mut op = HashAggregateOperator::new(
        "r",
        vec![],
        Some("data".to_string()),
        AggregateOp::Sum,
        vec![],
        "agg",
        OperatorOptions::default(),
        2,
    );
    let result = op.run(OperatorResult::single(group_table())).unwrap();
    let out = &result.find("agg").unwrap().table;
    match out.chunk(0).column(0) {
        ColumnArray::Int64(v) => assert_eq!(v, &vec![150]),
        _ => panic!("expected int64"),
    }
}

#[test]
fn scenario_4_mean() {
    let mut op = HashAggregateOperator::new(
        "r",
        vec![],
        Some("data".to_string()),
        AggregateOp::Mean,
        vec![],
        "agg",
        OperatorOptions::default(),
        2,
    );
    let result = op.run(OperatorResult::single(group_table())).unwrap();
    let out = &result.find("agg").unwrap().table;
    match out.chunk(0).column(0) {
        ColumnArray::Float64(v) => assert!((v[0] - 25.0).abs() < 1e-9),
        _ => panic!("expected float64"),
    }
}

#[test]
fn scenario_5_group_by_sum_order_by_group() {
    let mut op = HashAggregateOperator::new(
        "r",
        vec!["group".to_string()],
        Some("data".to_string()),
        AggregateOp::Sum,
        vec![OrderKey::by_group("group", false)],
        "agg",
        OperatorOptions::default(),
        2,
    );
    let result = op.run(OperatorResult::single(group_table())).unwrap();
    let out = &result.find("agg").unwrap().table;

    assert_eq!(
        scalars(out.chunk(0).column(0)),
        vec![Scalar::Utf8("R0".into()), Scalar::Utf8("R1".into()), Scalar::Utf8("R2".into())]
    );
    match out.chunk(0).column(1) {
        ColumnArray::Int64(v) => assert_eq!(v, &vec![10, 50, 90]),
        _ => panic!("expected int64"),
    }
}

#[test]
fn scenario_6_compound_predicate() {
    let predicate = PredicateTree::Connective {
        left: Box::new(PredicateTree::Leaf(Predicate {
            column: ColumnReference::new("r", "group"),
            op: CompareOp::GreaterEqual,
            value: Scalar::Utf8("R1".to_string()),
            value2: None,
        })),
        right: Box::new(PredicateTree::Leaf(Predicate {
            column: ColumnReference::new("r", "data"),
            op: CompareOp::LessEqual,
            value: Scalar::Int64(30),
            value2: None,
        })),
        op: ConnectiveOp::And,
    };

    let mut op = SelectOperator::new("r", predicate, OperatorOptions::default(), 2);
    let result = op.run(OperatorResult::single(group_table())).unwrap();
    let lazy = result.find("r").unwrap();

    let projections = vec![ColumnReference::new("r", "group"), ColumnReference::new("r", "data")];
    let out = OperatorResult::single(lazy.clone()).materialize(&projections, &[]).unwrap();

    assert_eq!(
        scalars(out.chunk(0).column(0)),
        vec![Scalar::Utf8("R1".into()), Scalar::Utf8("R1".into())]
    );
    match out.chunk(0).column(1) {
        ColumnArray::Int64(v) => assert_eq!(v, &vec![20, 30]),
        _ => panic!("expected int64"),
    }
}
