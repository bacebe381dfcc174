//! The greedy join-order planner (spec §4.8): turns a set of equality
//! join predicates over base tables into an `ExecutionPlan` of
//! `HashJoin` operators.

pub mod join_order;

pub use join_order::{plan_joins, JoinPredicate};
