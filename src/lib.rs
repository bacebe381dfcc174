//! vectorq - a columnar, in-memory analytical execution engine
//! specialized for star-schema join workloads.
//!
//! Five layers, built bottom-up (spec §2): a DAG task [`scheduler`], the
//! [`storage`]/[`types`] columnar model, the [`exec`] LazyTable
//! substrate, the four [`operators`] (Select, HashJoin, FilterJoin/LIP,
//! HashAggregate), the [`expr`] arithmetic evaluator, and the greedy
//! [`planner`].

pub mod common;
pub mod exec;
pub mod expr;
pub mod operators;
pub mod planner;
pub mod scheduler;
pub mod storage;
pub mod types;

pub use common::error::{EngineError, EngineResult};
pub use exec::{ChunkedFilter, ColumnReference, LazyTable, OperatorResult};
pub use operators::Operator;
pub use scheduler::{ExecutionPlan, Scheduler};
pub use storage::{RecordId, Table};
pub use types::{Chunk, ColumnArray, Field, LogicalType, Schema, ValidityMask};
