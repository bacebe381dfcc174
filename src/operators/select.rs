//! Select (spec §4.3): evaluate a predicate tree against a LazyTable's
//! own chunks, replacing its `filter` with a fresh per-chunk bitmap.
//!
//! Per-chunk work is dispatched as parallel sub-tasks, batch size
//! ≈ `num_chunks / (threads × parallel_factor)` (spec §4.3), mirroring
//! the host's `parallel_operators` batch-sizing convention.

use crate::common::config::OperatorOptions;
use crate::common::error::{EngineError, EngineResult};
use crate::exec::OperatorResult;
use crate::operators::predicate::PredicateTree;
use crate::operators::Operator;
use rayon::prelude::*;

pub struct SelectOperator {
    table_name: String,
    predicate: PredicateTree,
    options: OperatorOptions,
    num_threads: usize,
}

impl SelectOperator {
    pub fn new(table_name: impl Into<String>, predicate: PredicateTree, options: OperatorOptions, num_threads: usize) -> Self {
        Self {
            table_name: table_name.into(),
            predicate,
            options,
            num_threads: num_threads.max(1),
        }
    }
}

impl Operator for SelectOperator {
    fn initialize(&mut self, input: &OperatorResult) -> EngineResult<()> {
        input.find(&self.table_name).ok_or_else(|| {
            EngineError::Internal(format!("select: table '{}' not found in input", self.table_name))
        })?;
        Ok(())
    }

    fn execute(&mut self, mut input: OperatorResult) -> EngineResult<OperatorResult> {
        let lazy = input.find(&self.table_name).ok_or_else(|| {
            EngineError::Internal(format!("select: table '{}' not found in input", self.table_name))
        })?;

        let num_chunks = lazy.table.num_chunks();
        let batch_count = self.options.batch_count(num_chunks, self.num_threads);
        let batch_size = (num_chunks + batch_count - 1) / batch_count.max(1);
        let schema = lazy.table.schema.clone();
        let predicate = self.predicate.clone();
        let table = lazy.table.clone();

        let chunk_indices: Vec<usize> = (0..num_chunks).collect();
        let masks: Vec<EngineResult<crate::types::ValidityMask>> = chunk_indices
            .par_chunks(batch_size.max(1))
            .flat_map(|batch| {
                batch
                    .par_iter()
                    .map(|&i| predicate.evaluate_chunk(&schema, table.chunk(i)))
                    .collect::<Vec<_>>()
            })
            .collect();

        let mut filter = Vec::with_capacity(masks.len());
        for mask in masks {
            filter.push(mask?);
        }

        let target = input.find_mut(&self.table_name).unwrap();
        *target = target.with_filter(filter);
        Ok(input)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exec::{ColumnReference, LazyTable};
    use crate::operators::predicate::{CompareOp, Predicate};
    use crate::storage::Table;
    use crate::types::{Chunk, ColumnArray, Field, LogicalType, Scalar, Schema};
    use std::sync::Arc;

    fn make_input() -> OperatorResult {
        let chunk = Chunk::new(vec![ColumnArray::Int64(vec![1, 2, 3, 4, 5])]).unwrap();
        let table = Table::new(
            "t",
            Schema::new(vec![Field::new("a", LogicalType::Int64)]),
            vec![chunk],
        )
        .unwrap();
        OperatorResult::single(LazyTable::from_table(Arc::new(table)))
    }

    #[test]
    fn select_replaces_filter() {
        let predicate = PredicateTree::Leaf(Predicate {
            column: ColumnReference::new("t", "a"),
            op: CompareOp::GreaterEqual,
            value: Scalar::Int64(3),
            value2: None,
        });
        let mut op = SelectOperator::new("t", predicate, OperatorOptions::default(), 2);
        let result = op.run(make_input()).unwrap();
        let lazy = result.find("t").unwrap();
        assert_eq!(lazy.row_count(), 3);
    }
}
