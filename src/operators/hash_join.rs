//! Hash Join (spec §4.4): classic build/probe equi-join on one int64
//! column per side, with back-propagation of the new join indices to
//! every LazyTable in the incoming result that shared either side's
//! base table.

use crate::common::config::OperatorOptions;
use crate::common::constants::APPLY_SLICE_SIZE;
use crate::common::error::{EngineError, EngineResult};
use crate::exec::{JoinHashTable, OperatorResult};
use crate::operators::Operator;
use rayon::prelude::*;
use std::sync::Arc;

pub struct HashJoinOperator {
    left_table: String,
    left_col: String,
    right_table: String,
    right_col: String,
    options: OperatorOptions,
    num_threads: usize,
}

impl HashJoinOperator {
    pub fn new(
        left_table: impl Into<String>,
        left_col: impl Into<String>,
        right_table: impl Into<String>,
        right_col: impl Into<String>,
        options: OperatorOptions,
        num_threads: usize,
    ) -> Self {
        Self {
            left_table: left_table.into(),
            left_col: left_col.into(),
            right_table: right_table.into(),
            right_col: right_col.into(),
            options,
            num_threads: num_threads.max(1),
        }
    }
}

impl Operator for HashJoinOperator {
    fn initialize(&mut self, input: &OperatorResult) -> EngineResult<()> {
        input.find(&self.left_table).ok_or_else(|| {
            EngineError::Internal(format!("hash join: left table '{}' not found", self.left_table))
        })?;
        input.find(&self.right_table).ok_or_else(|| {
            EngineError::Internal(format!("hash join: right table '{}' not found", self.right_table))
        })?;
        Ok(())
    }

    fn execute(&mut self, input: OperatorResult) -> EngineResult<OperatorResult> {
        let left = input.find(&self.left_table).unwrap().clone();
        let right = input.find(&self.right_table).unwrap().clone();

        let left_col_idx = left.table.schema.require_index(&self.left_col)?;
        let right_col_idx = right.table.schema.require_index(&self.right_col)?;

        let hash_table = match &right.hash_table {
            Some(ht) => ht.clone(),
            None => Arc::new(JoinHashTable::build(&right, right_col_idx)?),
        };

        let keys = left.materialize_column(left_col_idx)?;
        let row_count = keys.len();

        let positions: Vec<usize> = (0..row_count).collect();
        let batch_size = self
            .options
            .batch_count((row_count + APPLY_SLICE_SIZE - 1) / APPLY_SLICE_SIZE.max(1), self.num_threads)
            .max(1);
        let slice_size = (row_count / batch_size).max(1);

        let batches: Vec<Vec<(u32, u32)>> = positions
            .par_chunks(slice_size)
            .map(|batch| {
                let mut local = Vec::new();
                for &pos in batch {
                    if let Ok(key) = keys.get_i64(pos) {
                        for &rpos in hash_table.probe(key) {
                            local.push((pos as u32, rpos));
                        }
                    }
                }
                local
            })
            .collect();

        let total: usize = batches.iter().map(|b| b.len()).sum();
        let mut left_take = Vec::with_capacity(total);
        let mut right_take = Vec::with_capacity(total);
        for batch in batches {
            for (l, r) in batch {
                left_take.push(l);
                right_take.push(r);
            }
        }

        let mut output_tables = Vec::with_capacity(input.tables.len());
        for lazy in input.tables {
            if lazy.table.name == left.table.name {
                output_tables.push(lazy.compose_indices(&left_take)?);
            } else if lazy.table.name == right.table.name {
                output_tables.push(lazy.compose_indices(&right_take)?);
            } else {
                output_tables.push(lazy);
            }
        }

        Ok(OperatorResult::new(output_tables))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exec::LazyTable;
    use crate::storage::Table;
    use crate::types::{Chunk, ColumnArray, Field, LogicalType, Schema};

    fn fact_table() -> LazyTable {
        let chunk = Chunk::new(vec![ColumnArray::Int64(vec![1, 2, 2, 3])]).unwrap();
        let table = Table::new(
            "fact",
            Schema::new(vec![Field::new("dim_id", LogicalType::Int64)]),
            vec![chunk],
        )
        .unwrap();
        LazyTable::from_table(Arc::new(table))
    }

    fn dim_table() -> LazyTable {
        let chunk = Chunk::new(vec![
            ColumnArray::Int64(vec![1, 2, 4]),
            ColumnArray::Int64(vec![100, 200, 400]),
        ])
        .unwrap();
        let table = Table::new(
            "dim",
            Schema::new(vec![
                Field::new("id", LogicalType::Int64),
                Field::new("value", LogicalType::Int64),
            ]),
            vec![chunk],
        )
        .unwrap();
        LazyTable::from_table(Arc::new(table))
    }

    #[test]
    fn inner_join_duplicates_cartesian_product() {
        let input = OperatorResult::new(vec![fact_table(), dim_table()]);
        let mut op = HashJoinOperator::new("fact", "dim_id", "dim", "id", OperatorOptions::default(), 2);
        let result = op.run(input).unwrap();

        let fact_out = result.find("fact").unwrap();
        let dim_out = result.find("dim").unwrap();
        // fact rows [1,2,2,3]: key 1 matches once, key 2 matches once per row (x2), key 3 no match.
        assert_eq!(fact_out.row_count(), 3);
        assert_eq!(dim_out.row_count(), 3);
    }

    #[test]
    fn empty_left_yields_empty_output() {
        let empty_chunk = Chunk::new(vec![ColumnArray::Int64(vec![])]).unwrap();
        let empty_table = Table::new(
            "fact",
            Schema::new(vec![Field::new("dim_id", LogicalType::Int64)]),
            vec![empty_chunk],
        )
        .unwrap();
        let input = OperatorResult::new(vec![LazyTable::from_table(Arc::new(empty_table)), dim_table()]);
        let mut op = HashJoinOperator::new("fact", "dim_id", "dim", "id", OperatorOptions::default(), 2);
        let result = op.run(input).unwrap();
        assert_eq!(result.find("fact").unwrap().row_count(), 0);
    }
}
