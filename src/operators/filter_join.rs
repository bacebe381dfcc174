//! FilterJoin / LIP (spec §4.5): pre-filter a fact table against several
//! already-selected dimensions' Bloom filters, confirm each candidate
//! against the dimension's hash table, and emit exact join indices for
//! the fact table and every dimension in one fused pass.

use crate::common::config::OperatorOptions;
use crate::common::error::{EngineError, EngineResult};
use crate::exec::{BloomFilter, JoinHashTable, OperatorResult};
use crate::operators::Operator;
use rayon::prelude::*;

/// One dimension leg of the fused probe: which dimension table, the
/// fact-side FK column that references it, and the dimension's PK
/// column.
pub struct DimJoinSpec {
    pub table: String,
    pub fact_col: String,
    pub dim_col: String,
}

impl DimJoinSpec {
    pub fn new(table: impl Into<String>, fact_col: impl Into<String>, dim_col: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            fact_col: fact_col.into(),
            dim_col: dim_col.into(),
        }
    }
}

struct DimState {
    table: String,
    bloom: BloomFilter,
    hash_table: JoinHashTable,
    hits: u64,
    probed: u64,
}

impl DimState {
    fn hit_rate(&self) -> f64 {
        if self.probed == 0 {
            0.0
        } else {
            self.hits as f64 / self.probed as f64
        }
    }
}

pub struct FilterJoinOperator {
    fact_table: String,
    dims: Vec<DimJoinSpec>,
    options: OperatorOptions,
    num_threads: usize,
}

impl FilterJoinOperator {
    pub fn new(fact_table: impl Into<String>, dims: Vec<DimJoinSpec>, options: OperatorOptions, num_threads: usize) -> Self {
        Self {
            fact_table: fact_table.into(),
            dims,
            options,
            num_threads: num_threads.max(1),
        }
    }
}

/// One row's outcome during a probe batch: whether it survived every
/// dimension, which (dim_idx, dim_local_position) pairs it matched, and
/// which dimensions were actually tested (for the hit-rate counters —
/// a short-circuited row never reaches later dimensions).
struct RowOutcome {
    fact_pos: u32,
    matches: Vec<(usize, u32)>,
    tested: Vec<(usize, bool)>,
}

impl Operator for FilterJoinOperator {
    fn initialize(&mut self, input: &OperatorResult) -> EngineResult<()> {
        input.find(&self.fact_table).ok_or_else(|| {
            EngineError::Internal(format!("filter join: fact table '{}' not found", self.fact_table))
        })?;
        for dim in &self.dims {
            input.find(&dim.table).ok_or_else(|| {
                EngineError::Internal(format!("filter join: dimension table '{}' not found", dim.table))
            })?;
        }
        Ok(())
    }

    fn execute(&mut self, input: OperatorResult) -> EngineResult<OperatorResult> {
        let fact = input.find(&self.fact_table).unwrap().clone();

        // Build phase (spec §4.5 step 1): one Bloom filter + hash table
        // per dimension, built in parallel.
        let built: Vec<EngineResult<(DimState, crate::types::ColumnArray)>> = self
            .dims
            .par_iter()
            .map(|dim| {
                let dim_lazy = input.find(&dim.table).unwrap().clone();
                let dim_col_idx = dim_lazy.table.schema.require_index(&dim.dim_col)?;
                let keys = dim_lazy.materialize_column(dim_col_idx)?;
                let mut bloom = BloomFilter::with_expected_items(keys.len().max(1));
                for i in 0..keys.len() {
                    if let Ok(key) = keys.get_i64(i) {
                        bloom.insert(key);
                    }
                }
                let hash_table = JoinHashTable::build(&dim_lazy, dim_col_idx)?;
                let fact_col_idx = fact.table.schema.require_index(&dim.fact_col)?;
                let fact_keys = fact.materialize_column(fact_col_idx)?;
                Ok((
                    DimState {
                        table: dim.table.clone(),
                        bloom,
                        hash_table,
                        hits: 0,
                        probed: 0,
                    },
                    fact_keys,
                ))
            })
            .collect();

        let mut dims = Vec::with_capacity(built.len());
        let mut fact_keys_per_dim = Vec::with_capacity(built.len());
        for result in built {
            let (state, fact_keys) = result?;
            dims.push(state);
            fact_keys_per_dim.push(fact_keys);
        }

        let row_count = fact.row_count();
        let num_chunks = fact.table.num_chunks();
        let batch_count = self.options.batch_count(num_chunks, self.num_threads);
        let batch_size = (row_count / batch_count.max(1)).max(1);

        let mut order: Vec<usize> = (0..dims.len()).collect();
        let mut fact_take: Vec<u32> = Vec::new();
        let mut dim_take: Vec<Vec<u32>> = vec![Vec::new(); dims.len()];

        let mut start = 0;
        while start < row_count {
            let end = (start + batch_size).min(row_count);
            let batch_positions: Vec<usize> = (start..end).collect();

            let outcomes: Vec<RowOutcome> = batch_positions
                .par_iter()
                .map(|&pos| {
                    let mut matches = Vec::with_capacity(dims.len());
                    let mut tested = Vec::with_capacity(dims.len());
                    let mut passed = true;
                    for &d in &order {
                        let key = match fact_keys_per_dim[d].get_i64(pos) {
                            Ok(k) => k,
                            Err(_) => {
                                passed = false;
                                break;
                            }
                        };
                        let bloom_hit = dims[d].bloom.test(key);
                        tested.push((d, bloom_hit));
                        if !bloom_hit {
                            passed = false;
                            break;
                        }
                        let candidates = dims[d].hash_table.probe(key);
                        if candidates.is_empty() {
                            passed = false;
                            break;
                        }
                        matches.push((d, candidates[0]));
                    }
                    RowOutcome {
                        fact_pos: pos as u32,
                        matches: if passed { matches } else { Vec::new() },
                        tested,
                    }
                })
                .collect();

            for outcome in &outcomes {
                for &(d, hit) in &outcome.tested {
                    dims[d].probed += 1;
                    if hit {
                        dims[d].hits += 1;
                    }
                }
            }

            for outcome in outcomes {
                if outcome.matches.len() == dims.len() {
                    fact_take.push(outcome.fact_pos);
                    for (d, local) in outcome.matches {
                        dim_take[d].push(local);
                    }
                }
            }

            // Filter reordering (spec §4.5 step 3): ascending hit rate,
            // most selective (lowest hit rate) probed first next batch.
            order.sort_by(|&a, &b| {
                dims[a]
                    .hit_rate()
                    .partial_cmp(&dims[b].hit_rate())
                    .unwrap_or(std::cmp::Ordering::Equal)
            });
            tracing::trace!(target: "vectorq::planner", ?order, "LIP filter order updated");

            start = end;
        }

        let mut output_tables = Vec::with_capacity(input.tables.len());
        for lazy in input.tables {
            if lazy.table.name == fact.table.name {
                output_tables.push(lazy.compose_indices(&fact_take)?);
            } else if let Some(pos) = dims.iter().position(|d| d.table == lazy.table.name) {
                output_tables.push(lazy.compose_indices(&dim_take[pos])?);
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
    use std::sync::Arc;

    fn fact_table() -> LazyTable {
        let chunk = Chunk::new(vec![
            ColumnArray::Int64(vec![1, 2, 3, 4]),
            ColumnArray::Int64(vec![10, 20, 20, 30]),
        ])
        .unwrap();
        let table = Table::new(
            "fact",
            Schema::new(vec![
                Field::new("store_id", LogicalType::Int64),
                Field::new("product_id", LogicalType::Int64),
            ]),
            vec![chunk],
        )
        .unwrap();
        LazyTable::from_table(Arc::new(table))
    }

    fn store_dim() -> LazyTable {
        let chunk = Chunk::new(vec![ColumnArray::Int64(vec![1, 2, 3])]).unwrap();
        let table = Table::new(
            "store",
            Schema::new(vec![Field::new("id", LogicalType::Int64)]),
            vec![chunk],
        )
        .unwrap();
        LazyTable::from_table(Arc::new(table))
    }

    fn product_dim() -> LazyTable {
        let chunk = Chunk::new(vec![ColumnArray::Int64(vec![10, 20])]).unwrap();
        let table = Table::new(
            "product",
            Schema::new(vec![Field::new("id", LogicalType::Int64)]),
            vec![chunk],
        )
        .unwrap();
        LazyTable::from_table(Arc::new(table))
    }

    #[test]
    fn fused_probe_matches_both_dimensions() {
        let input = OperatorResult::new(vec![fact_table(), store_dim(), product_dim()]);
        let dims = vec![
            DimJoinSpec::new("store", "store_id", "id"),
            DimJoinSpec::new("product", "product_id", "id"),
        ];
        let mut op = FilterJoinOperator::new("fact", dims, OperatorOptions::default(), 2);
        let result = op.run(input).unwrap();

        // store_id=4 has no matching store row -> rejected.
        assert_eq!(result.find("fact").unwrap().row_count(), 3);
        assert_eq!(result.find("store").unwrap().row_count(), 3);
        assert_eq!(result.find("product").unwrap().row_count(), 3);
    }
}
