//! Hash-based group aggregate (spec §4.6): two-phase local/global
//! accumulation keyed by a composite group hash, emitted in the
//! requested ORDER BY.

use crate::common::config::OperatorOptions;
use crate::common::error::{EngineError, EngineResult};
use crate::exec::aggregate_state::{finalize, AggregateOp, AggregateValue, LocalAggState};
use crate::exec::columnar_ops::scalars_to_array;
use crate::exec::OperatorResult;
use crate::operators::Operator;
use crate::storage::{RecordId, Table};
use crate::types::{ColumnArray, Field, Schema};
use rayon::prelude::*;

/// One ORDER BY key: `column = None` sorts by the aggregate value
/// itself (spec §4.6 step 4, "a nullptr/none table in an order-by ref
/// means sort by the aggregate column").
pub struct OrderKey {
    pub column: Option<String>,
    pub descending: bool,
}

impl OrderKey {
    pub fn by_group(column: impl Into<String>, descending: bool) -> Self {
        Self {
            column: Some(column.into()),
            descending,
        }
    }

    pub fn by_aggregate(descending: bool) -> Self {
        Self {
            column: None,
            descending,
        }
    }
}

pub struct HashAggregateOperator {
    table_name: String,
    group_by: Vec<String>,
    agg_col: Option<String>,
    op: AggregateOp,
    order_by: Vec<OrderKey>,
    output_name: String,
    options: OperatorOptions,
    num_threads: usize,
}

impl HashAggregateOperator {
    pub fn new(
        table_name: impl Into<String>,
        group_by: Vec<String>,
        agg_col: Option<String>,
        op: AggregateOp,
        order_by: Vec<OrderKey>,
        output_name: impl Into<String>,
        options: OperatorOptions,
        num_threads: usize,
    ) -> Self {
        Self {
            table_name: table_name.into(),
            group_by,
            agg_col,
            op,
            order_by,
            output_name: output_name.into(),
            options,
            num_threads: num_threads.max(1),
        }
    }
}

/// Physical (chunk_id, local_row) address for every surviving logical
/// row, in the same order `materialize_column` would emit values —
/// needed so `tuple_map` witnesses resolve back to real chunk storage.
fn physical_record_ids(lazy: &crate::exec::LazyTable) -> Vec<RecordId> {
    if let Some(indices) = &lazy.indices {
        match &lazy.index_chunks {
            Some(chunks) => indices
                .iter()
                .zip(chunks.iter())
                .map(|(&global, &chunk_id)| {
                    let base = lazy.table.offsets()[chunk_id as usize] as u32;
                    RecordId::new(chunk_id, global - base)
                })
                .collect(),
            None => indices.iter().map(|&global| lazy.table.resolve(global as usize)).collect(),
        }
    } else if let Some(filter) = &lazy.filter {
        let mut out = Vec::with_capacity(lazy.row_count());
        for (chunk_id, mask) in filter.iter().enumerate() {
            for row in 0..mask.len() {
                if mask.get(row) {
                    out.push(RecordId::new(chunk_id as u16, row as u32));
                }
            }
        }
        out
    } else {
        let mut out = Vec::with_capacity(lazy.table.total_rows());
        for (chunk_id, chunk) in lazy.table.chunks().iter().enumerate() {
            for row in 0..chunk.num_rows() {
                out.push(RecordId::new(chunk_id as u16, row as u32));
            }
        }
        out
    }
}

impl Operator for HashAggregateOperator {
    fn initialize(&mut self, input: &OperatorResult) -> EngineResult<()> {
        input.find(&self.table_name).ok_or_else(|| {
            EngineError::Internal(format!("hash aggregate: table '{}' not found", self.table_name))
        })?;
        Ok(())
    }

    fn execute(&mut self, input: OperatorResult) -> EngineResult<OperatorResult> {
        let lazy = input.find(&self.table_name).unwrap().clone();

        let group_col_idxs: Vec<usize> = self
            .group_by
            .iter()
            .map(|name| lazy.table.schema.require_index(name))
            .collect::<EngineResult<_>>()?;
        let group_arrays: Vec<ColumnArray> = group_col_idxs
            .iter()
            .map(|&idx| lazy.materialize_column(idx))
            .collect::<EngineResult<_>>()?;

        let agg_array: Option<ColumnArray> = match &self.agg_col {
            Some(name) => {
                let idx = lazy.table.schema.require_index(name)?;
                Some(lazy.materialize_column(idx)?)
            }
            None => None,
        };

        let record_ids = physical_record_ids(&lazy);
        let row_count = lazy.row_count();

        let task_count = self.options.batch_count(lazy.table.num_chunks(), self.num_threads).max(1);
        let batch_size = (row_count / task_count.max(1)).max(1);
        let batches: Vec<(usize, usize)> = (0..row_count)
            .step_by(batch_size)
            .map(|start| (start, (start + batch_size).min(row_count)))
            .collect();

        let op = self.op;
        let locals: Vec<LocalAggState> = batches
            .into_par_iter()
            .map(|(start, end)| {
                let mut local = LocalAggState::new();
                for pos in start..end {
                    let mut seed = 0u64;
                    for array in &group_arrays {
                        seed = array.get_scalar(pos).hash_combine_into(seed);
                    }
                    let value = match (op, &agg_array) {
                        (AggregateOp::Count, _) => None,
                        (_, Some(arr)) => Some(arr.get_i64(pos).unwrap_or(0)),
                        (_, None) => None,
                    };
                    local.update(op, seed, value, record_ids[pos]);
                }
                local
            })
            .collect();

        let mut merged = LocalAggState::new();
        for local in locals {
            merged.merge(local);
        }

        let mut rows = finalize(self.op, &merged);

        // ORDER BY (spec §4.6 step 4): apply sort passes in reverse
        // declaration order, each a stable sort, so the final pass (the
        // first declared key) dominates.
        for key in self.order_by.iter().rev() {
            match &key.column {
                None => {
                    rows.sort_by(|a, b| {
                        let ord = a.2.partial_cmp(&b.2).unwrap_or(std::cmp::Ordering::Equal);
                        if key.descending {
                            ord.reverse()
                        } else {
                            ord
                        }
                    });
                }
                Some(name) => {
                    let pos = self
                        .group_by
                        .iter()
                        .position(|g| g == name)
                        .ok_or_else(|| EngineError::MissingColumn(name.clone()))?;
                    rows.sort_by(|a, b| {
                        let va = scalar_at(&lazy.table, &group_col_idxs, pos, a.1);
                        let vb = scalar_at(&lazy.table, &group_col_idxs, pos, b.1);
                        let ord = va.compare(&vb).unwrap_or(std::cmp::Ordering::Equal);
                        if key.descending {
                            ord.reverse()
                        } else {
                            ord
                        }
                    });
                }
            }
        }

        let mut fields = Vec::with_capacity(self.group_by.len() + 1);
        let mut columns = Vec::with_capacity(self.group_by.len() + 1);

        for (i, name) in self.group_by.iter().enumerate() {
            let col_idx = group_col_idxs[i];
            let scalars: Vec<_> = rows
                .iter()
                .map(|(_, witness, _)| scalar_at(&lazy.table, &group_col_idxs, i, *witness))
                .collect();
            let template = lazy.table.chunk(0).column(col_idx);
            let array = scalars_to_array(template, &scalars);
            fields.push(Field::new(name.clone(), array.logical_type()));
            columns.push(array);
        }

        let agg_field_name = self.agg_col.clone().unwrap_or_else(|| "count".to_string());
        let (agg_field, agg_column) = match self.op {
            AggregateOp::Sum | AggregateOp::Count => {
                let values: Vec<i64> = rows
                    .iter()
                    .map(|(_, _, v)| match v {
                        AggregateValue::Int64(x) => *x,
                        AggregateValue::Float64(x) => *x as i64,
                    })
                    .collect();
                (
                    Field::new(agg_field_name, crate::types::LogicalType::Int64),
                    ColumnArray::Int64(values),
                )
            }
            AggregateOp::Mean => {
                let values: Vec<f64> = rows
                    .iter()
                    .map(|(_, _, v)| match v {
                        AggregateValue::Float64(x) => *x,
                        AggregateValue::Int64(x) => *x as f64,
                    })
                    .collect();
                (
                    Field::new(agg_field_name, crate::types::LogicalType::Float64),
                    ColumnArray::Float64(values),
                )
            }
        };
        fields.push(agg_field);
        columns.push(agg_column);

        let chunk = crate::types::Chunk::new(columns)?;
        let output_table = Table::new(self.output_name.clone(), Schema::new(fields), vec![chunk])?;

        let mut output_tables: Vec<_> = input.tables.into_iter().filter(|t| t.table.name != self.table_name).collect();
        output_tables.push(crate::exec::LazyTable::from_table(std::sync::Arc::new(output_table)));
        Ok(OperatorResult::new(output_tables))
    }
}

fn scalar_at(table: &Table, group_col_idxs: &[usize], group_pos: usize, witness: RecordId) -> crate::types::Scalar {
    table
        .record(witness)
        .column(group_col_idxs[group_pos])
        .get_scalar(witness.local_row as usize)
}
