//! [`LazyTable`] and [`OperatorResult`]: the carriers that flow between
//! operators without materializing intermediate tables (spec §3).

use crate::common::error::{EngineError, EngineResult};
use crate::exec::columnar_ops::{apply_filter, apply_indices};
use crate::exec::hash_table::JoinHashTable;
use crate::storage::Table;
use crate::types::{Chunk, ColumnArray, Field, Schema, ValidityMask};
use std::sync::Arc;

/// Per-chunk boolean bitmap, aligned to the table's chunks. Produced by
/// Select (spec §4.3).
pub type ChunkedFilter = Vec<ValidityMask>;

/// A logical view over a [`Table`] (spec §3). `filter` and `indices` are
/// mutually exclusive by construction; a Select replaces `filter`, a Join
/// replaces both with fresh `indices`.
#[derive(Clone)]
pub struct LazyTable {
    pub table: Arc<Table>,
    pub filter: Option<ChunkedFilter>,
    pub indices: Option<Vec<u32>>,
    /// Chunk id parallel to `indices`, enabling O(1) resolution without
    /// binary search (spec §3).
    pub index_chunks: Option<Vec<u16>>,
    /// Prebuilt hash table, attached when this LazyTable is reused as a
    /// join build side (spec §3 "Hash table for joins").
    pub hash_table: Option<Arc<JoinHashTable>>,
}

impl LazyTable {
    pub fn from_table(table: Arc<Table>) -> Self {
        Self {
            table,
            filter: None,
            indices: None,
            index_chunks: None,
            hash_table: None,
        }
    }

    /// Validate the LazyTable invariants (spec §3): at most one of
    /// filter/indices is set; index_chunks (if present) parallels
    /// indices; filter (if present) covers every row of the table.
    pub fn validate(&self) -> EngineResult<()> {
        if self.filter.is_some() && self.indices.is_some() {
            return Err(EngineError::Internal(
                "LazyTable carries both filter and indices".to_string(),
            ));
        }
        if let Some(filter) = &self.filter {
            if filter.len() != self.table.num_chunks() {
                return Err(EngineError::Internal(
                    "filter chunk count does not match table".to_string(),
                ));
            }
            for (chunk, mask) in self.table.chunks().iter().zip(filter.iter()) {
                if chunk.num_rows() != mask.len() {
                    return Err(EngineError::Internal(
                        "filter bitmap length does not match chunk row count".to_string(),
                    ));
                }
            }
        }
        if let Some(index_chunks) = &self.index_chunks {
            let indices_len = self.indices.as_ref().map(|v| v.len()).unwrap_or(0);
            if index_chunks.len() != indices_len {
                return Err(EngineError::Internal(
                    "index_chunks length does not match indices".to_string(),
                ));
            }
        }
        Ok(())
    }

    /// Number of rows this view currently represents.
    pub fn row_count(&self) -> usize {
        if let Some(indices) = &self.indices {
            indices.len()
        } else if let Some(filter) = &self.filter {
            filter.iter().map(|m| m.count_set()).sum()
        } else {
            self.table.total_rows()
        }
    }

    /// Materialize one column through this view's filter/indices.
    pub fn materialize_column(&self, col_idx: usize) -> EngineResult<ColumnArray> {
        if let Some(indices) = &self.indices {
            apply_indices(&self.table, col_idx, indices, self.index_chunks.as_deref())
        } else if let Some(filter) = &self.filter {
            apply_filter(&self.table, col_idx, filter)
        } else {
            // No selection applied: concatenate every chunk's column as-is.
            let parts: Vec<&ColumnArray> = self
                .table
                .chunks()
                .iter()
                .map(|c| c.column(col_idx))
                .collect();
            Ok(concat_columns(&parts))
        }
    }

    /// Replace this view's selection with a fresh per-chunk filter
    /// (what Select does to its input LazyTable).
    pub fn with_filter(&self, filter: ChunkedFilter) -> Self {
        Self {
            table: self.table.clone(),
            filter: Some(filter),
            indices: None,
            index_chunks: None,
            hash_table: self.hash_table.clone(),
        }
    }

    /// Replace this view's selection with fresh join indices (what a
    /// Join does to both its sides, and — via back-propagation — to
    /// every sibling LazyTable sharing the joined table, spec §4.4 step 5).
    pub fn with_indices(&self, indices: Vec<u32>, index_chunks: Option<Vec<u16>>) -> Self {
        Self {
            table: self.table.clone(),
            filter: None,
            indices: Some(indices),
            index_chunks,
            hash_table: None,
        }
    }

    /// Compose this view's existing `indices` with a new `take` array
    /// (spec §4.4 back-propagation: "a table that was previously joined
    /// passes its prior indices through `take(prior_indices,
    /// new_left_indices_of_indices)`"). `take_of` indexes into this
    /// view's *current* row space (i.e. positions within `self.indices`
    /// / `self.filter`, not global table rows).
    pub fn compose_indices(&self, take_of: &[u32]) -> EngineResult<Self> {
        if let Some(prior) = &self.indices {
            let prior_chunks = self.index_chunks.as_deref();
            let new_indices: Vec<u32> = take_of.iter().map(|&i| prior[i as usize]).collect();
            let new_index_chunks = prior_chunks.map(|chunks| {
                take_of.iter().map(|&i| chunks[i as usize]).collect::<Vec<_>>()
            });
            Ok(self.with_indices(new_indices, new_index_chunks))
        } else if let Some(filter) = &self.filter {
            // Expand the filter to a flat global-index list first, then
            // select through take_of — "a table that was previously
            // unjoined adopts the new indices directly" once resolved to
            // a common (global-index) coordinate space.
            let offsets = self.table.offsets();
            let mut global: Vec<u32> = Vec::with_capacity(self.row_count());
            for (chunk_id, mask) in filter.iter().enumerate() {
                let base = offsets[chunk_id] as u32;
                for row in 0..mask.len() {
                    if mask.get(row) {
                        global.push(base + row as u32);
                    }
                }
            }
            let new_indices: Vec<u32> = take_of.iter().map(|&i| global[i as usize]).collect();
            Ok(self.with_indices(new_indices, None))
        } else {
            // Unjoined: the global row space *is* the table's row space.
            let new_indices: Vec<u32> = take_of.to_vec();
            Ok(self.with_indices(new_indices, None))
        }
    }
}

pub(crate) fn concat_columns(parts: &[&ColumnArray]) -> ColumnArray {
    if parts.is_empty() {
        return ColumnArray::Int64(Vec::new());
    }
    let total: usize = parts.iter().map(|c| c.len()).sum();
    let indices: Vec<u32> = (0..total as u32).collect();
    // Build one flat array by taking sequential indices from a
    // concatenation view: cheapest correct approach is a manual merge
    // keyed on variant type, mirrored from `ColumnArray::take`.
    concat_via_take(parts, &indices)
}

pub(crate) fn concat_via_take(parts: &[&ColumnArray], _indices: &[u32]) -> ColumnArray {
    // Chunks are small relative to memory; concatenation is a simple
    // per-variant append rather than routing through `take`, since there
    // is no single backing buffer to index into across chunk boundaries.
    match parts[0] {
        ColumnArray::Boolean(_) => ColumnArray::Boolean(collect_numeric(parts, |c| match c {
            ColumnArray::Boolean(v) => v.clone(),
            _ => unreachable!(),
        })),
        ColumnArray::Int8(_) => ColumnArray::Int8(collect_numeric(parts, |c| match c {
            ColumnArray::Int8(v) => v.clone(),
            _ => unreachable!(),
        })),
        ColumnArray::Int16(_) => ColumnArray::Int16(collect_numeric(parts, |c| match c {
            ColumnArray::Int16(v) => v.clone(),
            _ => unreachable!(),
        })),
        ColumnArray::Int32(_) => ColumnArray::Int32(collect_numeric(parts, |c| match c {
            ColumnArray::Int32(v) => v.clone(),
            _ => unreachable!(),
        })),
        ColumnArray::Int64(_) => ColumnArray::Int64(collect_numeric(parts, |c| match c {
            ColumnArray::Int64(v) => v.clone(),
            _ => unreachable!(),
        })),
        ColumnArray::UInt8(_) => ColumnArray::UInt8(collect_numeric(parts, |c| match c {
            ColumnArray::UInt8(v) => v.clone(),
            _ => unreachable!(),
        })),
        ColumnArray::UInt16(_) => ColumnArray::UInt16(collect_numeric(parts, |c| match c {
            ColumnArray::UInt16(v) => v.clone(),
            _ => unreachable!(),
        })),
        ColumnArray::UInt32(_) => ColumnArray::UInt32(collect_numeric(parts, |c| match c {
            ColumnArray::UInt32(v) => v.clone(),
            _ => unreachable!(),
        })),
        ColumnArray::UInt64(_) => ColumnArray::UInt64(collect_numeric(parts, |c| match c {
            ColumnArray::UInt64(v) => v.clone(),
            _ => unreachable!(),
        })),
        ColumnArray::Float32(_) => ColumnArray::Float32(collect_numeric(parts, |c| match c {
            ColumnArray::Float32(v) => v.clone(),
            _ => unreachable!(),
        })),
        ColumnArray::Float64(_) => ColumnArray::Float64(collect_numeric(parts, |c| match c {
            ColumnArray::Float64(v) => v.clone(),
            _ => unreachable!(),
        })),
        ColumnArray::Utf8 { .. } => {
            let mut data = Vec::new();
            let mut offsets = vec![0u32];
            for part in parts {
                for i in 0..part.len() {
                    let s = part.get_str(i).unwrap_or("");
                    data.extend_from_slice(s.as_bytes());
                    offsets.push(data.len() as u32);
                }
            }
            ColumnArray::Utf8 { offsets, data }
        }
        ColumnArray::FixedBinary { width, .. } => {
            let mut data = Vec::new();
            for part in parts {
                if let ColumnArray::FixedBinary { data: d, .. } = part {
                    data.extend_from_slice(d);
                }
            }
            ColumnArray::FixedBinary { width: *width, data }
        }
    }
}

fn collect_numeric<T: Clone>(parts: &[&ColumnArray], extract: impl Fn(&ColumnArray) -> Vec<T>) -> Vec<T> {
    let mut out = Vec::new();
    for part in parts {
        out.extend(extract(part));
    }
    out
}

/// A named reference into the in-flight relational state: which table
/// (by name) and which column (spec §6 "ColumnReference"). `table =
/// None` names an aggregate/virtual output column rather than a base
/// table column.
#[derive(Debug, Clone)]
pub struct ColumnReference {
    pub table: Option<String>,
    pub col_name: String,
}

impl ColumnReference {
    pub fn new(table: impl Into<String>, col_name: impl Into<String>) -> Self {
        Self {
            table: Some(table.into()),
            col_name: col_name.into(),
        }
    }

    pub fn aggregate(col_name: impl Into<String>) -> Self {
        Self {
            table: None,
            col_name: col_name.into(),
        }
    }
}

/// The in-flight relational state between operators: an ordered list of
/// LazyTables (spec §3 "OperatorResult"). Operators receive one or more
/// of these and produce one; downstream operators see every LazyTable
/// the upstream saw plus any new ones (append semantics).
#[derive(Clone, Default)]
pub struct OperatorResult {
    pub tables: Vec<LazyTable>,
}

impl OperatorResult {
    pub fn new(tables: Vec<LazyTable>) -> Self {
        Self { tables }
    }

    pub fn single(table: LazyTable) -> Self {
        Self { tables: vec![table] }
    }

    pub fn push(&mut self, table: LazyTable) {
        self.tables.push(table);
    }

    pub fn find(&self, table_name: &str) -> Option<&LazyTable> {
        self.tables.iter().find(|t| t.table.name == table_name)
    }

    pub fn find_mut(&mut self, table_name: &str) -> Option<&mut LazyTable> {
        self.tables.iter_mut().find(|t| t.table.name == table_name)
    }

    /// Resolve a list of `ColumnReference` projections into a concrete
    /// `Table` (spec §6). Aggregate/virtual columns (`table = None`) must
    /// already exist in `aggregate_columns`.
    pub fn materialize(
        &self,
        projections: &[ColumnReference],
        aggregate_columns: &[(String, ColumnArray)],
    ) -> EngineResult<Table> {
        let mut fields = Vec::with_capacity(projections.len());
        let mut columns = Vec::with_capacity(projections.len());

        for projection in projections {
            match &projection.table {
                Some(table_name) => {
                    let lazy = self.find(table_name).ok_or_else(|| {
                        EngineError::MissingColumn(format!(
                            "{table_name}.{}",
                            projection.col_name
                        ))
                    })?;
                    let col_idx = lazy.table.schema.require_index(&projection.col_name)?;
                    let array = lazy.materialize_column(col_idx)?;
                    fields.push(Field::new(projection.col_name.clone(), array.logical_type()));
                    columns.push(array);
                }
                None => {
                    let (_, array) = aggregate_columns
                        .iter()
                        .find(|(name, _)| name == &projection.col_name)
                        .ok_or_else(|| {
                            EngineError::MissingColumn(projection.col_name.clone())
                        })?;
                    fields.push(Field::new(projection.col_name.clone(), array.logical_type()));
                    columns.push(array.clone());
                }
            }
        }

        let chunk = Chunk::new(columns)?;
        Table::new("__result", Schema::new(fields), vec![chunk])
    }
}
