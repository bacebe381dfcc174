//! The two primitives that propagate LazyTable state into concrete
//! arrays (spec §4.2): `apply_filter` and `apply_indices`. Both are
//! parallelized over fixed-size slices, each slice one scheduler
//! sub-task, with deterministic output order.

use crate::common::constants::APPLY_SLICE_SIZE;
use crate::common::error::EngineResult;
use crate::exec::lazy_table::{concat_columns, ChunkedFilter};
use crate::storage::Table;
use crate::types::{ColumnArray, Scalar};
use rayon::prelude::*;

/// Select rows whose bitmap bit is 1, chunk-wise in parallel, then
/// concatenate in chunk-index order (spec §4.2).
pub fn apply_filter(table: &Table, col_idx: usize, filter: &ChunkedFilter) -> EngineResult<ColumnArray> {
    let filtered: Vec<ColumnArray> = table
        .chunks()
        .par_iter()
        .zip(filter.par_iter())
        .map(|(chunk, mask)| chunk.column(col_idx).filter(mask))
        .collect();

    let refs: Vec<&ColumnArray> = filtered.iter().collect();
    Ok(concat_columns(&refs))
}

/// "Take": produce a new chunked array whose i-th element is
/// `values[indices[i]]`, resolving chunk membership via `index_chunks`
/// when present, otherwise via binary search in the table's chunk
/// offsets (spec §4.2).
pub fn apply_indices(
    table: &Table,
    col_idx: usize,
    indices: &[u32],
    index_chunks: Option<&[u16]>,
) -> EngineResult<ColumnArray> {
    let slice_size = APPLY_SLICE_SIZE.max(1);
    let slices: Vec<&[u32]> = indices.chunks(slice_size).collect();
    let chunk_slices: Vec<Option<&[u16]>> = if let Some(ic) = index_chunks {
        ic.chunks(slice_size).map(Some).collect()
    } else {
        vec![None; slices.len()]
    };

    let results: Vec<ColumnArray> = slices
        .into_par_iter()
        .zip(chunk_slices.into_par_iter())
        .map(|(idx_slice, chunk_slice)| gather_slice(table, col_idx, idx_slice, chunk_slice))
        .collect();

    let refs: Vec<&ColumnArray> = results.iter().collect();
    if refs.is_empty() {
        return Ok(table.chunk(0).column(col_idx).take(&[]));
    }
    Ok(concat_columns(&refs))
}

fn gather_slice(
    table: &Table,
    col_idx: usize,
    idx_slice: &[u32],
    chunk_slice: Option<&[u16]>,
) -> ColumnArray {
    let scalars: Vec<Scalar> = idx_slice
        .iter()
        .enumerate()
        .map(|(pos, &global)| {
            let (chunk_id, local_row) = match chunk_slice {
                Some(chunks) => {
                    let chunk_id = chunks[pos];
                    let base = table.offsets()[chunk_id as usize] as u32;
                    (chunk_id, global - base)
                }
                None => {
                    let record = table.resolve(global as usize);
                    (record.chunk_id, record.local_row)
                }
            };
            table
                .chunk(chunk_id as usize)
                .column(col_idx)
                .get_scalar(local_row as usize)
        })
        .collect();

    scalars_to_array(table.chunk(0).column(col_idx), &scalars)
}

pub(crate) fn scalars_to_array(template: &ColumnArray, scalars: &[Scalar]) -> ColumnArray {
    macro_rules! build {
        ($variant:ident) => {
            ColumnArray::$variant(
                scalars
                    .iter()
                    .map(|s| match s {
                        Scalar::$variant(x) => x.clone(),
                        _ => unreachable!("mixed scalar types in one column"),
                    })
                    .collect(),
            )
        };
    }
    match template {
        ColumnArray::Boolean(_) => build!(Boolean),
        ColumnArray::Int8(_) => build!(Int8),
        ColumnArray::Int16(_) => build!(Int16),
        ColumnArray::Int32(_) => build!(Int32),
        ColumnArray::Int64(_) => build!(Int64),
        ColumnArray::UInt8(_) => build!(UInt8),
        ColumnArray::UInt16(_) => build!(UInt16),
        ColumnArray::UInt32(_) => build!(UInt32),
        ColumnArray::UInt64(_) => build!(UInt64),
        ColumnArray::Float32(_) => build!(Float32),
        ColumnArray::Float64(_) => build!(Float64),
        ColumnArray::Utf8 { .. } => {
            let mut data = Vec::new();
            let mut offsets = vec![0u32];
            for s in scalars {
                let Scalar::Utf8(v) = s else { unreachable!("mixed scalar types in one column") };
                data.extend_from_slice(v.as_bytes());
                offsets.push(data.len() as u32);
            }
            ColumnArray::Utf8 { offsets, data }
        }
        ColumnArray::FixedBinary { width, .. } => {
            let mut data = Vec::new();
            for s in scalars {
                let Scalar::FixedBinary(v) = s else { unreachable!("mixed scalar types in one column") };
                data.extend_from_slice(v);
            }
            ColumnArray::FixedBinary { width: *width, data }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Chunk, Field, LogicalType, Schema, ValidityMask};

    fn make_table() -> Table {
        let c0 = Chunk::new(vec![ColumnArray::Int64(vec![0, 1, 2])]).unwrap();
        let c1 = Chunk::new(vec![ColumnArray::Int64(vec![3, 4])]).unwrap();
        Table::new(
            "t",
            Schema::new(vec![Field::new("k", LogicalType::Int64)]),
            vec![c0, c1],
        )
        .unwrap()
    }

    #[test]
    fn apply_filter_preserves_order() {
        let table = make_table();
        let mut m0 = ValidityMask::all_invalid(3);
        m0.set(0, true);
        m0.set(2, true);
        let mut m1 = ValidityMask::all_invalid(2);
        m1.set(1, true);

        let out = apply_filter(&table, 0, &vec![m0, m1]).unwrap();
        match out {
            ColumnArray::Int64(v) => assert_eq!(v, vec![0, 2, 4]),
            _ => panic!("wrong variant"),
        }
    }

    #[test]
    fn apply_indices_resolves_via_offsets() {
        let table = make_table();
        let indices = vec![4, 0, 3];
        let out = apply_indices(&table, 0, &indices, None).unwrap();
        match out {
            ColumnArray::Int64(v) => assert_eq!(v, vec![4, 0, 3]),
            _ => panic!("wrong variant"),
        }
    }

    #[test]
    fn apply_indices_with_index_chunks_matches_binary_search() {
        let table = make_table();
        let indices = vec![4, 0, 3];
        let index_chunks = vec![1u16, 0, 1];
        let out = apply_indices(&table, 0, &indices, Some(&index_chunks)).unwrap();
        let expected = apply_indices(&table, 0, &indices, None).unwrap();
        match (out, expected) {
            (ColumnArray::Int64(a), ColumnArray::Int64(b)) => assert_eq!(a, b),
            _ => panic!("wrong variant"),
        }
    }
}
