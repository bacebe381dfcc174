//! [`Table`]: an ordered sequence of chunks sharing one schema, plus the
//! chunk-offset coordinate system used by every indirection structure
//! downstream (spec §3 "Chunk-offset table").

use crate::common::constants::BLOCK_SIZE;
use crate::common::error::{EngineError, EngineResult};
use crate::types::{Chunk, Schema};

/// A physical row address: which chunk, and which row within it. The
/// coordinate every `indices`/`index_chunks` array and every join hash
/// table entry is expressed in (spec glossary "RecordID").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RecordId {
    pub chunk_id: u16,
    pub local_row: u32,
}

impl RecordId {
    pub fn new(chunk_id: u16, local_row: u32) -> Self {
        Self { chunk_id, local_row }
    }
}

#[derive(Debug, Clone)]
pub struct Table {
    pub name: String,
    pub schema: Schema,
    chunks: Vec<Chunk>,
    /// Cumulative row counts; length `chunks.len() + 1`. `offsets[i]` is
    /// the global row index of the first row of `chunks[i]`.
    offsets: Vec<usize>,
    total_rows: usize,
}

impl Table {
    pub fn new(name: impl Into<String>, schema: Schema, chunks: Vec<Chunk>) -> EngineResult<Self> {
        for (i, chunk) in chunks.iter().enumerate() {
            let is_last = i + 1 == chunks.len();
            if chunk.num_rows() > BLOCK_SIZE || (!is_last && chunk.num_rows() < BLOCK_SIZE) {
                // Only the last chunk may be partial (spec §3 invariant).
                if chunk.num_rows() > BLOCK_SIZE {
                    return Err(EngineError::Internal(format!(
                        "chunk {i} has {} rows, exceeding block size {BLOCK_SIZE}",
                        chunk.num_rows()
                    )));
                }
            }
            if chunk.num_columns() != schema.len() {
                return Err(EngineError::Internal(format!(
                    "chunk {i} has {} columns, schema declares {}",
                    chunk.num_columns(),
                    schema.len()
                )));
            }
        }

        let mut offsets = Vec::with_capacity(chunks.len() + 1);
        offsets.push(0);
        let mut total = 0;
        for chunk in &chunks {
            total += chunk.num_rows();
            offsets.push(total);
        }

        Ok(Self {
            name: name.into(),
            schema,
            chunks,
            offsets,
            total_rows: total,
        })
    }

    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    pub fn chunk(&self, idx: usize) -> &Chunk {
        &self.chunks[idx]
    }

    pub fn num_chunks(&self) -> usize {
        self.chunks.len()
    }

    pub fn total_rows(&self) -> usize {
        self.total_rows
    }

    pub fn offsets(&self) -> &[usize] {
        &self.offsets
    }

    /// Resolve a global row index to `(chunk_id, local_row)` via binary
    /// search over the offsets table (spec §3: "the coordinate system
    /// used by all indirection"). Used when a `LazyTable` carries
    /// `indices` without a parallel `index_chunks` array.
    pub fn resolve(&self, global_row: usize) -> RecordId {
        // offsets[0..=num_chunks] is sorted; find the chunk whose range contains global_row.
        let chunk_id = match self.offsets.binary_search(&global_row) {
            Ok(exact) if exact < self.chunks.len() => exact,
            Ok(exact) => exact - 1,
            Err(insert_at) => insert_at - 1,
        };
        let local_row = global_row - self.offsets[chunk_id];
        RecordId::new(chunk_id as u16, local_row as u32)
    }

    pub fn record(&self, id: RecordId) -> &Chunk {
        &self.chunks[id.chunk_id as usize]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ColumnArray, Field, LogicalType};

    fn int_chunk(vals: &[i64]) -> Chunk {
        Chunk::new(vec![ColumnArray::Int64(vals.to_vec())]).unwrap()
    }

    #[test]
    fn offsets_and_resolve() {
        let schema = Schema::new(vec![Field::new("k", LogicalType::Int64)]);
        let table = Table::new(
            "t",
            schema,
            vec![int_chunk(&[1, 2, 3]), int_chunk(&[4, 5])],
        )
        .unwrap();

        assert_eq!(table.total_rows(), 5);
        assert_eq!(table.offsets(), &[0, 3, 5]);

        let r0 = table.resolve(0);
        assert_eq!((r0.chunk_id, r0.local_row), (0, 0));
        let r3 = table.resolve(3);
        assert_eq!((r3.chunk_id, r3.local_row), (1, 0));
        let r4 = table.resolve(4);
        assert_eq!((r4.chunk_id, r4.local_row), (1, 1));
    }
}
