//! `JoinHashTable`: the build side of a hash join (spec §4.4 step 2) and
//! of each dimension probe in LIP (spec §4.5 step 1).
//!
//! Grounded in the host's `execution::hash_table::ParallelHashTable`
//! partitioned-build design, specialized to this engine's join
//! contract: keys are always materialized int64 columns. Entries are
//! keyed by *position within the owning LazyTable's current view*
//! (its `materialize_column` row order) rather than by raw physical
//! `RecordId` — a LazyTable that was itself produced by an earlier join
//! already carries `indices`, and a RecordId would not by itself tell
//! us which position in that prior `indices` array to compose through
//! during back-propagation (spec §4.4 step 5). Positions make both the
//! fresh-table and previously-joined cases go through the same
//! `LazyTable::compose_indices` path.

use crate::common::error::EngineResult;
use crate::exec::lazy_table::LazyTable;
use ahash::AHashMap;
use rayon::prelude::*;

/// Multi-valued int64 → position map. Duplicate keys accumulate in a
/// vector so probing can emit the Cartesian product spec §4.4 requires.
pub struct JoinHashTable {
    map: AHashMap<i64, Vec<u32>>,
}

impl JoinHashTable {
    /// Build from every surviving row of `lazy`'s join column, sized by
    /// the post-filter row count (spec §4.4 step 2). Chunks of
    /// positions are hashed in parallel into thread-local maps, then
    /// merged — mirroring the host's per-partition build followed by a
    /// single assembled table.
    pub fn build(lazy: &LazyTable, col_idx: usize) -> EngineResult<Self> {
        let keys = lazy.materialize_column(col_idx)?;
        let row_count = keys.len();
        let threads = rayon::current_num_threads().max(1);

        let map = (0..row_count)
            .into_par_iter()
            .fold(
                || AHashMap::with_capacity(row_count / threads + 1),
                |mut local, pos| {
                    if let Ok(key) = keys.get_i64(pos) {
                        local.entry(key).or_insert_with(Vec::new).push(pos as u32);
                    }
                    local
                },
            )
            .reduce(AHashMap::new, |mut a, b| {
                for (k, mut v) in b {
                    a.entry(k).or_insert_with(Vec::new).append(&mut v);
                }
                a
            });

        Ok(Self { map })
    }

    /// Look up every position stored under `key`. Null keys never match
    /// (spec §4.4 invariant) — callers never hash a null sentinel in,
    /// so this is simply "absent key".
    pub fn probe(&self, key: i64) -> &[u32] {
        self.map.get(&key).map(|v| v.as_slice()).unwrap_or(&[])
    }

    pub fn contains(&self, key: i64) -> bool {
        self.map.contains_key(&key)
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::Table;
    use crate::types::{Chunk, ColumnArray, Field, LogicalType, Schema};
    use std::sync::Arc;

    fn make_lazy() -> LazyTable {
        let chunk = Chunk::new(vec![ColumnArray::Int64(vec![10, 20, 20, 30])]).unwrap();
        let table = Table::new(
            "dim",
            Schema::new(vec![Field::new("id", LogicalType::Int64)]),
            vec![chunk],
        )
        .unwrap();
        LazyTable::from_table(Arc::new(table))
    }

    #[test]
    fn build_and_probe_multi_valued() {
        let lazy = make_lazy();
        let ht = JoinHashTable::build(&lazy, 0).unwrap();

        assert_eq!(ht.probe(10), &[0]);
        let mut twenty = ht.probe(20).to_vec();
        twenty.sort();
        assert_eq!(twenty, vec![1, 2]);
        assert!(ht.probe(99).is_empty());
        assert_eq!(ht.len(), 3);
    }
}
