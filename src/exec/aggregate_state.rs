//! Two-phase hash aggregate state (spec §4.6): per-task local maps
//! merged into one global map, restricted to SUM/COUNT/MEAN.
//!
//! Grounded in the host's `expression::aggregate::AggregateState` shape
//! (an `update`/`merge`/`finalize` trio per running state) but reworked
//! around the spec's explicit two-level map design — `value_map` /
//! `count_map` / `tuple_map` keyed by a composite group hash, rather
//! than one state object per group.

use ahash::AHashMap;
use std::cmp::Ordering as CmpOrdering;

use crate::storage::RecordId;

/// Which reduction the aggregate column applies (spec §4.6 "f ∈ {SUM,
/// COUNT, MEAN}").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregateOp {
    Sum,
    Count,
    Mean,
}

/// One task's private accumulation (spec §4.6 step 1). `tuple_map`
/// records the first witness row per group hash so the emit phase can
/// re-read the group-by column values without storing them twice.
#[derive(Default)]
pub struct LocalAggState {
    pub value_map: AHashMap<u64, i64>,
    pub count_map: AHashMap<u64, i64>,
    pub tuple_map: AHashMap<u64, RecordId>,
}

impl LocalAggState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one row into the local state. `value` is `None` for COUNT
    /// (the group hash alone drives the count); for SUM/MEAN it is the
    /// int64-cast aggregate-column value at this row.
    pub fn update(&mut self, op: AggregateOp, group_hash: u64, value: Option<i64>, witness: RecordId) {
        self.tuple_map.entry(group_hash).or_insert(witness);

        match op {
            AggregateOp::Count => {
                *self.value_map.entry(group_hash).or_insert(0) =
                    self.value_map.get(&group_hash).copied().unwrap_or(0).wrapping_add(1);
            }
            AggregateOp::Sum => {
                let v = value.unwrap_or(0);
                let entry = self.value_map.entry(group_hash).or_insert(0);
                *entry = entry.wrapping_add(v);
            }
            AggregateOp::Mean => {
                let v = value.unwrap_or(0);
                let entry = self.value_map.entry(group_hash).or_insert(0);
                *entry = entry.wrapping_add(v);
                let count = self.count_map.entry(group_hash).or_insert(0);
                *count = count.wrapping_add(1);
            }
        }
    }

    /// Merge `other` into `self` (spec §4.6 step 2): addition on
    /// collision for value/count maps, first-witness-wins for tuples.
    pub fn merge(&mut self, other: LocalAggState) {
        for (hash, value) in other.value_map {
            let entry = self.value_map.entry(hash).or_insert(0);
            *entry = entry.wrapping_add(value);
        }
        for (hash, count) in other.count_map {
            let entry = self.count_map.entry(hash).or_insert(0);
            *entry = entry.wrapping_add(count);
        }
        for (hash, witness) in other.tuple_map {
            self.tuple_map.entry(hash).or_insert(witness);
        }
    }
}

/// A group's emitted aggregate value: int64 for SUM/COUNT, float64 for
/// MEAN (spec §4.6 "Output schema").
#[derive(Debug, Clone, Copy)]
pub enum AggregateValue {
    Int64(i64),
    Float64(f64),
}

impl AggregateValue {
    pub fn partial_cmp(&self, other: &AggregateValue) -> Option<CmpOrdering> {
        match (self, other) {
            (AggregateValue::Int64(a), AggregateValue::Int64(b)) => Some(a.cmp(b)),
            (AggregateValue::Float64(a), AggregateValue::Float64(b)) => a.partial_cmp(b),
            _ => None,
        }
    }
}

/// Finalize the merged global state into `(group_hash, witness, value)`
/// triples (spec §4.6 step 3 "emit"). A group with zero contributing
/// rows never appears, since it has no entry in `value_map`.
pub fn finalize(op: AggregateOp, state: &LocalAggState) -> Vec<(u64, RecordId, AggregateValue)> {
    state
        .tuple_map
        .iter()
        .map(|(&hash, &witness)| {
            let value = match op {
                AggregateOp::Sum | AggregateOp::Count => {
                    AggregateValue::Int64(state.value_map.get(&hash).copied().unwrap_or(0))
                }
                AggregateOp::Mean => {
                    let sum = state.value_map.get(&hash).copied().unwrap_or(0);
                    let count = state.count_map.get(&hash).copied().unwrap_or(0);
                    AggregateValue::Float64(if count == 0 { 0.0 } else { sum as f64 / count as f64 })
                }
            };
            (hash, witness, value)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sum_wraps_across_local_merge() {
        let mut a = LocalAggState::new();
        a.update(AggregateOp::Sum, 1, Some(10), RecordId::new(0, 0));
        a.update(AggregateOp::Sum, 1, Some(5), RecordId::new(0, 1));

        let mut b = LocalAggState::new();
        b.update(AggregateOp::Sum, 1, Some(7), RecordId::new(0, 2));

        a.merge(b);
        let rows = finalize(AggregateOp::Sum, &a);
        assert_eq!(rows.len(), 1);
        match rows[0].2 {
            AggregateValue::Int64(v) => assert_eq!(v, 22),
            _ => panic!("expected int64"),
        }
    }

    #[test]
    fn mean_divides_after_merge() {
        let mut a = LocalAggState::new();
        a.update(AggregateOp::Mean, 9, Some(4), RecordId::new(0, 0));
        let mut b = LocalAggState::new();
        b.update(AggregateOp::Mean, 9, Some(6), RecordId::new(0, 1));
        b.update(AggregateOp::Mean, 9, Some(8), RecordId::new(1, 0));

        a.merge(b);
        let rows = finalize(AggregateOp::Mean, &a);
        match rows[0].2 {
            AggregateValue::Float64(v) => assert!((v - 6.0).abs() < 1e-9),
            _ => panic!("expected float64"),
        }
    }

    #[test]
    fn empty_group_never_emitted() {
        let state = LocalAggState::new();
        assert!(finalize(AggregateOp::Count, &state).is_empty());
    }
}
