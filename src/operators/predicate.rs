//! The predicate tree (spec §4.3): `Predicate` leaves and `Connective`
//! internal nodes, evaluated chunk-wise into packed bitmaps.
//!
//! BETWEEN is modeled as its own `CompareOp::Between` variant rather
//! than overloading `NotEqual` the way the system this was distilled
//! from does — the REDESIGN FLAG this spec calls out.

use crate::common::error::{EngineError, EngineResult};
use crate::exec::ColumnReference;
use crate::types::{Chunk, Schema, ValidityMask};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Equal,
    NotEqual,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
    Between,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectiveOp {
    And,
    Or,
}

#[derive(Debug, Clone)]
pub struct Predicate {
    pub column: ColumnReference,
    pub op: CompareOp,
    pub value: crate::types::Scalar,
    /// Second bound, present only for `CompareOp::Between` (closed interval).
    pub value2: Option<crate::types::Scalar>,
}

#[derive(Debug, Clone)]
pub enum PredicateTree {
    Leaf(Predicate),
    Connective {
        left: Box<PredicateTree>,
        right: Box<PredicateTree>,
        op: ConnectiveOp,
    },
}

impl PredicateTree {
    pub fn and(left: PredicateTree, right: PredicateTree) -> Self {
        PredicateTree::Connective {
            left: Box::new(left),
            right: Box::new(right),
            op: ConnectiveOp::And,
        }
    }

    pub fn or(left: PredicateTree, right: PredicateTree) -> Self {
        PredicateTree::Connective {
            left: Box::new(left),
            right: Box::new(right),
            op: ConnectiveOp::Or,
        }
    }

    /// Evaluate this tree over one chunk, producing a bitmap the size
    /// of the chunk's row count (spec §4.3 "Execution").
    pub fn evaluate_chunk(&self, schema: &Schema, chunk: &Chunk) -> EngineResult<ValidityMask> {
        match self {
            PredicateTree::Leaf(pred) => evaluate_leaf(schema, chunk, pred),
            PredicateTree::Connective { left, right, op } => {
                let l = left.evaluate_chunk(schema, chunk)?;
                let r = right.evaluate_chunk(schema, chunk)?;
                Ok(match op {
                    ConnectiveOp::And => l.and(&r),
                    ConnectiveOp::Or => l.or(&r),
                })
            }
        }
    }
}

fn evaluate_leaf(schema: &Schema, chunk: &Chunk, pred: &Predicate) -> EngineResult<ValidityMask> {
    let col_idx = schema.require_index(&pred.column.col_name)?;
    let array = chunk.column(col_idx);
    let mut mask = ValidityMask::all_invalid(chunk.num_rows());

    for row in 0..chunk.num_rows() {
        let lhs = array.get_scalar(row);
        let passes = match pred.op {
            CompareOp::Between => {
                let hi = pred.value2.as_ref().ok_or_else(|| {
                    EngineError::Internal("BETWEEN predicate missing upper bound".to_string())
                })?;
                between(&lhs, &pred.value, hi)
            }
            other => compare_passes(other, &lhs, &pred.value),
        };
        mask.set(row, passes);
    }

    Ok(mask)
}

fn compare_passes(op: CompareOp, lhs: &crate::types::Scalar, rhs: &crate::types::Scalar) -> bool {
    use std::cmp::Ordering;
    let Some(ord) = lhs.compare(rhs) else { return false };
    match op {
        CompareOp::Equal => ord == Ordering::Equal,
        CompareOp::NotEqual => ord != Ordering::Equal,
        CompareOp::Less => ord == Ordering::Less,
        CompareOp::LessEqual => ord != Ordering::Greater,
        CompareOp::Greater => ord == Ordering::Greater,
        CompareOp::GreaterEqual => ord != Ordering::Less,
        CompareOp::Between => unreachable!("handled separately"),
    }
}

/// Closed-interval membership. For unsigned columns this is the
/// `(x - lo) <= (hi - lo)` wraparound-free trick named in spec §4.3;
/// other types fall back to the two ordered comparisons.
fn between(x: &crate::types::Scalar, lo: &crate::types::Scalar, hi: &crate::types::Scalar) -> bool {
    use crate::types::Scalar;
    match (x, lo, hi) {
        (Scalar::UInt64(x), Scalar::UInt64(lo), Scalar::UInt64(hi)) => x.wrapping_sub(*lo) <= hi.wrapping_sub(*lo),
        (Scalar::UInt32(x), Scalar::UInt32(lo), Scalar::UInt32(hi)) => {
            (*x as u64).wrapping_sub(*lo as u64) <= (*hi as u64).wrapping_sub(*lo as u64)
        }
        _ => {
            let ge_lo = x.compare(lo).map(|o| o != std::cmp::Ordering::Less).unwrap_or(false);
            let le_hi = x.compare(hi).map(|o| o != std::cmp::Ordering::Greater).unwrap_or(false);
            ge_lo && le_hi
        }
    }
}
