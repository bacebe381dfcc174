//! Typed scalar values: predicate literals (spec §6 "Predicate literal
//! encoding") and the unit a column element is read out as.

use crate::types::logical_type::LogicalType;
use std::cmp::Ordering;
use std::hash::{Hash, Hasher};

/// A single typed value. Comparisons beyond `Utf8` are numeric; `Utf8`
/// compares byte-wise (spec §4.3 "Comparing against a string scalar uses
/// byte-wise equality / ordering").
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Null,
    Boolean(bool),
    Int8(i8),
    Int16(i16),
    Int32(i32),
    Int64(i64),
    UInt8(u8),
    UInt16(u16),
    UInt32(u32),
    UInt64(u64),
    Float32(f32),
    Float64(f64),
    Utf8(String),
    FixedBinary(Vec<u8>),
}

impl Scalar {
    pub fn logical_type(&self) -> Option<LogicalType> {
        match self {
            Scalar::Null => None,
            Scalar::Boolean(_) => Some(LogicalType::Boolean),
            Scalar::Int8(_) => Some(LogicalType::Int8),
            Scalar::Int16(_) => Some(LogicalType::Int16),
            Scalar::Int32(_) => Some(LogicalType::Int32),
            Scalar::Int64(_) => Some(LogicalType::Int64),
            Scalar::UInt8(_) => Some(LogicalType::UInt8),
            Scalar::UInt16(_) => Some(LogicalType::UInt16),
            Scalar::UInt32(_) => Some(LogicalType::UInt32),
            Scalar::UInt64(_) => Some(LogicalType::UInt64),
            Scalar::Float32(_) => Some(LogicalType::Float32),
            Scalar::Float64(_) => Some(LogicalType::Float64),
            Scalar::Utf8(_) => Some(LogicalType::Utf8),
            Scalar::FixedBinary(b) => Some(LogicalType::FixedBinary(b.len() as u16)),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Scalar::Null)
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Scalar::Int8(v) => Some(*v as i64),
            Scalar::Int16(v) => Some(*v as i64),
            Scalar::Int32(v) => Some(*v as i64),
            Scalar::Int64(v) => Some(*v),
            Scalar::UInt8(v) => Some(*v as i64),
            Scalar::UInt16(v) => Some(*v as i64),
            Scalar::UInt32(v) => Some(*v as i64),
            Scalar::UInt64(v) => i64::try_from(*v).ok(),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Scalar::Float32(v) => Some(*v as f64),
            Scalar::Float64(v) => Some(*v),
            _ => self.as_i64().map(|v| v as f64),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Scalar::Utf8(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Ordered comparison. Returns `None` for NULLs or cross-type
    /// comparisons the engine refuses to coerce (predicates require
    /// matching column/scalar types per spec §7 "Type mismatch").
    pub fn compare(&self, other: &Scalar) -> Option<Ordering> {
        match (self, other) {
            (Scalar::Null, _) | (_, Scalar::Null) => None,
            (Scalar::Utf8(a), Scalar::Utf8(b)) => Some(a.as_bytes().cmp(b.as_bytes())),
            (Scalar::Boolean(a), Scalar::Boolean(b)) => Some(a.cmp(b)),
            (Scalar::FixedBinary(a), Scalar::FixedBinary(b)) => Some(a.cmp(b)),
            _ => {
                if let (Some(a), Some(b)) = (self.as_f64(), other.as_f64()) {
                    a.partial_cmp(&b)
                } else {
                    None
                }
            }
        }
    }

    /// Combine this value's hash into a running 64-bit group hash using
    /// the Boost-style combiner named in spec §4.6 and SPEC_FULL §4.6.a.
    pub fn hash_combine_into(&self, seed: u64) -> u64 {
        let mut hasher = ahash::AHasher::default();
        match self {
            Scalar::Null => 0u8.hash(&mut hasher),
            Scalar::Boolean(v) => v.hash(&mut hasher),
            Scalar::Int8(v) => v.hash(&mut hasher),
            Scalar::Int16(v) => v.hash(&mut hasher),
            Scalar::Int32(v) => v.hash(&mut hasher),
            Scalar::Int64(v) => v.hash(&mut hasher),
            Scalar::UInt8(v) => v.hash(&mut hasher),
            Scalar::UInt16(v) => v.hash(&mut hasher),
            Scalar::UInt32(v) => v.hash(&mut hasher),
            Scalar::UInt64(v) => v.hash(&mut hasher),
            Scalar::Float32(v) => v.to_bits().hash(&mut hasher),
            Scalar::Float64(v) => v.to_bits().hash(&mut hasher),
            Scalar::Utf8(v) => v.hash(&mut hasher),
            Scalar::FixedBinary(v) => v.hash(&mut hasher),
        }
        let next = hasher.finish();
        hash_combine(seed, next)
    }
}

/// `hash_combine(seed, next) = seed ^ (next + 0x9e3779b9 + (seed<<6) + (seed>>2))`,
/// verbatim from spec §4.6.
#[inline]
pub fn hash_combine(seed: u64, next: u64) -> u64 {
    seed ^ (next
        .wrapping_add(0x9e3779b9)
        .wrapping_add(seed << 6)
        .wrapping_add(seed >> 2))
}
