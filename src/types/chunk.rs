//! The columnar row-batch: [`Chunk`], its typed [`ColumnArray`] buffers,
//! and the per-column [`ValidityMask`]. Chunks are immutable after
//! construction (spec §3 "Chunks are immutable after insertion").

use crate::common::error::{EngineError, EngineResult};
use crate::types::logical_type::LogicalType;
use crate::types::scalar::Scalar;

/// A per-row validity bitmap: one bit per row, `1` = valid (non-null).
/// Stored as packed 64-bit words, the same bitset discipline used for
/// Select's output filter (spec §4.3).
#[derive(Debug, Clone)]
pub struct ValidityMask {
    words: Vec<u64>,
    len: usize,
}

impl ValidityMask {
    pub fn all_valid(len: usize) -> Self {
        Self {
            words: vec![u64::MAX; Self::word_count(len)],
            len,
        }
    }

    pub fn all_invalid(len: usize) -> Self {
        Self {
            words: vec![0u64; Self::word_count(len)],
            len,
        }
    }

    fn word_count(len: usize) -> usize {
        (len + 63) / 64
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    pub fn get(&self, idx: usize) -> bool {
        debug_assert!(idx < self.len);
        (self.words[idx / 64] >> (idx % 64)) & 1 == 1
    }

    #[inline]
    pub fn set(&mut self, idx: usize, valid: bool) {
        debug_assert!(idx < self.len);
        let word = idx / 64;
        let bit = idx % 64;
        if valid {
            self.words[word] |= 1u64 << bit;
        } else {
            self.words[word] &= !(1u64 << bit);
        }
    }

    /// AND two masks bytewise (used to combine Select's Connective::And).
    pub fn and(&self, other: &ValidityMask) -> ValidityMask {
        debug_assert_eq!(self.len, other.len);
        let words = self
            .words
            .iter()
            .zip(other.words.iter())
            .map(|(a, b)| a & b)
            .collect();
        ValidityMask {
            words,
            len: self.len,
        }
    }

    /// OR two masks bytewise (used to combine Select's Connective::Or).
    pub fn or(&self, other: &ValidityMask) -> ValidityMask {
        debug_assert_eq!(self.len, other.len);
        let words = self
            .words
            .iter()
            .zip(other.words.iter())
            .map(|(a, b)| a | b)
            .collect();
        ValidityMask {
            words,
            len: self.len,
        }
    }

    pub fn count_set(&self) -> usize {
        (0..self.len).filter(|&i| self.get(i)).count()
    }

    pub fn iter(&self) -> impl Iterator<Item = bool> + '_ {
        (0..self.len).map(move |i| self.get(i))
    }

    pub fn take(&self, indices: &[u32]) -> ValidityMask {
        let mut out = ValidityMask::all_invalid(indices.len());
        for (i, &idx) in indices.iter().enumerate() {
            out.set(i, self.get(idx as usize));
        }
        out
    }

    pub fn gather_where(&self, mask: &ValidityMask) -> ValidityMask {
        let mut out = ValidityMask::all_invalid(mask.count_set());
        let mut w = 0;
        for i in 0..self.len {
            if mask.get(i) {
                out.set(w, self.get(i));
                w += 1;
            }
        }
        out
    }
}

/// Typed column storage. One buffer per column per chunk (spec §3).
#[derive(Debug, Clone)]
pub enum ColumnArray {
    Boolean(Vec<bool>),
    Int8(Vec<i8>),
    Int16(Vec<i16>),
    Int32(Vec<i32>),
    Int64(Vec<i64>),
    UInt8(Vec<u8>),
    UInt16(Vec<u16>),
    UInt32(Vec<u32>),
    UInt64(Vec<u64>),
    Float32(Vec<f32>),
    Float64(Vec<f64>),
    /// UTF-8 string column: `offsets.len() == data-rows + 1`, byte range
    /// for row `i` is `data[offsets[i]..offsets[i+1]]`.
    Utf8 { offsets: Vec<u32>, data: Vec<u8> },
    FixedBinary { width: u16, data: Vec<u8> },
}

macro_rules! numeric_variant_ops {
    ($($variant:ident => $ty:ty),* $(,)?) => {
        impl ColumnArray {
            pub fn len(&self) -> usize {
                match self {
                    $(ColumnArray::$variant(v) => v.len(),)*
                    ColumnArray::Utf8 { offsets, .. } => offsets.len().saturating_sub(1),
                    ColumnArray::FixedBinary { width, data } => {
                        if *width == 0 { 0 } else { data.len() / (*width as usize) }
                    }
                }
            }
        }
    };
}

numeric_variant_ops!(
    Boolean => bool,
    Int8 => i8,
    Int16 => i16,
    Int32 => i32,
    Int64 => i64,
    UInt8 => u8,
    UInt16 => u16,
    UInt32 => u32,
    UInt64 => u64,
    Float32 => f32,
    Float64 => f64,
);

impl ColumnArray {
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn logical_type(&self) -> LogicalType {
        match self {
            ColumnArray::Boolean(_) => LogicalType::Boolean,
            ColumnArray::Int8(_) => LogicalType::Int8,
            ColumnArray::Int16(_) => LogicalType::Int16,
            ColumnArray::Int32(_) => LogicalType::Int32,
            ColumnArray::Int64(_) => LogicalType::Int64,
            ColumnArray::UInt8(_) => LogicalType::UInt8,
            ColumnArray::UInt16(_) => LogicalType::UInt16,
            ColumnArray::UInt32(_) => LogicalType::UInt32,
            ColumnArray::UInt64(_) => LogicalType::UInt64,
            ColumnArray::Float32(_) => LogicalType::Float32,
            ColumnArray::Float64(_) => LogicalType::Float64,
            ColumnArray::Utf8 { .. } => LogicalType::Utf8,
            ColumnArray::FixedBinary { width, .. } => LogicalType::FixedBinary(*width),
        }
    }

    /// Read row `idx` as an untyped [`Scalar`]. Used by the predicate
    /// evaluator and the aggregate group-key hasher; hot loops (join
    /// probe, `apply_indices`) use the typed `get_i64`/`get_str` instead.
    pub fn get_scalar(&self, idx: usize) -> Scalar {
        match self {
            ColumnArray::Boolean(v) => Scalar::Boolean(v[idx]),
            ColumnArray::Int8(v) => Scalar::Int8(v[idx]),
            ColumnArray::Int16(v) => Scalar::Int16(v[idx]),
            ColumnArray::Int32(v) => Scalar::Int32(v[idx]),
            ColumnArray::Int64(v) => Scalar::Int64(v[idx]),
            ColumnArray::UInt8(v) => Scalar::UInt8(v[idx]),
            ColumnArray::UInt16(v) => Scalar::UInt16(v[idx]),
            ColumnArray::UInt32(v) => Scalar::UInt32(v[idx]),
            ColumnArray::UInt64(v) => Scalar::UInt64(v[idx]),
            ColumnArray::Float32(v) => Scalar::Float32(v[idx]),
            ColumnArray::Float64(v) => Scalar::Float64(v[idx]),
            ColumnArray::Utf8 { .. } => Scalar::Utf8(self.get_str(idx).unwrap().to_string()),
            ColumnArray::FixedBinary { width, data } => {
                let w = *width as usize;
                Scalar::FixedBinary(data[idx * w..(idx + 1) * w].to_vec())
            }
        }
    }

    /// Fast-path int64 read used by hash-join key extraction (spec §4.4:
    /// "all hash joins in the core assume 64-bit integer key columns").
    pub fn get_i64(&self, idx: usize) -> EngineResult<i64> {
        match self {
            ColumnArray::Int64(v) => Ok(v[idx]),
            other => Err(EngineError::TypeMismatch {
                operator: "join-key-extract",
                column: String::new(),
                expected: "INT64".to_string(),
                found: other.logical_type().to_string(),
            }),
        }
    }

    pub fn get_str(&self, idx: usize) -> Option<&str> {
        match self {
            ColumnArray::Utf8 { offsets, data } => {
                let start = offsets[idx] as usize;
                let end = offsets[idx + 1] as usize;
                std::str::from_utf8(&data[start..end]).ok()
            }
            _ => None,
        }
    }

    /// The "take" primitive (spec §4.2): produce a new array whose i-th
    /// element is `self[indices[i]]`.
    pub fn take(&self, indices: &[u32]) -> ColumnArray {
        macro_rules! take_numeric {
            ($v:expr) => {
                indices.iter().map(|&i| $v[i as usize]).collect()
            };
        }
        match self {
            ColumnArray::Boolean(v) => ColumnArray::Boolean(take_numeric!(v)),
            ColumnArray::Int8(v) => ColumnArray::Int8(take_numeric!(v)),
            ColumnArray::Int16(v) => ColumnArray::Int16(take_numeric!(v)),
            ColumnArray::Int32(v) => ColumnArray::Int32(take_numeric!(v)),
            ColumnArray::Int64(v) => ColumnArray::Int64(take_numeric!(v)),
            ColumnArray::UInt8(v) => ColumnArray::UInt8(take_numeric!(v)),
            ColumnArray::UInt16(v) => ColumnArray::UInt16(take_numeric!(v)),
            ColumnArray::UInt32(v) => ColumnArray::UInt32(take_numeric!(v)),
            ColumnArray::UInt64(v) => ColumnArray::UInt64(take_numeric!(v)),
            ColumnArray::Float32(v) => ColumnArray::Float32(take_numeric!(v)),
            ColumnArray::Float64(v) => ColumnArray::Float64(take_numeric!(v)),
            ColumnArray::Utf8 { .. } => {
                // Strings rebuild offsets/bytes; preallocate from a mean-length
                // estimate and grow if exceeded (spec §4.2 invariant).
                let mean_len = if self.len() == 0 {
                    8
                } else {
                    let ColumnArray::Utf8 { offsets, .. } = self else { unreachable!() };
                    (*offsets.last().unwrap() as usize / self.len().max(1)).max(1)
                };
                let mut data = Vec::with_capacity(mean_len * indices.len());
                let mut offsets = Vec::with_capacity(indices.len() + 1);
                offsets.push(0u32);
                for &i in indices {
                    let s = self.get_str(i as usize).unwrap_or("");
                    data.extend_from_slice(s.as_bytes());
                    offsets.push(data.len() as u32);
                }
                ColumnArray::Utf8 { offsets, data }
            }
            ColumnArray::FixedBinary { width, data } => {
                let w = *width as usize;
                let mut out = Vec::with_capacity(indices.len() * w);
                for &i in indices {
                    let s = i as usize * w;
                    out.extend_from_slice(&data[s..s + w]);
                }
                ColumnArray::FixedBinary { width: *width, data: out }
            }
        }
    }

    /// The "filter" primitive (spec §4.2): keep rows whose bitmap bit is 1.
    pub fn filter(&self, mask: &ValidityMask) -> ColumnArray {
        let indices: Vec<u32> = (0..self.len() as u32)
            .filter(|&i| mask.get(i as usize))
            .collect();
        self.take(&indices)
    }
}

/// A row-batch: a fixed set of typed columns sharing one row count, plus
/// one validity mask per column.
#[derive(Debug, Clone)]
pub struct Chunk {
    columns: Vec<ColumnArray>,
    validity: Vec<ValidityMask>,
    num_rows: usize,
}

impl Chunk {
    pub fn new(columns: Vec<ColumnArray>) -> EngineResult<Self> {
        let num_rows = columns.first().map(|c| c.len()).unwrap_or(0);
        for c in &columns {
            if c.len() != num_rows {
                return Err(EngineError::Internal(format!(
                    "chunk column length mismatch: expected {num_rows}, found {}",
                    c.len()
                )));
            }
        }
        let validity = columns.iter().map(|_| ValidityMask::all_valid(num_rows)).collect();
        Ok(Self {
            columns,
            validity,
            num_rows,
        })
    }

    pub fn with_validity(columns: Vec<ColumnArray>, validity: Vec<ValidityMask>) -> EngineResult<Self> {
        let mut chunk = Self::new(columns)?;
        if validity.len() != chunk.columns.len() {
            return Err(EngineError::Internal(
                "validity mask count does not match column count".to_string(),
            ));
        }
        chunk.validity = validity;
        Ok(chunk)
    }

    pub fn num_rows(&self) -> usize {
        self.num_rows
    }

    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }

    pub fn column(&self, idx: usize) -> &ColumnArray {
        &self.columns[idx]
    }

    pub fn columns(&self) -> &[ColumnArray] {
        &self.columns
    }

    pub fn validity(&self, idx: usize) -> &ValidityMask {
        &self.validity[idx]
    }

    pub fn is_valid(&self, col: usize, row: usize) -> bool {
        self.validity[col].get(row)
    }

    /// Gather rows by local (within-chunk) indices.
    pub fn take(&self, indices: &[u32]) -> Chunk {
        let columns = self.columns.iter().map(|c| c.take(indices)).collect();
        let validity = self.validity.iter().map(|v| v.take(indices)).collect();
        Chunk {
            columns,
            validity,
            num_rows: indices.len(),
        }
    }

    /// Gather rows where `mask` is set.
    pub fn filter(&self, mask: &ValidityMask) -> Chunk {
        let columns = self.columns.iter().map(|c| c.filter(mask)).collect();
        let validity = self.validity.iter().map(|v| v.gather_where(mask)).collect();
        Chunk {
            columns,
            validity,
            num_rows: mask.count_set(),
        }
    }
}
