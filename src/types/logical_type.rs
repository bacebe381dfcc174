//! Logical (schema-level) types supported by the core execution engine.
//!
//! Per spec §3 the core only needs a closed set: signed/unsigned integers
//! at four widths, float32/float64, UTF-8 string, fixed-size binary, and
//! boolean. There is deliberately no Date/Timestamp/Decimal/List/Struct —
//! those belong to the SQL-catalog layer this crate does not implement.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LogicalType {
    Boolean,
    Int8,
    Int16,
    Int32,
    Int64,
    UInt8,
    UInt16,
    UInt32,
    UInt64,
    Float32,
    Float64,
    Utf8,
    FixedBinary(u16),
}

impl LogicalType {
    /// Join keys in the core are always materialized as int64 (spec §3,
    /// §4.4): "All hash joins in the core assume 64-bit integer key
    /// columns".
    pub fn is_join_key_compatible(&self) -> bool {
        matches!(self, LogicalType::Int64)
    }

    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            LogicalType::Int8
                | LogicalType::Int16
                | LogicalType::Int32
                | LogicalType::Int64
                | LogicalType::UInt8
                | LogicalType::UInt16
                | LogicalType::UInt32
                | LogicalType::UInt64
                | LogicalType::Float32
                | LogicalType::Float64
        )
    }
}

impl fmt::Display for LogicalType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogicalType::Boolean => write!(f, "BOOLEAN"),
            LogicalType::Int8 => write!(f, "INT8"),
            LogicalType::Int16 => write!(f, "INT16"),
            LogicalType::Int32 => write!(f, "INT32"),
            LogicalType::Int64 => write!(f, "INT64"),
            LogicalType::UInt8 => write!(f, "UINT8"),
            LogicalType::UInt16 => write!(f, "UINT16"),
            LogicalType::UInt32 => write!(f, "UINT32"),
            LogicalType::UInt64 => write!(f, "UINT64"),
            LogicalType::Float32 => write!(f, "FLOAT32"),
            LogicalType::Float64 => write!(f, "FLOAT64"),
            LogicalType::Utf8 => write!(f, "UTF8"),
            LogicalType::FixedBinary(n) => write!(f, "FIXEDBINARY({n})"),
        }
    }
}
