//! Columnar type system: logical types, typed column buffers, and the
//! [`Chunk`] row-batch built from them.

pub mod chunk;
pub mod logical_type;
pub mod scalar;
pub mod schema;

pub use chunk::{ColumnArray, Chunk, ValidityMask};
pub use logical_type::LogicalType;
pub use scalar::{hash_combine, Scalar};
pub use schema::{Field, Schema};
