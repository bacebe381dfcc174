//! Constants shared across the execution engine.

/// Fixed block size: the maximum number of rows held by a single [`Chunk`](crate::types::Chunk).
/// Only the final chunk of a table may hold fewer rows.
pub const BLOCK_SIZE: usize = 1 << 16;

/// Row-slice size used to parallelize `apply_filter` / `apply_indices` (spec §4.2).
pub const APPLY_SLICE_SIZE: usize = 30_000;

/// Number of buckets in the LIP Bloom filter per dimension, before load-factor sizing.
pub const BLOOM_DEFAULT_BITS: usize = 1 << 20;

/// Sentinel used for "no match" / "absent" indices.
pub const INVALID_INDEX: u32 = u32::MAX;
